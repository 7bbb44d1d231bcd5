mod guard;
mod stream;

pub use guard::RestorePosition;
pub use stream::StructuralRead;
