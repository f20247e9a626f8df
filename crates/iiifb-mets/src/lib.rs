pub mod error;
mod wrapper;

pub use error::MetsError;
pub use wrapper::{MetsWrapper, WorkingDirectory, WorkingFile};
