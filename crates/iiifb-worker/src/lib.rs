pub mod coordinator;
pub mod error;
pub mod reader;
pub mod shutdown;

pub use coordinator::{CoordinatorConfig, JobCoordinator};
pub use error::WorkerError;
pub use reader::StreamReader;
pub use shutdown::{Shutdown, ShutdownHandle};
