// Application crate: the enhancement pipeline, video context, synthesis,
// pool scanning, and the `PulseService` facade used by the CLI.

pub mod cli;
pub mod context;
pub mod enhancement;
pub mod error;
pub mod scan;
pub mod service;
pub mod synthesis;

pub use error::PulseError;
pub use service::PulseService;
