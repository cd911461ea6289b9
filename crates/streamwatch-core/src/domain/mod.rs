//! Domain types shared by every pipeline stage.

pub mod error;
pub mod result;
pub mod status;

pub use error::{ConfigError, DispatchError, Result, WatchError};
pub use result::{HealthResult, RunReport};
pub use status::HealthStatus;
