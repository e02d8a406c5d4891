pub mod config;
pub mod error;
pub mod geo;
pub mod types;

pub use config::RespondConfig;
pub use error::{RespondError, Result};
pub use types::*;
