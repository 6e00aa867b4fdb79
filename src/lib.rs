pub mod config;
pub mod diagnose;
pub mod error;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod prepare;
pub mod schema;

pub use error::{EtlError, Result};
