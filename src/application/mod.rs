// Application layer: the service clients call into, the result shapes it
// returns, and the configuration it runs with.

pub mod config;
pub mod error;
pub mod reporting;
pub mod service;

pub use config::*;
pub use error::*;
pub use reporting::*;
pub use service::*;
