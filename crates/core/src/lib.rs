// Seqrelay Core - Bounded queue and ordered delivery protocol
// NO subscriber or config-file dependencies: the daemon wires those

pub mod application;
pub mod domain;
pub mod error;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
