//! Structured logging for the Mnemo backend.

mod logger;

pub use logger::init_logging;
