pub mod config;
pub mod manifest;
pub mod patch;
pub mod runtime;
pub mod sync;
