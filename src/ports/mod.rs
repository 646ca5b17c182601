//! Port traits the domain depends on.

pub mod config_port;
pub mod source_port;
pub mod toolchain_port;
