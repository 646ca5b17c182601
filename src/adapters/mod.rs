//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod fs_source_adapter;
pub mod system_compiler_adapter;
