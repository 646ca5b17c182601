//! Compiler configuration.
//!
//! Validates the `[compiler]` and `[templates]` sections before any script is
//! read, and resolves relative paths against the configuration directory.

use crate::domain::error::DtbuildError;
use crate::ports::config_port::ConfigPort;
use std::path::{Path, PathBuf};

pub const DEFAULT_CXXFLAGS: &str = "-shared -fPIC -O2 -std=c++17";
pub const DEFAULT_INCLUDE_DIR: &str = "../include";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerSettings {
    pub cxx: String,
    pub cxxflags: Vec<String>,
    pub lflags: Vec<String>,
    /// Directory holding `dtbuild/algorithm.h`.
    pub include_dir: PathBuf,
    pub algorithm_template: Option<PathBuf>,
    pub indicator_template: Option<PathBuf>,
}

pub fn validate_compiler_config(config: &dyn ConfigPort) -> Result<(), DtbuildError> {
    validate_cxx(config)?;
    validate_non_blank(config, "compiler", "include_dir")?;
    validate_non_blank(config, "templates", "algorithm")?;
    validate_non_blank(config, "templates", "indicator")?;
    Ok(())
}

/// Validate `config` and read it into settings. Relative paths are resolved
/// against `config_dir`.
pub fn load_compiler_settings(
    config: &dyn ConfigPort,
    config_dir: &Path,
) -> Result<CompilerSettings, DtbuildError> {
    validate_compiler_config(config)?;

    let resolve = |value: String| config_dir.join(value.trim());
    let split = |value: String| -> Vec<String> {
        value.split_whitespace().map(str::to_string).collect()
    };

    Ok(CompilerSettings {
        cxx: config
            .get_string("compiler", "cxx")
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        cxxflags: split(config.get_string_or("compiler", "cxxflags", DEFAULT_CXXFLAGS)),
        lflags: split(config.get_string_or("compiler", "lflags", "")),
        include_dir: resolve(config.get_string_or("compiler", "include_dir", DEFAULT_INCLUDE_DIR)),
        algorithm_template: config.get_string("templates", "algorithm").map(resolve),
        indicator_template: config.get_string("templates", "indicator").map(resolve),
    })
}

fn validate_cxx(config: &dyn ConfigPort) -> Result<(), DtbuildError> {
    match config.get_string("compiler", "cxx") {
        None => Err(DtbuildError::ConfigMissing {
            section: "compiler".to_string(),
            key: "cxx".to_string(),
        }),
        Some(value) if value.trim().is_empty() => Err(DtbuildError::ConfigInvalid {
            section: "compiler".to_string(),
            key: "cxx".to_string(),
            reason: "compiler path must not be empty".to_string(),
        }),
        Some(_) => Ok(()),
    }
}

/// An optional key, if given, must have a value.
fn validate_non_blank(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), DtbuildError> {
    match config.get_string(section, key) {
        Some(value) if value.trim().is_empty() => Err(DtbuildError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must not be empty when given"),
        }),
        _ => Ok(()),
    }
}
