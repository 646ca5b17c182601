//! Source file access port trait.

use crate::domain::error::DtbuildError;
use std::path::Path;

pub trait SourcePort {
    /// Read a script file in full. A missing or unreadable file is a
    /// `DtbuildError::FileRead`.
    fn read_source(&self, path: &Path) -> Result<String, DtbuildError>;
}
