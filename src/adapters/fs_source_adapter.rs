//! Filesystem source adapter.

use crate::domain::error::DtbuildError;
use crate::ports::source_port::SourcePort;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct FsSourceAdapter;

impl SourcePort for FsSourceAdapter {
    fn read_source(&self, path: &Path) -> Result<String, DtbuildError> {
        fs::read_to_string(path).map_err(|source| DtbuildError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }
}
