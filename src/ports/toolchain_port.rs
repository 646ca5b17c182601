//! System compiler port trait.

use crate::domain::error::DtbuildError;
use std::path::PathBuf;

/// One invocation of the system compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    /// Composed C++ translation unit.
    pub source: PathBuf,
    /// Shared library to produce.
    pub output: PathBuf,
    /// Extra `-I` directories, searched before the runtime headers.
    pub include_dirs: Vec<PathBuf>,
}

/// Port for turning a composed C++ translation unit into a shared library.
pub trait ToolchainPort {
    fn compile(&self, job: &CompileJob) -> Result<(), DtbuildError>;

    /// Command line that `compile` would run, for logging and error reports.
    fn describe(&self, job: &CompileJob) -> String;
}
