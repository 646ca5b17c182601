#![allow(dead_code)]

use dtbuild::domain::error::DtbuildError;
use dtbuild::domain::grammar::{GrammarTable, build_grammar};
use dtbuild::domain::orchestrator::Orchestrator;
use dtbuild::domain::template::Templates;
use dtbuild::ports::source_port::SourcePort;
use dtbuild::ports::toolchain_port::{CompileJob, ToolchainPort};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// In-memory scripts keyed by path. Counts reads so tests can check that a
/// pipeline stopped before touching a file.
pub struct MockSourcePort {
    pub files: HashMap<PathBuf, String>,
    pub reads: Cell<usize>,
}

impl MockSourcePort {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            reads: Cell::new(0),
        }
    }

    pub fn with_file(mut self, path: &str, text: &str) -> Self {
        self.files.insert(PathBuf::from(path), text.to_string());
        self
    }
}

impl SourcePort for MockSourcePort {
    fn read_source(&self, path: &Path) -> Result<String, DtbuildError> {
        self.reads.set(self.reads.get() + 1);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| DtbuildError::FileRead {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            })
    }
}

/// Records every job and the translation unit it was given.
pub struct MockToolchain {
    pub jobs: RefCell<Vec<CompileJob>>,
    pub sources: RefCell<Vec<String>>,
    pub fail: bool,
    /// Write a stand-in library to the job's output.
    pub write_output: bool,
}

impl MockToolchain {
    pub fn new() -> Self {
        Self {
            jobs: RefCell::new(Vec::new()),
            sources: RefCell::new(Vec::new()),
            fail: false,
            write_output: true,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs.borrow().len()
    }
}

impl ToolchainPort for MockToolchain {
    fn compile(&self, job: &CompileJob) -> Result<(), DtbuildError> {
        let source = std::fs::read_to_string(&job.source)?;
        self.sources.borrow_mut().push(source);
        self.jobs.borrow_mut().push(job.clone());
        if self.write_output {
            std::fs::write(&job.output, b"\x7fELF partial")?;
        }
        if self.fail {
            return Err(DtbuildError::Toolchain {
                command: self.describe(job),
                reason: "exited with status 1".to_string(),
            });
        }
        Ok(())
    }

    fn describe(&self, job: &CompileJob) -> String {
        format!("mock-cxx {} -o {}", job.source.display(), job.output.display())
    }
}

/// Grammar and built-in templates shared by the pipeline tests.
pub struct Fixture {
    pub grammar: GrammarTable,
    pub templates: Templates,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            grammar: build_grammar().unwrap(),
            templates: Templates::builtin(),
        }
    }

    pub fn orchestrator<'a>(
        &'a self,
        sources: &'a MockSourcePort,
        toolchain: &'a MockToolchain,
    ) -> Orchestrator<'a> {
        Orchestrator::new(&self.grammar, sources, toolchain, &self.templates)
    }
}

pub const EMA_INDICATOR: &str = r#"$label "Exponential moving average"
$identifier EMA
#include <cmath>

// smoothing factor from the period argument
const double k = 2.0 / (args[0] + 1);
data[0] = candles[0].close;
for (int i = 1; i < range; i++) {
    data[i] = candles[i].close * k + data[i - 1] * (1 - k);
}
"#;

pub const CROSSOVER_ALGORITHM: &str = r#"$label "EMA crossover"
#require "ema.dti"

EMA<4> shortma;
EMA<12> longma;

if (shortma.back() > longma.back()) {
    buy();
} else if (shortma.back() < longma.back()) {
    sell();
}
do_nothing();
"#;
