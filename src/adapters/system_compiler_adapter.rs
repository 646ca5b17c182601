//! System C++ compiler adapter.
//!
//! Runs `cxx cxxflags <source> -o <output> -I<dirs...> -I<include_dir> lflags`
//! and waits for it. Compiler diagnostics go straight to the user's stderr.

use crate::domain::config_validation::CompilerSettings;
use crate::domain::error::DtbuildError;
use crate::ports::toolchain_port::{CompileJob, ToolchainPort};
use std::ffi::OsString;
use std::process::Command;

pub struct SystemCompilerAdapter {
    settings: CompilerSettings,
}

impl SystemCompilerAdapter {
    pub fn new(settings: CompilerSettings) -> Self {
        Self { settings }
    }

    fn arguments(&self, job: &CompileJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.settings.cxxflags.iter().map(OsString::from).collect();
        args.push(job.source.clone().into_os_string());
        args.push("-o".into());
        args.push(job.output.clone().into_os_string());
        let dirs = job
            .include_dirs
            .iter()
            .chain(std::iter::once(&self.settings.include_dir))
            .filter(|dir| !dir.as_os_str().is_empty());
        for dir in dirs {
            let mut flag = OsString::from("-I");
            flag.push(dir);
            args.push(flag);
        }
        args.extend(self.settings.lflags.iter().map(OsString::from));
        args
    }
}

impl ToolchainPort for SystemCompilerAdapter {
    fn compile(&self, job: &CompileJob) -> Result<(), DtbuildError> {
        let status = Command::new(&self.settings.cxx)
            .args(self.arguments(job))
            .status()
            .map_err(|e| DtbuildError::Toolchain {
                command: self.describe(job),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(DtbuildError::Toolchain {
                command: self.describe(job),
                reason: match status.code() {
                    Some(code) => format!("exited with status {code}"),
                    None => "terminated by signal".to_string(),
                },
            });
        }
        Ok(())
    }

    fn describe(&self, job: &CompileJob) -> String {
        std::iter::once(self.settings.cxx.clone())
            .chain(
                self.arguments(job)
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned()),
            )
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings(cxx: &str) -> CompilerSettings {
        CompilerSettings {
            cxx: cxx.to_string(),
            cxxflags: vec!["-shared".into(), "-fPIC".into()],
            lflags: vec!["-lm".into()],
            include_dir: PathBuf::from("/opt/dt/include"),
            algorithm_template: None,
            indicator_template: None,
        }
    }

    fn job() -> CompileJob {
        CompileJob {
            source: PathBuf::from("/tmp/dtbuild-x.cpp"),
            output: PathBuf::from("/out/simple.so"),
            include_dirs: vec![PathBuf::from("/algos")],
        }
    }

    #[test]
    fn command_line_order() {
        let adapter = SystemCompilerAdapter::new(settings("g++"));
        assert_eq!(
            adapter.describe(&job()),
            "g++ -shared -fPIC /tmp/dtbuild-x.cpp -o /out/simple.so -I/algos -I/opt/dt/include -lm"
        );
    }

    #[test]
    fn empty_include_dir_is_not_passed() {
        let adapter = SystemCompilerAdapter::new(settings("g++"));
        let mut job = job();
        job.include_dirs = vec![PathBuf::new(), PathBuf::from(".")];
        let command = adapter.describe(&job);
        assert!(command.contains(" -I. -I/opt/dt/include "));
        assert!(!command.split(' ').any(|arg| arg == "-I"));
    }

    #[test]
    fn missing_compiler_is_toolchain_error() {
        let adapter = SystemCompilerAdapter::new(settings("/nonexistent/bin/cxx"));
        let err = adapter.compile(&job()).unwrap_err();
        match err {
            DtbuildError::Toolchain { command, .. } => {
                assert!(command.starts_with("/nonexistent/bin/cxx "))
            }
            other => panic!("expected toolchain error, got {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_toolchain_error() {
        let adapter = SystemCompilerAdapter::new(settings("false"));
        let err = adapter.compile(&job()).unwrap_err();
        assert!(err.to_string().contains("exited with status 1"));
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        let adapter = SystemCompilerAdapter::new(settings("true"));
        assert!(adapter.compile(&job()).is_ok());
    }
}
