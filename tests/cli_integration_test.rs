//! CLI integration tests with real files on disk.
//!
//! Tests cover:
//! - Config loading and path resolution
//! - Exit codes for each failure stage
//! - Full runs with `true`/`false` standing in for the compiler (unix only)

mod common;

use common::{CROSSOVER_ALGORITHM, EMA_INDICATOR};
use dtbuild::cli::{self, Cli};
use dtbuild::domain::error::DtbuildError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn same_code(actual: ExitCode, expected: u8) -> bool {
    format!("{actual:?}") == format!("{:?}", ExitCode::from(expected))
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn config_with(dir: &Path, cxx: &str) -> PathBuf {
    write(
        dir,
        "config/dtbuild.ini",
        &format!("[compiler]\ncxx = {cxx}\ncxxflags = -shared\ninclude_dir = ../include\n"),
    )
}

fn cli_for(input: PathBuf, config: PathBuf) -> Cli {
    Cli {
        input,
        output_dir: None,
        print: false,
        expand: false,
        config: Some(config),
    }
}

mod config_loading {
    use super::*;

    #[test]
    fn include_dir_is_relative_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(dir.path(), "g++");

        let settings = cli::load_settings(&config).unwrap();
        assert_eq!(settings.cxx, "g++");
        assert_eq!(settings.cxxflags, vec!["-shared".to_string()]);
        assert_eq!(settings.include_dir, dir.path().join("config").join("../include"));
    }

    #[test]
    fn missing_compiler_key_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = write(dir.path(), "dtbuild.ini", "[compiler]\ncxxflags = -O2\n");

        let err = cli::load_settings(&config).unwrap_err();
        assert!(matches!(err, DtbuildError::ConfigMissing { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = cli::load_settings(Path::new("/nonexistent/dtbuild.ini")).unwrap_err();
        assert!(matches!(err, DtbuildError::FileRead { .. }));
    }

    #[test]
    fn template_override_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "config/algo.cpp",
            "extern \"C\" int ranges_size() { return %INDICATOR_COUNT% + 1; }\nextern \"C\" void algorithm() {}\n",
        );
        let config = write(
            dir.path(),
            "config/dtbuild.ini",
            "[compiler]\ncxx = g++\n\n[templates]\nalgorithm = algo.cpp\n",
        );

        let settings = cli::load_settings(&config).unwrap();
        assert_eq!(
            settings.algorithm_template,
            Some(dir.path().join("config").join("algo.cpp"))
        );
        assert_eq!(settings.indicator_template, None);
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn missing_config_exits_with_io_code() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "cross.dts", "$label \"A\"\nbuy();\n");
        let cli = cli_for(input, dir.path().join("absent.ini"));
        assert!(same_code(cli::run(cli), 1));
    }

    #[test]
    fn invalid_config_exits_with_config_code() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "cross.dts", "$label \"A\"\nbuy();\n");
        let config = write(dir.path(), "dtbuild.ini", "[templates]\n");
        assert!(same_code(cli::run(cli_for(input, config)), 2));
    }

    #[test]
    fn cycle_exits_with_cycle_code() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "a.dts", "$label \"A\"\n#require \"b.dti\"\nbuy();\n");
        write(dir.path(), "b.dti", "#require \"a.dts\"\n");
        let config = config_with(dir.path(), "g++");
        assert!(same_code(cli::run(cli_for(input, config)), 3));
    }

    #[test]
    fn syntax_error_exits_with_syntax_code() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "cross.dts", "$label \"A\"\nif (x {\n");
        let config = config_with(dir.path(), "g++");
        assert!(same_code(cli::run(cli_for(input, config)), 4));
    }

    #[test]
    fn directive_error_exits_with_directive_code() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "cross.dts", "buy();\n");
        let config = config_with(dir.path(), "g++");
        assert!(same_code(cli::run(cli_for(input, config)), 5));
    }

    #[test]
    fn expand_does_not_need_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "a.dts", "$label \"A\"\n#require \"b.dti\"\nbuy();\n");
        write(dir.path(), "b.dti", "$label \"B\"\n$identifier B\ndata[0] = 1;\n");
        let mut cli = cli_for(input, dir.path().join("absent.ini"));
        cli.expand = true;
        assert!(same_code(cli::run(cli), 0));
    }
}

#[cfg(unix)]
mod full_runs {
    use super::*;

    fn project(cxx: &str) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "algos/cross.dts", CROSSOVER_ALGORITHM);
        write(dir.path(), "algos/ema.dti", EMA_INDICATOR);
        let config = config_with(dir.path(), cxx);
        (dir, input, config)
    }

    #[test]
    fn successful_compile_exits_zero() {
        let (_dir, input, config) = project("true");
        let mut cli = cli_for(input, config);
        cli.print = true;
        assert!(same_code(cli::run(cli), 0));
    }

    #[test]
    fn output_dir_is_created() {
        let (dir, input, config) = project("true");
        let out = dir.path().join("build/plugins");
        let mut cli = cli_for(input, config);
        cli.output_dir = Some(out.clone());
        assert!(same_code(cli::run(cli), 0));
        assert!(out.is_dir());
    }

    #[test]
    fn failing_compiler_exits_with_toolchain_code() {
        let (dir, input, config) = project("false");
        assert!(same_code(cli::run(cli_for(input, config)), 6));
        let artifact = dir
            .path()
            .join("algos")
            .join(format!("cross.{}", std::env::consts::DLL_EXTENSION));
        assert!(!artifact.exists());
    }
}
