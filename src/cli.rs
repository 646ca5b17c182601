//! CLI definition and dispatch.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::fs_source_adapter::FsSourceAdapter;
use crate::adapters::system_compiler_adapter::SystemCompilerAdapter;
use crate::domain::config_validation::{CompilerSettings, load_compiler_settings};
use crate::domain::error::DtbuildError;
use crate::domain::grammar::build_grammar;
use crate::domain::orchestrator::{Orchestrator, output_path};
use crate::domain::preprocessor::{RequireMode, preprocess};
use crate::domain::template::Templates;
use crate::ports::source_port::SourcePort;

/// Location of the configuration file, relative to the executable's directory.
pub const CONFIG_FILE: &str = "config/dtbuild.ini";

#[derive(Parser, Debug)]
#[command(
    name = "dtbuild",
    about = "Compile trading algorithm scripts into runtime plugins"
)]
pub struct Cli {
    /// Algorithm script to compile
    pub input: PathBuf,
    /// Directory for the compiled library [default: next to the input]
    #[arg(short, long = "output")]
    pub output_dir: Option<PathBuf>,
    /// Print the generated C++ with line numbers before compiling
    #[arg(short, long)]
    pub print: bool,
    /// Print the input with every #require spliced in, then exit
    #[arg(short = 'E', long)]
    pub expand: bool,
    /// Configuration file [default: <executable dir>/config/dtbuild.ini]
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e, &FsSourceAdapter);
            ExitCode::from(&e)
        }
    }
}

fn execute(cli: &Cli) -> Result<(), DtbuildError> {
    let sources = FsSourceAdapter;
    let grammar = build_grammar()?;

    if cli.expand {
        let expanded = preprocess(&cli.input, &sources, RequireMode::Splice)?;
        print!("{}", expanded.text);
        return Ok(());
    }

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let settings = load_settings(&config_path)?;
    let templates = Templates::load(
        settings.algorithm_template.as_deref(),
        settings.indicator_template.as_deref(),
        &sources,
    )?;
    let toolchain = SystemCompilerAdapter::new(settings);
    let orchestrator = Orchestrator::new(&grammar, &sources, &toolchain, &templates);

    let composed = orchestrator.compose(&cli.input)?;
    if cli.print {
        print!("{}", number_lines(&composed.source));
    }

    if let Some(dir) = &cli.output_dir {
        fs::create_dir_all(dir)?;
    }
    let output = output_path(&cli.input, cli.output_dir.as_deref());
    orchestrator.build(&composed, &output)?;
    eprintln!("{} -> {}", cli.input.display(), output.display());
    Ok(())
}

fn default_config_path() -> Result<PathBuf, DtbuildError> {
    let exe = std::env::current_exe()?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(CONFIG_FILE))
}

/// Read and validate the configuration at `path`.
pub fn load_settings(path: &Path) -> Result<CompilerSettings, DtbuildError> {
    log::info!("loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    load_compiler_settings(&adapter, dir)
}

/// Prefix each line with its 1-based number, `%5d | ` style.
pub fn number_lines(text: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| format!("{:5} | {line}\n", i + 1))
        .collect()
}

/// Print an error; syntax errors get the offending source line and a caret.
pub fn report(err: &DtbuildError, sources: &dyn SourcePort) {
    if let DtbuildError::Syntax(diag) = err {
        let line_text = sources
            .read_source(Path::new(&diag.file))
            .ok()
            .and_then(|text| {
                let index = diag.line.checked_sub(1)?;
                text.lines().nth(index).map(str::to_string)
            });
        if let Some(line_text) = line_text {
            eprintln!("{}", diag.display_with_context(&line_text));
            return;
        }
    }
    eprintln!("error: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_lines_matches_listing_format() {
        assert_eq!(number_lines("a\nb\n"), "    1 | a\n    2 | b\n");
    }

    #[test]
    fn number_lines_of_empty_text_is_empty() {
        assert_eq!(number_lines(""), "");
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from(["dtbuild", "algo.dts", "-o", "out", "-p", "-c", "cfg.ini"]);
        assert_eq!(cli.input, PathBuf::from("algo.dts"));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert!(cli.print);
        assert!(!cli.expand);
        assert_eq!(cli.config, Some(PathBuf::from("cfg.ini")));
    }

    #[test]
    fn cli_requires_input() {
        assert!(Cli::try_parse_from(["dtbuild"]).is_err());
    }

    #[test]
    fn default_config_sits_next_to_executable() {
        let path = default_config_path().unwrap();
        assert!(path.ends_with("config/dtbuild.ini"));
    }
}
