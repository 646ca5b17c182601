//! Error types for the dtbuild toolchain.

use std::path::PathBuf;

/// A syntax error reported by the parser, positioned in the author's file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    /// Length of the offending token, used to size the underline.
    pub width: usize,
}

impl Diagnostic {
    /// Format the error with the offending source line and a caret underline.
    ///
    /// `line_text` is the full text of line `self.line` in `self.file`.
    pub fn display_with_context(&self, line_text: &str) -> String {
        let indent = " ".repeat(self.column.saturating_sub(1));
        let underline = "~".repeat(self.width.saturating_sub(1));
        format!(
            "dtbuild: {file}:{line}:{column}: error: {message}\n{line:>5} | {text}\n      | {indent}^{underline}",
            file = self.file,
            line = self.line,
            column = self.column,
            message = self.message,
            text = line_text,
            indent = indent,
            underline = underline,
        )
    }
}

/// Self-validation failures of the grammar table. Any of these means the
/// toolchain itself cannot run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("rule '{rule}' has {count} empty alternatives, at most one is allowed")]
    MultipleEmptyAlternatives { rule: String, count: usize },

    #[error("rule '{rule}': alternatives {first} and {second} can both start with {symbol}")]
    AmbiguousAlternatives {
        rule: String,
        first: usize,
        second: usize,
        symbol: String,
    },

    #[error("rule '{rule}' refers to '{symbol}', which has no rule")]
    UndefinedNonTerminal { rule: String, symbol: String },

    #[error("rule '{rule}' is left-recursive")]
    LeftRecursion { rule: String },

    #[error("rule '{rule}' repeats a symbol that can match nothing")]
    NullableRepetition { rule: String },

    #[error("root rule '{rule}' is not defined")]
    MissingRoot { rule: String },
}

/// Top-level error type for dtbuild.
#[derive(Debug, thiserror::Error)]
pub enum DtbuildError {
    #[error("failed to read '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{file}:{line}: {reason}")]
    Preprocess {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("circular dependency: {}", display_chain(.chain))]
    Cycle { chain: Vec<PathBuf> },

    #[error(transparent)]
    Syntax(#[from] Diagnostic),

    #[error("{file}: {reason}")]
    Directive { file: String, reason: String },

    #[error("indicator label \"{label}\" is defined by both '{first}' and '{second}'")]
    DuplicateLabel {
        label: String,
        first: String,
        second: String,
    },

    #[error("indicator identifier '{identifier}' is defined by both '{first}' and '{second}'")]
    DuplicateIdentifier {
        identifier: String,
        first: String,
        second: String,
    },

    #[error("{file}:{line}: indicator '{name}' is declared more than once")]
    DuplicateDeclaration {
        file: String,
        line: usize,
        name: String,
    },

    #[error("compiler command `{command}` failed: {reason}")]
    Toolchain { command: String, reason: String },

    #[error("failed to remove temporary file '{}': {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("grammar self-check failed: {0}")]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl From<&DtbuildError> for std::process::ExitCode {
    fn from(err: &DtbuildError) -> Self {
        let code: u8 = match err {
            DtbuildError::FileRead { .. } | DtbuildError::Io(_) => 1,
            DtbuildError::ConfigParse { .. }
            | DtbuildError::ConfigMissing { .. }
            | DtbuildError::ConfigInvalid { .. } => 2,
            DtbuildError::Cycle { .. } => 3,
            DtbuildError::Syntax(_) => 4,
            DtbuildError::Preprocess { .. }
            | DtbuildError::Directive { .. }
            | DtbuildError::DuplicateLabel { .. }
            | DtbuildError::DuplicateIdentifier { .. }
            | DtbuildError::DuplicateDeclaration { .. } => 5,
            DtbuildError::Toolchain { .. } => 6,
            DtbuildError::Cleanup { .. } => 7,
            DtbuildError::Grammar(_) => 8,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic() -> Diagnostic {
        Diagnostic {
            file: "algo.dts".into(),
            line: 3,
            column: 5,
            message: "expected ';', found '}'".into(),
            width: 1,
        }
    }

    #[test]
    fn diagnostic_display_has_position() {
        assert_eq!(
            diagnostic().to_string(),
            "algo.dts:3:5: expected ';', found '}'"
        );
    }

    #[test]
    fn display_with_context_points_at_column() {
        let ctx = diagnostic().display_with_context("    }");
        let lines: Vec<&str> = ctx.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("error: expected ';'"));
        assert_eq!(lines[1], "    3 |     }");
        assert_eq!(lines[2], "      |     ^");
    }

    #[test]
    fn display_with_context_underlines_width() {
        let mut diag = diagnostic();
        diag.width = 4;
        let ctx = diag.display_with_context("    else");
        assert!(ctx.ends_with("^~~~"));
    }

    #[test]
    fn cycle_lists_chain() {
        let err = DtbuildError::Cycle {
            chain: vec!["a.dts".into(), "b.dti".into(), "a.dts".into()],
        };
        assert_eq!(
            err.to_string(),
            "circular dependency: a.dts -> b.dti -> a.dts"
        );
    }

    #[test]
    fn exit_codes_are_distinct_per_category() {
        use std::process::ExitCode;
        let syntax: ExitCode = (&DtbuildError::Syntax(diagnostic())).into();
        let cycle: ExitCode = (&DtbuildError::Cycle { chain: vec![] }).into();
        assert_eq!(format!("{syntax:?}"), format!("{:?}", ExitCode::from(4)));
        assert_eq!(format!("{cycle:?}"), format!("{:?}", ExitCode::from(3)));
    }
}
