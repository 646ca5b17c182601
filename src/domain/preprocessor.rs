//! Script preprocessor.
//!
//! Strips comments, collects `$`/`#` directives and expands `#require`.
//! Every file's output starts with a position marker line `@<line>:<path>`
//! so that the lexer can attribute tokens to the author's file and line;
//! a marker is also emitted after each spliced file to resume the includer.

use crate::domain::dependency::{normalize, resolve_relative};
use crate::domain::error::DtbuildError;
use crate::ports::source_port::SourcePort;
use std::path::{Path, PathBuf};

/// First character of a position marker line.
pub const MARKER_PREFIX: char = '@';

/// How `#require` directives are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequireMode {
    /// Recursively preprocess the required file and splice it in place.
    Splice,
    /// Record the directive and blank the line. Used when required files
    /// are composed separately.
    Elide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Label,
    Identifier,
    Require,
    Include,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Argument text. Quotes are removed for `$label` and `#require`;
    /// `#include` keeps its argument verbatim.
    pub argument: String,
    pub file: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOrigin {
    pub file: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessed {
    pub text: String,
    pub directives: Vec<Directive>,
    /// Origin of each output line; `None` for marker lines.
    lines: Vec<Option<LineOrigin>>,
}

impl Preprocessed {
    /// Map a 1-based line of `text` back to the file and line it came from.
    pub fn origin(&self, line: usize) -> Option<&LineOrigin> {
        self.lines.get(line.checked_sub(1)?)?.as_ref()
    }

    pub fn directives_of(&self, kind: DirectiveKind) -> impl Iterator<Item = &Directive> {
        self.directives.iter().filter(move |d| d.kind == kind)
    }

    fn push_marker(&mut self, line: usize, file: &Path) {
        self.text
            .push_str(&format!("{MARKER_PREFIX}{line}:{}\n", file.display()));
        self.lines.push(None);
    }

    fn push_line(&mut self, text: &str, file: &Path, line: usize) {
        self.text.push_str(text);
        self.text.push('\n');
        self.lines.push(Some(LineOrigin {
            file: file.to_path_buf(),
            line,
        }));
    }
}

/// Preprocess the file at `path`.
pub fn preprocess(
    path: &Path,
    sources: &dyn SourcePort,
    mode: RequireMode,
) -> Result<Preprocessed, DtbuildError> {
    let mut preprocessor = Preprocessor {
        sources,
        mode,
        active: Vec::new(),
    };
    let mut out = Preprocessed::default();
    preprocessor.expand(&normalize(path), &mut out)?;
    Ok(out)
}

struct Preprocessor<'a> {
    sources: &'a dyn SourcePort,
    mode: RequireMode,
    /// Files on the current inclusion path, outermost first.
    active: Vec<PathBuf>,
}

impl Preprocessor<'_> {
    fn expand(&mut self, path: &Path, out: &mut Preprocessed) -> Result<(), DtbuildError> {
        if let Some(pos) = self.active.iter().position(|p| p == path) {
            let mut chain = self.active[pos..].to_vec();
            chain.push(path.to_path_buf());
            return Err(DtbuildError::Cycle { chain });
        }

        let raw = self.sources.read_source(path)?;
        let stripped = strip_comments(&raw);

        self.active.push(path.to_path_buf());
        out.push_marker(1, path);

        for (index, line) in stripped.lines().enumerate() {
            let line_no = index + 1;
            if line.trim_start().starts_with(MARKER_PREFIX) {
                return Err(DtbuildError::Preprocess {
                    file: path.display().to_string(),
                    line: line_no,
                    reason: format!("stray '{MARKER_PREFIX}' at start of line"),
                });
            }
            let Some(directive) = parse_directive(line, path, line_no)? else {
                out.push_line(line, path, line_no);
                continue;
            };

            match (directive.kind, self.mode) {
                (DirectiveKind::Require, RequireMode::Splice) => {
                    let target = resolve_relative(path, &directive.argument);
                    out.directives.push(directive);
                    self.expand(&target, out)?;
                    out.push_marker(line_no + 1, path);
                }
                _ => {
                    out.directives.push(directive);
                    out.push_line("", path, line_no);
                }
            }
        }

        self.active.pop();
        Ok(())
    }
}

/// Replace comments with a single space. Newlines inside block comments are
/// kept so that line numbers do not shift. Comment markers inside string or
/// character literals are left alone.
pub fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == '\\' {
                if let Some(&next) = chars.peek() {
                    if next != '\n' {
                        out.push(next);
                        chars.next();
                    }
                }
            } else if ch == q || ch == '\n' {
                quote = None;
            }
            continue;
        }

        match (ch, chars.peek()) {
            ('"' | '\'', _) => {
                quote = Some(ch);
                out.push(ch);
            }
            ('/', Some('/')) => {
                out.push(' ');
                while chars.peek().is_some_and(|&c| c != '\n') {
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                out.push(' ');
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Recognise a directive line (first non-blank character `$` or `#`).
fn parse_directive(
    line: &str,
    file: &Path,
    line_no: usize,
) -> Result<Option<Directive>, DtbuildError> {
    let trimmed = line.trim_start();
    let sigil = match trimmed.chars().next() {
        Some(c @ ('$' | '#')) => c,
        _ => return Ok(None),
    };

    let error = |reason: String| DtbuildError::Preprocess {
        file: file.display().to_string(),
        line: line_no,
        reason,
    };

    let body = trimmed[1..].trim_start();
    let word_end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    let (word, rest) = body.split_at(word_end);
    let rest = rest.trim();

    if word.is_empty() {
        return Err(error(format!("stray '{sigil}' in program")));
    }

    let kind = match (sigil, word) {
        ('$', "label") => DirectiveKind::Label,
        ('$', "identifier") => DirectiveKind::Identifier,
        ('#', "require") => DirectiveKind::Require,
        ('#', "include") => DirectiveKind::Include,
        _ => return Err(error(format!("unknown directive '{sigil}{word}'"))),
    };

    if rest.is_empty() {
        return Err(error(format!("no argument given to directive '{sigil}{word}'")));
    }

    let argument = match kind {
        DirectiveKind::Label | DirectiveKind::Require => unquote(rest).ok_or_else(|| {
            error(format!(
                "directive '{sigil}{word}' expects a quoted argument, found '{rest}'"
            ))
        })?,
        DirectiveKind::Identifier => {
            if !is_identifier(rest) {
                return Err(error(format!("'{rest}' is not a valid indicator identifier")));
            }
            rest.to_string()
        }
        DirectiveKind::Include => rest.to_string(),
    };

    Ok(Some(Directive {
        kind,
        argument,
        file: file.to_path_buf(),
        line: line_no,
    }))
}

/// Contents of a string that is exactly one double-quoted literal.
pub fn unquote(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains('"') {
        return None;
    }
    Some(inner.to_string())
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
