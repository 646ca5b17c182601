//! Build orchestration: from an algorithm script to a shared library.
//!
//! 1. Resolve `#require` dependencies (cycles are rejected before any file is
//!    lexed).
//! 2. Compose each required indicator, deepest first, into an indicator class.
//! 3. Compose the algorithm script and its indicator instances into one
//!    translation unit.
//! 4. Write it to a unique temporary file and hand it to the system compiler.

use crate::domain::dependency::resolve_dependencies;
use crate::domain::error::{Diagnostic, DtbuildError};
use crate::domain::generator::{action_of, generate};
use crate::domain::grammar::{GrammarTable, NonTerminal};
use crate::domain::lexer::{lex, mark_indicator_names};
use crate::domain::parser::parse;
use crate::domain::preprocessor::{DirectiveKind, Preprocessed, RequireMode, preprocess};
use crate::domain::template::{Hook, Templates, indent};
use crate::domain::token::{TerminalKind, Token};
use crate::domain::tree::Node;
use crate::ports::source_port::SourcePort;
use crate::ports::toolchain_port::{CompileJob, ToolchainPort};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix of the generated field holding an indicator instance.
pub const INSTANCE_SUFFIX: &str = "_INDICATOR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedIndicator {
    pub path: PathBuf,
    /// Class name from `$identifier`.
    pub class: String,
    pub label: String,
    /// Class definition produced from the indicator template.
    pub definition: String,
}

/// An `Name<args> variable;` declaration in an algorithm script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorInstance {
    pub class: String,
    pub name: String,
    /// Generated initializer list, e.g. `12, 2`.
    pub init: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedAlgorithm {
    pub path: PathBuf,
    pub label: String,
    /// In composition order.
    pub indicators: Vec<ComposedIndicator>,
    /// In source order.
    pub instances: Vec<IndicatorInstance>,
    /// Complete C++ translation unit.
    pub source: String,
    /// Directories of the composed scripts, for quoted `#include`s.
    pub include_dirs: Vec<PathBuf>,
}

pub struct Orchestrator<'a> {
    grammar: &'a GrammarTable,
    sources: &'a dyn SourcePort,
    toolchain: &'a dyn ToolchainPort,
    templates: &'a Templates,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        grammar: &'a GrammarTable,
        sources: &'a dyn SourcePort,
        toolchain: &'a dyn ToolchainPort,
        templates: &'a Templates,
    ) -> Self {
        Self {
            grammar,
            sources,
            toolchain,
            templates,
        }
    }

    /// Compose and compile `algorithm` into `output`.
    pub fn run(&self, algorithm: &Path, output: &Path) -> Result<ComposedAlgorithm, DtbuildError> {
        let composed = self.compose(algorithm)?;
        self.build(&composed, output)?;
        Ok(composed)
    }

    /// Steps 1 to 3: produce the translation unit for `algorithm`.
    pub fn compose(&self, algorithm: &Path) -> Result<ComposedAlgorithm, DtbuildError> {
        log::info!("resolving dependencies of {}", algorithm.display());
        let graph = resolve_dependencies(algorithm, self.sources)?;
        for entry in &graph.entries {
            log::debug!("  {} (depth {})", entry.path.display(), entry.depth);
        }

        let mut indicators: Vec<ComposedIndicator> = Vec::new();
        let mut labels: HashMap<String, PathBuf> = HashMap::new();
        let mut classes: HashMap<String, PathBuf> = HashMap::new();

        for entry in graph.composition_order() {
            let indicator = self.compose_indicator(&entry.path)?;
            if let Some(first) = labels.get(&indicator.label) {
                return Err(DtbuildError::DuplicateLabel {
                    label: indicator.label,
                    first: first.display().to_string(),
                    second: entry.path.display().to_string(),
                });
            }
            if let Some(first) = classes.get(&indicator.class) {
                return Err(DtbuildError::DuplicateIdentifier {
                    identifier: indicator.class,
                    first: first.display().to_string(),
                    second: entry.path.display().to_string(),
                });
            }
            labels.insert(indicator.label.clone(), entry.path.clone());
            classes.insert(indicator.class.clone(), entry.path.clone());
            indicators.push(indicator);
        }

        self.compose_algorithm(algorithm, indicators)
    }

    /// Compose one indicator script into a class definition.
    pub fn compose_indicator(&self, path: &Path) -> Result<ComposedIndicator, DtbuildError> {
        log::info!("composing indicator {}", path.display());
        let pre = preprocess(path, self.sources, RequireMode::Elide)?;
        let label = single_directive(&pre, DirectiveKind::Label, path)?;
        let class = single_directive(&pre, DirectiveKind::Identifier, path)?;

        let tokens = tokenize(&pre, path);
        let tree = parse(&tokens, self.grammar)?;
        if let Some(stmt) = tree.find_all(NonTerminal::ActionStmt).first() {
            let action = action_of(stmt).map(|a| a.to_string()).unwrap_or_default();
            let message = format!("'{action}' is not allowed in an indicator script");
            return Err(statement_error(stmt, action.len(), message));
        }
        // `calculate` returns void.
        if let Some(stmt) = tree
            .find_all(NonTerminal::ReturnStmt)
            .into_iter()
            .find(|s| s.child(NonTerminal::Expression).is_some())
        {
            let message = "an indicator script cannot return a value".to_string();
            return Err(statement_error(stmt, "return".len(), message));
        }

        let script = indent(&generate(&tree), 2);
        let includes = include_lines(&pre);
        let definition = self.templates.indicator.substitute(&[
            (Hook::Includes, includes.as_str()),
            (Hook::IndicatorClass, class.as_str()),
            (Hook::IndicatorLabel, c_string(&label).as_str()),
            (Hook::CalculateScript, script.as_str()),
        ]);

        Ok(ComposedIndicator {
            path: path.to_path_buf(),
            class,
            label,
            definition,
        })
    }

    fn compose_algorithm(
        &self,
        path: &Path,
        indicators: Vec<ComposedIndicator>,
    ) -> Result<ComposedAlgorithm, DtbuildError> {
        log::info!("composing algorithm {}", path.display());
        let pre = preprocess(path, self.sources, RequireMode::Elide)?;
        let label = single_directive(&pre, DirectiveKind::Label, path)?;
        if let Some(directive) = pre.directives_of(DirectiveKind::Identifier).next() {
            return Err(DtbuildError::Directive {
                file: path.display().to_string(),
                reason: format!(
                    "line {}: '$identifier' is only valid in indicator scripts",
                    directive.line
                ),
            });
        }

        let mut tokens = tokenize(&pre, path);
        let names: HashSet<String> = indicators.iter().map(|i| i.class.clone()).collect();
        mark_indicator_names(&mut tokens, &names);
        let tree = parse(&tokens, self.grammar)?;
        // The script body runs inside a lambda returning the action code.
        if let Some(stmt) = tree
            .find_all(NonTerminal::ReturnStmt)
            .into_iter()
            .find(|s| s.child(NonTerminal::Expression).is_none())
        {
            let message = "'return' in an algorithm script needs an action code".to_string();
            return Err(statement_error(stmt, "return".len(), message));
        }

        let instances = indicator_instances(&tree)?;
        for indicator in &indicators {
            if !instances.iter().any(|i| i.class == indicator.class) {
                log::debug!("indicator {} is required but never declared", indicator.class);
            }
        }

        let script = indent(&generate(&tree), 2);
        let define = indicators
            .iter()
            .map(|i| i.definition.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let declare = instances
            .iter()
            .map(|i| format!("\tconst {} {}{INSTANCE_SUFFIX}{{ {} }};", i.class, i.name, i.init))
            .collect::<Vec<_>>()
            .join("\n");
        let data = instances
            .iter()
            .map(|i| {
                format!(
                    "\tconst Indicator& {name} = add_indicator(out, {name}{INSTANCE_SUFFIX}, \"{name}\");",
                    name = i.name
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let count = instances.len().to_string();
        let includes = include_lines(&pre);

        let source = self.templates.algorithm.substitute(&[
            (Hook::Includes, includes.as_str()),
            (Hook::AlgorithmName, c_string(&label).as_str()),
            (Hook::IndicatorDefine, define.as_str()),
            (Hook::IndicatorDeclare, declare.as_str()),
            (Hook::IndicatorData, data.as_str()),
            (Hook::IndicatorCount, count.as_str()),
            (Hook::AlgorithmScript, script.as_str()),
        ]);
        log::debug!("composed {} bytes of C++", source.len());

        let mut include_dirs: Vec<PathBuf> = Vec::new();
        for file in std::iter::once(path).chain(indicators.iter().map(|i| i.path.as_path())) {
            let dir = script_dir(file);
            if !include_dirs.contains(&dir) {
                include_dirs.push(dir);
            }
        }

        Ok(ComposedAlgorithm {
            path: path.to_path_buf(),
            label,
            indicators,
            instances,
            source,
            include_dirs,
        })
    }

    /// Step 4: compile a composed algorithm into `output`.
    ///
    /// The temporary source is removed whatever the compiler does. A failed
    /// compile also removes anything the compiler left at `output`.
    pub fn build(&self, composed: &ComposedAlgorithm, output: &Path) -> Result<(), DtbuildError> {
        let mut temp = tempfile::Builder::new()
            .prefix("dtbuild-")
            .suffix(".cpp")
            .tempfile()?;
        temp.write_all(composed.source.as_bytes())?;
        temp.flush()?;

        let job = CompileJob {
            source: temp.path().to_path_buf(),
            output: output.to_path_buf(),
            include_dirs: composed.include_dirs.clone(),
        };
        log::info!("{}", self.toolchain.describe(&job));
        let result = self.toolchain.compile(&job);

        let temp_path = temp.path().to_path_buf();
        let cleanup = temp.close().map_err(|source| DtbuildError::Cleanup {
            path: temp_path,
            source,
        });

        match result {
            Ok(()) => {
                log::info!("wrote {}", output.display());
                cleanup
            }
            Err(err) => {
                if output.exists() {
                    if let Err(e) = std::fs::remove_file(output) {
                        log::warn!("could not remove partial output {}: {e}", output.display());
                    }
                }
                if let Err(e) = cleanup {
                    log::error!("{e}");
                }
                Err(err)
            }
        }
    }
}

/// Where the library for `input` goes: `<dir>/<stem>.<dll extension>`, with
/// `dir` defaulting to the input's directory.
pub fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let dir = out_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.parent().unwrap_or_else(|| Path::new("")).to_path_buf());
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "algorithm".to_string());
    dir.join(format!("{stem}.{}", std::env::consts::DLL_EXTENSION))
}

fn statement_error(stmt: &Node, width: usize, message: String) -> DtbuildError {
    Diagnostic {
        file: stmt.file.clone(),
        line: stmt.line,
        column: stmt.column,
        message,
        width,
    }
    .into()
}

/// Directory of a script, `.` for a bare file name.
fn script_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn tokenize(pre: &Preprocessed, path: &Path) -> Vec<Token> {
    let tokens: Vec<Token> = lex(&pre.text, &path.display().to_string()).collect();
    log::debug!("{}: {} tokens", path.display(), tokens.len());
    tokens
}

/// Argument of the one `kind` directive a script must contain.
fn single_directive(
    pre: &Preprocessed,
    kind: DirectiveKind,
    path: &Path,
) -> Result<String, DtbuildError> {
    let name = match kind {
        DirectiveKind::Label => "$label",
        DirectiveKind::Identifier => "$identifier",
        DirectiveKind::Require => "#require",
        DirectiveKind::Include => "#include",
    };
    let mut found = pre.directives_of(kind);
    let Some(first) = found.next() else {
        return Err(DtbuildError::Directive {
            file: path.display().to_string(),
            reason: format!("missing '{name}' directive"),
        });
    };
    if let Some(again) = found.next() {
        return Err(DtbuildError::Directive {
            file: path.display().to_string(),
            reason: format!(
                "line {}: '{name}' redefined (first given on line {})",
                again.line, first.line
            ),
        });
    }
    Ok(first.argument.clone())
}

/// `#include` lines of a script, duplicates dropped.
fn include_lines(pre: &Preprocessed) -> String {
    let mut seen = HashSet::new();
    pre.directives_of(DirectiveKind::Include)
        .filter(|d| seen.insert(d.argument.as_str()))
        .map(|d| format!("#include {}", d.argument))
        .collect::<Vec<_>>()
        .join("\n")
}

fn indicator_instances(tree: &Node) -> Result<Vec<IndicatorInstance>, DtbuildError> {
    let mut instances: Vec<IndicatorInstance> = Vec::new();
    for decl in tree.find_all(NonTerminal::IndicatorDecl) {
        let class = terminal_text(decl, TerminalKind::IndicatorName);
        let name = terminal_text(decl, TerminalKind::Identifier);
        if instances.iter().any(|i| i.name == name) {
            return Err(DtbuildError::DuplicateDeclaration {
                file: decl.file.clone(),
                line: decl.line,
                name,
            });
        }
        let init = decl
            .child(NonTerminal::InitList)
            .map(generate)
            .unwrap_or_default();
        instances.push(IndicatorInstance {
            class,
            name,
            init,
            line: decl.line,
        });
    }
    Ok(instances)
}

fn terminal_text(node: &Node, kind: TerminalKind) -> String {
    node.terminal_child(kind)
        .map(|n| n.value.clone())
        .unwrap_or_default()
}

/// Escape text for use inside a C string literal.
fn c_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
