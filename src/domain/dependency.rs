//! `#require` dependency resolution.
//!
//! Dependencies are discovered from the raw text of each file, before any
//! preprocessing, so discovery does not depend on comment stripping or
//! splicing. The depth of a file is the longest chain of requirements from
//! the root to it; composition emits the deepest files first.

use crate::domain::error::DtbuildError;
use crate::domain::preprocessor::unquote;
use crate::ports::source_port::SourcePort;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    pub path: PathBuf,
    pub depth: usize,
}

/// A `#require` found in a file's raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub target: String,
    pub line: usize,
}

/// All files reachable from a root through `#require`, root excluded.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// In depth-first discovery order.
    pub entries: Vec<DependencyEntry>,
}

impl DependencyGraph {
    /// Entries ordered by descending depth; ties keep discovery order.
    pub fn composition_order(&self) -> Vec<&DependencyEntry> {
        let mut ordered: Vec<&DependencyEntry> = self.entries.iter().collect();
        ordered.sort_by(|a, b| b.depth.cmp(&a.depth));
        ordered
    }

    pub fn depth_of(&self, path: &Path) -> Option<usize> {
        self.entries.iter().find(|e| e.path == path).map(|e| e.depth)
    }
}

/// Resolve `target` relative to the directory of `including`.
pub fn resolve_relative(including: &Path, target: &str) -> PathBuf {
    let base = including.parent().unwrap_or_else(|| Path::new(""));
    normalize(&base.join(target))
}

/// Lexically remove `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Find `#require "file"` lines in raw source text.
pub fn scan_requires(source: &str, file: &Path) -> Result<Vec<Requirement>, DtbuildError> {
    let mut requires = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let Some(rest) = line.trim_start().strip_prefix('#') else {
            continue;
        };
        let Some(argument) = rest.trim_start().strip_prefix("require") else {
            continue;
        };
        if argument.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
            continue;
        }
        let argument = argument.trim();
        let target = unquote(argument).ok_or_else(|| DtbuildError::Preprocess {
            file: file.display().to_string(),
            line: index + 1,
            reason: format!("directive '#require' expects a quoted argument, found '{argument}'"),
        })?;
        requires.push(Requirement {
            target,
            line: index + 1,
        });
    }
    Ok(requires)
}

/// Walk the `#require` graph from `root`. A file that requires itself,
/// directly or transitively, is a `DtbuildError::Cycle`.
pub fn resolve_dependencies(
    root: &Path,
    sources: &dyn SourcePort,
) -> Result<DependencyGraph, DtbuildError> {
    let mut walker = Walker {
        sources,
        stack: Vec::new(),
        edges: HashMap::new(),
        order: Vec::new(),
    };
    let root = normalize(root);
    walker.discover(&root)?;

    let mut depths: HashMap<PathBuf, usize> = HashMap::new();
    assign_depth(&walker.edges, &root, 0, &mut depths);

    let entries = walker
        .order
        .into_iter()
        .filter(|p| *p != root)
        .map(|path| {
            let depth = depths.get(&path).copied().unwrap_or(0);
            DependencyEntry { path, depth }
        })
        .collect();

    Ok(DependencyGraph { entries })
}

struct Walker<'a> {
    sources: &'a dyn SourcePort,
    stack: Vec<PathBuf>,
    /// Finished files and their direct requirements.
    edges: HashMap<PathBuf, Vec<PathBuf>>,
    order: Vec<PathBuf>,
}

impl Walker<'_> {
    fn discover(&mut self, path: &Path) -> Result<(), DtbuildError> {
        if let Some(pos) = self.stack.iter().position(|p| p == path) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(path.to_path_buf());
            return Err(DtbuildError::Cycle { chain });
        }
        if self.edges.contains_key(path) {
            return Ok(());
        }

        let source = self.sources.read_source(path)?;
        let targets: Vec<PathBuf> = scan_requires(&source, path)?
            .iter()
            .map(|r| resolve_relative(path, &r.target))
            .collect();

        self.order.push(path.to_path_buf());
        self.stack.push(path.to_path_buf());
        for target in &targets {
            self.discover(target)?;
        }
        self.stack.pop();

        self.edges.insert(path.to_path_buf(), targets);
        Ok(())
    }
}

fn assign_depth(
    edges: &HashMap<PathBuf, Vec<PathBuf>>,
    path: &Path,
    depth: usize,
    depths: &mut HashMap<PathBuf, usize>,
) {
    if depths.get(path).is_some_and(|&d| d >= depth) {
        return;
    }
    depths.insert(path.to_path_buf(), depth);
    if let Some(targets) = edges.get(path) {
        for target in targets {
            assign_depth(edges, target, depth + 1, depths);
        }
    }
}
