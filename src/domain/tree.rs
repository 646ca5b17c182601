//! Parse tree produced by the parser.
//!
//! Children are owned by their parent; the tree is discarded as a whole once
//! code generation is done.

use crate::domain::grammar::NonTerminal;
use crate::domain::token::{TerminalKind, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    NonTerminal(NonTerminal),
    Terminal(TerminalKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Index of the matched alternative; 0 for terminals.
    pub alternative: usize,
    /// Token text; empty for non-terminals.
    pub value: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub children: Vec<Node>,
}

impl Node {
    pub fn terminal(token: &Token) -> Self {
        Self {
            kind: NodeKind::Terminal(token.kind),
            alternative: 0,
            value: token.value.clone(),
            file: token.source_file.clone(),
            line: token.line,
            column: token.column,
            children: Vec::new(),
        }
    }

    /// A non-terminal positioned at `at`, the first token it covers (or the
    /// token following an empty match).
    pub fn non_terminal(nt: NonTerminal, alternative: usize, at: Option<&Token>) -> Self {
        let (file, line, column) = at
            .map(|t| (t.source_file.clone(), t.line, t.column))
            .unwrap_or_default();
        Self {
            kind: NodeKind::NonTerminal(nt),
            alternative,
            value: String::new(),
            file,
            line,
            column,
            children: Vec::new(),
        }
    }

    pub fn is(&self, nt: NonTerminal) -> bool {
        self.kind == NodeKind::NonTerminal(nt)
    }

    pub fn is_terminal(&self, kind: TerminalKind) -> bool {
        self.kind == NodeKind::Terminal(kind)
    }

    /// First direct child that is the non-terminal `nt`.
    pub fn child(&self, nt: NonTerminal) -> Option<&Node> {
        self.children.iter().find(|c| c.is(nt))
    }

    /// First direct child that is the terminal `kind`.
    pub fn terminal_child(&self, kind: TerminalKind) -> Option<&Node> {
        self.children.iter().find(|c| c.is_terminal(kind))
    }

    /// Every node in the subtree, parents before children.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Every `nt` node in the subtree, in source order.
    pub fn find_all(&self, nt: NonTerminal) -> Vec<&Node> {
        self.descendants().filter(|n| n.is(nt)).collect()
    }

    pub fn contains_terminal(&self, kind: TerminalKind) -> bool {
        self.descendants().any(|n| n.is_terminal(kind))
    }

    /// Token values of the subtree's leaves, in order.
    pub fn leaves(&self) -> Vec<&str> {
        self.descendants()
            .filter(|n| matches!(n.kind, NodeKind::Terminal(_)))
            .map(|n| n.value.as_str())
            .collect()
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
