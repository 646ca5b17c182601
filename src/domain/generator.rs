//! C++ emitter.
//!
//! A structural walk over the parse tree: token values are written back with
//! single spaces, braces open and close indented lines, `;` ends a line
//! except inside a `for` header, and list elements are re-joined with `, `.
//! Action statements become a `return` of the action code. Indicator
//! declarations emit nothing here; the orchestrator turns them into fields.

use crate::domain::action::Action;
use crate::domain::grammar::NonTerminal;
use crate::domain::token::TerminalKind;
use crate::domain::tree::{Node, NodeKind};

pub fn generate(tree: &Node) -> String {
    let mut emitter = Emitter::new();
    emitter.node(tree);
    emitter.out
}

/// Action requested by an `ActionStmt` node.
pub fn action_of(stmt: &Node) -> Option<Action> {
    let call = stmt.child(NonTerminal::ActionCall)?;
    match call.children.first()?.kind {
        NodeKind::Terminal(kind) => Action::from_kind(kind),
        NodeKind::NonTerminal(_) => None,
    }
}

struct Emitter {
    out: String,
    indent: usize,
    line_start: bool,
    /// Nesting of `for` headers; statement ends stay on the line.
    inline: usize,
}

impl Emitter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
            line_start: true,
            inline: 0,
        }
    }

    fn word(&mut self, text: &str) {
        if self.line_start {
            for _ in 0..self.indent {
                self.out.push('\t');
            }
        } else if !matches!(text, "," | ";") {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.line_start = false;
    }

    fn newline(&mut self) {
        if !self.line_start {
            self.out.push('\n');
            self.line_start = true;
        }
    }

    fn node(&mut self, node: &Node) {
        match node.kind {
            NodeKind::Terminal(kind) => self.terminal(kind, &node.value),
            NodeKind::NonTerminal(NonTerminal::IndicatorDecl) => {}
            NodeKind::NonTerminal(NonTerminal::ActionStmt) => match action_of(node) {
                Some(action) => {
                    self.word("return");
                    self.word(&action.code().to_string());
                    self.terminal(TerminalKind::Semicolon, ";");
                }
                None => self.children(node),
            },
            NodeKind::NonTerminal(NonTerminal::ForStmt) => {
                let Some((body, header)) = node.children.split_last() else {
                    return;
                };
                self.inline += 1;
                header.iter().for_each(|child| self.node(child));
                self.inline -= 1;
                self.node(body);
            }
            NodeKind::NonTerminal(NonTerminal::Arguments | NonTerminal::InitList) => {
                for (i, child) in node.children.iter().enumerate() {
                    if i > 0 {
                        self.word(",");
                    }
                    self.node(child);
                }
            }
            NodeKind::NonTerminal(_) => self.children(node),
        }
    }

    fn children(&mut self, node: &Node) {
        node.children.iter().for_each(|child| self.node(child));
    }

    fn terminal(&mut self, kind: TerminalKind, value: &str) {
        match kind {
            TerminalKind::LBrace => {
                self.word(value);
                self.newline();
                self.indent += 1;
            }
            TerminalKind::RBrace => {
                self.indent = self.indent.saturating_sub(1);
                self.newline();
                self.word(value);
                self.newline();
            }
            TerminalKind::Semicolon => {
                self.word(value);
                if self.inline == 0 {
                    self.newline();
                }
            }
            _ => self.word(value),
        }
    }
}
