//! Table-driven recursive descent parser with local backtracking.
//!
//! Alternatives of a non-terminal are tried in order. An alternative that
//! fails before consuming any token is rejected and the next one is tried;
//! once an alternative has consumed a token it is committed, and a later
//! mandatory symbol that does not match is a syntax error. Only the first
//! error is reported.

use crate::domain::error::Diagnostic;
use crate::domain::grammar::{GrammarTable, NonTerminal, Repeat, Symbol, SymbolKind};
use crate::domain::token::{TerminalKind, Token};
use crate::domain::tree::Node;

/// Result of matching one alternative or non-terminal.
#[derive(Debug)]
enum Outcome {
    Matched(Node, usize),
    Rejected,
}

/// Parse a whole token stream with the grammar's root rule. The root must
/// consume every token.
pub fn parse(tokens: &[Token], grammar: &GrammarTable) -> Result<Node, Diagnostic> {
    parse_as(tokens, grammar, grammar.root())
}

/// Parse a whole token stream as `nt`.
pub fn parse_as(
    tokens: &[Token],
    grammar: &GrammarTable,
    nt: NonTerminal,
) -> Result<Node, Diagnostic> {
    let parser = Parser { tokens, grammar };
    match parser.match_non_terminal(nt, 0)? {
        Outcome::Matched(node, consumed) if consumed == tokens.len() => Ok(node),
        Outcome::Matched(_, consumed) => Err(parser.unexpected(consumed)),
        Outcome::Rejected => Err(parser.expected(SymbolKind::NonTerminal(nt), 0)),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    grammar: &'a GrammarTable,
}

impl Parser<'_> {
    fn match_non_terminal(&self, nt: NonTerminal, pos: usize) -> Result<Outcome, Diagnostic> {
        for (index, alternative) in self.grammar.alternatives(nt).iter().enumerate() {
            if let Outcome::Matched(node, consumed) =
                self.match_alternative(nt, index, alternative, pos)?
            {
                return Ok(Outcome::Matched(node, consumed));
            }
        }
        Ok(Outcome::Rejected)
    }

    fn match_alternative(
        &self,
        nt: NonTerminal,
        index: usize,
        alternative: &[Symbol],
        start: usize,
    ) -> Result<Outcome, Diagnostic> {
        let mut node = Node::non_terminal(nt, index, self.tokens.get(start));
        let mut pos = start;

        for symbol in alternative {
            match symbol.repeat {
                Repeat::Plain => match self.match_symbol(symbol.kind, pos)? {
                    Outcome::Matched(child, consumed) => {
                        node.children.push(child);
                        pos += consumed;
                    }
                    Outcome::Rejected if pos == start => return Ok(Outcome::Rejected),
                    Outcome::Rejected => return Err(self.expected(symbol.kind, pos)),
                },
                Repeat::Optional => {
                    if let Outcome::Matched(child, consumed) = self.match_symbol(symbol.kind, pos)? {
                        node.children.push(child);
                        pos += consumed;
                    }
                }
                Repeat::ZeroOrMore => {
                    while let Outcome::Matched(child, consumed) =
                        self.match_symbol(symbol.kind, pos)?
                    {
                        node.children.push(child);
                        pos += consumed;
                        if consumed == 0 {
                            break;
                        }
                    }
                }
                Repeat::CommaSeparatedZeroOrMore => {
                    let Outcome::Matched(child, consumed) = self.match_symbol(symbol.kind, pos)?
                    else {
                        continue;
                    };
                    node.children.push(child);
                    pos += consumed;

                    while self.kind_at(pos) == Some(TerminalKind::Comma) {
                        match self.match_symbol(symbol.kind, pos + 1)? {
                            Outcome::Matched(child, consumed) => {
                                node.children.push(child);
                                pos += 1 + consumed;
                            }
                            Outcome::Rejected => return Err(self.expected(symbol.kind, pos + 1)),
                        }
                    }
                }
            }
        }

        Ok(Outcome::Matched(node, pos - start))
    }

    fn match_symbol(&self, kind: SymbolKind, pos: usize) -> Result<Outcome, Diagnostic> {
        match kind {
            SymbolKind::Terminal(expected) => Ok(match self.tokens.get(pos) {
                Some(token) if token.kind == expected => Outcome::Matched(Node::terminal(token), 1),
                _ => Outcome::Rejected,
            }),
            SymbolKind::NonTerminal(nt) => self.match_non_terminal(nt, pos),
        }
    }

    fn kind_at(&self, pos: usize) -> Option<TerminalKind> {
        self.tokens.get(pos).map(|t| t.kind)
    }

    fn expected(&self, symbol: SymbolKind, pos: usize) -> Diagnostic {
        self.diagnostic_at(pos, |found| format!("expected {symbol}, found {found}"))
    }

    fn unexpected(&self, pos: usize) -> Diagnostic {
        self.diagnostic_at(pos, |found| format!("unexpected {found}"))
    }

    fn diagnostic_at(&self, pos: usize, message: impl FnOnce(&str) -> String) -> Diagnostic {
        match self.tokens.get(pos) {
            Some(token) => Diagnostic {
                file: token.source_file.clone(),
                line: token.line,
                column: token.column,
                message: message(&format!("'{}'", token.value)),
                width: token.value.chars().count(),
            },
            None => {
                let (file, line, column) = self
                    .tokens
                    .last()
                    .map(|t| {
                        (
                            t.source_file.clone(),
                            t.line,
                            t.column + t.value.chars().count(),
                        )
                    })
                    .unwrap_or_else(|| (String::new(), 1, 1));
                Diagnostic {
                    file,
                    line,
                    column,
                    message: message("end of input"),
                    width: 1,
                }
            }
        }
    }
}
