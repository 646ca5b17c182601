//! Grammar table for the scripting language.
//!
//! The table is plain data: every non-terminal maps to an ordered list of
//! alternatives, each an ordered list of `Symbol`s. `GrammarTable::from_rules`
//! validates the rules once so that the parser can rely on one token of
//! lookahead picking at most one alternative.

use crate::domain::error::GrammarError;
use crate::domain::token::TerminalKind;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NonTerminal {
    Program,
    Item,
    IndicatorDecl,
    InitList,
    Statement,
    Block,
    Declaration,
    TypeSpec,
    Declarator,
    Initializer,
    DeclaratorTail,
    IfStmt,
    ElseClause,
    WhileStmt,
    ForStmt,
    ForInit,
    ReturnStmt,
    BreakStmt,
    ContinueStmt,
    ActionStmt,
    ActionCall,
    ExprStmt,
    EmptyStmt,
    Expression,
    AssignTail,
    AssignOp,
    Ternary,
    TernaryTail,
    LogicalOr,
    OrTail,
    LogicalAnd,
    AndTail,
    Equality,
    EqualityTail,
    EqualityOp,
    Relational,
    RelationalTail,
    RelationalOp,
    Additive,
    AdditiveTail,
    AdditiveOp,
    Multiplicative,
    MultiplicativeTail,
    MultiplicativeOp,
    Unary,
    UnaryOp,
    Postfix,
    PostfixOp,
    Arguments,
    Primary,
}

impl NonTerminal {
    /// Human-readable description used in diagnostics.
    pub fn describe(self) -> &'static str {
        use NonTerminal::*;
        match self {
            Program => "program",
            Item => "declaration or statement",
            IndicatorDecl => "indicator declaration",
            InitList => "indicator arguments",
            Statement => "statement",
            Block => "block",
            Declaration => "declaration",
            TypeSpec => "type",
            Declarator => "variable name",
            Initializer => "initializer",
            DeclaratorTail => "declarator",
            IfStmt => "if statement",
            ElseClause => "else clause",
            WhileStmt => "while statement",
            ForStmt => "for statement",
            ForInit => "for initializer",
            ReturnStmt => "return statement",
            BreakStmt => "break statement",
            ContinueStmt => "continue statement",
            ActionStmt => "action statement",
            ActionCall => "'buy', 'sell' or 'do_nothing'",
            ExprStmt => "expression statement",
            EmptyStmt => "';'",
            AssignOp => "assignment operator",
            EqualityOp => "'==' or '!='",
            RelationalOp => "comparison operator",
            AdditiveOp => "'+' or '-'",
            MultiplicativeOp => "'*', '/' or '%'",
            UnaryOp => "unary operator",
            PostfixOp => "postfix operator",
            Arguments => "arguments",
            Expression | AssignTail | Ternary | TernaryTail | LogicalOr | OrTail | LogicalAnd
            | AndTail | Equality | EqualityTail | Relational | RelationalTail | Additive
            | AdditiveTail | Multiplicative | MultiplicativeTail | Unary | Postfix | Primary => {
                "expression"
            }
        }
    }
}

impl fmt::Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Repetition modifier on a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Plain,
    Optional,
    ZeroOrMore,
    CommaSeparatedZeroOrMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Terminal(TerminalKind),
    NonTerminal(NonTerminal),
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Terminal(kind) => kind.fmt(f),
            SymbolKind::NonTerminal(nt) => nt.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub repeat: Repeat,
}

impl Symbol {
    pub fn terminal(kind: TerminalKind) -> Self {
        Self {
            kind: SymbolKind::Terminal(kind),
            repeat: Repeat::Plain,
        }
    }

    pub fn non_terminal(nt: NonTerminal) -> Self {
        Self {
            kind: SymbolKind::NonTerminal(nt),
            repeat: Repeat::Plain,
        }
    }

    pub fn optional(self) -> Self {
        Self {
            repeat: Repeat::Optional,
            ..self
        }
    }

    pub fn many(self) -> Self {
        Self {
            repeat: Repeat::ZeroOrMore,
            ..self
        }
    }

    pub fn comma_separated(self) -> Self {
        Self {
            repeat: Repeat::CommaSeparatedZeroOrMore,
            ..self
        }
    }

    pub fn is_mandatory(&self) -> bool {
        self.repeat == Repeat::Plain
    }
}

pub type Alternative = Vec<Symbol>;

#[derive(Debug, Clone)]
pub struct GrammarRule {
    pub non_terminal: NonTerminal,
    pub alternatives: Vec<Alternative>,
}

impl GrammarRule {
    pub fn new(non_terminal: NonTerminal, alternatives: Vec<Alternative>) -> Self {
        Self {
            non_terminal,
            alternatives,
        }
    }
}

/// Validated, read-only grammar. Built once at startup and shared by
/// reference with every parse.
#[derive(Debug, Clone)]
pub struct GrammarTable {
    root: NonTerminal,
    rules: BTreeMap<NonTerminal, Vec<Alternative>>,
}

impl GrammarTable {
    /// Build and validate a table. Rules for the same non-terminal are
    /// merged in order.
    pub fn from_rules(root: NonTerminal, rules: Vec<GrammarRule>) -> Result<Self, GrammarError> {
        let mut merged: BTreeMap<NonTerminal, Vec<Alternative>> = BTreeMap::new();
        for rule in rules {
            merged
                .entry(rule.non_terminal)
                .or_default()
                .extend(rule.alternatives);
        }

        if !merged.contains_key(&root) {
            return Err(GrammarError::MissingRoot {
                rule: format!("{root:?}"),
            });
        }

        for (nt, alternatives) in &merged {
            for symbol in alternatives.iter().flatten() {
                let SymbolKind::NonTerminal(target) = symbol.kind else {
                    continue;
                };
                if !merged.contains_key(&target) {
                    return Err(GrammarError::UndefinedNonTerminal {
                        rule: format!("{nt:?}"),
                        symbol: format!("{target:?}"),
                    });
                }
            }
        }

        for (nt, alternatives) in merged.iter_mut() {
            let empty = alternatives.iter().filter(|a| a.is_empty()).count();
            if empty > 1 {
                return Err(GrammarError::MultipleEmptyAlternatives {
                    rule: format!("{nt:?}"),
                    count: empty,
                });
            }
            // Stable: non-empty alternatives keep their order, the empty one goes last.
            alternatives.sort_by_key(|a| a.is_empty());
        }

        let table = Self {
            root,
            rules: merged,
        };
        let nullable = table.nullable_set();
        table.check_nullable_repetition(&nullable)?;
        table.check_left_recursion(&nullable)?;
        table.check_disjoint_alternatives(&nullable)?;
        Ok(table)
    }

    pub fn root(&self) -> NonTerminal {
        self.root
    }

    pub fn alternatives(&self, nt: NonTerminal) -> &[Alternative] {
        self.rules.get(&nt).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Terminals that can begin a match of `nt`.
    pub fn first_set(&self, nt: NonTerminal) -> BTreeSet<TerminalKind> {
        let nullable = self.nullable_set();
        let mut first = BTreeSet::new();
        for alternative in self.alternatives(nt) {
            first.extend(self.first_of_sequence(alternative, &nullable, &mut Vec::new()));
        }
        first
    }

    fn symbol_nullable(symbol: &Symbol, nullable: &BTreeSet<NonTerminal>) -> bool {
        !symbol.is_mandatory()
            || matches!(symbol.kind, SymbolKind::NonTerminal(nt) if nullable.contains(&nt))
    }

    /// Non-terminals that can match without consuming a token.
    fn nullable_set(&self) -> BTreeSet<NonTerminal> {
        let mut nullable = BTreeSet::new();
        loop {
            let before = nullable.len();
            for (nt, alternatives) in &self.rules {
                if alternatives
                    .iter()
                    .any(|a| a.iter().all(|s| Self::symbol_nullable(s, &nullable)))
                {
                    nullable.insert(*nt);
                }
            }
            if nullable.len() == before {
                return nullable;
            }
        }
    }

    fn first_of_sequence(
        &self,
        symbols: &[Symbol],
        nullable: &BTreeSet<NonTerminal>,
        visiting: &mut Vec<NonTerminal>,
    ) -> BTreeSet<TerminalKind> {
        let mut first = BTreeSet::new();
        for symbol in symbols {
            match symbol.kind {
                SymbolKind::Terminal(kind) => {
                    first.insert(kind);
                }
                SymbolKind::NonTerminal(nt) => {
                    if !visiting.contains(&nt) {
                        visiting.push(nt);
                        for alternative in self.alternatives(nt) {
                            first.extend(self.first_of_sequence(alternative, nullable, visiting));
                        }
                        visiting.pop();
                    }
                }
            }
            if !Self::symbol_nullable(symbol, nullable) {
                break;
            }
        }
        first
    }

    fn check_nullable_repetition(&self, nullable: &BTreeSet<NonTerminal>) -> Result<(), GrammarError> {
        for (nt, alternatives) in &self.rules {
            let repeats_nullable = alternatives.iter().flatten().any(|s| {
                matches!(s.repeat, Repeat::ZeroOrMore | Repeat::CommaSeparatedZeroOrMore)
                    && matches!(s.kind, SymbolKind::NonTerminal(target) if nullable.contains(&target))
            });
            if repeats_nullable {
                return Err(GrammarError::NullableRepetition {
                    rule: format!("{nt:?}"),
                });
            }
        }
        Ok(())
    }

    /// Non-terminals reachable from `nt` without consuming a token.
    fn leftmost(&self, nt: NonTerminal, nullable: &BTreeSet<NonTerminal>) -> Vec<NonTerminal> {
        let mut out = Vec::new();
        for alternative in self.alternatives(nt) {
            for symbol in alternative {
                if let SymbolKind::NonTerminal(target) = symbol.kind {
                    out.push(target);
                }
                if !Self::symbol_nullable(symbol, nullable) {
                    break;
                }
            }
        }
        out
    }

    fn check_left_recursion(&self, nullable: &BTreeSet<NonTerminal>) -> Result<(), GrammarError> {
        for &start in self.rules.keys() {
            let mut seen = BTreeSet::new();
            let mut pending = self.leftmost(start, nullable);
            while let Some(nt) = pending.pop() {
                if nt == start {
                    return Err(GrammarError::LeftRecursion {
                        rule: format!("{start:?}"),
                    });
                }
                if seen.insert(nt) {
                    pending.extend(self.leftmost(nt, nullable));
                }
            }
        }
        Ok(())
    }

    fn check_disjoint_alternatives(
        &self,
        nullable: &BTreeSet<NonTerminal>,
    ) -> Result<(), GrammarError> {
        for (nt, alternatives) in &self.rules {
            let firsts: Vec<BTreeSet<TerminalKind>> = alternatives
                .iter()
                .map(|a| self.first_of_sequence(a, nullable, &mut Vec::new()))
                .collect();
            for (i, a) in firsts.iter().enumerate() {
                for (j, b) in firsts.iter().enumerate().skip(i + 1) {
                    if let Some(shared) = a.intersection(b).next() {
                        return Err(GrammarError::AmbiguousAlternatives {
                            rule: format!("{nt:?}"),
                            first: i,
                            second: j,
                            symbol: shared.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Build the grammar of the scripting language.
pub fn build_grammar() -> Result<GrammarTable, GrammarError> {
    GrammarTable::from_rules(NonTerminal::Program, dsl_rules())
}

fn t(kind: TerminalKind) -> Symbol {
    Symbol::terminal(kind)
}

fn n(nt: NonTerminal) -> Symbol {
    Symbol::non_terminal(nt)
}

fn rule(nt: NonTerminal, alternatives: Vec<Alternative>) -> GrammarRule {
    GrammarRule::new(nt, alternatives)
}

/// One alternative per terminal, e.g. operator choices.
fn one_of(nt: NonTerminal, kinds: &[TerminalKind]) -> GrammarRule {
    rule(nt, kinds.iter().map(|&k| vec![t(k)]).collect())
}

/// Left-associative binary level: `nt -> operand tail*`, `tail -> op operand`.
fn binary_level(
    nt: NonTerminal,
    tail: NonTerminal,
    op: Symbol,
    operand: NonTerminal,
) -> [GrammarRule; 2] {
    [
        rule(nt, vec![vec![n(operand), n(tail).many()]]),
        rule(tail, vec![vec![op, n(operand)]]),
    ]
}

/// The rule set of the scripting language, a C-like statement language.
pub fn dsl_rules() -> Vec<GrammarRule> {
    use NonTerminal::*;
    use TerminalKind as T;

    let mut rules = vec![
        rule(Program, vec![vec![n(Item).many()]]),
        rule(Item, vec![vec![n(IndicatorDecl)], vec![n(Statement)]]),
        rule(
            IndicatorDecl,
            vec![vec![
                t(T::IndicatorName),
                t(T::Less),
                n(InitList),
                t(T::Greater),
                t(T::Identifier),
                t(T::Semicolon),
            ]],
        ),
        rule(InitList, vec![vec![n(Additive).comma_separated()]]),
        rule(
            Statement,
            vec![
                vec![n(Block)],
                vec![n(Declaration)],
                vec![n(IfStmt)],
                vec![n(WhileStmt)],
                vec![n(ForStmt)],
                vec![n(ReturnStmt)],
                vec![n(BreakStmt)],
                vec![n(ContinueStmt)],
                vec![n(ActionStmt)],
                vec![n(ExprStmt)],
                vec![n(EmptyStmt)],
            ],
        ),
        rule(Block, vec![vec![t(T::LBrace), n(Statement).many(), t(T::RBrace)]]),
        rule(
            Declaration,
            vec![vec![
                n(TypeSpec),
                n(Declarator),
                n(DeclaratorTail).many(),
                t(T::Semicolon),
            ]],
        ),
        rule(
            TypeSpec,
            vec![vec![t(T::Const).optional(), t(T::TypeName), t(T::TypeName).many()]],
        ),
        rule(Declarator, vec![vec![t(T::Identifier), n(Initializer).optional()]]),
        rule(Initializer, vec![vec![t(T::Assign), n(Expression)]]),
        rule(DeclaratorTail, vec![vec![t(T::Comma), n(Declarator)]]),
        rule(
            IfStmt,
            vec![vec![
                t(T::If),
                t(T::LParen),
                n(Expression),
                t(T::RParen),
                n(Statement),
                n(ElseClause),
            ]],
        ),
        rule(ElseClause, vec![vec![t(T::Else), n(Statement)], vec![]]),
        rule(
            WhileStmt,
            vec![vec![
                t(T::While),
                t(T::LParen),
                n(Expression),
                t(T::RParen),
                n(Statement),
            ]],
        ),
        rule(
            ForStmt,
            vec![vec![
                t(T::For),
                t(T::LParen),
                n(ForInit),
                n(Expression).optional(),
                t(T::Semicolon),
                n(Expression).optional(),
                t(T::RParen),
                n(Statement),
            ]],
        ),
        rule(
            ForInit,
            vec![vec![n(Declaration)], vec![n(ExprStmt)], vec![n(EmptyStmt)]],
        ),
        rule(
            ReturnStmt,
            vec![vec![t(T::Return), n(Expression).optional(), t(T::Semicolon)]],
        ),
        rule(BreakStmt, vec![vec![t(T::Break), t(T::Semicolon)]]),
        rule(ContinueStmt, vec![vec![t(T::Continue), t(T::Semicolon)]]),
        rule(
            ActionStmt,
            vec![vec![
                n(ActionCall),
                t(T::LParen),
                t(T::RParen),
                t(T::Semicolon),
            ]],
        ),
        one_of(ActionCall, &[T::Buy, T::Sell, T::DoNothing]),
        rule(ExprStmt, vec![vec![n(Expression), t(T::Semicolon)]]),
        rule(EmptyStmt, vec![vec![t(T::Semicolon)]]),
        rule(Expression, vec![vec![n(Ternary), n(AssignTail).optional()]]),
        rule(AssignTail, vec![vec![n(AssignOp), n(Expression)]]),
        one_of(
            AssignOp,
            &[
                T::Assign,
                T::PlusAssign,
                T::MinusAssign,
                T::StarAssign,
                T::SlashAssign,
            ],
        ),
        rule(Ternary, vec![vec![n(LogicalOr), n(TernaryTail).optional()]]),
        rule(
            TernaryTail,
            vec![vec![t(T::Question), n(Expression), t(T::Colon), n(Ternary)]],
        ),
        one_of(EqualityOp, &[T::EqEq, T::NotEq]),
        one_of(RelationalOp, &[T::Less, T::Greater, T::LessEq, T::GreaterEq]),
        one_of(AdditiveOp, &[T::Plus, T::Minus]),
        one_of(MultiplicativeOp, &[T::Star, T::Slash, T::Percent]),
        rule(Unary, vec![vec![n(UnaryOp), n(Unary)], vec![n(Postfix)]]),
        one_of(UnaryOp, &[T::Minus, T::Bang, T::Plus]),
        rule(Postfix, vec![vec![n(Primary), n(PostfixOp).many()]]),
        rule(
            PostfixOp,
            vec![
                vec![t(T::LBracket), n(Expression), t(T::RBracket)],
                vec![t(T::LParen), n(Arguments), t(T::RParen)],
                vec![t(T::Period), t(T::Identifier)],
                vec![t(T::Increment)],
                vec![t(T::Decrement)],
            ],
        ),
        rule(Arguments, vec![vec![n(Expression).comma_separated()]]),
        rule(
            Primary,
            vec![
                vec![t(T::Identifier)],
                vec![t(T::NumLiteral)],
                vec![t(T::StringLiteral)],
                vec![t(T::CharLiteral)],
                vec![t(T::True)],
                vec![t(T::False)],
                vec![t(T::LParen), n(Expression), t(T::RParen)],
            ],
        ),
    ];

    rules.extend(binary_level(LogicalOr, OrTail, t(T::OrOr), LogicalAnd));
    rules.extend(binary_level(LogicalAnd, AndTail, t(T::AndAnd), Equality));
    rules.extend(binary_level(Equality, EqualityTail, n(EqualityOp), Relational));
    rules.extend(binary_level(Relational, RelationalTail, n(RelationalOp), Additive));
    rules.extend(binary_level(Additive, AdditiveTail, n(AdditiveOp), Multiplicative));
    rules.extend(binary_level(
        Multiplicative,
        MultiplicativeTail,
        n(MultiplicativeOp),
        Unary,
    ));
    rules
}
