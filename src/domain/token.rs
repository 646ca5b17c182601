//! Lexical token types for the indicator/algorithm scripting language.
//!
//! - `TerminalKind`: every terminal the grammar can match
//! - `Token`: one lexical unit with the position of its first character

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TerminalKind {
    Identifier,
    /// An identifier declared by a required indicator's `$identifier`.
    IndicatorName,
    NumLiteral,
    StringLiteral,
    CharLiteral,

    // Keywords
    TypeName,
    Const,
    If,
    Else,
    For,
    While,
    Return,
    Break,
    Continue,
    True,
    False,
    Buy,
    Sell,
    DoNothing,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Period,
    Colon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Tilde,
    Less,
    Greater,
    Assign,
    Ampersand,
    Pipe,
    Caret,
    Hash,
    Dollar,

    // Two-character operators
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    LessEq,
    GreaterEq,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Increment,
    Decrement,

    /// A fragment that fits no other class, e.g. `@` or `1abc`.
    Unknown,
}

const TYPE_NAMES: &[&str] = &[
    "int", "double", "float", "bool", "long", "short", "unsigned", "signed", "char", "auto",
    "size_t", "void",
];

impl TerminalKind {
    pub fn keyword(word: &str) -> Option<TerminalKind> {
        let kind = match word {
            "const" => TerminalKind::Const,
            "if" => TerminalKind::If,
            "else" => TerminalKind::Else,
            "for" => TerminalKind::For,
            "while" => TerminalKind::While,
            "return" => TerminalKind::Return,
            "break" => TerminalKind::Break,
            "continue" => TerminalKind::Continue,
            "true" => TerminalKind::True,
            "false" => TerminalKind::False,
            "buy" => TerminalKind::Buy,
            "sell" => TerminalKind::Sell,
            "do_nothing" => TerminalKind::DoNothing,
            w if TYPE_NAMES.contains(&w) => TerminalKind::TypeName,
            _ => return None,
        };
        Some(kind)
    }

    pub fn punctuation(ch: char) -> Option<TerminalKind> {
        let kind = match ch {
            '(' => TerminalKind::LParen,
            ')' => TerminalKind::RParen,
            '{' => TerminalKind::LBrace,
            '}' => TerminalKind::RBrace,
            '[' => TerminalKind::LBracket,
            ']' => TerminalKind::RBracket,
            ';' => TerminalKind::Semicolon,
            ',' => TerminalKind::Comma,
            '.' => TerminalKind::Period,
            ':' => TerminalKind::Colon,
            '?' => TerminalKind::Question,
            '+' => TerminalKind::Plus,
            '-' => TerminalKind::Minus,
            '*' => TerminalKind::Star,
            '/' => TerminalKind::Slash,
            '%' => TerminalKind::Percent,
            '!' => TerminalKind::Bang,
            '~' => TerminalKind::Tilde,
            '<' => TerminalKind::Less,
            '>' => TerminalKind::Greater,
            '=' => TerminalKind::Assign,
            '&' => TerminalKind::Ampersand,
            '|' => TerminalKind::Pipe,
            '^' => TerminalKind::Caret,
            '#' => TerminalKind::Hash,
            '$' => TerminalKind::Dollar,
            _ => return None,
        };
        Some(kind)
    }

    /// Kind of the operator formed by two adjacent single-character tokens.
    pub fn compound(first: TerminalKind, second: TerminalKind) -> Option<TerminalKind> {
        use TerminalKind::*;
        let kind = match (first, second) {
            (Ampersand, Ampersand) => AndAnd,
            (Pipe, Pipe) => OrOr,
            (Assign, Assign) => EqEq,
            (Bang, Assign) => NotEq,
            (Less, Assign) => LessEq,
            (Greater, Assign) => GreaterEq,
            (Plus, Assign) => PlusAssign,
            (Minus, Assign) => MinusAssign,
            (Star, Assign) => StarAssign,
            (Slash, Assign) => SlashAssign,
            (Plus, Plus) => Increment,
            (Minus, Minus) => Decrement,
            _ => return None,
        };
        Some(kind)
    }

    /// Human-readable description used in diagnostics.
    pub fn describe(self) -> &'static str {
        use TerminalKind::*;
        match self {
            Identifier => "identifier",
            IndicatorName => "indicator name",
            NumLiteral => "number",
            StringLiteral => "string literal",
            CharLiteral => "character literal",
            TypeName => "type name",
            Const => "'const'",
            If => "'if'",
            Else => "'else'",
            For => "'for'",
            While => "'while'",
            Return => "'return'",
            Break => "'break'",
            Continue => "'continue'",
            True => "'true'",
            False => "'false'",
            Buy => "'buy'",
            Sell => "'sell'",
            DoNothing => "'do_nothing'",
            LParen => "'('",
            RParen => "')'",
            LBrace => "'{'",
            RBrace => "'}'",
            LBracket => "'['",
            RBracket => "']'",
            Semicolon => "';'",
            Comma => "','",
            Period => "'.'",
            Colon => "':'",
            Question => "'?'",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Percent => "'%'",
            Bang => "'!'",
            Tilde => "'~'",
            Less => "'<'",
            Greater => "'>'",
            Assign => "'='",
            Ampersand => "'&'",
            Pipe => "'|'",
            Caret => "'^'",
            Hash => "'#'",
            Dollar => "'$'",
            AndAnd => "'&&'",
            OrOr => "'||'",
            EqEq => "'=='",
            NotEq => "'!='",
            LessEq => "'<='",
            GreaterEq => "'>='",
            PlusAssign => "'+='",
            MinusAssign => "'-='",
            StarAssign => "'*='",
            SlashAssign => "'/='",
            Increment => "'++'",
            Decrement => "'--'",
            Unknown => "unrecognised token",
        }
    }
}

impl fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub kind: TerminalKind,
    pub line: usize,
    pub column: usize,
    pub source_file: String,
}

impl Token {
    pub fn new(
        value: impl Into<String>,
        kind: TerminalKind,
        line: usize,
        column: usize,
        source_file: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            kind,
            line,
            column,
            source_file: source_file.into(),
        }
    }
}
