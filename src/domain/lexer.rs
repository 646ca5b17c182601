//! Lexer for preprocessed script text.
//!
//! Works in two layers. `Fragments` splits the text on whitespace and the
//! punctuation set, reads string/char literals verbatim and consumes the
//! preprocessor's position markers. `Lexer` coalesces adjacent fragments into
//! decimals and two-character operators and classifies words. Both layers are
//! lazy and single-pass.

use crate::domain::preprocessor::MARKER_PREFIX;
use crate::domain::token::{TerminalKind, Token};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

/// Lex `text`. Tokens are attributed to `file` until a position marker says
/// otherwise. Only the preprocessor may put `@` at the start of a line; it
/// rejects script lines that do.
pub fn lex<'a>(text: &'a str, file: &str) -> Lexer<'a> {
    Lexer {
        fragments: Fragments {
            src: text,
            pos: 0,
            line: 1,
            column: 1,
            file: Rc::from(file),
            glued: false,
        },
        pending: VecDeque::new(),
    }
}

/// Re-kind identifiers naming a known indicator class as `IndicatorName`.
pub fn mark_indicator_names(tokens: &mut [Token], names: &HashSet<String>) {
    for token in tokens
        .iter_mut()
        .filter(|t| t.kind == TerminalKind::Identifier)
    {
        if names.contains(&token.value) {
            token.kind = TerminalKind::IndicatorName;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentClass {
    Word,
    Punct(TerminalKind),
    Literal(TerminalKind),
    Unknown,
}

#[derive(Debug, Clone)]
struct Fragment<'a> {
    text: &'a str,
    class: FragmentClass,
    line: usize,
    column: usize,
    file: Rc<str>,
    /// No whitespace between this fragment and the previous one.
    glued: bool,
}

impl Fragment<'_> {
    fn is_digits(&self) -> bool {
        self.class == FragmentClass::Word && self.text.bytes().all(|b| b.is_ascii_digit())
    }

    fn into_token(self, value: String, kind: TerminalKind) -> Token {
        Token {
            value,
            kind,
            line: self.line,
            column: self.column,
            source_file: self.file.to_string(),
        }
    }
}

struct Fragments<'a> {
    src: &'a str,
    /// Byte offset into `src`.
    pos: usize,
    line: usize,
    column: usize,
    file: Rc<str>,
    glued: bool,
}

impl<'a> Fragments<'a> {
    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self, ch: char) {
        self.pos += ch.len_utf8();
        self.column += 1;
    }

    /// Consume a `@<line>:<path>` marker if one starts at the current
    /// position. The marker names the line number of the line after it.
    fn consume_marker(&mut self) -> bool {
        let rest = &self.src[self.pos..];
        let end = rest.find('\n').unwrap_or(rest.len());
        let Some(body) = rest[..end].strip_prefix(MARKER_PREFIX) else {
            return false;
        };
        let Some((line, file)) = body.split_once(':') else {
            return false;
        };
        let Ok(line) = line.parse::<usize>() else {
            return false;
        };

        self.pos += (end + 1).min(rest.len());
        self.line = line;
        self.column = 1;
        self.file = Rc::from(file);
        self.glued = false;
        true
    }

    /// Read a quoted literal. Returns `None` if the literal is not closed
    /// before the end of the line; the partial literal is then dropped.
    fn read_literal(&mut self, quote: char) -> Option<&'a str> {
        let start = self.pos;
        self.bump(quote);
        while let Some(ch) = self.peek_char() {
            match ch {
                '\n' => break,
                '\\' => {
                    self.bump(ch);
                    if let Some(next) = self.peek_char().filter(|&c| c != '\n') {
                        self.bump(next);
                    }
                }
                c if c == quote => {
                    self.bump(c);
                    return Some(&self.src[start..self.pos]);
                }
                c => self.bump(c),
            }
        }
        log::warn!(
            "{}:{}: unterminated {} literal dropped",
            self.file,
            self.line,
            if quote == '"' { "string" } else { "character" }
        );
        None
    }
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Fragment<'a>;

    fn next(&mut self) -> Option<Fragment<'a>> {
        loop {
            let ch = self.peek_char()?;

            if ch == '\n' {
                self.pos += 1;
                self.line += 1;
                self.column = 1;
                self.glued = false;
                continue;
            }
            if ch == MARKER_PREFIX && self.column == 1 && self.consume_marker() {
                continue;
            }
            if ch.is_whitespace() {
                self.bump(ch);
                self.glued = false;
                continue;
            }

            let (start, line, column, glued) = (self.pos, self.line, self.column, self.glued);
            let class = if ch.is_ascii_alphanumeric() || ch == '_' {
                while let Some(c) = self
                    .peek_char()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                {
                    self.bump(c);
                }
                FragmentClass::Word
            } else if ch == '"' || ch == '\'' {
                let kind = if ch == '"' {
                    TerminalKind::StringLiteral
                } else {
                    TerminalKind::CharLiteral
                };
                if self.read_literal(ch).is_none() {
                    self.glued = true;
                    continue;
                }
                FragmentClass::Literal(kind)
            } else {
                self.bump(ch);
                match TerminalKind::punctuation(ch) {
                    Some(kind) => FragmentClass::Punct(kind),
                    None => FragmentClass::Unknown,
                }
            };

            self.glued = true;
            return Some(Fragment {
                text: &self.src[start..self.pos],
                class,
                line,
                column,
                file: Rc::clone(&self.file),
                glued,
            });
        }
    }
}

/// Lazy token stream over preprocessed text.
pub struct Lexer<'a> {
    fragments: Fragments<'a>,
    pending: VecDeque<Fragment<'a>>,
}

impl<'a> Lexer<'a> {
    fn next_fragment(&mut self) -> Option<Fragment<'a>> {
        self.pending.pop_front().or_else(|| self.fragments.next())
    }

    fn peek_fragment(&mut self, n: usize) -> Option<&Fragment<'a>> {
        while self.pending.len() <= n {
            let fragment = self.fragments.next()?;
            self.pending.push_back(fragment);
        }
        self.pending.get(n)
    }

    /// Whether the next fragments are a glued `.` followed by glued digits.
    fn decimal_follows(&mut self) -> bool {
        let period = matches!(
            self.peek_fragment(0),
            Some(f) if f.glued && f.class == FragmentClass::Punct(TerminalKind::Period)
        );
        period && matches!(self.peek_fragment(1), Some(f) if f.glued && f.is_digits())
    }

    fn word(&mut self, fragment: Fragment<'a>) -> Token {
        let text = fragment.text;
        if fragment.is_digits() {
            let mut value = text.to_string();
            if self.decimal_follows() {
                for _ in 0..2 {
                    if let Some(next) = self.next_fragment() {
                        value.push_str(next.text);
                    }
                }
            }
            return fragment.into_token(value, TerminalKind::NumLiteral);
        }

        let kind = if text.starts_with(|c: char| c.is_ascii_digit()) {
            TerminalKind::Unknown
        } else {
            TerminalKind::keyword(text).unwrap_or(TerminalKind::Identifier)
        };
        fragment.into_token(text.to_string(), kind)
    }

    fn punct(&mut self, fragment: Fragment<'a>, kind: TerminalKind) -> Token {
        if kind == TerminalKind::Period
            && matches!(self.peek_fragment(0), Some(f) if f.glued && f.is_digits())
        {
            let mut value = fragment.text.to_string();
            if let Some(digits) = self.next_fragment() {
                value.push_str(digits.text);
            }
            return fragment.into_token(value, TerminalKind::NumLiteral);
        }

        let compound = match self.peek_fragment(0) {
            Some(next) if next.glued => match next.class {
                FragmentClass::Punct(second) => TerminalKind::compound(kind, second),
                _ => None,
            },
            _ => None,
        };
        if let Some(compound) = compound {
            let mut value = fragment.text.to_string();
            if let Some(second) = self.next_fragment() {
                value.push_str(second.text);
            }
            return fragment.into_token(value, compound);
        }

        let value = fragment.text.to_string();
        fragment.into_token(value, kind)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let fragment = self.next_fragment()?;
        let token = match fragment.class {
            FragmentClass::Word => self.word(fragment),
            FragmentClass::Punct(kind) => self.punct(fragment, kind),
            FragmentClass::Literal(kind) => {
                let value = fragment.text.to_string();
                fragment.into_token(value, kind)
            }
            FragmentClass::Unknown => {
                let value = fragment.text.to_string();
                fragment.into_token(value, TerminalKind::Unknown)
            }
        };
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TerminalKind::*;

    fn kinds(src: &str) -> Vec<TerminalKind> {
        lex(src, "t.dts").map(|t| t.kind).collect()
    }

    fn values(src: &str) -> Vec<String> {
        lex(src, "t.dts").map(|t| t.value).collect()
    }

    #[test]
    fn simple_statement() {
        assert_eq!(
            kinds("double x = 1;"),
            vec![TypeName, Identifier, Assign, NumLiteral, Semicolon]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let tokens: Vec<Token> = lex("a\n  bc = 1;", "t.dts").collect();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 6));
        assert_eq!(tokens[1].source_file, "t.dts");
    }

    #[test]
    fn decimal_is_merged_at_first_character() {
        let tokens: Vec<Token> = lex("x = 3.14;", "t.dts").collect();
        assert_eq!(tokens[2].value, "3.14");
        assert_eq!(tokens[2].kind, NumLiteral);
        assert_eq!(tokens[2].column, 5);
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn leading_period_decimal() {
        assert_eq!(values("y = .5;"), vec!["y", "=", ".5", ";"]);
        assert_eq!(kinds(".5"), vec![NumLiteral]);
    }

    #[test]
    fn spaced_period_is_not_merged() {
        assert_eq!(values("3 . 14"), vec!["3", ".", "14"]);
        assert_eq!(values("out.size"), vec!["out", ".", "size"]);
    }

    #[test]
    fn trailing_period_stays_separate() {
        assert_eq!(kinds("5.x"), vec![NumLiteral, Period, Identifier]);
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("a && b || c == d != e <= f >= g"),
            vec![
                Identifier, AndAnd, Identifier, OrOr, Identifier, EqEq, Identifier, NotEq,
                Identifier, LessEq, Identifier, GreaterEq, Identifier
            ]
        );
        assert_eq!(kinds("i++; j -= 2"), vec![Identifier, Increment, Semicolon, Identifier, MinusAssign, NumLiteral]);
    }

    #[test]
    fn separated_operator_characters_stay_apart() {
        assert_eq!(kinds("a & & b"), vec![Identifier, Ampersand, Ampersand, Identifier]);
        assert_eq!(kinds("a < = b"), vec![Identifier, Less, Assign, Identifier]);
    }

    #[test]
    fn merged_operator_keeps_first_column() {
        let tokens: Vec<Token> = lex("a  && b", "t.dts").collect();
        assert_eq!(tokens[1].value, "&&");
        assert_eq!(tokens[1].column, 4);
    }

    #[test]
    fn string_literal_keeps_whitespace() {
        let tokens: Vec<Token> = lex("s = \"a  b\";", "t.dts").collect();
        assert_eq!(tokens[2].value, "\"a  b\"");
        assert_eq!(tokens[2].kind, StringLiteral);
        assert_eq!(tokens[3].kind, Semicolon);
    }

    #[test]
    fn char_literal_with_escape() {
        let tokens: Vec<Token> = lex("c = '\\'';", "t.dts").collect();
        assert_eq!(tokens[2].value, "'\\''");
        assert_eq!(tokens[2].kind, CharLiteral);
    }

    #[test]
    fn unterminated_literal_is_dropped() {
        let tokens: Vec<Token> = lex("s = \"never closed\nx;", "t.dts").collect();
        assert_eq!(
            tokens.iter().map(|t| t.value.as_str()).collect::<Vec<_>>(),
            vec!["s", "=", "x", ";"]
        );
        assert_eq!(tokens[2].line, 2);
    }

    #[test]
    fn keywords_and_actions() {
        assert_eq!(
            kinds("if (x) buy(); else do_nothing();"),
            vec![
                If, LParen, Identifier, RParen, Buy, LParen, RParen, Semicolon, Else, DoNothing,
                LParen, RParen, Semicolon
            ]
        );
    }

    #[test]
    fn digit_led_word_is_unknown() {
        assert_eq!(kinds("1abc"), vec![Unknown]);
        assert_eq!(kinds("a ` b"), vec![Identifier, Unknown, Identifier]);
    }

    #[test]
    fn markers_set_file_and_line() {
        let text = "@1:/p/a.dts\nx;\n@7:/p/b.dti\ny;\n";
        let tokens: Vec<Token> = lex(text, "ignored").collect();
        assert_eq!(tokens[0].source_file, "/p/a.dts");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[2].source_file, "/p/b.dti");
        assert_eq!(tokens[2].line, 7);
        assert_eq!(tokens[2].column, 1);
    }

    #[test]
    fn at_sign_mid_line_is_unknown() {
        assert_eq!(kinds("x @1:y"), vec![Identifier, Unknown, NumLiteral, Colon, Identifier]);
    }

    #[test]
    fn lexer_is_lazy() {
        let mut lexer = lex("a b c", "t.dts");
        assert_eq!(lexer.next().map(|t| t.value), Some("a".to_string()));
        assert_eq!(lexer.count(), 2);
    }

    #[test]
    fn indicator_names_are_rekinded() {
        let mut tokens: Vec<Token> = lex("EMA<4> fast; EMAX y;", "t.dts").collect();
        let names: HashSet<String> = ["EMA".to_string()].into_iter().collect();
        mark_indicator_names(&mut tokens, &names);
        assert_eq!(tokens[0].kind, IndicatorName);
        assert_eq!(tokens[6].value, "EMAX");
        assert_eq!(tokens[6].kind, Identifier);
    }
}
