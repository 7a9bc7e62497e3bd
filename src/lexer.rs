use crate::diagnostic::Diagnostic;
use crate::lexeme::{Lexeme, Token};
use crate::span::Span;

/// Single-pass, left-to-right scanner. No backtracking, no regular
/// expression engine: each rule is tried in order at the current byte.
pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    line: u32,
    column: u32,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.kind == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        if self.pos >= self.source.len() {
            return Token::eof(self.line, self.column);
        }

        let ch = self.source[self.pos];

        if is_ident_start(ch) {
            return self.scan_ident_or_keyword();
        }
        if ch.is_ascii_digit() {
            return self.scan_number();
        }
        if ch == b'"' {
            return self.scan_string();
        }
        self.scan_symbol()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.advance_char();
            }

            if self.pos < self.source.len() && self.source[self.pos] == b'#' {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.advance_char();
                }
                continue;
            }

            break;
        }
    }

    /// Advances one byte, updating line/column. Every cursor movement in
    /// this scanner goes through here so line/column never drift.
    fn advance_char(&mut self) {
        if self.source[self.pos] == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn scan_ident_or_keyword(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.advance_char();
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        let kind = Lexeme::from_keyword(text).unwrap_or_else(|| Lexeme::Ident(text.to_string()));
        Token::new(text, kind, line, column)
    }

    /// `[0-9.]+` — any number of dots is accepted here; an ill-formed
    /// value (e.g. `1.2.3`) simply parses to `0.0` via `f64::parse`'s
    /// failure path rather than being rejected at scan time.
    fn scan_number(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        while self.pos < self.source.len()
            && (self.source[self.pos].is_ascii_digit() || self.source[self.pos] == b'.')
        {
            self.advance_char();
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        let value = text.parse::<f64>().unwrap_or(0.0);
        Token::new(text, Lexeme::Number(value), line, column)
    }

    fn scan_string(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        self.advance_char(); // opening quote
        let start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos] != b'"' {
            self.advance_char();
        }
        let text = std::str::from_utf8(&self.source[start..self.pos])
            .unwrap()
            .to_string();

        if self.pos < self.source.len() {
            self.advance_char(); // closing quote
        } else {
            self.diagnostics.push(Diagnostic::warning(
                "unterminated string literal".to_string(),
                Span::new(line, column),
            ));
        }

        Token::new(text.clone(), Lexeme::String(text), line, column)
    }

    fn scan_symbol(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let ch = self.source[self.pos];
        self.advance_char();

        match ch {
            b'{' => Token::new("{", Lexeme::LBrace, line, column),
            b'}' => Token::new("}", Lexeme::RBrace, line, column),
            b'(' => Token::new("(", Lexeme::LParen, line, column),
            b')' => Token::new(")", Lexeme::RParen, line, column),
            b'+' => Token::new("+", Lexeme::Plus, line, column),
            b'-' => Token::new("-", Lexeme::Minus, line, column),
            b'*' => Token::new("*", Lexeme::Star, line, column),
            b'/' => Token::new("/", Lexeme::Slash, line, column),
            b';' => Token::new(";", Lexeme::Semicolon, line, column),
            b',' => Token::new(",", Lexeme::Comma, line, column),
            b'=' if self.peek() == Some(b'=') => {
                self.advance_char();
                Token::new("==", Lexeme::EqEq, line, column)
            }
            b'=' => Token::new("=", Lexeme::Eq, line, column),
            b'!' if self.peek() == Some(b'=') => {
                self.advance_char();
                Token::new("!=", Lexeme::Ne, line, column)
            }
            b'<' if self.peek() == Some(b'=') => {
                self.advance_char();
                Token::new("<=", Lexeme::Le, line, column)
            }
            b'<' => Token::new("<", Lexeme::Lt, line, column),
            b'>' if self.peek() == Some(b'=') => {
                self.advance_char();
                Token::new(">=", Lexeme::Ge, line, column)
            }
            b'>' => Token::new(">", Lexeme::Gt, line, column),
            other => {
                let c = other as char;
                self.diagnostics.push(Diagnostic::warning(
                    format!("unknown character '{}'", c),
                    Span::new(line, column),
                ));
                Token::new(c.to_string(), Lexeme::Unknown(c), line, column)
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic()
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Lexeme> {
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords() {
        let tokens = lex("fn return print if else for while");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Fn,
                Lexeme::Return,
                Lexeme::Print,
                Lexeme::If,
                Lexeme::Else,
                Lexeme::For,
                Lexeme::While,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        let tokens = lex("{ } ( ) + - * / ; ,");
        assert_eq!(
            tokens,
            vec![
                Lexeme::LBrace,
                Lexeme::RBrace,
                Lexeme::LParen,
                Lexeme::RParen,
                Lexeme::Plus,
                Lexeme::Minus,
                Lexeme::Star,
                Lexeme::Slash,
                Lexeme::Semicolon,
                Lexeme::Comma,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_comparison_operators() {
        let tokens = lex("= == != < > <= >=");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Eq,
                Lexeme::EqEq,
                Lexeme::Ne,
                Lexeme::Lt,
                Lexeme::Gt,
                Lexeme::Le,
                Lexeme::Ge,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("0 1 3.14 42.0");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Number(0.0),
                Lexeme::Number(1.0),
                Lexeme::Number(3.14),
                Lexeme::Number(42.0),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let tokens = lex("x foo_bar aCounter");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Ident("x".into()),
                Lexeme::Ident("foo_bar".into()),
                Lexeme::Ident("aCounter".into()),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literal() {
        let tokens = lex(r#""hello world""#);
        assert_eq!(
            tokens,
            vec![Lexeme::String("hello world".to_string()), Lexeme::Eof]
        );
    }

    #[test]
    fn test_line_comment() {
        let tokens = lex("x # a trailing comment\ny");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Ident("x".into()),
                Lexeme::Ident("y".into()),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_line_and_column_tracking() {
        let (tokens, _) = Lexer::new("fn add\n  x").tokenize();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 4));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
    }

    #[test]
    fn test_unterminated_string_is_a_warning_not_fatal() {
        let (tokens, diags) = Lexer::new(r#""abc"#).tokenize();
        assert_eq!(tokens[0].kind, Lexeme::String("abc".to_string()));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unterminated string"));
    }

    #[test]
    fn test_unknown_character_is_a_warning_not_fatal() {
        let (tokens, diags) = Lexer::new("@").tokenize();
        assert_eq!(tokens[0].kind, Lexeme::Unknown('@'));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unknown character '@'"));
    }

    #[test]
    fn test_eof_synthesized_once() {
        let (tokens, _) = Lexer::new("").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, Lexeme::Eof);
    }
}
