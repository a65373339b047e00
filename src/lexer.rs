//! Character stream -> token sequence.
//!
//! Stateless with respect to the parser: the lexer never looks at the
//! grammar, only at the fixed keyword and punctuation vocabularies of the
//! surface language. It rejects malformed input by raising `LexerError` on
//! the first unrecoverable violation, mirroring `read_characters`/`lex` in
//! the source this system reimplements.

use crate::token::{Token, TokenKind};
use log::trace;
use std::fmt;

/// Every reserved word of the surface language. `Identifier` lexemes are
/// checked against this list; a match is re-emitted as `Keyword` instead.
/// `"_"` and `"Self"` are included so that the wildcard pattern/expression
/// and the `Self` path segment stay lexically disjoint from `Identifier`.
pub const KEYWORDS: &[&str] = &[
    "fn", "struct", "enum", "const", "trait", "impl", "for", "let", "if", "else", "while",
    "loop", "continue", "break", "return", "true", "false", "mut", "ref", "self", "Self", "as",
    "_",
];

/// Recognized operators and delimiters, longest-first so that maximal munch
/// falls out of a simple linear scan.
pub const PUNCTUATION: &[&str] = &[
    "<<=", ">>=", "::", "->", "==", "!=", "<=", ">=", "&&", "||", "<<", ">>", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "+", "-", "*", "/", "%", "&", "|", "^", "!", "=", "<", ">", "(",
    ")", "{", "}", "[", "]", ",", ":", ";", ".",
];

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LexerError {
    UnterminatedString,
    UnterminatedChar,
    UnterminatedComment,
    InvalidEscape(char),
    UnexpectedCharacter(char),
    EmptyCharLiteral,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::UnterminatedString => write!(f, "unterminated string literal"),
            LexerError::UnterminatedChar => write!(f, "unterminated char literal"),
            LexerError::UnterminatedComment => write!(f, "unterminated block comment"),
            LexerError::InvalidEscape(c) => write!(f, "invalid escape sequence '\\{c}'"),
            LexerError::UnexpectedCharacter(c) => write!(f, "unexpected character '{c}'"),
            LexerError::EmptyCharLiteral => write!(f, "empty char literal"),
        }
    }
}

impl std::error::Error for LexerError {}

/// Lex an entire source string into its token sequence, trivia included.
///
/// Callers that feed the chart builder must filter `Whitespace`/`Comment`
/// first (see [`crate::token::Token::is_trivia`]); this function keeps them
/// so the token-fidelity invariant (concatenated lexemes == source text) can
/// be checked directly against its output.
pub fn lex(source: &str) -> Result<Vec<Token>, LexerError> {
    let mut lexer = Lexer::new(source);
    lexer.run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self { chars: source.chars().collect(), pos: 0 }
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn run(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        while !self.at_eof() {
            tokens.push(self.next_token()?);
        }
        trace!("lexed {} tokens", tokens.len());
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexerError> {
        let c = self.peek().expect("next_token called at eof");

        if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
            return Ok(self.lex_whitespace());
        }
        if c == '/' && matches!(self.peek_at(1), Some('/') | Some('*')) {
            return self.lex_comment();
        }
        if c.is_ascii_digit() {
            return Ok(self.lex_integer());
        }
        if c == '_' || c.is_ascii_alphabetic() {
            return Ok(self.lex_identifier_or_keyword());
        }
        if c == '\'' {
            return self.lex_char_literal();
        }
        if c == '"' {
            return self.lex_string_literal();
        }
        if let Some(lexeme) = self.match_punctuation() {
            self.advance_punctuation(lexeme);
            return Ok(Token::new(TokenKind::Punctuation, lexeme));
        }
        Err(LexerError::UnexpectedCharacter(c))
    }

    fn lex_whitespace(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\r') | Some('\n')) {
            self.pos += 1;
        }
        Token::new(TokenKind::Whitespace, self.slice(start))
    }

    /// `// ... <newline-or-eof>` or a nested `/* ... */` block comment.
    ///
    /// Nesting is tracked by depth: every `/*` encountered while already
    /// inside a block comment opens a new level, and the comment only ends
    /// once the depth returns to zero. A `//` line comment swallows the rest
    /// of the line verbatim, including any `/*`/`*/` sequences it contains.
    fn lex_comment(&mut self) -> Result<Token, LexerError> {
        let start = self.pos;
        if self.peek_at(1) == Some('/') {
            self.pos += 2;
            while !self.at_eof() && self.peek() != Some('\n') {
                self.pos += 1;
            }
            return Ok(Token::new(TokenKind::Comment, self.slice(start)));
        }

        debug_assert_eq!(self.peek(), Some('/'));
        debug_assert_eq!(self.peek_at(1), Some('*'));
        self.pos += 2;
        let mut depth = 1usize;
        while depth > 0 {
            match (self.peek(), self.peek_at(1)) {
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    depth += 1;
                }
                (Some('*'), Some('/')) => {
                    self.pos += 2;
                    depth -= 1;
                }
                (Some(_), _) => self.pos += 1,
                (None, _) => return Err(LexerError::UnterminatedComment),
            }
        }
        Ok(Token::new(TokenKind::Comment, self.slice(start)))
    }

    fn lex_integer(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        Token::new(TokenKind::IntegerLiteral, self.slice(start))
    }

    fn lex_identifier_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let text = self.slice(start);
        if KEYWORDS.contains(&text.as_str()) {
            Token::new(TokenKind::Keyword, text)
        } else {
            Token::new(TokenKind::Identifier, text)
        }
    }

    fn lex_char_literal(&mut self) -> Result<Token, LexerError> {
        let start = self.pos;
        self.pos += 1; // opening '
        if self.peek() == Some('\'') {
            return Err(LexerError::EmptyCharLiteral);
        }
        self.decode_one_char()?;
        match self.bump() {
            Some('\'') => Ok(Token::new(TokenKind::CharLiteral, self.slice(start))),
            _ => Err(LexerError::UnterminatedChar),
        }
    }

    fn lex_string_literal(&mut self) -> Result<Token, LexerError> {
        let start = self.pos;
        self.pos += 1; // opening "
        loop {
            match self.peek() {
                None => return Err(LexerError::UnterminatedString),
                Some('"') => {
                    self.pos += 1;
                    return Ok(Token::new(TokenKind::StringLiteral, self.slice(start)));
                }
                _ => {
                    self.decode_one_char()?;
                }
            }
        }
    }

    /// Consume one source character (possibly an escape sequence) from just
    /// past an opening quote. Only validates and advances `self.pos`; the
    /// decoded value itself is not needed since lexemes are stored raw.
    ///
    /// Mirrors the source's `read_characters(string_view) -> (char, int)`
    /// helper shared between char- and string-literal lexing.
    fn decode_one_char(&mut self) -> Result<(), LexerError> {
        match self.peek() {
            None => Err(LexerError::UnterminatedString),
            Some('\\') => {
                self.pos += 1;
                match self.peek() {
                    Some(c @ ('n' | 't' | '\'' | '"' | '\\')) => {
                        self.pos += 1;
                        let _ = c;
                        Ok(())
                    }
                    Some(other) => Err(LexerError::InvalidEscape(other)),
                    None => Err(LexerError::UnterminatedString),
                }
            }
            Some(_) => {
                self.pos += 1;
                Ok(())
            }
        }
    }

    fn match_punctuation(&self) -> Option<&'static str> {
        PUNCTUATION
            .iter()
            .find(|p| self.matches_str(p))
            .copied()
    }

    fn matches_str(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn slice(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }
}

// the punctuation matcher above advances separately; keep callers in sync
impl Lexer {
    fn advance_punctuation(&mut self, lexeme: &str) {
        self.pos += lexeme.chars().count();
    }
}
