//! The token vocabulary shared by the lexer, the chart builder and the tree builder.

use smol_str::SmolStr;
use std::fmt;

/// One of the seven lexical categories the lexer ever produces.
///
/// `Whitespace` and `Comment` are real tokens (needed for the token-fidelity
/// invariant) but are filtered out before the chart builder ever sees them.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum TokenKind {
    Identifier,
    Keyword,
    CharLiteral,
    StringLiteral,
    IntegerLiteral,
    Punctuation,
    Whitespace,
    Comment,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Identifier => "Identifier",
            TokenKind::Keyword => "Keyword",
            TokenKind::CharLiteral => "CharLiteral",
            TokenKind::StringLiteral => "StringLiteral",
            TokenKind::IntegerLiteral => "IntegerLiteral",
            TokenKind::Punctuation => "Punctuation",
            TokenKind::Whitespace => "Whitespace",
            TokenKind::Comment => "Comment",
        };
        write!(f, "{s}")
    }
}

/// A single lexed token: a kind plus the exact source text it covers.
///
/// Literal lexemes (`CharLiteral`, `StringLiteral`) retain their delimiting
/// quote characters and any escape sequences exactly as written -- the lexer
/// does not decode them. Decoding is a downstream concern this system does
/// not perform.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: SmolStr,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<SmolStr>) -> Self {
        Self { kind, lexeme: lexeme.into() }
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind, self.lexeme)
    }
}
