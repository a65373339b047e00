//! The surface grammar as a static data table.
//!
//! A grammar is a fixed map from nonterminal name to an ordered list of
//! productions; each production is an ordered sequence of symbols, where a
//! symbol is either a terminal pattern (a token kind, optionally pinned to
//! one exact lexeme) or a reference to another nonterminal. Production order
//! within a row is significant: it is the tie-break the tree builder uses
//! when a span admits more than one derivation.
//!
//! Unlike the ixml grammars this module's ancestor compiled at runtime from
//! grammar *text*, this grammar is entirely compile-time data -- the surface
//! language is fixed, so there is no grammar-of-grammars to bootstrap.

use crate::token::{Token, TokenKind};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TerminalPattern {
    pub kind: TokenKind,
    pub lexeme: Option<SmolStr>,
}

impl TerminalPattern {
    pub fn matches(&self, token: &Token) -> bool {
        self.kind == token.kind
            && self.lexeme.as_ref().map_or(true, |l| l == &token.lexeme)
    }
}

impl fmt::Display for TerminalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lexeme {
            Some(l) => write!(f, "{:?}", l),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Symbol {
    Term(TerminalPattern),
    Nonterm(SmolStr),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Term(t) => write!(f, "{t}"),
            Symbol::Nonterm(n) => write!(f, "{n}"),
        }
    }
}

fn term(kind: TokenKind) -> Symbol {
    Symbol::Term(TerminalPattern { kind, lexeme: None })
}

fn kw(lexeme: &str) -> Symbol {
    Symbol::Term(TerminalPattern { kind: TokenKind::Keyword, lexeme: Some(SmolStr::new(lexeme)) })
}

fn punct(lexeme: &str) -> Symbol {
    Symbol::Term(TerminalPattern { kind: TokenKind::Punctuation, lexeme: Some(SmolStr::new(lexeme)) })
}

fn nt(name: &str) -> Symbol {
    Symbol::Nonterm(SmolStr::new(name))
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Production {
    pub symbols: Vec<Symbol>,
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.symbols.is_empty() {
            return write!(f, "\u{03b5}");
        }
        let s: Vec<String> = self.symbols.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", s.join(" "))
    }
}

/// The fixed map of nonterminal -> ordered productions, plus the start
/// symbol (always `Items`).
#[derive(Debug, Clone)]
pub struct Grammar {
    definitions: HashMap<SmolStr, Vec<Production>>,
    start: SmolStr,
}

impl Grammar {
    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn productions(&self, nonterminal: &str) -> &[Production] {
        self.definitions
            .get(nonterminal)
            .unwrap_or_else(|| panic!("grammar has no definition for nonterminal {nonterminal}"))
    }

    pub fn contains(&self, nonterminal: &str) -> bool {
        self.definitions.contains_key(nonterminal)
    }

    pub fn nonterminal_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(SmolStr::as_str)
    }
}

macro_rules! production {
    ($($sym:expr),* $(,)?) => {
        Production { symbols: vec![$($sym),*] }
    };
}

macro_rules! def {
    ($map:expr, $name:expr, [ $( [ $($sym:expr),* $(,)? ] ),* $(,)? ]) => {
        $map.insert(SmolStr::new($name), vec![ $( production![$($sym),*] ),* ]);
    };
}

/// Build the fixed ~97-nonterminal grammar of the surface language.
///
/// The shape mirrors the source's node schema one nonterminal at a time:
/// every named production here corresponds to exactly one typed CST node
/// variant in [`crate::tree`]. The recurring `Comma<X>`/`Optional<X>` pairs
/// encode trailing-comma-tolerant comma-separated lists; they appear
/// wherever the surface language allows a list (function parameters,
/// struct/enum bodies, call arguments, struct-literal fields, array
/// elements).
pub fn surface_grammar() -> Grammar {
    let mut d: HashMap<SmolStr, Vec<Production>> = HashMap::new();

    def!(d, "Items", [
        [nt("Items"), nt("Item")],
        [],
    ]);
    def!(d, "Item", [
        [nt("Function")],
        [nt("Struct")],
        [nt("Enumeration")],
        [nt("ConstantItem")],
        [nt("Trait")],
        [nt("Implementation")],
    ]);
    def!(d, "Function", [
        [nt("OptionalConst"), kw("fn"), term(TokenKind::Identifier), punct("("), nt("OptionalFunctionParameters"), punct(")"), nt("OptionalFunctionReturnType"), nt("BlockExpressionOrSemicolon")],
    ]);
    def!(d, "OptionalConst", [
        [kw("const")],
        [],
    ]);
    def!(d, "OptionalFunctionParameters", [
        [nt("FunctionParameters")],
        [],
    ]);
    def!(d, "FunctionParameters", [
        [nt("SelfParam"), nt("OptionalComma")],
        [nt("SelfParam"), punct(","), nt("CommaFunctionParams")],
        [nt("CommaFunctionParams")],
    ]);
    def!(d, "SelfParam", [
        [nt("ShorthandSelf")],
        [nt("TypedSelf")],
    ]);
    def!(d, "ShorthandSelf", [
        [kw("self")],
        [kw("mut"), kw("self")],
        [punct("&"), kw("self")],
        [punct("&"), kw("mut"), kw("self")],
    ]);
    def!(d, "TypedSelf", [
        [kw("self"), punct(":"), nt("Type")],
        [kw("mut"), kw("self"), punct(":"), nt("Type")],
    ]);
    def!(d, "FunctionParam", [
        [nt("Pattern"), punct(":"), nt("Type")],
    ]);
    def!(d, "FunctionReturnType", [
        [punct("->"), nt("Type")],
    ]);
    def!(d, "OptionalComma", [
        [punct(",")],
        [],
    ]);
    def!(d, "CommaFunctionParams", [
        [nt("FunctionParam"), punct(","), nt("CommaFunctionParams")],
        [nt("FunctionParam"), nt("OptionalComma")],
    ]);
    def!(d, "OptionalFunctionReturnType", [
        [nt("FunctionReturnType")],
        [],
    ]);
    def!(d, "BlockExpressionOrSemicolon", [
        [nt("BlockExpression")],
        [punct(";")],
    ]);
    def!(d, "Struct", [
        [kw("struct"), term(TokenKind::Identifier), punct("{"), nt("OptionalStructFields"), punct("}")],
        [kw("struct"), term(TokenKind::Identifier), punct(";")],
    ]);
    def!(d, "StructFields", [
        [nt("StructField"), punct(","), nt("CommaStructFields")],
        [nt("StructField"), nt("OptionalComma")],
    ]);
    def!(d, "StructField", [
        [term(TokenKind::Identifier), punct(":"), nt("Type")],
    ]);
    def!(d, "OptionalStructFields", [
        [nt("StructFields")],
        [],
    ]);
    def!(d, "CommaStructFields", [
        [nt("StructField"), punct(","), nt("CommaStructFields")],
        [nt("StructField"), nt("OptionalComma")],
    ]);
    def!(d, "Enumeration", [
        [kw("enum"), term(TokenKind::Identifier), punct("{"), nt("OptionalEnumVariants"), punct("}")],
    ]);
    def!(d, "EnumVariants", [
        [nt("EnumVariant"), punct(","), nt("CommaEnumVariants")],
        [nt("EnumVariant"), nt("OptionalComma")],
    ]);
    def!(d, "EnumVariant", [
        [term(TokenKind::Identifier)],
    ]);
    def!(d, "OptionalEnumVariants", [
        [nt("EnumVariants")],
        [],
    ]);
    def!(d, "CommaEnumVariants", [
        [nt("EnumVariant"), punct(","), nt("CommaEnumVariants")],
        [nt("EnumVariant"), nt("OptionalComma")],
    ]);
    def!(d, "ConstantItem", [
        [kw("const"), term(TokenKind::Identifier), punct(":"), nt("Type"), punct("="), nt("Expression"), punct(";")],
        [kw("const"), term(TokenKind::Identifier), punct(":"), nt("Type"), punct(";")],
    ]);
    def!(d, "Trait", [
        [kw("trait"), term(TokenKind::Identifier), punct("{"), nt("Items"), punct("}")],
    ]);
    def!(d, "Implementation", [
        [nt("InherentImpl")],
        [nt("TraitImpl")],
    ]);
    def!(d, "InherentImpl", [
        [kw("impl"), nt("Type"), punct("{"), nt("Items"), punct("}")],
    ]);
    def!(d, "TraitImpl", [
        [kw("impl"), term(TokenKind::Identifier), kw("for"), nt("Type"), punct("{"), nt("Items"), punct("}")],
    ]);
    def!(d, "Statement", [
        [punct(";")],
        [nt("Item")],
        [nt("LetStatement")],
        [nt("ExpressionStatement")],
    ]);
    def!(d, "LetStatement", [
        [kw("let"), nt("Pattern"), punct(":"), nt("Type"), punct("="), nt("Expression"), punct(";")],
        [kw("let"), nt("Pattern"), punct(":"), nt("Type"), punct(";")],
    ]);
    def!(d, "ExpressionStatement", [
        [nt("ExpressionWithBlock")],
        [nt("ExpressionWithBlock"), punct(";")],
        [nt("Expression"), punct(";")],
    ]);
    def!(d, "Expression", [
        [nt("FlowControlExpression")],
    ]);
    def!(d, "BasicExpression", [
        [nt("LiteralExpression")],
        [nt("UnderscoreExpression")],
        [nt("GroupedExpression")],
        [nt("ArrayExpression")],
        [nt("PathExpression")],
        [nt("StructExpression")],
        [nt("ExpressionWithBlock")],
    ]);
    def!(d, "LiteralExpression", [
        [term(TokenKind::CharLiteral)],
        [term(TokenKind::StringLiteral)],
        [term(TokenKind::IntegerLiteral)],
        [kw("true")],
        [kw("false")],
    ]);
    def!(d, "UnderscoreExpression", [
        [kw("_")],
    ]);
    def!(d, "GroupedExpression", [
        [punct("("), nt("Expression"), punct(")")],
    ]);
    def!(d, "ArrayExpression", [
        [punct("["), nt("OptionalArrayElements"), punct("]")],
    ]);
    def!(d, "OptionalArrayElements", [
        [nt("ArrayElements")],
        [],
    ]);
    def!(d, "ArrayElements", [
        [nt("Expression"), punct(","), nt("CommaArrayElements")],
        [nt("Expression"), nt("OptionalComma")],
        [nt("Expression"), punct(";"), nt("Expression")],
    ]);
    def!(d, "CommaArrayElements", [
        [nt("Expression"), punct(","), nt("CommaArrayElements")],
        [nt("Expression"), nt("OptionalComma")],
    ]);
    def!(d, "PathExpression", [
        [nt("PathInExpression")],
    ]);
    def!(d, "StructExpression", [
        [nt("PathInExpression"), punct("{"), nt("OptionalStructExprFields"), punct("}")],
    ]);
    def!(d, "OptionalStructExprFields", [
        [nt("StructExprFields")],
        [],
    ]);
    def!(d, "StructExprFields", [
        [nt("StructExprField"), punct(","), nt("CommaStructExprFields")],
        [nt("StructExprField"), nt("OptionalComma")],
    ]);
    def!(d, "CommaStructExprFields", [
        [nt("StructExprField"), punct(","), nt("CommaStructExprFields")],
        [nt("StructExprField"), nt("OptionalComma")],
    ]);
    def!(d, "StructExprField", [
        [term(TokenKind::Identifier), punct(":"), nt("Expression")],
        [term(TokenKind::Identifier)],
    ]);
    def!(d, "PostfixExpression", [
        [nt("BasicExpression")],
        [nt("MethodCallExpression")],
        [nt("FieldExpression")],
        [nt("CallExpression")],
        [nt("IndexExpression")],
    ]);
    def!(d, "MethodCallExpression", [
        [nt("PostfixExpression"), punct("."), nt("PathExprSegment"), punct("("), nt("OptionalCallParams"), punct(")")],
    ]);
    def!(d, "OptionalCallParams", [
        [nt("CallParams")],
        [],
    ]);
    def!(d, "CallParams", [
        [nt("Expression"), punct(","), nt("CommaCallParams")],
        [nt("Expression"), nt("OptionalComma")],
    ]);
    def!(d, "CommaCallParams", [
        [nt("Expression"), punct(","), nt("CommaCallParams")],
        [nt("Expression"), nt("OptionalComma")],
    ]);
    def!(d, "FieldExpression", [
        [nt("PostfixExpression"), punct("."), term(TokenKind::Identifier)],
    ]);
    def!(d, "CallExpression", [
        [nt("PostfixExpression"), punct("("), nt("OptionalCallParams"), punct(")")],
    ]);
    def!(d, "IndexExpression", [
        [nt("PostfixExpression"), punct("["), nt("Expression"), punct("]")],
    ]);
    def!(d, "UnaryOperatorExpression", [
        [nt("PostfixExpression")],
        [nt("BorrowExpression")],
        [nt("DereferenceExpression")],
        [nt("NegationExpression")],
    ]);
    def!(d, "BorrowExpression", [
        [punct("&"), nt("UnaryOperatorExpression")],
        [punct("&"), kw("mut"), nt("UnaryOperatorExpression")],
        [punct("&&"), nt("UnaryOperatorExpression")],
    ]);
    def!(d, "DereferenceExpression", [
        [punct("*"), nt("UnaryOperatorExpression")],
    ]);
    def!(d, "NegationExpression", [
        [punct("!"), nt("UnaryOperatorExpression")],
        [punct("-"), nt("UnaryOperatorExpression")],
    ]);
    // Left-recursive by design: `x as T as U` associates to the left, the
    // one place in the precedence stack that isn't right-recursive.
    def!(d, "TypeCastExpression", [
        [nt("UnaryOperatorExpression")],
        [nt("TypeCastExpression"), kw("as"), nt("Type")],
    ]);
    def!(d, "MultiplicativeOperatorExpression", [
        [nt("TypeCastExpression")],
        [nt("TypeCastExpression"), punct("*"), nt("MultiplicativeOperatorExpression")],
        [nt("TypeCastExpression"), punct("/"), nt("MultiplicativeOperatorExpression")],
        [nt("TypeCastExpression"), punct("%"), nt("MultiplicativeOperatorExpression")],
    ]);
    def!(d, "AdditiveOperatorExpression", [
        [nt("MultiplicativeOperatorExpression")],
        [nt("MultiplicativeOperatorExpression"), punct("+"), nt("AdditiveOperatorExpression")],
        [nt("MultiplicativeOperatorExpression"), punct("-"), nt("AdditiveOperatorExpression")],
    ]);
    def!(d, "ShiftOperatorExpression", [
        [nt("AdditiveOperatorExpression")],
        [nt("AdditiveOperatorExpression"), punct("<<"), nt("ShiftOperatorExpression")],
        [nt("AdditiveOperatorExpression"), punct(">>"), nt("ShiftOperatorExpression")],
    ]);
    def!(d, "AndExpression", [
        [nt("ShiftOperatorExpression")],
        [nt("ShiftOperatorExpression"), punct("&"), nt("AndExpression")],
    ]);
    def!(d, "XorExpression", [
        [nt("AndExpression")],
        [nt("AndExpression"), punct("^"), nt("XorExpression")],
    ]);
    def!(d, "OrExpression", [
        [nt("XorExpression")],
        [nt("XorExpression"), punct("|"), nt("OrExpression")],
    ]);
    // Non-chaining: both operands are OrExpression, neither side recurses
    // back into ComparisonOperatorExpression -- `a < b < c` is rejected.
    def!(d, "ComparisonOperatorExpression", [
        [nt("OrExpression")],
        [nt("OrExpression"), punct("=="), nt("OrExpression")],
        [nt("OrExpression"), punct("!="), nt("OrExpression")],
        [nt("OrExpression"), punct("<"), nt("OrExpression")],
        [nt("OrExpression"), punct("<="), nt("OrExpression")],
        [nt("OrExpression"), punct(">"), nt("OrExpression")],
        [nt("OrExpression"), punct(">="), nt("OrExpression")],
    ]);
    def!(d, "LazyAndExpression", [
        [nt("ComparisonOperatorExpression")],
        [nt("ComparisonOperatorExpression"), punct("&&"), nt("LazyAndExpression")],
    ]);
    def!(d, "LazyOrExpression", [
        [nt("LazyAndExpression")],
        [nt("LazyAndExpression"), punct("||"), nt("LazyOrExpression")],
    ]);
    def!(d, "AssignmentExpression", [
        [nt("LazyOrExpression")],
        [nt("SimpleAssignmentExpression")],
        [nt("CompoundAssignmentExpression")],
    ]);
    def!(d, "SimpleAssignmentExpression", [
        [nt("LazyOrExpression"), punct("="), nt("AssignmentExpression")],
    ]);
    def!(d, "CompoundAssignmentExpression", [
        [nt("LazyOrExpression"), punct("+="), nt("AssignmentExpression")],
        [nt("LazyOrExpression"), punct("-="), nt("AssignmentExpression")],
        [nt("LazyOrExpression"), punct("*="), nt("AssignmentExpression")],
        [nt("LazyOrExpression"), punct("/="), nt("AssignmentExpression")],
        [nt("LazyOrExpression"), punct("%="), nt("AssignmentExpression")],
        [nt("LazyOrExpression"), punct("&="), nt("AssignmentExpression")],
        [nt("LazyOrExpression"), punct("|="), nt("AssignmentExpression")],
        [nt("LazyOrExpression"), punct("^="), nt("AssignmentExpression")],
        [nt("LazyOrExpression"), punct("<<="), nt("AssignmentExpression")],
        [nt("LazyOrExpression"), punct(">>="), nt("AssignmentExpression")],
    ]);
    def!(d, "FlowControlExpression", [
        [nt("AssignmentExpression")],
        [nt("ContinueExpression")],
        [nt("BreakExpression")],
        [nt("ReturnExpression")],
    ]);
    def!(d, "ContinueExpression", [
        [kw("continue")],
    ]);
    def!(d, "BreakExpression", [
        [kw("break"), nt("Expression")],
        [kw("break")],
    ]);
    def!(d, "ReturnExpression", [
        [kw("return"), nt("Expression")],
        [kw("return")],
    ]);
    def!(d, "ExpressionWithBlock", [
        [nt("BlockExpression")],
        [nt("LoopExpression")],
        [nt("IfExpression")],
    ]);
    def!(d, "BlockExpression", [
        [punct("{"), nt("Statements"), punct("}")],
        [punct("{"), nt("Statements"), nt("Expression"), punct("}")],
    ]);
    def!(d, "Statements", [
        [nt("Statement"), nt("Statements")],
        [],
    ]);
    def!(d, "LoopExpression", [
        [nt("InfiniteLoopExpression")],
        [nt("PredicateLoopExpression")],
    ]);
    def!(d, "InfiniteLoopExpression", [
        [kw("loop"), nt("BlockExpression")],
    ]);
    def!(d, "PredicateLoopExpression", [
        [kw("while"), nt("Conditions"), nt("BlockExpression")],
    ]);
    def!(d, "IfExpression", [
        [kw("if"), nt("Conditions"), nt("BlockExpression"), kw("else"), nt("IfExpression")],
        [kw("if"), nt("Conditions"), nt("BlockExpression"), kw("else"), nt("BlockExpression")],
        [kw("if"), nt("Conditions"), nt("BlockExpression")],
    ]);
    def!(d, "Conditions", [
        [nt("Expression")],
    ]);
    def!(d, "Pattern", [
        [nt("IdentifierPattern")],
        [nt("WildcardPattern")],
        [nt("ReferencePattern")],
    ]);
    def!(d, "IdentifierPattern", [
        [kw("ref"), kw("mut"), term(TokenKind::Identifier)],
        [kw("ref"), term(TokenKind::Identifier)],
        [kw("mut"), term(TokenKind::Identifier)],
        [term(TokenKind::Identifier)],
    ]);
    def!(d, "WildcardPattern", [
        [kw("_")],
    ]);
    def!(d, "ReferencePattern", [
        [punct("&"), nt("Pattern")],
        [punct("&"), kw("mut"), nt("Pattern")],
        [punct("&&"), nt("Pattern")],
    ]);
    def!(d, "Type", [
        [nt("TypePath")],
        [nt("ReferenceType")],
        [nt("ArrayType")],
        [nt("UnitType")],
    ]);
    def!(d, "TypePath", [
        [nt("PathExprSegment")],
    ]);
    def!(d, "ReferenceType", [
        [punct("&"), nt("Type")],
        [punct("&"), kw("mut"), nt("Type")],
    ]);
    def!(d, "ArrayType", [
        [punct("["), nt("Type"), punct(";"), nt("Expression"), punct("]")],
    ]);
    def!(d, "UnitType", [
        [punct("("), punct(")")],
    ]);
    def!(d, "PathInExpression", [
        [nt("PathExprSegment")],
        [nt("PathExprSegment"), punct("::"), nt("PathExprSegment")],
    ]);
    def!(d, "PathExprSegment", [
        [term(TokenKind::Identifier)],
        [kw("Self")],
        [kw("self")],
    ]);

    Grammar { definitions: d, start: SmolStr::new("Items") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn start_symbol_has_an_epsilon_alternative() {
        let g = surface_grammar();
        let items = g.productions("Items");
        assert!(items.iter().any(|p| p.symbols.is_empty()));
    }

    #[test]
    fn every_referenced_nonterminal_has_a_definition() {
        let g = surface_grammar();
        for name in g.nonterminal_names() {
            for production in g.productions(name) {
                for symbol in &production.symbols {
                    if let Symbol::Nonterm(n) = symbol {
                        assert!(g.contains(n), "{name} references undefined nonterminal {n}");
                    }
                }
            }
        }
    }

    #[test]
    fn nonterminal_count_matches_the_surface_language() {
        let g = surface_grammar();
        assert_eq!(g.nonterminal_names().count(), 96);
    }

    #[test]
    fn nonterminal_names_are_unique() {
        let g = surface_grammar();
        let names: Vec<&str> = g.nonterminal_names().collect();
        assert!(names.iter().duplicates().next().is_none(), "grammar table redefined a nonterminal");
    }
}
