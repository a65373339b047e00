//! Chart + grammar + tokens -> rooted CST.
//!
//! This is the rightmost-derivation recovery pass: for every finished
//! Earley item the builder fills in children **right-to-left**, picking
//! among competing completions the one with the largest origin (the
//! longest possible match, since we are walking backwards) and, among
//! those, the earliest production in declaration order. That tie-break is
//! what turns an ambiguous chart into one canonical, deterministic tree --
//! and, combined with the grammar's right-recursive precedence chain, it is
//! what makes the tree reflect the intended operator precedence (see the
//! `MultiplicativeOperatorExpression`-and-friends chain in
//! [`crate::grammar`]).
//!
//! One node variant exists per grammar nonterminal plus one per terminal
//! token kind -- a tagged sum standing in for the per-production virtual
//! classes of the source, per its own Design Notes recommendation. Children
//! live in a single [`indextree::Arena`], giving the tree plain exclusive
//! ownership with no raw borrowed pointers between siblings.

use crate::earley::{self, Chart, ParseError, ParsingState};
use crate::grammar::{Grammar, Symbol};
use crate::token::{Token, TokenKind};
use indextree::{Arena, NodeId};
use log::trace;
use smol_str::SmolStr;
use string_builder::Builder;

macro_rules! node_kinds {
    ($($variant:ident),* $(,)?) => {
        /// One variant per grammar nonterminal, plus `Terminal` for leaves.
        #[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
        pub enum NodeKind {
            Terminal(TokenKind),
            $($variant),*
        }

        fn nonterminal_kind(name: &str) -> NodeKind {
            match name {
                $(stringify!($variant) => NodeKind::$variant,)*
                other => panic!("no CST node kind registered for nonterminal {other}"),
            }
        }
    };
}

node_kinds!(
    Items, Item, Function, OptionalConst, OptionalFunctionParameters, FunctionParameters,
    SelfParam, ShorthandSelf, TypedSelf, FunctionParam, FunctionReturnType, OptionalComma,
    CommaFunctionParams, OptionalFunctionReturnType, BlockExpressionOrSemicolon, Struct,
    StructFields, StructField, OptionalStructFields, CommaStructFields, Enumeration,
    EnumVariants, EnumVariant, OptionalEnumVariants, CommaEnumVariants, ConstantItem, Trait,
    Implementation, InherentImpl, TraitImpl, Statement, LetStatement, ExpressionStatement,
    Expression, BasicExpression, LiteralExpression, UnderscoreExpression, GroupedExpression,
    ArrayExpression, OptionalArrayElements, ArrayElements, CommaArrayElements, PathExpression,
    StructExpression, OptionalStructExprFields, StructExprFields, CommaStructExprFields,
    StructExprField, PostfixExpression, MethodCallExpression, OptionalCallParams, CallParams,
    CommaCallParams, FieldExpression, CallExpression, IndexExpression, UnaryOperatorExpression,
    BorrowExpression, DereferenceExpression, NegationExpression, TypeCastExpression,
    MultiplicativeOperatorExpression, AdditiveOperatorExpression, ShiftOperatorExpression,
    AndExpression, XorExpression, OrExpression, ComparisonOperatorExpression, LazyAndExpression,
    LazyOrExpression, AssignmentExpression, SimpleAssignmentExpression,
    CompoundAssignmentExpression, FlowControlExpression, ContinueExpression, BreakExpression,
    ReturnExpression, ExpressionWithBlock, BlockExpression, Statements, LoopExpression,
    InfiniteLoopExpression, PredicateLoopExpression, IfExpression, Conditions, Pattern,
    IdentifierPattern, WildcardPattern, ReferencePattern, Type, TypePath, ReferenceType,
    ArrayType, UnitType, PathInExpression, PathExprSegment,
);

/// A single CST node: either a terminal leaf carrying the matched lexeme,
/// or a nonterminal node recording which production alternative it embodies
/// (its children, in left-to-right production order, are the node's
/// children in the arena).
#[derive(Debug, Clone)]
pub struct CstNode {
    pub kind: NodeKind,
    pub production_index: Option<usize>,
    pub lexeme: Option<SmolStr>,
}

impl CstNode {
    fn terminal(token: &Token) -> Self {
        Self { kind: NodeKind::Terminal(token.kind), production_index: None, lexeme: Some(token.lexeme.clone()) }
    }

    fn nonterminal(name: &str, production_index: usize) -> Self {
        Self { kind: nonterminal_kind(name), production_index: Some(production_index), lexeme: None }
    }
}

/// A recursion-depth guard against pathological grammars, per the source's
/// own "fixed large constant" escape hatch; not expected to ever trip on
/// inputs this grammar can otherwise accept.
fn recursion_guard(token_count: usize) -> usize {
    2 * token_count + 64
}

/// Materialize the CST for an accepted chart. Fails with `ParseError` if
/// the chart does not accept, or if the chosen derivation cannot be
/// reconstructed (a malformed chart -- a programming-invariant violation,
/// not a user-facing parse failure).
pub fn build_tree(
    chart: &Chart,
    tokens: &[Token],
    grammar: &Grammar,
) -> Result<(Arena<CstNode>, NodeId), ParseError> {
    if !earley::accepts(chart, grammar) {
        return Err(ParseError::NotAccepted);
    }
    let n = tokens.len();
    let start = grammar.start();

    let production_index = chart[n]
        .iter()
        .filter(|s| s.nonterminal == start && s.origin == 0 && is_finished(s, grammar))
        .map(|s| s.production_index)
        .min()
        .ok_or_else(|| ParseError::ChartInconsistency("no accepting start state despite accepts=true".into()))?;

    let mut arena = Arena::new();
    let guard = recursion_guard(n);
    let root = build_node(&mut arena, chart, tokens, grammar, start, production_index, 0, n, 0, guard)?;
    Ok((arena, root))
}

fn is_finished(state: &ParsingState, grammar: &Grammar) -> bool {
    state.dot_position == grammar.productions(&state.nonterminal)[state.production_index].symbols.len()
}

/// Fill in the children of `(nonterminal, production_index)` spanning
/// `[i, j)`, right-to-left, per the derivation algorithm: terminals consume
/// one token each from the right end; nonterminals recurse into the best
/// completion found by [`find_completion`].
#[allow(clippy::too_many_arguments)]
fn build_node(
    arena: &mut Arena<CstNode>,
    chart: &Chart,
    tokens: &[Token],
    grammar: &Grammar,
    nonterminal: &str,
    production_index: usize,
    i: usize,
    j: usize,
    depth: usize,
    guard: usize,
) -> Result<NodeId, ParseError> {
    if depth > guard {
        return Err(ParseError::ChartInconsistency(format!(
            "recursion depth exceeded while building {nonterminal}"
        )));
    }

    let production = &grammar.productions(nonterminal)[production_index];
    let m = production.symbols.len();
    let mut children: Vec<NodeId> = Vec::with_capacity(m);
    let mut k = m;
    let mut l = j;

    while k > 0 {
        let symbol = &production.symbols[k - 1];
        match symbol {
            Symbol::Term(pattern) => {
                if l == 0 {
                    return Err(ParseError::ChartInconsistency(format!(
                        "{nonterminal} production {production_index} ran out of tokens"
                    )));
                }
                let token = &tokens[l - 1];
                if !pattern.matches(token) {
                    return Err(ParseError::ChartInconsistency(format!(
                        "{nonterminal} production {production_index}: token {token} does not match {pattern}"
                    )));
                }
                children.push(arena.new_node(CstNode::terminal(token)));
                l -= 1;
            }
            Symbol::Nonterm(name) => {
                let (chosen_production, r) =
                    find_completion(chart, grammar, name, l, nonterminal, production_index, k - 1, i).ok_or_else(
                        || {
                            ParseError::ChartInconsistency(format!(
                                "no completion for {name} ending at {l} while building {nonterminal}/{production_index}"
                            ))
                        },
                    )?;
                trace!("{nonterminal}/{production_index}: child {name}/{chosen_production} spans [{r},{l})");
                let child =
                    build_node(arena, chart, tokens, grammar, name, chosen_production, r, l, depth + 1, guard)?;
                children.push(child);
                l = r;
            }
        }
        k -= 1;
    }

    if l != i {
        return Err(ParseError::ChartInconsistency(format!(
            "{nonterminal} production {production_index}: span started at {l}, expected {i}"
        )));
    }

    children.reverse();
    let node = arena.new_node(CstNode::nonterminal(nonterminal, production_index));
    for child in children {
        node.append(child, arena);
    }
    Ok(node)
}

/// Find the best candidate completion of `nonterminal` ending at `l`: a
/// finished item `(nonterminal, q, l, r)` in `T[l]` such that the parent
/// item one step behind it -- `(parent_nonterminal, parent_production,
/// parent_dot_before, parent_origin)` -- is itself live in `T[r]`. Among all
/// such candidates, prefer the **largest `r`** (the longest match, since we
/// are filling in right-to-left) and, among those tied on `r`, the
/// **smallest `q`** (earliest production -- the declared tie-break).
#[allow(clippy::too_many_arguments)]
fn find_completion(
    chart: &Chart,
    grammar: &Grammar,
    nonterminal: &str,
    l: usize,
    parent_nonterminal: &str,
    parent_production: usize,
    parent_dot_before: usize,
    parent_origin: usize,
) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None; // (q, r)
    for state in chart[l].iter() {
        if state.nonterminal != nonterminal || !is_finished(state, grammar) {
            continue;
        }
        let q = state.production_index;
        let r = state.origin;
        let parent_state = ParsingState {
            nonterminal: SmolStr::new(parent_nonterminal),
            production_index: parent_production,
            dot_position: parent_dot_before,
            origin: parent_origin,
        };
        if !chart[r].contains(&parent_state) {
            continue;
        }
        best = match best {
            None => Some((q, r)),
            Some((best_q, best_r)) if r > best_r || (r == best_r && q < best_q) => Some((q, r)),
            other => other,
        };
    }
    best
}

/// A simple, non-bit-normative S-expression rendering of a tree, useful for
/// CLI output and test assertions: `(NodeKind child child ...)` for
/// nonterminals, the raw lexeme for terminals.
pub fn render(arena: &Arena<CstNode>, root: NodeId) -> String {
    let mut builder = Builder::default();
    render_node(arena, root, &mut builder);
    builder.string().unwrap_or_default()
}

fn render_node(arena: &Arena<CstNode>, id: NodeId, builder: &mut Builder) {
    let node = arena.get(id).expect("NodeId must be valid within its own arena").get();
    match &node.lexeme {
        Some(lexeme) => {
            builder.append(lexeme.as_str());
        }
        None => {
            builder.append("(");
            builder.append(format!("{:?}", node.kind));
            for child in id.children(arena) {
                builder.append(" ");
                render_node(arena, child, builder);
            }
            builder.append(")");
        }
    }
}

/// The in-order sequence of terminal lexemes under `root`; used to check
/// the tree-coverage and tree-round-trip invariants against the filtered
/// token sequence that produced the tree.
pub fn leaf_lexemes(arena: &Arena<CstNode>, root: NodeId) -> Vec<SmolStr> {
    let mut out = Vec::new();
    collect_leaves(arena, root, &mut out);
    out
}

fn collect_leaves(arena: &Arena<CstNode>, id: NodeId, out: &mut Vec<SmolStr>) {
    let node = arena.get(id).expect("NodeId must be valid within its own arena").get();
    if let Some(lexeme) = &node.lexeme {
        out.push(lexeme.clone());
        return;
    }
    for child in id.children(arena) {
        collect_leaves(arena, child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::earley::build_chart;
    use crate::grammar::surface_grammar;
    use crate::lexer::lex;

    fn filtered_tokens(src: &str) -> Vec<Token> {
        lex(src).unwrap().into_iter().filter(|t| !t.is_trivia()).collect()
    }

    #[test]
    fn empty_input_builds_an_empty_items_node() {
        let tokens: Vec<Token> = Vec::new();
        let g = surface_grammar();
        let (chart, accepts) = build_chart(&tokens, &g);
        assert!(accepts);
        let (arena, root) = build_tree(&chart, &tokens, &g).unwrap();
        assert_eq!(arena.get(root).unwrap().get().kind, NodeKind::Items);
        assert_eq!(root.children(&arena).count(), 0);
    }

    #[test]
    fn tree_coverage_matches_filtered_tokens() {
        let src = "fn f() { 1 + 2 * 3 ; }";
        let tokens = filtered_tokens(src);
        let g = surface_grammar();
        let (chart, accepts) = build_chart(&tokens, &g);
        assert!(accepts);
        let (arena, root) = build_tree(&chart, &tokens, &g).unwrap();
        let leaves = leaf_lexemes(&arena, root);
        let expected: Vec<SmolStr> = tokens.iter().map(|t| t.lexeme.clone()).collect();
        assert_eq!(leaves, expected);
    }

    #[test]
    fn function_recognition_shape() {
        let tokens = filtered_tokens("fn f() {}");
        let g = surface_grammar();
        let (chart, accepts) = build_chart(&tokens, &g);
        assert!(accepts);
        let (arena, root) = build_tree(&chart, &tokens, &g).unwrap();
        assert_eq!(arena.get(root).unwrap().get().kind, NodeKind::Items);
        let items: Vec<_> = root.children(&arena).collect();
        assert_eq!(items.len(), 1);
        let item = items[0];
        assert_eq!(arena.get(item).unwrap().get().kind, NodeKind::Item);
        let function = item.children(&arena).next().unwrap();
        assert_eq!(arena.get(function).unwrap().get().kind, NodeKind::Function);
        let function_children: Vec<_> = function.children(&arena).collect();
        // OptionalConst, "fn", Identifier, "(", OptionalFunctionParameters, ")",
        // OptionalFunctionReturnType, BlockExpressionOrSemicolon
        assert_eq!(function_children.len(), 8);
        let fn_keyword = arena.get(function_children[1]).unwrap().get();
        assert_eq!(fn_keyword.lexeme.as_deref(), Some("fn"));
        let ident = arena.get(function_children[2]).unwrap().get();
        assert_eq!(ident.lexeme.as_deref(), Some("f"));
    }

    #[test]
    fn precedence_shape_groups_multiplication_first() {
        let tokens = filtered_tokens("fn f() { 1 + 2 * 3 ; }");
        let g = surface_grammar();
        let (chart, accepts) = build_chart(&tokens, &g);
        assert!(accepts);
        let (arena, root) = build_tree(&chart, &tokens, &g).unwrap();
        let rendered = render(&arena, root);
        // "2" and "3" must be grouped together (multiplicative) before "1" joins them (additive).
        let pos_2 = rendered.find('2').unwrap();
        let pos_3 = rendered.find('3').unwrap();
        let pos_1 = rendered.find('1').unwrap();
        assert!(pos_1 < pos_2);
        assert!(pos_2 < pos_3);
        assert!(rendered.contains("AdditiveOperatorExpression"));
        assert!(rendered.contains("MultiplicativeOperatorExpression"));
    }

    #[test]
    fn determinism_of_rendered_tree() {
        let tokens = filtered_tokens("fn f() { 1 + 2 * 3 ; }");
        let g = surface_grammar();
        let (chart_a, _) = build_chart(&tokens, &g);
        let (arena_a, root_a) = build_tree(&chart_a, &tokens, &g).unwrap();
        let (chart_b, _) = build_chart(&tokens, &g);
        let (arena_b, root_b) = build_tree(&chart_b, &tokens, &g).unwrap();
        assert_eq!(render(&arena_a, root_a), render(&arena_b, root_b));
    }
}
