//! End-to-end lex -> chart -> tree scenarios, covering the concrete
//! examples and boundary cases.

use ferrous_cst::grammar::surface_grammar;
use ferrous_cst::lexer::lex;
use ferrous_cst::token::{Token, TokenKind};
use ferrous_cst::{earley, tree};
use indoc::indoc;

fn filtered(src: &str) -> Vec<Token> {
    lex(src).unwrap().into_iter().filter(|t| !t.is_trivia()).collect()
}

fn accepts(src: &str) -> bool {
    let tokens = filtered(src);
    let grammar = surface_grammar();
    earley::build_chart(&tokens, &grammar).1
}

#[test]
fn lexer_smoke_scenario() {
    let tokens = lex("let x = 42;").unwrap();
    let kinds_and_lexemes: Vec<(TokenKind, &str)> =
        tokens.iter().filter(|t| !t.is_trivia()).map(|t| (t.kind, t.lexeme.as_str())).collect();
    assert_eq!(
        kinds_and_lexemes,
        vec![
            (TokenKind::Keyword, "let"),
            (TokenKind::Identifier, "x"),
            (TokenKind::Punctuation, "="),
            (TokenKind::IntegerLiteral, "42"),
            (TokenKind::Punctuation, ";"),
        ]
    );
}

#[test]
fn nested_comment_scenario() {
    let tokens: Vec<_> = lex("42 /* a /* b */ c */").unwrap().into_iter().filter(|t| !t.is_trivia()).collect();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::IntegerLiteral);
    assert_eq!(tokens[0].lexeme.as_str(), "42");
}

#[test]
fn unterminated_string_scenario() {
    assert!(lex("\"abc").is_err());
}

#[test]
fn function_recognition_scenario() {
    assert!(accepts("fn f() {}"));
}

#[test]
fn precedence_scenario() {
    let src = "fn f() { 1 + 2 * 3 ; }";
    let tokens = filtered(src);
    let grammar = surface_grammar();
    let (chart, ok) = earley::build_chart(&tokens, &grammar);
    assert!(ok);
    let (arena, root) = tree::build_tree(&chart, &tokens, &grammar).unwrap();
    let rendered = tree::render(&arena, root);
    assert!(rendered.contains("AdditiveOperatorExpression"));
    assert!(rendered.contains("MultiplicativeOperatorExpression"));
    // `2 * 3` must nest together under the additive expression's right
    // operand -- never `(1 + 2) * 3`, which would put `3` before `2`.
    let one_pos = rendered.find('1').unwrap();
    let two_pos = rendered.find('2').unwrap();
    let three_pos = rendered.find('3').unwrap();
    assert!(one_pos < two_pos);
    assert!(two_pos < three_pos);
}

#[test]
fn rejection_scenario() {
    assert!(!accepts("fn f( {}"));
}

#[test]
fn empty_input_boundary() {
    let grammar = surface_grammar();
    let (chart, ok) = earley::build_chart(&[], &grammar);
    assert_eq!(chart.len(), 1);
    assert!(ok);
    let (arena, root) = tree::build_tree(&chart, &[], &grammar).unwrap();
    assert_eq!(root.children(&arena).count(), 0);
}

#[test]
fn bare_identifier_boundary() {
    assert!(!accepts("x"));
}

#[test]
fn deeply_nested_block_comment_boundary() {
    let mut src = String::from("1 ");
    for _ in 0..8 {
        src.push_str("/* ");
    }
    src.push_str("inner");
    for _ in 0..8 {
        src.push_str(" */");
    }
    let tokens: Vec<_> = lex(&src).unwrap().into_iter().filter(|t| !t.is_trivia()).collect();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].lexeme.as_str(), "1");
}

#[test]
fn tree_coverage_and_round_trip() {
    let src = indoc! {"
        fn add(a: i32, b: i32) -> i32 {
            a + b
        }
    "};
    let tokens = filtered(src);
    let grammar = surface_grammar();
    let (chart, ok) = earley::build_chart(&tokens, &grammar);
    assert!(ok);
    let (arena, root) = tree::build_tree(&chart, &tokens, &grammar).unwrap();

    let leaves = tree::leaf_lexemes(&arena, root);
    let expected: Vec<_> = tokens.iter().map(|t| t.lexeme.clone()).collect();
    assert_eq!(leaves, expected, "tree coverage must match the filtered token sequence");

    let joined = leaves.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(" ");
    let re_lexed: Vec<_> = lex(&joined).unwrap().into_iter().filter(|t| !t.is_trivia()).collect();
    assert_eq!(re_lexed, tokens, "re-lexing the space-joined leaves must reproduce the token sequence");
}

#[test]
fn struct_and_enum_and_trait_and_impl_all_parse() {
    assert!(accepts("struct Point { x: i32, y: i32 }"));
    assert!(accepts("struct Unit;"));
    assert!(accepts("enum Color { Red, Green, Blue, }"));
    assert!(accepts("trait Shape { fn area(&self) -> i32; }"));
    assert!(accepts("impl Point { fn origin() -> Point { Point { x: 0, y: 0 } } }"));
    assert!(accepts("impl Shape for Point { fn area(&self) -> i32 { 0 } }"));
}

#[test]
fn control_flow_constructs_parse() {
    assert!(accepts("fn f() { if true { 1 ; } else { 2 ; } }"));
    assert!(accepts("fn f() { loop { break ; } }"));
    assert!(accepts("fn f() { while true { continue ; } }"));
    assert!(accepts("fn f() -> i32 { return 1 ; }"));
}

#[test]
fn assignment_and_method_call_chains_parse() {
    assert!(accepts("fn f() { let x : i32 = 1 ; x += 1 ; }"));
    assert!(accepts("fn f(a: Point) { a.translate(1, 2).scale(3) ; }"));
}

#[test]
fn comparison_does_not_chain() {
    // `a < b < c` is not a valid ComparisonOperatorExpression: both operands
    // must be OrExpression, which does not recurse back into comparisons.
    assert!(!accepts("fn f() { 1 < 2 < 3 ; }"));
}

#[test]
fn invalid_escape_is_rejected() {
    assert!(lex("\"\\q\"").is_err());
}

#[test]
fn determinism_across_runs_scenario() {
    let src = "fn f(a: i32) -> i32 { a * 2 + 1 }";
    let tokens = filtered(src);
    let grammar = surface_grammar();
    let (chart_a, _) = earley::build_chart(&tokens, &grammar);
    let (arena_a, root_a) = tree::build_tree(&chart_a, &tokens, &grammar).unwrap();
    let (chart_b, _) = earley::build_chart(&tokens, &grammar);
    let (arena_b, root_b) = tree::build_tree(&chart_b, &tokens, &grammar).unwrap();
    assert_eq!(tree::render(&arena_a, root_a), tree::render(&arena_b, root_b));
}
