//! The Earley recognizer: token sequence + grammar -> saturated chart.
//!
//! This is the general chart parser at the center of the system -- the
//! surface grammar is heavily left-recursive and ambiguous in its
//! expression hierarchy, which rules out LL/LR techniques outright. The
//! algorithm here is the textbook predict/scan/complete fixpoint; what
//! differs from a typical from-scratch treatment is the state-set
//! bookkeeping, inherited from the source's continuation-tracking style of
//! chart construction: every `StateSet` keeps a side index of "what is
//! waiting on nonterminal B" so Complete does not have to scan the whole
//! origin set.

use crate::grammar::{Grammar, Symbol};
use crate::token::Token;
use log::{debug, trace};
use multimap::MultiMap;
use smol_str::SmolStr;
use std::collections::HashSet;
use std::fmt;

/// A dotted production plus the origin position it was introduced at --
/// the four-tuple `(nonterminal, production_index, dot_position, origin)`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ParsingState {
    pub nonterminal: SmolStr,
    pub production_index: usize,
    pub dot_position: usize,
    pub origin: usize,
}

impl ParsingState {
    fn new(nonterminal: &str, production_index: usize, dot_position: usize, origin: usize) -> Self {
        Self { nonterminal: SmolStr::new(nonterminal), production_index, dot_position, origin }
    }

    fn advanced(&self) -> Self {
        Self { dot_position: self.dot_position + 1, ..self.clone() }
    }

    fn is_finished(&self, grammar: &Grammar) -> bool {
        let production = &grammar.productions(&self.nonterminal)[self.production_index];
        self.dot_position == production.symbols.len()
    }

    fn symbol_at_dot<'g>(&self, grammar: &'g Grammar) -> Option<&'g Symbol> {
        let production = &grammar.productions(&self.nonterminal)[self.production_index];
        production.symbols.get(self.dot_position)
    }
}

impl fmt::Display for ParsingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.nonterminal, self.production_index, self.dot_position, self.origin
        )
    }
}

/// One `T[k]`: an insertion-ordered, duplicate-free set of `ParsingState`s,
/// plus a `waiting` index from "nonterminal this state's dot sits on" to
/// the state's position in `states`, used by Complete to avoid a linear
/// scan of the whole origin set.
#[derive(Debug, Clone, Default)]
pub struct StateSet {
    states: Vec<ParsingState>,
    seen: HashSet<ParsingState>,
    waiting: MultiMap<SmolStr, usize>,
}

impl StateSet {
    pub fn iter(&self) -> std::slice::Iter<'_, ParsingState> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn contains(&self, state: &ParsingState) -> bool {
        self.seen.contains(state)
    }

    /// Insert `state`, preserving first-seen order and silently dropping
    /// structural duplicates. Returns `true` if the set actually grew.
    fn insert(&mut self, state: ParsingState, grammar: &Grammar) -> bool {
        if self.seen.contains(&state) {
            return false;
        }
        if !state.is_finished(grammar) {
            if let Some(Symbol::Nonterm(name)) = state.symbol_at_dot(grammar) {
                self.waiting.insert(name.clone(), self.states.len());
            }
        }
        self.seen.insert(state.clone());
        self.states.push(state);
        true
    }

    fn waiting_on(&self, nonterminal: &str) -> Vec<usize> {
        self.waiting.get_vec(nonterminal).cloned().unwrap_or_default()
    }
}

pub type Chart = Vec<StateSet>;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ParseError {
    ChartInconsistency(String),
    NotAccepted,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::ChartInconsistency(msg) => write!(f, "chart inconsistency: {msg}"),
            ParseError::NotAccepted => write!(f, "input cannot be parsed"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Build the Earley chart for `tokens` under `grammar`.
///
/// `tokens` must already have `Whitespace`/`Comment` filtered out -- the
/// chart builder only ever matches terminal patterns against `Identifier`,
/// `Keyword`, `CharLiteral`, `StringLiteral`, `IntegerLiteral` and
/// `Punctuation` tokens.
///
/// Returns the saturated chart together with `accepts`: whether `T[N]`
/// contains a finished item for the start production spanning the whole
/// input. A rejecting input is not an error here -- `accepts = false` with
/// a partial chart is the expected, total result for unparseable input.
pub fn build_chart(tokens: &[Token], grammar: &Grammar) -> (Chart, bool) {
    let n = tokens.len();
    let mut chart: Chart = (0..=n).map(|_| StateSet::default()).collect();

    let start = grammar.start();
    for (index, _production) in grammar.productions(start).iter().enumerate() {
        let seed = ParsingState::new(start, index, 0, 0);
        chart[0].insert(seed, grammar);
    }

    for k in 0..=n {
        let mut i = 0;
        while i < chart[k].len() {
            let state = chart[k].states[i].clone();
            i += 1;

            if state.is_finished(grammar) {
                complete(&mut chart, k, &state, grammar);
                continue;
            }

            match state.symbol_at_dot(grammar) {
                Some(Symbol::Nonterm(name)) => predict(&mut chart, k, name, grammar),
                Some(Symbol::Term(pattern)) => {
                    if k < n && pattern.matches(&tokens[k]) {
                        let advanced = state.advanced();
                        trace!("scan at {k}: {state} + {} -> {advanced}", tokens[k]);
                        chart[k + 1].insert(advanced, grammar);
                    }
                }
                None => unreachable!("unfinished state must have a symbol at the dot"),
            }
        }
        debug!("T[{k}] saturated with {} states", chart[k].len());
    }

    let accepts = chart[n].iter().any(|s| {
        s.nonterminal == start && s.origin == 0 && s.is_finished(grammar)
    });
    (chart, accepts)
}

fn predict(chart: &mut Chart, k: usize, nonterminal: &str, grammar: &Grammar) {
    for index in 0..grammar.productions(nonterminal).len() {
        let predicted = ParsingState::new(nonterminal, index, 0, k);
        chart[k].insert(predicted, grammar);
    }
}

fn complete(chart: &mut Chart, k: usize, finished: &ParsingState, grammar: &Grammar) {
    let origin_set = &chart[finished.origin];
    let waiting_indices = origin_set.waiting_on(&finished.nonterminal);
    let advanced: Vec<ParsingState> = waiting_indices
        .into_iter()
        .map(|idx| chart[finished.origin].states[idx].advanced())
        .collect();
    for state in advanced {
        chart[k].insert(state, grammar);
    }
}

/// `accepts = true` iff `T[N]` holds a finished item for the start
/// production spanning the whole input from position 0.
pub fn accepts(chart: &Chart, grammar: &Grammar) -> bool {
    let n = chart.len() - 1;
    chart[n].iter().any(|s| {
        s.nonterminal == grammar.start() && s.origin == 0 && s.is_finished(grammar)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::surface_grammar;
    use crate::lexer::lex;

    fn parse_ok(src: &str) -> bool {
        let tokens: Vec<_> = lex(src).unwrap().into_iter().filter(|t| !t.is_trivia()).collect();
        let g = surface_grammar();
        let (_chart, ok) = build_chart(&tokens, &g);
        ok
    }

    #[test]
    fn empty_input_accepts_via_epsilon() {
        let g = surface_grammar();
        let (chart, ok) = build_chart(&[], &g);
        assert_eq!(chart.len(), 1);
        assert!(!chart[0].is_empty());
        assert!(ok);
    }

    #[test]
    fn bare_identifier_is_rejected() {
        assert!(!parse_ok("x"));
    }

    #[test]
    fn function_recognition() {
        assert!(parse_ok("fn f() {}"));
    }

    #[test]
    fn precedence_example_parses() {
        assert!(parse_ok("fn f() { 1 + 2 * 3 ; }"));
    }

    #[test]
    fn unbalanced_parameters_are_rejected() {
        assert!(!parse_ok("fn f( {}"));
    }

    #[test]
    fn chart_never_shrinks_and_has_no_duplicates() {
        let tokens: Vec<_> =
            lex("fn f() { let x : i32 = 1 + 2 ; }").unwrap().into_iter().filter(|t| !t.is_trivia()).collect();
        let g = surface_grammar();
        let (chart, ok) = build_chart(&tokens, &g);
        assert!(ok);
        for set in &chart {
            let mut seen = HashSet::new();
            for s in set.iter() {
                assert!(seen.insert(s.clone()), "duplicate state in a chart set: {s}");
            }
        }
    }

    #[test]
    fn deterministic_across_runs() {
        let tokens: Vec<_> =
            lex("fn f() { 1 + 2 * 3 ; }").unwrap().into_iter().filter(|t| !t.is_trivia()).collect();
        let g = surface_grammar();
        let (chart_a, ok_a) = build_chart(&tokens, &g);
        let (chart_b, ok_b) = build_chart(&tokens, &g);
        assert_eq!(ok_a, ok_b);
        assert_eq!(chart_a.len(), chart_b.len());
        for (a, b) in chart_a.iter().zip(chart_b.iter()) {
            assert_eq!(a.states, b.states);
        }
    }
}
