//! `ferrous_cst`: a lexer, Earley chart recognizer and CST builder for a
//! small, statically-typed, Rust-like surface language.
//!
//! The three phases run strictly in sequence and are exposed as separate
//! modules so each can be exercised independently: [`lexer`] turns source
//! text into tokens, [`earley`] turns a filtered token sequence into a
//! saturated chart, and [`tree`] turns an accepting chart into a concrete
//! syntax tree. [`grammar`] is the static data both [`earley`] and [`tree`]
//! are indexed by; [`token`] is the shared vocabulary all three speak.

pub mod debug;
pub mod earley;
pub mod grammar;
pub mod lexer;
pub mod token;
pub mod tree;
