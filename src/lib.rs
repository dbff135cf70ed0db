//! # amber-rs: termination analysis of probabilistic loops
//!
//! **`amber-rs`** decides **almost-sure termination** (AST) and **positive almost-sure
//! termination** (PAST) of *prob-solvable* loops: probabilistic while-loops whose variables are
//! updated by polynomial recurrences, probabilistic choices and independent random draws.
//!
//! ## How it works
//!
//! The loop guard `G` (the loop runs while `G > 0`) is treated as a candidate martingale.
//!
//! - **Moments**: exact closed forms of `E[G(n)]` and of the one-step expected change
//!   `E[G(n+1) - G(n) | F(n)]` are computed by solving linear recurrences.
//! - **Bounds**: every polynomial over program variables gets an eventual envelope
//!   `lower(n) ≤ value(n) ≤ upper(n)`, up to unknown positive constants.
//! - **Rules**: a sequence of martingale proof rules turns bounds into verdicts, each with a
//!   human-readable [`Witness`][crate::result::Witness].
//!
//! All results are *eventual*: they hold for sufficiently large `n`, which is enough for
//! termination arguments.
//!
//! ## Basic Usage
//!
//! ```rust
//! use amber_rs::decision::decide_termination;
//! use amber_rs::parser::parse_program;
//! use amber_rs::result::Answer;
//!
//! let program = parse_program(
//!     "x = 10
//!      while x > 0:
//!          x = x - 1 @ 1/2; x + 1
//!      end",
//! )
//! .unwrap();
//!
//! let result = decide_termination(&program).unwrap();
//! assert_eq!(result.ast(), Answer::True);
//! assert_eq!(result.past(), Answer::False);
//! println!("{}", result);
//! ```
//!
//! ## Core Components
//!
//! - **[`expr`]**: canonical exact exponential polynomials, the currency of the whole analysis.
//! - **[`program`]** and **[`parser`]**: the loop model and its source format.
//! - **[`analysis`]**: the context owning all memo tables for one program.
//! - **[`bounds`]** and **[`invariance`]**: bound inference and the eventual sign check.
//! - **[`rules`]** and **[`decision`]**: the proof rules and the procedure running them.

pub mod analysis;
pub mod asymptotics;
pub mod bounds;
pub mod cases;
pub mod decision;
pub mod error;
pub mod expr;
pub mod invariance;
pub mod moments;
pub mod parser;
pub mod program;
pub mod recurrence;
pub mod result;
pub mod roots;
pub mod rules;
pub mod store;
pub mod symbol;
