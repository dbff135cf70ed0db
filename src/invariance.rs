//! Deciding whether `expr ≤ 0` eventually holds in every run.
use log::debug;

use crate::analysis::Analysis;
use crate::asymptotics::{dominates_or_same, eventual_sign, Direction};
use crate::error::Result;
use crate::expr::{Expr, Sign};
use crate::result::Answer;
use crate::roots::{eventual_polynomial_sign, Polynomial};
use crate::symbol::Symbol;

/// Decides `expr ≤ 0` eventually, for an expression in `n` only.
///
/// Polynomials are evaluated right after their largest real root. Exponential polynomials
/// follow the sign of their dominant term, and oscillating ones are left undecided.
pub fn deterministic_invariant(expr: &Expr) -> Answer {
    if let Some(polynomial) = Polynomial::from_expr(expr) {
        let (at, sign) = eventual_polynomial_sign(&polynomial);
        debug!("Sign of {} from n = {} on: {:?}", expr, at, sign);
        return if sign == Sign::Positive {
            Answer::False
        } else {
            Answer::True
        };
    }
    match eventual_sign(expr) {
        Some(Sign::Positive) => Answer::False,
        Some(_) => Answer::True,
        None => Answer::Unknown,
    }
}

impl Analysis<'_> {
    /// Decides whether `expr ≤ 0` holds eventually.
    ///
    /// Expressions over program variables are decided through their bounds: an upper bound
    /// eventually below a negative constant proves the invariant, a lower bound eventually
    /// above a positive constant refutes it. Anything else is [`Answer::Unknown`].
    pub fn is_invariant(&mut self, expr: &Expr) -> Result<Answer> {
        if expr.free_symbols().iter().all(Symbol::is_n) {
            return Ok(deterministic_invariant(expr));
        }
        let bounds = match self.bounds_of_expr(expr) {
            Ok(bounds) => bounds,
            Err(e) if e.is_incompleteness() => {
                debug!("Invariance of {} <= 0 is unknown: {}", expr, e);
                return Ok(Answer::Unknown);
            }
            Err(e) => return Err(e),
        };
        if dominates_or_same(&bounds.upper, &Expr::from(-1), Direction::NegInf) {
            return Ok(Answer::True);
        }
        if dominates_or_same(&bounds.lower, &Expr::from(1), Direction::PosInf) {
            return Ok(Answer::False);
        }
        Ok(Answer::Unknown)
    }
}
