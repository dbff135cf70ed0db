//! Asymptotic ordering of functions of `n`.
//!
//! Functions are compared "up to a positive constant factor" as `n → ∞`. The limit of an
//! exponential polynomial is read off its dominant term: the terms with the largest `|λ|` and,
//! among them, the largest power of `n`.
use std::fmt;

use num_traits::{One, Signed};

use crate::error::{Error, Result};
use crate::expr::{Expr, Monomial, Rational, Sign};
use crate::symbol::Symbol;

/// Direction of domination: toward `+∞` for upper bounds, toward `-∞` for lower bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    PosInf,
    NegInf,
}

/// Limit of an expression as `n → ∞`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Limit {
    Finite(Expr),
    PosInf,
    NegInf,
    /// `∞·sign(c)` for an `n`-free coefficient `c` of unknown sign.
    SignedInf(Expr),
    /// No limit (the expression oscillates).
    Undefined,
}

impl Limit {
    fn finite_sign(&self) -> Option<Sign> {
        match self {
            Limit::Finite(value) => value.sign(),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Limit::Finite(value) if value.is_zero())
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, Limit::NegInf) || self.finite_sign() == Some(Sign::Negative)
    }

    pub fn is_nonpositive(&self) -> bool {
        matches!(self, Limit::NegInf)
            || matches!(self.finite_sign(), Some(Sign::Negative | Sign::Zero))
    }

    pub fn is_nonnegative(&self) -> bool {
        matches!(self, Limit::PosInf)
            || matches!(self.finite_sign(), Some(Sign::Positive | Sign::Zero))
    }

    /// Position on the extended real line, for limits that have one.
    fn rank(&self) -> Option<i8> {
        match self {
            Limit::NegInf => Some(-1),
            Limit::Finite(_) => Some(0),
            Limit::PosInf => Some(1),
            Limit::SignedInf(_) | Limit::Undefined => None,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(value) => write!(f, "{}", value),
            Limit::PosInf => write!(f, "oo"),
            Limit::NegInf => write!(f, "-oo"),
            Limit::SignedInf(c) => write!(f, "oo*sign({})", c),
            Limit::Undefined => write!(f, "undefined"),
        }
    }
}

/// Dominant part `coefficient · n^degree · magnitude^n` of a nonzero expression.
struct Dominant {
    magnitude: Rational,
    degree: u32,
    coefficient: Expr,
    oscillating: bool,
}

impl Dominant {
    fn key(&self) -> (&Rational, u32) {
        (&self.magnitude, self.degree)
    }
}

fn dominant(expr: &Expr) -> Option<Dominant> {
    let key = |m: &Monomial| (m.base().abs(), m.n_degree());
    let (magnitude, degree) = expr.terms().map(|(m, _)| key(m)).max()?;

    let mut coefficient = Expr::zero();
    let mut oscillating = false;
    for (monomial, c) in expr.terms() {
        if key(monomial) != (magnitude.clone(), degree) {
            continue;
        }
        if monomial.base().is_negative() {
            oscillating = true;
        } else {
            let (rest, _) = monomial.without(&Symbol::N);
            let (constants, _) = rest.split(|_| true);
            coefficient = coefficient + Expr::term(constants, c.clone());
        }
    }
    Some(Dominant {
        magnitude,
        degree,
        coefficient,
        oscillating,
    })
}

/// Computes the limit of `expr` as `n → ∞`.
///
/// Expressions free of `n` are their own limit.
pub fn limit_at(expr: &Expr) -> Limit {
    if !expr.depends_on_n() {
        return Limit::Finite(expr.clone());
    }
    let Some(d) = dominant(expr) else {
        return Limit::Finite(Expr::zero());
    };
    if d.magnitude < Rational::one() {
        return Limit::Finite(Expr::zero());
    }
    if d.oscillating {
        return Limit::Undefined;
    }
    if d.magnitude.is_one() && d.degree == 0 {
        return Limit::Finite(d.coefficient);
    }
    match d.coefficient.sign() {
        Some(Sign::Positive) => Limit::PosInf,
        Some(Sign::Negative) => Limit::NegInf,
        _ => Limit::SignedInf(d.coefficient),
    }
}

/// Sign of `expr` for all sufficiently large `n`, if it can be determined.
pub fn eventual_sign(expr: &Expr) -> Option<Sign> {
    if !expr.depends_on_n() {
        return expr.sign();
    }
    let d = dominant(expr)?;
    if d.oscillating {
        return None;
    }
    d.coefficient.sign()
}

/// Compares two expressions by their eventual sign and growth rate.
fn dominates_by_growth(f: &Expr, g: &Expr, direction: Direction) -> bool {
    let (Some(sf), Some(sg)) = (eventual_sign(f), eventual_sign(g)) else {
        return false;
    };
    let (sf, sg) = match direction {
        Direction::PosInf => (sf, sg),
        Direction::NegInf => (sf.flip(), sg.flip()),
    };
    let keys = || match (dominant(f), dominant(g)) {
        (Some(df), Some(dg)) => Some(df.key().cmp(&dg.key())),
        _ => None,
    };
    match (sf, sg) {
        (Sign::Positive | Sign::Zero, Sign::Negative | Sign::Zero) => true,
        (Sign::Zero | Sign::Negative, Sign::Positive) | (Sign::Negative, Sign::Zero) => false,
        (Sign::Positive, Sign::Positive) => keys().is_some_and(|o| o.is_ge()),
        (Sign::Negative, Sign::Negative) => keys().is_some_and(|o| o.is_le()),
    }
}

/// Returns `true` iff `f` eventually dominates `g` modulo a positive constant factor, toward
/// the given direction.
///
/// Toward `+∞` this means `f(n) ≥ c·g(n)` for some `c > 0` and all large `n`; toward `-∞` it
/// means `f(n) ≤ c·g(n)`.
pub fn dominates_or_same(f: &Expr, g: &Expr, direction: Direction) -> bool {
    if f == g {
        return true;
    }
    let upper = direction == Direction::PosInf;
    let limit_f = limit_at(f);
    let limit_g = limit_at(g);

    if let (Limit::Finite(a), Limit::Finite(b)) = (&limit_f, &limit_g) {
        if a.is_zero() && b.is_zero() {
            return true;
        }
        let (sa, sb) = (a.sign(), b.sign());
        let difference = (a - b).sign();
        return if upper {
            sa == Some(Sign::Positive)
                || sb == Some(Sign::Negative)
                || matches!(difference, Some(Sign::Positive | Sign::Zero))
        } else {
            sa == Some(Sign::Negative)
                || sb == Some(Sign::Positive)
                || matches!(difference, Some(Sign::Negative | Sign::Zero))
        };
    }

    let (Some(rank_f), Some(rank_g)) = (limit_f.rank(), limit_g.rank()) else {
        return false;
    };
    if rank_f != rank_g {
        return if upper { rank_f > rank_g } else { rank_f < rank_g };
    }

    // Both limits are the same infinity.
    dominates_by_growth(f, g, direction)
}

fn fold(fs: &[Expr], direction: Direction) -> Result<Expr> {
    let mut iter = fs.iter();
    let Some(first) = iter.next() else {
        return Err(Error::internal("eventual bound of an empty list"));
    };
    let mut result = first;
    for f in iter {
        if dominates_or_same(result, f, direction) {
            continue;
        }
        if dominates_or_same(f, result, direction) {
            result = f;
        }
    }
    Ok(simplify_asymptotically(result))
}

/// Eventual upper bound of all `fs`, canonicalized.
pub fn dominating(fs: &[Expr]) -> Result<Expr> {
    fold(fs, Direction::PosInf)
}

/// Eventual lower bound of all `fs`, canonicalized.
pub fn dominated(fs: &[Expr]) -> Result<Expr> {
    fold(fs, Direction::NegInf)
}

/// Returns `true` for a single term `±c · n^k · λ^n` with a positive constant `c`.
fn is_canonical(expr: &Expr) -> bool {
    let mut terms = expr.terms();
    let (Some((monomial, coefficient)), None) = (terms.next(), terms.next()) else {
        return false;
    };
    let (rest, _) = monomial.without(&Symbol::N);
    let mut constants = rest.powers().iter();
    coefficient.abs().is_one()
        && monomial.base().is_positive()
        && matches!(
            (constants.next(), constants.next()),
            (Some((symbol, 1)), None) if symbol.is_positive()
        )
}

/// Collapses `expr` to its dominant term times a fresh positive constant.
///
/// Expressions free of `n` and expressions vanishing at infinity are returned unchanged, and
/// so are expressions whose dominant term has no known sign. Expressions already of the form
/// `±c · n^k · λ^n` are returned unchanged as well.
pub fn simplify_asymptotically(expr: &Expr) -> Expr {
    if !expr.depends_on_n() || limit_at(expr).is_zero() || is_canonical(expr) {
        return expr.clone();
    }
    let Some(d) = dominant(expr) else {
        return expr.clone();
    };
    if d.oscillating {
        return expr.clone();
    }
    let sign = match d.coefficient.sign() {
        Some(Sign::Positive) => Rational::one(),
        Some(Sign::Negative) => -Rational::one(),
        _ => return expr.clone(),
    };
    let c = Expr::symbol(Symbol::fresh_positive("c"));
    let order = Expr::term(Monomial::symbol(Symbol::N, d.degree), Rational::one())
        * Expr::exponential(d.magnitude);
    (c * order).scale(&sign)
}

/// The unit of growth `n^degree · magnitude^n` of the dominant term, used in reports.
pub fn growth_order(expr: &Expr) -> Expr {
    match dominant(expr) {
        Some(d) => {
            Expr::term(Monomial::symbol(Symbol::N, d.degree), Rational::one())
                * Expr::exponential(d.magnitude)
        }
        None => Expr::zero(),
    }
}
