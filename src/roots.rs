//! Real roots of univariate polynomials in `n`.
//!
//! Roots are never computed numerically. Sturm sequences count distinct real roots to the
//! right of a rational point, which is enough to find the first integer after which a
//! polynomial keeps its sign.
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::expr::{Expr, Rational, Sign};

/// Polynomial with rational coefficients, lowest degree first, without trailing zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    coefficients: Vec<Rational>,
}

impl Polynomial {
    pub fn new(mut coefficients: Vec<Rational>) -> Self {
        while coefficients.last().is_some_and(|c| c.is_zero()) {
            coefficients.pop();
        }
        Self { coefficients }
    }

    /// Reads an expression as a polynomial in `n`. Fails if anything but `n` occurs.
    pub fn from_expr(expr: &Expr) -> Option<Self> {
        let mut coefficients = Vec::new();
        for (monomial, coefficient) in expr.terms() {
            if monomial.is_exponential() || monomial.symbols().any(|s| !s.is_n()) {
                return None;
            }
            let degree = monomial.n_degree() as usize;
            if coefficients.len() <= degree {
                coefficients.resize(degree + 1, Rational::zero());
            }
            coefficients[degree] = coefficient.clone();
        }
        Some(Self::new(coefficients))
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn degree(&self) -> Option<usize> {
        self.coefficients.len().checked_sub(1)
    }

    pub fn leading(&self) -> Rational {
        self.coefficients.last().cloned().unwrap_or_else(Rational::zero)
    }

    pub fn eval(&self, at: &Rational) -> Rational {
        let mut result = Rational::zero();
        for c in self.coefficients.iter().rev() {
            result = result * at + c;
        }
        result
    }

    pub fn derivative(&self) -> Polynomial {
        Polynomial::new(
            self.coefficients
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, c)| c * Rational::from_integer(BigInt::from(i)))
                .collect(),
        )
    }

    fn rem(&self, divisor: &Polynomial) -> Polynomial {
        let mut remainder = self.coefficients.clone();
        let Some(d) = divisor.degree() else {
            return Polynomial::new(remainder);
        };
        let lead = divisor.leading();
        while remainder.len() > d {
            let shift = remainder.len() - 1 - d;
            let factor = remainder[remainder.len() - 1].clone() / &lead;
            for (i, c) in divisor.coefficients.iter().enumerate() {
                remainder[shift + i] -= &factor * c;
            }
            remainder.pop();
            while remainder.last().is_some_and(|c| c.is_zero()) {
                remainder.pop();
            }
        }
        Polynomial::new(remainder)
    }

    /// Divides out the factor `(n - root)` as often as `root` is a root.
    fn deflate(&self, root: &Rational) -> Polynomial {
        let mut current = self.clone();
        while !current.is_zero() && current.degree() != Some(0) && current.eval(root).is_zero() {
            // Synthetic division by (n - root).
            let mut quotient = vec![Rational::zero(); current.coefficients.len() - 1];
            let mut carry = Rational::zero();
            for i in (0..current.coefficients.len()).rev() {
                let value = &current.coefficients[i] + &carry * root;
                if i > 0 {
                    quotient[i - 1] = value.clone();
                }
                carry = value;
            }
            current = Polynomial::new(quotient);
        }
        current
    }

    fn sturm_sequence(&self) -> Vec<Polynomial> {
        let mut sequence = vec![self.clone(), self.derivative()];
        loop {
            let len = sequence.len();
            if sequence[len - 1].is_zero() {
                sequence.pop();
                break;
            }
            let next = sequence[len - 2].rem(&sequence[len - 1]);
            let negated = Polynomial::new(next.coefficients.iter().map(|c| -c).collect());
            sequence.push(negated);
        }
        sequence
    }

    fn sign_changes(signs: impl Iterator<Item = Sign>) -> usize {
        let mut changes = 0;
        let mut previous = None;
        for sign in signs.filter(|s| *s != Sign::Zero) {
            if previous.is_some_and(|p| p != sign) {
                changes += 1;
            }
            previous = Some(sign);
        }
        changes
    }

    /// Number of distinct real roots strictly greater than `at`.
    pub fn count_roots_above(&self, at: &Rational) -> usize {
        if self.degree().unwrap_or(0) == 0 {
            return 0;
        }
        let reduced = self.deflate(at);
        if reduced.degree().unwrap_or(0) == 0 {
            return 0;
        }
        let sequence = reduced.sturm_sequence();
        let at_point = Self::sign_changes(sequence.iter().map(|p| Sign::of(&p.eval(at))));
        let at_infinity = Self::sign_changes(sequence.iter().map(|p| Sign::of(&p.leading())));
        at_point.saturating_sub(at_infinity)
    }

    /// Cauchy bound: every real root lies in `[-bound, bound]`.
    pub fn cauchy_bound(&self) -> Rational {
        let lead = self.leading();
        if lead.is_zero() {
            return Rational::zero();
        }
        let max = self
            .coefficients
            .iter()
            .rev()
            .skip(1)
            .map(|c| (c / &lead).abs())
            .max()
            .unwrap_or_else(Rational::zero);
        Rational::one() + max
    }

    /// Smallest integer `m ≥ 0` such that no real root is greater than `m`.
    pub fn max_root_ceiling(&self) -> u64 {
        let at = |m: u64| Rational::from_integer(BigInt::from(m));
        if self.count_roots_above(&at(0)) == 0 {
            return 0;
        }
        let mut low = 0u64;
        let mut high = self.cauchy_bound().ceil().to_integer().to_u64().unwrap_or(u64::MAX);
        // Invariant: roots above `low`, none above `high`.
        while high - low > 1 {
            let mid = low + (high - low) / 2;
            if self.count_roots_above(&at(mid)) == 0 {
                high = mid;
            } else {
                low = mid;
            }
        }
        high
    }
}

/// Whether a function of `n` may be positive and may be negative for some `n ≥ 1`.
///
/// Numbers have their exact sign. Polynomials in `n` are checked exactly past their largest
/// root. Other expressions are only recognized as positive (or negative) when every term is
/// positive-definite (or every term is the negation of one).
pub fn polarity_in_n(expr: &Expr) -> (bool, bool) {
    if let Some(c) = expr.as_constant() {
        return (c.is_positive(), c.is_negative());
    }
    if let Some(polynomial) = Polynomial::from_expr(expr) {
        if polynomial.max_root_ceiling() > 0 {
            return (true, true);
        }
        let at_one = polynomial.eval(&Rational::one());
        return (at_one.is_positive(), at_one.is_negative());
    }
    let definite = |positive: bool| {
        expr.terms().all(|(monomial, coefficient)| {
            monomial.is_positive_definite() && coefficient.is_positive() == positive
        })
    };
    if definite(true) {
        (true, false)
    } else if definite(false) {
        (false, true)
    } else {
        (true, true)
    }
}

/// Sign of a polynomial in `n` for all sufficiently large `n`, checked at the first integer
/// past its largest real root.
pub fn eventual_polynomial_sign(polynomial: &Polynomial) -> (u64, Sign) {
    let m = polynomial.max_root_ceiling() + 1;
    let value = polynomial.eval(&Rational::from_integer(BigInt::from(m)));
    (m, Sign::of(&value))
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::expr::{int, ratio};

    fn poly(coefficients: &[i64]) -> Polynomial {
        Polynomial::new(coefficients.iter().map(|&c| int(c)).collect())
    }

    #[test]
    fn test_from_expr() {
        let e = Expr::n().pow(2).scale(&int(3)) - Expr::from(1);
        assert_eq!(Polynomial::from_expr(&e), Some(poly(&[-1, 0, 3])));
        assert_eq!(Polynomial::from_expr(&Expr::var("x")), None);
        assert_eq!(Polynomial::from_expr(&Expr::exponential(int(2))), None);
    }

    #[test]
    fn test_count_roots() {
        // (n - 1)(n - 2)(n - 5) = n^3 - 8n^2 + 17n - 10
        let p = poly(&[-10, 17, -8, 1]);
        assert_eq!(p.count_roots_above(&int(0)), 3);
        assert_eq!(p.count_roots_above(&int(1)), 2);
        assert_eq!(p.count_roots_above(&ratio(3, 2)), 2);
        assert_eq!(p.count_roots_above(&int(2)), 1);
        assert_eq!(p.count_roots_above(&int(5)), 0);
    }

    #[test]
    fn test_repeated_roots() {
        // (n - 3)^2 = n^2 - 6n + 9
        let p = poly(&[9, -6, 1]);
        assert_eq!(p.count_roots_above(&int(0)), 1);
        assert_eq!(p.count_roots_above(&int(3)), 0);
        assert_eq!(p.max_root_ceiling(), 3);
    }

    #[test]
    fn test_max_root_ceiling() {
        assert_eq!(poly(&[-10, 17, -8, 1]).max_root_ceiling(), 5);
        // n^2 - 10 has its largest root near 3.16
        assert_eq!(poly(&[-10, 0, 1]).max_root_ceiling(), 4);
        // n^2 + 1 has no real roots
        assert_eq!(poly(&[1, 0, 1]).max_root_ceiling(), 0);
        assert_eq!(poly(&[7]).max_root_ceiling(), 0);
    }

    #[test]
    fn test_polarity_in_n() {
        assert_eq!(polarity_in_n(&Expr::from(-2)), (false, true));
        assert_eq!(polarity_in_n(&(Expr::n() + Expr::one())), (true, false));
        assert_eq!(polarity_in_n(&(Expr::from(10) - Expr::n())), (true, true));
        assert_eq!(polarity_in_n(&Expr::exponential(int(2))), (true, false));
        assert_eq!(
            polarity_in_n(&(-Expr::exponential(int(2)) - Expr::n())),
            (false, true)
        );
        assert_eq!(polarity_in_n(&Expr::exponential(int(-1))), (true, true));
    }

    #[test]
    fn test_eventual_sign() {
        let (m, sign) = eventual_polynomial_sign(&poly(&[10, -1]));
        assert_eq!(m, 11);
        assert_eq!(sign, Sign::Negative);
    }
}
