//! Closed forms of first-order linear recurrences with constant coefficient.
use num_traits::{One, Zero};

use crate::expr::{binomial, Expr, Monomial, Rational};
use crate::symbol::Symbol;

/// Solves `f(n) = c·f(n-1) + h(n)` with `f(0) = f0`.
///
/// `h` is an exponential polynomial in `n` whose coefficients may contain constant symbols.
/// The returned closed form agrees with the recurrence for every `n ≥ 1`, and also at `n = 0`
/// unless `c = 0`.
pub fn solve(c: &Rational, h: &Expr, f0: &Expr) -> Expr {
    if c.is_zero() {
        return h.clone();
    }

    let mut result = Expr::exponential(c.clone()) * f0;
    for (monomial, coefficient) in h.terms() {
        let (rest, k) = monomial.without(&Symbol::N);
        let (constants, _) = rest.split(|_| true);
        let lambda = rest.base().clone();
        let s = c / &lambda;
        let p = particular_polynomial(&s, k);

        let p_of_n: Expr = p
            .iter()
            .enumerate()
            .map(|(m, pm)| Expr::term(Monomial::symbol(Symbol::N, m as u32), pm.clone()))
            .sum();
        let p_at_zero = p.first().cloned().unwrap_or_else(Rational::zero);
        let particular = Expr::exponential(lambda) * p_of_n
            - Expr::exponential(c.clone()).scale(&p_at_zero);

        result = result + Expr::term(constants, coefficient.clone()) * particular;
    }
    result
}

/// Coefficients `p₀, p₁, …` of the polynomial `P` with `P(n) - s·P(n-1) = n^k`.
fn particular_polynomial(s: &Rational, k: u32) -> Vec<Rational> {
    // Coefficient of n^m in P(n-1) is Σ_{j≥m} p_j·C(j,m)·(-1)^{j-m}.
    let tail = |p: &[Rational], m: u32, from: u32| -> Rational {
        let mut sum = Rational::zero();
        for j in from..p.len() as u32 {
            let mut term = &p[j as usize] * binomial(j, m);
            if (j - m) % 2 == 1 {
                term = -term;
            }
            sum += term;
        }
        sum
    };
    let delta = |m: u32| {
        if m == k {
            Rational::one()
        } else {
            Rational::zero()
        }
    };

    if s.is_one() {
        let mut p = vec![Rational::zero(); k as usize + 2];
        for m in (0..=k).rev() {
            let value = (delta(m) + tail(&p, m, m + 2)) / Rational::from_integer((m + 1).into());
            p[m as usize + 1] = value;
        }
        p
    } else {
        let denominator = Rational::one() - s;
        let mut p = vec![Rational::zero(); k as usize + 1];
        for m in (0..=k).rev() {
            let value = (delta(m) + s * tail(&p, m, m + 1)) / &denominator;
            p[m as usize] = value;
        }
        p
    }
}
