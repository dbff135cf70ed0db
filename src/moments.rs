//! Expected values of program expressions.
//!
//! Two queries are answered here:
//!
//! - the one-step recurrence `E[e(n+1) | F(n)]` of an expression `e`, as a polynomial over the
//!   variables at iteration `n`;
//! - the exact closed form `E[m(n)]` of a monomial `m` as a function of `n`.
//!
//! Closed forms are computed lazily: the one-step recurrence of a monomial is linear in the
//! monomial itself with a numeric coefficient, and mentions other monomials whose closed forms
//! are computed first.
use std::collections::BTreeMap;

use log::debug;
use num_traits::{One, Zero};

use crate::error::{Error, Result};
use crate::expr::{Expr, Monomial, Rational};
use crate::program::Program;
use crate::recurrence;
use crate::store::Store;
use crate::symbol::Symbol;

pub struct Moments<'p> {
    program: &'p Program,
    closed_forms: Store<Monomial, Expr>,
}

impl<'p> Moments<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            closed_forms: Store::new(),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn store(&self) -> &Store<Monomial, Expr> {
        &self.closed_forms
    }

    /// Computes `E[expr(n+1) | F(n)]` in terms of the variables at iteration `n`.
    ///
    /// Variables are replaced in reverse update order, so that variables referenced by an
    /// update are replaced after it.
    pub fn expected_next(&self, expr: &Expr) -> Expr {
        let mut result = expr.clone();
        for variable in self.program.variables().iter().rev() {
            if !result.contains_symbol(variable) {
                continue;
            }
            let Some(update) = self.program.update(variable) else {
                continue;
            };
            let mut moments: BTreeMap<u32, Expr> = BTreeMap::new();
            let mut next = Expr::zero();
            for (monomial, coefficient) in result.terms() {
                let (rest, power) = monomial.without(variable);
                let term = Expr::term(rest, coefficient.clone());
                if power == 0 {
                    next = next + term;
                } else {
                    let moment = moments.entry(power).or_insert_with(|| update.moment(power));
                    next = next + term * &*moment;
                }
            }
            result = next;
        }
        result
    }

    /// `E[m(0)]`, using that initial values are independent.
    pub fn initial_moment(&self, monomial: &Monomial) -> Expr {
        let mut result = Expr::one();
        for (variable, &power) in monomial.powers() {
            match self.program.initial_value(variable) {
                Some(init) => result = result * init.moment(power),
                None => result = result * Expr::symbol(variable.clone()).pow(power),
            }
        }
        result
    }

    /// Exact closed form of `E[m(n)]`, valid for `n ≥ 1`.
    pub fn closed_form(&mut self, monomial: &Monomial) -> Result<Expr> {
        if monomial.is_one() {
            return Ok(Expr::one());
        }
        if let Some(value) = self.closed_forms.get(monomial) {
            return Ok(value.clone());
        }
        if !self.closed_forms.begin(monomial) {
            return Err(Error::internal(format!(
                "closed form of `{}` depends on itself",
                monomial
            )));
        }
        let result = self.compute_closed_form(monomial);
        match &result {
            Ok(value) => self.closed_forms.insert(monomial.clone(), value.clone()),
            Err(_) => self.closed_forms.abandon(monomial),
        }
        result
    }

    fn compute_closed_form(&mut self, monomial: &Monomial) -> Result<Expr> {
        debug!("Computing closed form for {}", monomial);
        let next = self.expected_next(&Expr::term(monomial.clone(), Rational::one()));

        let mut coefficient = Rational::zero();
        let mut inhomogeneous = Expr::zero();
        for (other, c) in next.collect_by(Symbol::is_var) {
            if &other == monomial {
                coefficient = c.as_constant().ok_or_else(|| {
                    Error::unsupported(format!(
                        "recurrence of `{}` has the non-constant coefficient `{}`",
                        monomial, c
                    ))
                })?;
            } else {
                let closed = self.closed_form(&other)?;
                inhomogeneous = inhomogeneous + c * closed;
            }
        }

        let initial = self.initial_moment(monomial);
        let solution = recurrence::solve(&coefficient, &inhomogeneous.shift(-1), &initial);
        debug!("E[{}] = {}", monomial, solution);
        Ok(solution)
    }

    /// `E[expr(n)]` for a polynomial over program variables.
    pub fn expected(&mut self, expr: &Expr) -> Result<Expr> {
        let mut result = Expr::zero();
        for (monomial, coefficient) in expr.collect_by(Symbol::is_var) {
            result = result + coefficient * self.closed_form(&monomial)?;
        }
        Ok(result)
    }

    /// `E[G(n+1)] - E[G(n)]` for the loop guard `G`.
    pub fn loop_guard_change(&mut self) -> Result<Expr> {
        let expected = self.expected(self.program.loop_guard())?;
        Ok(expected.shift(1) - expected)
    }

    /// Replaces every deterministic variable by its closed form.
    pub fn substitute_deterministic(&mut self, expr: &Expr) -> Result<Expr> {
        let mut map = BTreeMap::new();
        for variable in expr.free_symbols() {
            if variable.is_var() && !self.program.is_probabilistic(&variable) {
                let closed = self.closed_form(&Monomial::symbol(variable.clone(), 1))?;
                map.insert(variable, closed);
            }
        }
        Ok(expr.subs_all(&map))
    }

    /// `E[G(n+1) - G(n) | F(n)]` with deterministic variables replaced by their closed forms.
    pub fn martingale_expression(&mut self) -> Result<Expr> {
        let guard = self.program.loop_guard();
        let expression = self.expected_next(guard) - guard;
        self.substitute_deterministic(&expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::expr::{int, ratio};
    use crate::parser::parse_program;

    fn x() -> Monomial {
        Monomial::symbol(Symbol::var("x"), 1)
    }

    #[test]
    fn test_countdown() {
        let program = parse_program("x = 10\nwhile x > 0:\n    x = x - 1\nend\n").unwrap();
        let mut moments = Moments::new(&program);
        assert_eq!(moments.closed_form(&x()).unwrap(), Expr::from(10) - Expr::n());
        assert_eq!(moments.loop_guard_change().unwrap(), Expr::from(-1));
        assert_eq!(moments.martingale_expression().unwrap(), Expr::from(-1));
    }

    #[test]
    fn test_biased_walk() {
        let program =
            parse_program("while x > 0:\n    x = x + 1 @ 2/3; x - 1\nend\n").unwrap();
        let mut moments = Moments::new(&program);
        let x0 = Expr::symbol(Symbol::real("x0"));
        assert_eq!(
            moments.closed_form(&x()).unwrap(),
            x0.clone() + Expr::n().scale(&ratio(1, 3))
        );
        assert_eq!(moments.loop_guard_change().unwrap(), Expr::constant(ratio(1, 3)));
        assert_eq!(moments.martingale_expression().unwrap(), Expr::constant(ratio(1, 3)));

        // E[x^2] satisfies f(n) = f(n-1) + 2/3 E[x(n-1)] + 1
        let x2 = Monomial::symbol(Symbol::var("x"), 2);
        let closed = moments.closed_form(&x2).unwrap();
        assert_eq!(closed.at_n(0), x0.pow(2));
        assert_eq!(
            closed.at_n(1),
            x0.pow(2) + x0.scale(&ratio(2, 3)) + Expr::one()
        );
    }

    #[test]
    fn test_expected_next_with_random_variable() {
        let program = parse_program(
            "x = 0\nwhile 5 > x:\n    y = RV(uniform, 0, 2)\n    x = x + y**2\nend\n",
        )
        .unwrap();
        let moments = Moments::new(&program);
        let next = moments.expected_next(&Expr::var("x"));
        assert_eq!(next, Expr::var("x") + Expr::constant(ratio(4, 3)));
    }

    #[test]
    fn test_deterministic_substitution() {
        let program = parse_program(
            "y = 0\nwhile x > y:\n    y = y + 2\n    x = x + 1 @ 1/2; x - 1\nend\n",
        )
        .unwrap();
        let mut moments = Moments::new(&program);
        // E[x - y next | F] - (x - y) = -2, and y is replaced by 2n
        let me = moments.martingale_expression().unwrap();
        assert_eq!(me, Expr::from(-2));
        let lgc = moments.loop_guard_change().unwrap();
        assert_eq!(lgc, Expr::from(-2));
        assert!(moments.store().len() >= 2);
    }

    #[test]
    fn test_geometric_decay() {
        let program = parse_program("x = 8\nwhile x > 1:\n    x = x / 2\nend\n").unwrap();
        let mut moments = Moments::new(&program);
        let closed = moments.closed_form(&x()).unwrap();
        assert_eq!(closed, Expr::exponential(ratio(1, 2)).scale(&int(8)));
    }
}
