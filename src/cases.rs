//! One-step unfolding of expressions over the loop body.
//!
//! For an expression `E` denoting a value after an iteration, [`get_cases`] lists every
//! expression over the values *before* the iteration that `E` can evaluate to, together with
//! its probability. Variables drawn from a [`RandomVar`][crate::program::RandomVar] are not
//! unfolded and stay as symbols.
use std::collections::BTreeMap;
use std::fmt;

use log::trace;
use num_traits::{One, Signed, Zero};

use crate::error::{Error, Result};
use crate::expr::{Expr, Monomial, Rational};
use crate::program::{Endpoint, Program};
use crate::symbol::Symbol;

/// A possible value of an expression after one iteration, with its probability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub expr: Expr,
    pub probability: Rational,
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.expr, self.probability)
    }
}

/// Enumerates the one-step cases of `expr`.
///
/// Variables are unfolded in reverse update order, and cases with equal expressions are merged
/// after every variable, keeping the order of first occurrence.
pub fn get_cases(expr: &Expr, program: &Program) -> Vec<Case> {
    let mut cases = vec![Case {
        expr: expr.clone(),
        probability: Rational::one(),
    }];
    for variable in program.variables().iter().rev() {
        let Some(branches) = program.update(variable).and_then(|u| u.branches()) else {
            continue;
        };
        let mut split = Vec::with_capacity(cases.len() * branches.len());
        for case in cases {
            if !case.expr.contains_symbol(variable) {
                split.push(case);
                continue;
            }
            for (value, probability) in branches {
                split.push(Case {
                    expr: case.expr.subs(variable, value),
                    probability: &case.probability * probability,
                });
            }
        }
        cases = merge(split);
    }
    trace!(
        "Cases of {}: [{}]",
        expr,
        cases.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
    );
    cases
}

fn merge(cases: Vec<Case>) -> Vec<Case> {
    let mut result: Vec<Case> = Vec::with_capacity(cases.len());
    for case in cases {
        match result.iter_mut().find(|c| c.expr == case.expr) {
            Some(existing) => existing.probability += case.probability,
            None => result.push(case),
        }
    }
    result
}

/// One edge `monom(n) = recurrence_constant · monom(n-1) + inhom_part(n-1)`, taken with
/// `probability`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub monom: Monomial,
    pub recurrence_constant: Rational,
    pub inhom_part: Expr,
    pub probability: Rational,
}

/// Decomposes the cases of a monomial into recurrence branches.
pub fn branches_of_monom(monom: &Monomial, program: &Program) -> Result<Vec<Branch>> {
    let unit = Expr::term(monom.clone(), Rational::one());
    let mut branches = Vec::new();
    for case in get_cases(&unit, program) {
        let collected = case.expr.collect_by(Symbol::is_var);
        let recurrence_constant = match collected.get(monom) {
            None => Rational::zero(),
            Some(c) => c.as_constant().ok_or_else(|| {
                Error::unsupported(format!(
                    "coefficient `{}` of `{}` in case `{}` is not a number",
                    c, monom, case.expr
                ))
            })?,
        };
        let inhom_part = &case.expr - Expr::term(monom.clone(), recurrence_constant.clone());
        branches.push(Branch {
            monom: monom.clone(),
            recurrence_constant,
            inhom_part,
            probability: case.probability,
        });
    }
    Ok(branches)
}

/// Conservative sign estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Polarity {
    pub maybe_positive: bool,
    pub maybe_negative: bool,
}

impl Polarity {
    pub const BOTH: Polarity = Polarity {
        maybe_positive: true,
        maybe_negative: true,
    };

    pub fn new(maybe_positive: bool, maybe_negative: bool) -> Self {
        Self {
            maybe_positive,
            maybe_negative,
        }
    }

    pub fn of(value: &Rational) -> Self {
        Self::new(value.is_positive(), value.is_negative())
    }

    /// Polarity of the negated value.
    pub fn flip(self) -> Self {
        Self::new(self.maybe_negative, self.maybe_positive)
    }

    pub fn or(self, other: Polarity) -> Self {
        Self::new(
            self.maybe_positive || other.maybe_positive,
            self.maybe_negative || other.maybe_negative,
        )
    }
}

const MAX_CORNER_ATOMS: usize = 16;

/// Value of `expr` at `n = 0`, with every variable that has a single initial value replaced by
/// it.
pub fn initial_value(expr: &Expr, program: &Program) -> Expr {
    let mut fixed = BTreeMap::new();
    for variable in expr.free_symbols().into_iter().filter(Symbol::is_var) {
        if let Some(value) = program
            .initial_value(&variable)
            .and_then(|init| init.single_branch())
        {
            fixed.insert(variable, value.clone());
        }
    }
    expr.at_n(0).subs_all(&fixed)
}

/// Sign estimate of `expr` before the first iteration.
///
/// Variables with a single initial value are substituted. Every remaining power `x^k` ranges
/// over the support of the initial distribution raised to `k`, and the expression is evaluated
/// at every corner of the resulting box.
pub fn initial_polarity(expr: &Expr, program: &Program) -> Polarity {
    let value = initial_value(expr, program);
    if let Some(c) = value.as_constant() {
        return Polarity::of(&c);
    }

    let collected = value.collect_by(Symbol::is_var);
    let mut atoms: Vec<(Symbol, u32)> = Vec::new();
    let mut terms: Vec<(Vec<usize>, Rational)> = Vec::new();
    for (monomial, coefficient) in &collected {
        let Some(coefficient) = coefficient.as_constant() else {
            return Polarity::BOTH;
        };
        let mut indices = Vec::new();
        for (variable, &power) in monomial.powers() {
            let atom = (variable.clone(), power);
            let index = match atoms.iter().position(|a| a == &atom) {
                Some(i) => i,
                None => {
                    atoms.push(atom);
                    atoms.len() - 1
                }
            };
            indices.push(index);
        }
        terms.push((indices, coefficient));
    }

    if atoms.len() > MAX_CORNER_ATOMS {
        return Polarity::BOTH;
    }
    let mut intervals = Vec::with_capacity(atoms.len());
    for (variable, power) in &atoms {
        let support = program
            .initial_value(variable)
            .and_then(|init| init.support(*power));
        match support {
            Some((Endpoint::Finite(low), Endpoint::Finite(high))) => intervals.push([low, high]),
            _ => return Polarity::BOTH,
        }
    }

    let mut polarity = Polarity::default();
    for corner in 0..(1usize << atoms.len()) {
        let mut total = Rational::zero();
        for (indices, coefficient) in &terms {
            let mut product = coefficient.clone();
            for &i in indices {
                product *= &intervals[i][(corner >> i) & 1];
            }
            total += product;
        }
        polarity = polarity.or(Polarity::of(&total));
        if polarity == Polarity::BOTH {
            break;
        }
    }
    polarity
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::expr::{int, ratio};
    use crate::parser::parse_program;

    #[test]
    fn test_cases_of_product() {
        let program = parse_program(
            "x = 0\ny = 0\nwhile x > 0:\n    x = x - 1 @ 1/2; x + 1\n    y = y - 1 @ 1/2; y + 1\nend\n",
        )
        .unwrap();
        let x = Expr::var("x");
        let y = Expr::var("y");
        let cases = get_cases(&(&x * &y), &program);
        assert_eq!(cases.len(), 4);
        for case in &cases {
            assert_eq!(case.probability, ratio(1, 4));
        }
        assert_eq!(
            cases[0].expr,
            (&x - Expr::from(1)) * (&y - Expr::from(1))
        );
    }

    #[test]
    fn test_cases_merge() {
        let program =
            parse_program("while x > 0:\n    x = x + 1 @ 1/4; x - 1 @ 1/4; x + 1\nend\n").unwrap();
        let cases = get_cases(&Expr::var("x"), &program);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].expr, Expr::var("x") + Expr::from(1));
        assert_eq!(cases[0].probability, ratio(3, 4));
        assert_eq!(cases[1].probability, ratio(1, 4));
    }

    #[test]
    fn test_cases_keep_random_variables() {
        let program = parse_program(
            "x = 0\nwhile x > 0:\n    y = RV(uniform, 0, 1)\n    x = x + y\nend\n",
        )
        .unwrap();
        let cases = get_cases(&Expr::var("x"), &program);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].expr, Expr::var("x") + Expr::var("y"));
    }

    #[test]
    fn test_branches_of_monom() {
        let program =
            parse_program("while x > 0:\n    x = 2*x + 1 @ 1/3; x - 3\nend\n").unwrap();
        let x2 = Monomial::symbol(Symbol::var("x"), 2);
        let branches = branches_of_monom(&x2, &program).unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].recurrence_constant, int(4));
        assert_eq!(branches[0].inhom_part, Expr::var("x").scale(&int(4)) + Expr::from(1));
        assert_eq!(branches[0].probability, ratio(1, 3));
        assert_eq!(branches[1].recurrence_constant, int(1));
        assert_eq!(branches[1].inhom_part, Expr::var("x").scale(&int(-6)) + Expr::from(9));
        assert_eq!(branches[1].probability, ratio(2, 3));
    }

    #[test]
    fn test_initial_polarity() {
        let program = parse_program(
            "x = 10\ny = 1 @ 1/2; -2\nwhile x > 0:\n    x = x - 1\n    y = y\n    z = z + 1\nend\n",
        )
        .unwrap();
        let x = Expr::var("x");
        let y = Expr::var("y");
        let z = Expr::var("z");

        assert_eq!(initial_value(&(&x + &y), &program), Expr::from(10) + &y);
        assert_eq!(initial_polarity(&x, &program), Polarity::new(true, false));
        assert_eq!(
            initial_polarity(&(Expr::from(10) - &x), &program),
            Polarity::new(false, false)
        );
        assert_eq!(initial_polarity(&y, &program), Polarity::new(true, true));
        // y^2 ∈ [1, 4]
        assert_eq!(
            initial_polarity(&(y.pow(2) - Expr::from(5)), &program),
            Polarity::new(false, true)
        );
        // unknown initial value
        assert_eq!(initial_polarity(&z, &program), Polarity::BOTH);
        assert_eq!(
            initial_polarity(&(Expr::n() + &x), &program),
            Polarity::new(true, false)
        );
    }

    #[test]
    fn test_initial_polarity_zero_corner() {
        let program =
            parse_program("x = 0 @ 1/2; -1\nwhile x > 0:\n    x = x + 1\nend\n").unwrap();
        let x = Expr::var("x");
        assert_eq!(initial_polarity(&x, &program), Polarity::new(false, true));
        assert_eq!(initial_polarity(&-&x, &program), Polarity::new(true, false));
        // x^2 ∈ [0, 1]
        assert_eq!(initial_polarity(&x.pow(2), &program), Polarity::new(true, false));
        assert_eq!(initial_polarity(&(Expr::from(0) * &x), &program), Polarity::new(false, false));
    }
}
