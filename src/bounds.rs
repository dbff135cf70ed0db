//! Asymptotic bounds of polynomial expressions over program variables.
//!
//! The bounds of an expression are assembled from the bounds of its monomials. Bounds of a
//! monomial are found, in this order, by
//!
//! 1. separating factors drawn from a random variable, whose support is a fixed interval;
//! 2. substituting closed forms, if every variable is deterministic;
//! 3. reducing `m^d` to `m` for an odd `d`, since odd powers are monotone;
//! 4. bounding the recurrence `m(n) = c·m(n-1) + inhom(n-1)` taken by every branch.
//!
//! All bounds hold for sufficiently large `n` only, and up to the positive constants introduced
//! by [`simplify_asymptotically`].
use std::cell::OnceCell;
use std::fmt;

use log::{debug, trace};
use num_traits::{One, Signed, Zero};

use crate::analysis::Analysis;
use crate::asymptotics::{dominated, dominating, eventual_sign, limit_at, simplify_asymptotically, Limit};
use crate::cases::{initial_polarity, Polarity};
use crate::error::{Error, Result};
use crate::expr::{Expr, Monomial, Rational, Sign};
use crate::program::Endpoint;
use crate::recurrence;
use crate::roots::polarity_in_n;
use crate::symbol::Symbol;

/// Eventual envelope `lower(n) ≤ expression(n) ≤ upper(n)`.
#[derive(Debug, Clone)]
pub struct Bounds {
    pub expression: Expr,
    pub lower: Expr,
    pub upper: Expr,
    pub maybe_positive: bool,
    pub maybe_negative: bool,
    absolute_upper: OnceCell<Expr>,
}

impl Bounds {
    pub fn new(expression: Expr, lower: Expr, upper: Expr, polarity: Polarity) -> Self {
        Self {
            expression,
            lower,
            upper,
            maybe_positive: polarity.maybe_positive,
            maybe_negative: polarity.maybe_negative,
            absolute_upper: OnceCell::new(),
        }
    }

    pub fn polarity(&self) -> Polarity {
        Polarity::new(self.maybe_positive, self.maybe_negative)
    }

    /// Eventual upper bound of `|expression(n)|`.
    pub fn absolute_upper(&self) -> Result<Expr> {
        if let Some(value) = self.absolute_upper.get() {
            return Ok(value.clone());
        }
        let value = dominating(&[self.upper.clone(), -&self.lower])?;
        Ok(self.absolute_upper.get_or_init(|| value).clone())
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in [{}, {}]", self.expression, self.lower, self.upper)
    }
}

/// Replaces the sign of an undetermined dominant coefficient by both possible signs.
///
/// If the limit of `expr` is `∞·sign(c)`, some constant `s` occurring linearly in `c` is solved
/// for `c = e` and `c = -e` with a fresh positive `e`, giving two candidates whose limits are
/// `+∞` and `-∞`.
pub fn split_on_signums(expr: &Expr) -> Result<Vec<Expr>> {
    let mut result = Vec::new();
    let mut pending = vec![expr.clone()];
    while let Some(candidate) = pending.pop() {
        let Limit::SignedInf(c) = limit_at(&candidate) else {
            result.push(candidate);
            continue;
        };
        let constants = c.free_symbols();
        let solvable = constants
            .iter()
            .filter(|s| s.is_constant() && !s.is_positive())
            .chain(constants.iter().filter(|s| s.is_positive()))
            .find_map(|s| c.linear_in(s).map(|(a, rest)| (s.clone(), a, rest)));
        let Some((symbol, a, rest)) = solvable else {
            return Err(Error::internal(format!(
                "cannot eliminate sign({}) from `{}`",
                c, candidate
            )));
        };
        let e = Expr::symbol(Symbol::fresh_positive("e"));
        trace!("Splitting `{}` on sign({}) with {} = ±{}", candidate, c, symbol, e);
        for target in [e.clone(), -e] {
            let value = (target - &rest).scale(&a.recip());
            pending.push(candidate.subs(&symbol, &value));
        }
    }
    Ok(result)
}

fn starting_values(polarity: Polarity) -> Vec<Expr> {
    let mut values = Vec::new();
    if polarity.maybe_positive {
        values.push(Expr::symbol(Symbol::fresh_positive("d")));
    }
    if polarity.maybe_negative {
        values.push(-Expr::symbol(Symbol::fresh_positive("d")));
    }
    if values.is_empty() {
        values.push(Expr::zero());
    }
    values
}

fn bound_candidates(
    coefficients: &[Rational],
    inhom: &Expr,
    starting_values: &[Expr],
) -> Result<Vec<Expr>> {
    let mut candidates = Vec::new();
    for c in coefficients {
        for start in starting_values {
            let solution = recurrence::solve(c, inhom, start);
            candidates.extend(split_on_signums(&solution)?);
        }
    }
    Ok(candidates)
}

/// Interval containing the product of the random factors of a monomial.
fn random_factor_support(
    analysis: &Analysis<'_>,
    random: &Monomial,
) -> Result<(Rational, Rational)> {
    let mut low = Rational::one();
    let mut high = Rational::one();
    for (variable, &power) in random.powers() {
        let support = analysis
            .program
            .update(variable)
            .and_then(|update| update.support(power));
        let Some((Endpoint::Finite(l), Endpoint::Finite(h))) = support else {
            return Err(Error::unsupported(format!(
                "`{}^{}` has unbounded support",
                variable, power
            )));
        };
        let corners = [&low * &l, &low * &h, &high * &l, &high * &h];
        low = corners.iter().min().cloned().unwrap_or_else(Rational::zero);
        high = corners.iter().max().cloned().unwrap_or_else(Rational::zero);
    }
    Ok((low, high))
}

impl Analysis<'_> {
    /// Computes bounds of a polynomial over program variables.
    ///
    /// Coefficients may depend on `n`; the eventual sign of a coefficient decides whether the
    /// lower or the upper bound of its monomial enters the upper bound of the expression.
    pub fn bounds_of_expr(&mut self, expr: &Expr) -> Result<Bounds> {
        let collected = expr.collect_by(Symbol::is_var);
        let constant = collected.get(&Monomial::one()).cloned().unwrap_or_else(Expr::zero);
        let (pos, neg) = polarity_in_n(&constant);
        let mut polarity = Polarity::new(pos, neg);
        let mut upper = constant.clone();
        let mut lower = constant;

        for (monomial, coefficient) in &collected {
            if monomial.is_one() {
                continue;
            }
            let bounds = self.bounds_of_monom(monomial)?;
            match eventual_sign(coefficient) {
                Some(Sign::Positive) => {
                    upper = upper + coefficient * &bounds.upper;
                    lower = lower + coefficient * &bounds.lower;
                    polarity = polarity.or(bounds.polarity());
                }
                Some(Sign::Negative) => {
                    upper = upper + coefficient * &bounds.lower;
                    lower = lower + coefficient * &bounds.upper;
                    polarity = polarity.or(bounds.polarity().flip());
                }
                Some(Sign::Zero) => {}
                None => {
                    return Err(Error::unsupported(format!(
                        "sign of the coefficient `{}` of `{}` is unknown",
                        coefficient, monomial
                    )))
                }
            }
        }

        // An exact value stays exact unless its sign at infinity needs splitting.
        if upper == lower && !matches!(limit_at(&upper), Limit::SignedInf(_)) {
            return Ok(Bounds::new(expr.clone(), lower, upper, polarity));
        }
        let upper = dominating(&split_on_signums(&upper)?)?;
        let lower = dominated(&split_on_signums(&lower)?)?;
        Ok(Bounds::new(expr.clone(), lower, upper, polarity))
    }

    /// Computes bounds of a single monomial, memoized.
    pub fn bounds_of_monom(&mut self, monom: &Monomial) -> Result<Bounds> {
        if let Some(bounds) = self.bounds.get(monom) {
            return Ok(bounds.clone());
        }
        if !self.bounds.begin(monom) {
            return Err(Error::internal(format!(
                "bounds of `{}` depend on themselves",
                monom
            )));
        }
        debug!("Computing bounds for {}", monom);
        match self.compute_bounds_of_monom(monom) {
            Ok(bounds) => {
                debug!("Found bounds for {}: [{}, {}]", monom, bounds.lower, bounds.upper);
                self.bounds.insert(monom.clone(), bounds.clone());
                Ok(bounds)
            }
            Err(e) => {
                self.bounds.abandon(monom);
                Err(e)
            }
        }
    }

    fn compute_bounds_of_monom(&mut self, monom: &Monomial) -> Result<Bounds> {
        let program = self.program;
        let (random, rest) = monom.split(|s| program.is_random(s));
        if !random.is_one() {
            return self.bounds_with_random_factors(monom, &random, &rest);
        }
        if monom.symbols().all(|s| !program.is_probabilistic(s)) {
            return self.bounds_of_deterministic_monom(monom);
        }
        let gcd = monom.power_gcd();
        let odd = gcd >> gcd.trailing_zeros();
        if odd > 1 {
            return self.bounds_of_monom_power(monom, odd);
        }
        self.bounds_of_monom_recurrence(monom)
    }

    fn bounds_with_random_factors(
        &mut self,
        monom: &Monomial,
        random: &Monomial,
        rest: &Monomial,
    ) -> Result<Bounds> {
        let (low, high) = random_factor_support(self, random)?;
        let expression = Expr::term(monom.clone(), Rational::one());
        let factor = Polarity::new(high.is_positive(), low.is_negative());
        if rest.is_one() {
            return Ok(Bounds::new(
                expression,
                Expr::constant(low),
                Expr::constant(high),
                factor,
            ));
        }

        let bounds = self.bounds_of_monom(rest)?;
        let candidates = [
            bounds.lower.scale(&low),
            bounds.lower.scale(&high),
            bounds.upper.scale(&low),
            bounds.upper.scale(&high),
        ];
        let other = bounds.polarity();
        let polarity = Polarity::new(
            (factor.maybe_positive && other.maybe_positive)
                || (factor.maybe_negative && other.maybe_negative),
            (factor.maybe_positive && other.maybe_negative)
                || (factor.maybe_negative && other.maybe_positive),
        );
        Ok(Bounds::new(
            expression,
            dominated(&candidates)?,
            dominating(&candidates)?,
            polarity,
        ))
    }

    fn bounds_of_deterministic_monom(&mut self, monom: &Monomial) -> Result<Bounds> {
        let expression = Expr::term(monom.clone(), Rational::one());
        let value = self.moments.substitute_deterministic(&expression)?;
        let (pos, neg) = polarity_in_n(&value);
        let bound = simplify_asymptotically(&value);
        Ok(Bounds::new(
            expression,
            bound.clone(),
            bound,
            Polarity::new(pos, neg),
        ))
    }

    /// Bounds of `base^power` for odd `power` from the bounds of `base`.
    fn bounds_of_monom_power(&mut self, monom: &Monomial, power: u32) -> Result<Bounds> {
        let base = monom.root(power);
        let bounds = self.bounds_of_monom(&base)?;
        Ok(Bounds::new(
            Expr::term(monom.clone(), Rational::one()),
            simplify_asymptotically(&bounds.lower.pow(power)),
            simplify_asymptotically(&bounds.upper.pow(power)),
            bounds.polarity(),
        ))
    }

    fn bounds_of_monom_recurrence(&mut self, monom: &Monomial) -> Result<Bounds> {
        let expression = Expr::term(monom.clone(), Rational::one());
        let branches = self.branches_of_monom(monom)?;
        let mut inhom_bounds = Vec::with_capacity(branches.len());
        for branch in &branches {
            inhom_bounds.push(self.bounds_of_expr(&branch.inhom_part)?);
        }

        let constants = branches.iter().map(|b| &b.recurrence_constant);
        let (Some(min_rec), Some(max_rec)) = (constants.clone().min(), constants.max()) else {
            return Err(Error::internal(format!("`{}` has no branches", monom)));
        };

        if min_rec.is_negative() {
            // |m(n)| ≤ max|c|·|m(n-1)| + |inhom(n-1)|
            let scale = min_rec.abs().max(max_rec.abs());
            let mut parts = Vec::with_capacity(inhom_bounds.len());
            for bounds in &inhom_bounds {
                parts.push(bounds.absolute_upper()?.shift(-1));
            }
            let inhom = dominating(&parts)?;
            let start = starting_values(Polarity::new(true, false));
            let envelope = dominating(&bound_candidates(&[scale], &inhom, &start)?)?;
            return Ok(Bounds::new(expression, -&envelope, envelope, Polarity::BOTH));
        }

        let all_even = monom.powers().values().all(|p| p % 2 == 0);
        let polarity = if all_even {
            Polarity::new(true, false)
        } else {
            inhom_bounds
                .iter()
                .fold(initial_polarity(&expression, self.program), |acc, b| {
                    acc.or(b.polarity())
                })
        };

        let uppers: Vec<Expr> = inhom_bounds.iter().map(|b| b.upper.shift(-1)).collect();
        let lowers: Vec<Expr> = inhom_bounds.iter().map(|b| b.lower.shift(-1)).collect();
        let max_upper = dominating(&uppers)?;
        let min_lower = dominated(&lowers)?;

        let mut coefficients = vec![min_rec.clone()];
        if max_rec != min_rec {
            coefficients.push(max_rec.clone());
        }
        let start = starting_values(polarity);
        let mut upper = dominating(&bound_candidates(&coefficients, &max_upper, &start)?)?;
        let mut lower = dominated(&bound_candidates(&coefficients, &min_lower, &start)?)?;

        if !polarity.maybe_positive {
            upper = dominated(&[upper, Expr::zero()])?;
        }
        if !polarity.maybe_negative {
            lower = dominating(&[lower, Expr::zero()])?;
        }
        Ok(Bounds::new(expression, lower, upper, polarity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::asymptotics::growth_order;
    use crate::expr::int;
    use crate::parser::parse_program;

    fn bounds_of(source: &str, expr: &Expr) -> Bounds {
        let program = parse_program(source).unwrap();
        let mut analysis = Analysis::new(&program);
        analysis.bounds_of_expr(expr).unwrap()
    }

    #[test]
    fn test_constant_bounds() {
        let source = "while x > 0:\n    x = x - 1 @ 1/2; x + 1\nend\n";
        let bounds = bounds_of(source, &Expr::from(-1));
        assert_eq!(bounds.lower, Expr::from(-1));
        assert_eq!(bounds.upper, Expr::from(-1));
        assert_eq!(bounds.polarity(), Polarity::new(false, true));
        assert_eq!(bounds.absolute_upper().unwrap(), Expr::from(1));

        let bounds = bounds_of(source, &Expr::zero());
        assert!(bounds.upper.is_zero());
        assert_eq!(bounds.polarity(), Polarity::new(false, false));
    }

    #[test]
    fn test_increasing_walk() {
        let source = "x = 0\nwhile x < 100:\n    x = x + 1 @ 1/2; x + 2\nend\n";
        let bounds = bounds_of(source, &Expr::var("x"));
        assert_eq!(growth_order(&bounds.upper), Expr::n());
        assert_eq!(growth_order(&bounds.lower), Expr::n());
        assert_eq!(eventual_sign(&bounds.upper), Some(Sign::Positive));
        assert_eq!(eventual_sign(&bounds.lower), Some(Sign::Positive));
        assert_eq!(bounds.polarity(), Polarity::new(true, false));
    }

    #[test]
    fn test_random_variable_factor() {
        let source = "x = 0\nwhile x < 100:\n    y = RV(uniform, -1, 2)\n    x = x + y\nend\n";
        let program = parse_program(source).unwrap();
        let mut analysis = Analysis::new(&program);

        let y = analysis.bounds_of_expr(&Expr::var("y")).unwrap();
        assert_eq!(y.lower, Expr::from(-1));
        assert_eq!(y.upper, Expr::from(2));
        assert_eq!(y.polarity(), Polarity::BOTH);

        let x = analysis.bounds_of_expr(&Expr::var("x")).unwrap();
        assert_eq!(growth_order(&x.upper), Expr::n());
        assert_eq!(eventual_sign(&x.upper), Some(Sign::Positive));
        assert_eq!(eventual_sign(&x.lower), Some(Sign::Negative));
        assert_eq!(x.polarity(), Polarity::BOTH);
        assert!(analysis.bound_store().len() >= 2);
    }

    #[test]
    fn test_unbounded_random_variable() {
        let source = "x = 0\nwhile x < 100:\n    y = RV(gauss, 0, 1)\n    x = x + y\nend\n";
        let program = parse_program(source).unwrap();
        let mut analysis = Analysis::new(&program);
        let error = analysis.bounds_of_expr(&Expr::var("y")).unwrap_err();
        assert!(error.is_incompleteness());
    }

    #[test]
    fn test_deterministic_monomial() {
        let source = "y = 0\nwhile x > y:\n    y = y + 2\n    x = x + 1 @ 1/2; x - 1\nend\n";
        let bounds = bounds_of(source, &Expr::var("y"));
        assert_eq!(bounds.lower, bounds.upper);
        assert_eq!(growth_order(&bounds.upper), Expr::n());
        assert_eq!(bounds.polarity(), Polarity::new(true, false));

        let shifted = bounds_of(source, &(Expr::var("y") + Expr::from(3)));
        assert_eq!(shifted.lower, shifted.upper);
    }

    #[test]
    fn test_unknown_initial_value() {
        let source = "while x > y:\n    y = 2*y\n    x = x + 1 @ 1/2; x - 1\nend\n";
        let bounds = bounds_of(source, &Expr::var("y"));
        assert_ne!(bounds.lower, bounds.upper);
        assert_eq!(eventual_sign(&bounds.upper), Some(Sign::Positive));
        assert_eq!(eventual_sign(&bounds.lower), Some(Sign::Negative));
        assert_eq!(growth_order(&bounds.upper), Expr::exponential(int(2)));
    }

    #[test]
    fn test_odd_power() {
        let source = "x = 0\nwhile x < 100:\n    x = x + 1 @ 1/2; x + 2\nend\n";
        let bounds = bounds_of(source, &Expr::var("x").pow(3));
        assert_eq!(growth_order(&bounds.upper), Expr::n().pow(3));
        assert_eq!(eventual_sign(&bounds.lower), Some(Sign::Positive));
    }

    #[test]
    fn test_negative_recurrence_constant() {
        let source = "x = 1\nwhile x > 0:\n    x = 1 - x @ 1/2; x\nend\n";
        let bounds = bounds_of(source, &Expr::var("x"));
        assert_eq!(bounds.polarity(), Polarity::BOTH);
        assert_eq!(growth_order(&bounds.upper), Expr::n());
        assert_eq!(eventual_sign(&bounds.lower), Some(Sign::Negative));
    }

    #[test]
    fn test_split_on_signums() {
        let x0 = Expr::symbol(Symbol::real("x0"));
        let expr = &x0 * Expr::n() + Expr::from(1);
        let candidates = split_on_signums(&expr).unwrap();
        assert_eq!(candidates.len(), 2);
        let limits: Vec<Limit> = candidates.iter().map(limit_at).collect();
        assert!(limits.contains(&Limit::PosInf));
        assert!(limits.contains(&Limit::NegInf));

        let plain = Expr::n().scale(&int(3));
        assert_eq!(split_on_signums(&plain).unwrap(), vec![plain]);
    }
}
