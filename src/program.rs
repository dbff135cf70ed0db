//! Prob-solvable loops.
//!
//! A [`Program`] is a loop
//!
//! ```text
//! <initializations>
//! while <guard> > 0:
//!     <updates>
//! ```
//!
//! whose updates are either finite probabilistic choices between polynomials or draws from a
//! [`RandomVar`]. Programs are only built through [`ProgramBuilder`], which checks that every
//! update is prob-solvable: a variable may depend on itself only linearly with a numeric
//! coefficient, and on other variables only if they are updated before it.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::error::{Error, Result};
use crate::expr::{binomial, int, rational_pow, Expr, Monomial, Rational, Sign};
use crate::symbol::Symbol;

/// Endpoint of an interval over the extended rationals.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    NegInf,
    Finite(Rational),
    PosInf,
}

impl Endpoint {
    pub fn sign(&self) -> Sign {
        match self {
            Endpoint::NegInf => Sign::Negative,
            Endpoint::Finite(value) => Sign::of(value),
            Endpoint::PosInf => Sign::Positive,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Endpoint::Finite(_))
    }

    pub fn pow(&self, exp: u32) -> Endpoint {
        match self {
            Endpoint::Finite(value) => Endpoint::Finite(rational_pow(value, exp)),
            _ if exp == 0 => Endpoint::Finite(Rational::one()),
            Endpoint::PosInf => Endpoint::PosInf,
            Endpoint::NegInf if exp % 2 == 0 => Endpoint::PosInf,
            Endpoint::NegInf => Endpoint::NegInf,
        }
    }

    pub fn as_finite(&self) -> Option<&Rational> {
        match self {
            Endpoint::Finite(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Rational> for Endpoint {
    fn from(value: Rational) -> Self {
        Endpoint::Finite(value)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::NegInf => write!(f, "-oo"),
            Endpoint::Finite(value) => write!(f, "{}", value),
            Endpoint::PosInf => write!(f, "oo"),
        }
    }
}

/// If `x ∈ [low, high]`, returns an interval containing `x^power`.
pub fn interval_to_power(low: &Endpoint, high: &Endpoint, power: u32) -> (Endpoint, Endpoint) {
    let mut l = low.pow(power);
    let mut h = high.pow(power);
    if power % 2 == 0 {
        if high.sign() == Sign::Negative {
            std::mem::swap(&mut l, &mut h);
        } else if low.sign() == Sign::Negative {
            h = h.max(l);
            l = Endpoint::Finite(Rational::zero());
        }
    }
    (l, h)
}

/// Distribution of a variable drawn afresh in every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RandomVar {
    Uniform { low: Rational, high: Rational },
    Bernoulli { p: Rational },
    Gauss { mean: Rational, variance: Rational },
    Laplace { location: Rational, scale: Rational },
    Exponential { rate: Rational },
    Beta { alpha: Rational, beta: Rational },
    /// Number of trials up to and including the first success, supported on `{1, 2, …}`.
    Geometric { p: Rational },
    /// An unspecified value, whose moments are the powers of the given constant.
    /// Only used for initial values.
    Unknown(Symbol),
}

impl RandomVar {
    /// Creates a distribution from its name and parameters.
    pub fn from_name(name: &str, params: &[Rational]) -> std::result::Result<Self, String> {
        let arity = |n: usize| {
            if params.len() == n {
                Ok(())
            } else {
                Err(format!(
                    "`{}` takes {} parameter(s), got {}",
                    name,
                    n,
                    params.len()
                ))
            }
        };
        let rv = match name {
            "uniform" => {
                arity(2)?;
                RandomVar::Uniform {
                    low: params[0].clone(),
                    high: params[1].clone(),
                }
            }
            "bernoulli" => {
                arity(1)?;
                RandomVar::Bernoulli {
                    p: params[0].clone(),
                }
            }
            "gauss" | "normal" => {
                arity(2)?;
                RandomVar::Gauss {
                    mean: params[0].clone(),
                    variance: params[1].clone(),
                }
            }
            "laplace" => {
                arity(2)?;
                RandomVar::Laplace {
                    location: params[0].clone(),
                    scale: params[1].clone(),
                }
            }
            "exponential" => {
                arity(1)?;
                RandomVar::Exponential {
                    rate: params[0].clone(),
                }
            }
            "beta" => {
                arity(2)?;
                RandomVar::Beta {
                    alpha: params[0].clone(),
                    beta: params[1].clone(),
                }
            }
            "geometric" => {
                arity(1)?;
                RandomVar::Geometric {
                    p: params[0].clone(),
                }
            }
            _ => return Err(format!("unknown distribution `{}`", name)),
        };
        rv.validate()?;
        Ok(rv)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let zero = Rational::zero();
        let one = Rational::one();
        match self {
            RandomVar::Uniform { low, high } if low > high => {
                Err(format!("empty interval [{}, {}]", low, high))
            }
            RandomVar::Bernoulli { p } if *p < zero || *p > one => {
                Err(format!("probability {} outside of [0, 1]", p))
            }
            RandomVar::Geometric { p } if *p <= zero || *p > one => {
                Err(format!("probability {} outside of (0, 1]", p))
            }
            RandomVar::Gauss { variance, .. } if variance.is_negative() => {
                Err(format!("negative variance {}", variance))
            }
            RandomVar::Laplace { scale, .. } if !scale.is_positive() => {
                Err(format!("non-positive scale {}", scale))
            }
            RandomVar::Exponential { rate } if !rate.is_positive() => {
                Err(format!("non-positive rate {}", rate))
            }
            RandomVar::Beta { alpha, beta } if !alpha.is_positive() || !beta.is_positive() => {
                Err(format!("non-positive shape ({}, {})", alpha, beta))
            }
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RandomVar::Uniform { .. } => "uniform",
            RandomVar::Bernoulli { .. } => "bernoulli",
            RandomVar::Gauss { .. } => "gauss",
            RandomVar::Laplace { .. } => "laplace",
            RandomVar::Exponential { .. } => "exponential",
            RandomVar::Beta { .. } => "beta",
            RandomVar::Geometric { .. } => "geometric",
            RandomVar::Unknown(_) => "unknown",
        }
    }

    /// Interval containing every value of `X^power`.
    pub fn support(&self, power: u32) -> (Endpoint, Endpoint) {
        let zero = || Endpoint::Finite(Rational::zero());
        let one = || Endpoint::Finite(Rational::one());
        let (low, high) = match self {
            RandomVar::Uniform { low, high } => (low.clone().into(), high.clone().into()),
            RandomVar::Bernoulli { .. } | RandomVar::Beta { .. } => (zero(), one()),
            RandomVar::Exponential { .. } => (zero(), Endpoint::PosInf),
            RandomVar::Geometric { .. } => (one(), Endpoint::PosInf),
            RandomVar::Gauss { .. } | RandomVar::Laplace { .. } | RandomVar::Unknown(_) => {
                (Endpoint::NegInf, Endpoint::PosInf)
            }
        };
        interval_to_power(&low, &high, power)
    }

    /// Raw moment `E[X^k]` in closed form.
    pub fn moment(&self, k: u32) -> Expr {
        if k == 0 {
            return Expr::one();
        }
        let value = match self {
            RandomVar::Uniform { low, high } => {
                if low == high {
                    rational_pow(low, k)
                } else {
                    (rational_pow(high, k + 1) - rational_pow(low, k + 1))
                        / (int(k as i64 + 1) * (high - low))
                }
            }
            RandomVar::Bernoulli { p } => p.clone(),
            RandomVar::Gauss { mean, variance } => {
                // Σ_{j even} C(k, j) μ^{k-j} σ^j (j-1)!!
                let mut sum = Rational::zero();
                let mut double_factorial = Rational::one();
                for j in (0..=k).step_by(2) {
                    if j >= 2 {
                        double_factorial *= int(j as i64 - 1);
                    }
                    sum += binomial(k, j)
                        * rational_pow(mean, k - j)
                        * rational_pow(variance, j / 2)
                        * &double_factorial;
                }
                sum
            }
            RandomVar::Laplace { location, scale } => {
                // Σ_{j even} C(k, j) μ^{k-j} j! b^j
                let mut sum = Rational::zero();
                for j in (0..=k).step_by(2) {
                    sum += binomial(k, j)
                        * rational_pow(location, k - j)
                        * factorial(j)
                        * rational_pow(scale, j);
                }
                sum
            }
            RandomVar::Exponential { rate } => factorial(k) / rational_pow(rate, k),
            RandomVar::Beta { alpha, beta } => {
                let mut product = Rational::one();
                for r in 0..k {
                    let r = int(r as i64);
                    product *= (alpha + &r) / (alpha + beta + &r);
                }
                product
            }
            RandomVar::Geometric { p } => {
                // E[X^k] = Σ_i A(k, i) q^i / p^k with Eulerian numbers A(k, i)
                let q = Rational::one() - p;
                let numerator: Rational = eulerian_numbers(k)
                    .iter()
                    .enumerate()
                    .map(|(i, a)| a * rational_pow(&q, i as u32))
                    .sum();
                numerator / rational_pow(p, k)
            }
            RandomVar::Unknown(symbol) => return Expr::symbol(symbol.clone()).pow(k),
        };
        Expr::constant(value)
    }
}

impl fmt::Display for RandomVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = match self {
            RandomVar::Uniform { low, high } => vec![low.to_string(), high.to_string()],
            RandomVar::Bernoulli { p } | RandomVar::Geometric { p } => vec![p.to_string()],
            RandomVar::Gauss { mean, variance } => vec![mean.to_string(), variance.to_string()],
            RandomVar::Laplace { location, scale } => vec![location.to_string(), scale.to_string()],
            RandomVar::Exponential { rate } => vec![rate.to_string()],
            RandomVar::Beta { alpha, beta } => vec![alpha.to_string(), beta.to_string()],
            RandomVar::Unknown(_) => vec![],
        };
        write!(f, "RV({}", self.name())?;
        for p in params {
            write!(f, ", {}", p)?;
        }
        write!(f, ")")
    }
}

fn factorial(k: u32) -> Rational {
    let mut result = BigInt::one();
    for i in 2..=k {
        result *= i;
    }
    Rational::from_integer(result)
}

fn eulerian_numbers(k: u32) -> Vec<Rational> {
    let mut row = vec![BigInt::one()];
    for m in 1..=k {
        let mut next = vec![BigInt::zero(); m as usize];
        for i in 0..m as usize {
            let mut value = BigInt::zero();
            if i < row.len() {
                value += &row[i] * (i + 1);
            }
            if i >= 1 && i - 1 < row.len() {
                value += &row[i - 1] * (m as usize - i);
            }
            next[i] = value;
        }
        row = next;
    }
    row.into_iter().map(Rational::from_integer).collect()
}

/// How a variable is assigned, either by the loop body or initially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Probabilistic choice between expressions; probabilities sum to one.
    Branches(Vec<(Expr, Rational)>),
    Random(RandomVar),
}

impl Update {
    pub fn deterministic(expr: Expr) -> Self {
        Update::Branches(vec![(expr, Rational::one())])
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Update::Random(_))
    }

    pub fn branches(&self) -> Option<&[(Expr, Rational)]> {
        match self {
            Update::Branches(branches) => Some(branches),
            Update::Random(_) => None,
        }
    }

    /// The expression of a single-branch update.
    pub fn single_branch(&self) -> Option<&Expr> {
        match self {
            Update::Branches(branches) if branches.len() == 1 => Some(&branches[0].0),
            _ => None,
        }
    }

    /// Whether this initial value is fixed: a single branch or an unspecified constant.
    pub fn is_fixed_value(&self) -> bool {
        match self {
            Update::Branches(branches) => branches.len() == 1,
            Update::Random(RandomVar::Unknown(_)) => true,
            Update::Random(_) => false,
        }
    }

    /// `E[X^k]` for the assigned value `X`, in terms of the variables on the right-hand side.
    pub fn moment(&self, k: u32) -> Expr {
        match self {
            Update::Branches(branches) => branches
                .iter()
                .map(|(expr, probability)| expr.pow(k).scale(probability))
                .sum(),
            Update::Random(rv) => rv.moment(k),
        }
    }

    /// Interval containing every value of `X^power`, if every branch is a number.
    pub fn support(&self, power: u32) -> Option<(Endpoint, Endpoint)> {
        match self {
            Update::Random(rv) => Some(rv.support(power)),
            Update::Branches(branches) => {
                let values: Option<Vec<Rational>> = branches
                    .iter()
                    .map(|(expr, _)| expr.as_constant().map(|c| rational_pow(&c, power)))
                    .collect();
                let values = values?;
                let low = values.iter().min()?.clone();
                let high = values.iter().max()?.clone();
                Some((Endpoint::Finite(low), Endpoint::Finite(high)))
            }
        }
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Random(rv) => write!(f, "{}", rv),
            Update::Branches(branches) => {
                for (i, (expr, probability)) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    if probability.is_one() {
                        write!(f, "{}", expr)?;
                    } else {
                        write!(f, "{} @ {}", expr, probability)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// A validated prob-solvable loop.
#[derive(Debug, Clone)]
pub struct Program {
    variables: Vec<Symbol>,
    updates: BTreeMap<Symbol, Update>,
    initial_values: BTreeMap<Symbol, Update>,
    ancestors: BTreeMap<Symbol, BTreeSet<Symbol>>,
    dependencies: BTreeMap<Symbol, BTreeSet<Symbol>>,
    probabilistic: BTreeSet<Symbol>,
    loop_guard: Expr,
    contains_rvs: bool,
}

impl Program {
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::new()
    }

    /// Variables in update order.
    pub fn variables(&self) -> &[Symbol] {
        &self.variables
    }

    pub fn update(&self, variable: &Symbol) -> Option<&Update> {
        self.updates.get(variable)
    }

    pub fn initial_value(&self, variable: &Symbol) -> Option<&Update> {
        self.initial_values.get(variable)
    }

    pub fn ancestors(&self, variable: &Symbol) -> Option<&BTreeSet<Symbol>> {
        self.ancestors.get(variable)
    }

    pub fn dependencies(&self, variable: &Symbol) -> Option<&BTreeSet<Symbol>> {
        self.dependencies.get(variable)
    }

    /// Loop guard `G`; the loop runs while `G > 0`.
    pub fn loop_guard(&self) -> &Expr {
        &self.loop_guard
    }

    pub fn contains_rvs(&self) -> bool {
        self.contains_rvs
    }

    pub fn is_variable(&self, symbol: &Symbol) -> bool {
        self.updates.contains_key(symbol)
    }

    /// A variable is probabilistic unless its value in every iteration is a fixed function of `n`.
    pub fn is_probabilistic(&self, variable: &Symbol) -> bool {
        self.probabilistic.contains(variable)
    }

    /// Whether the variable is drawn from a distribution in every iteration.
    pub fn is_random(&self, variable: &Symbol) -> bool {
        self.updates.get(variable).is_some_and(Update::is_random)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for variable in &self.variables {
            if let Some(init) = self.initial_values.get(variable) {
                if !matches!(init, Update::Random(RandomVar::Unknown(_))) {
                    writeln!(f, "{} = {}", variable, init)?;
                }
            }
        }
        writeln!(f, "while {} > 0:", self.loop_guard)?;
        for variable in &self.variables {
            if let Some(update) = self.updates.get(variable) {
                if update.single_branch() != Some(&Expr::symbol(variable.clone())) {
                    writeln!(f, "    {} = {}", variable, update)?;
                }
            }
        }
        write!(f, "end")
    }
}

/// Assembles and validates a [`Program`].
///
/// ```
/// use amber_rs::expr::{ratio, Expr};
/// use amber_rs::program::{Program, Update};
///
/// let x = Expr::var("x");
/// let program = Program::builder()
///     .initial("x", Update::deterministic(Expr::from(10)))
///     .update(
///         "x",
///         Update::Branches(vec![
///             (x.clone() - Expr::one(), ratio(1, 2)),
///             (x.clone() + Expr::one(), ratio(1, 2)),
///         ]),
///     )
///     .guard(x)
///     .build()
///     .unwrap();
/// assert!(program.is_probabilistic(&amber_rs::symbol::Symbol::var("x")));
/// ```
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    initial: Vec<(String, Update)>,
    updates: Vec<(String, Update)>,
    guard: Option<Expr>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial(mut self, name: &str, value: Update) -> Self {
        self.initial.push((name.to_string(), value));
        self
    }

    pub fn update(mut self, name: &str, update: Update) -> Self {
        self.updates.push((name.to_string(), update));
        self
    }

    pub fn guard(mut self, guard: Expr) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn build(self) -> Result<Program> {
        let guard = self.guard.ok_or(Error::MissingLoopGuard)?;

        // Variables that are never updated keep their initial value.
        let mut order: Vec<(Symbol, Update)> = Vec::new();
        for (name, _) in &self.initial {
            if !self.updates.iter().any(|(n, _)| n == name) {
                let v = Symbol::var(name);
                if !order.iter().any(|(s, _)| s == &v) {
                    order.push((v.clone(), Update::deterministic(Expr::symbol(v))));
                }
            }
        }
        for (name, update) in self.updates {
            let v = Symbol::var(&name);
            if order.iter().any(|(s, _)| s == &v) {
                return Err(Error::NotProbSolvable {
                    variable: name,
                    reason: "variable is updated more than once".to_string(),
                });
            }
            order.push((v, update));
        }
        let variables: Vec<Symbol> = order.iter().map(|(v, _)| v.clone()).collect();

        let mut updates = BTreeMap::new();
        for (i, (v, update)) in order.into_iter().enumerate() {
            validate_update(&v, &update, &variables[..i])?;
            updates.insert(v, update);
        }

        let mut initial_values = BTreeMap::new();
        for (name, value) in self.initial {
            let v = Symbol::var(&name);
            if !variables.contains(&v) {
                return Err(Error::UnknownVariable(name));
            }
            validate_initial(&v, &value)?;
            initial_values.insert(v, value);
        }
        for v in &variables {
            initial_values.entry(v.clone()).or_insert_with(|| {
                Update::Random(RandomVar::Unknown(Symbol::real(&format!("{}0", v))))
            });
        }

        for symbol in guard.free_symbols() {
            if symbol.is_n() {
                return Err(Error::NotProbSolvable {
                    variable: "loop guard".to_string(),
                    reason: "the guard depends on the iteration counter".to_string(),
                });
            }
            if symbol.is_var() && !variables.contains(&symbol) {
                return Err(Error::UnknownVariable(symbol.to_string()));
            }
        }

        let mut ancestors: BTreeMap<Symbol, BTreeSet<Symbol>> = BTreeMap::new();
        let mut probabilistic = BTreeSet::new();
        for v in &variables {
            let update = &updates[v];
            let parents: BTreeSet<Symbol> = match update {
                Update::Random(_) => BTreeSet::new(),
                Update::Branches(branches) => branches
                    .iter()
                    .flat_map(|(e, _)| e.free_symbols())
                    .filter(|s| s.is_var())
                    .collect(),
            };
            let mut all = parents.clone();
            for parent in parents.iter().filter(|p| *p != v) {
                if let Some(a) = ancestors.get(parent) {
                    all.extend(a.iter().cloned());
                }
            }
            ancestors.insert(v.clone(), all);

            let uses_probabilistic = parents.iter().any(|p| probabilistic.contains(p));
            let fixed_initial = initial_values[v].is_fixed_value();
            let branching = update.branches().is_some_and(|b| b.len() > 1);
            if update.is_random() || branching || uses_probabilistic || !fixed_initial {
                probabilistic.insert(v.clone());
            }
        }

        let mut dependencies = BTreeMap::new();
        for v in &variables {
            let dependent = variables
                .iter()
                .filter(|w| !ancestors[v].is_disjoint(&ancestors[*w]))
                .cloned()
                .collect();
            dependencies.insert(v.clone(), dependent);
        }

        let contains_rvs = updates.values().any(Update::is_random);

        Ok(Program {
            variables,
            updates,
            initial_values,
            ancestors,
            dependencies,
            probabilistic,
            loop_guard: guard,
            contains_rvs,
        })
    }
}

fn validate_probabilities(variable: &Symbol, branches: &[(Expr, Rational)]) -> Result<()> {
    let mut sum = Rational::zero();
    for (_, probability) in branches {
        if !probability.is_positive() || probability > &Rational::one() {
            return Err(Error::InvalidProbability {
                variable: variable.to_string(),
                probability: probability.clone(),
            });
        }
        sum += probability;
    }
    if !sum.is_one() {
        return Err(Error::ProbabilitySum {
            variable: variable.to_string(),
            sum,
        });
    }
    Ok(())
}

fn validate_update(variable: &Symbol, update: &Update, earlier: &[Symbol]) -> Result<()> {
    let not_solvable = |reason: &str| Error::NotProbSolvable {
        variable: variable.to_string(),
        reason: reason.to_string(),
    };
    let branches = match update {
        Update::Random(RandomVar::Unknown(_)) => {
            return Err(not_solvable("unknown distributions are only allowed as initial values"));
        }
        Update::Random(_) => return Ok(()),
        Update::Branches(branches) => branches,
    };
    validate_probabilities(variable, branches)?;

    for (expr, _) in branches {
        for symbol in expr.free_symbols() {
            if symbol.is_n() {
                return Err(not_solvable("update depends on the iteration counter"));
            }
            if symbol.is_var() && &symbol != variable && !earlier.contains(&symbol) {
                return Err(Error::CircularDependency {
                    variable: variable.to_string(),
                    dependency: symbol.to_string(),
                });
            }
        }
        if expr.degree_in(variable) > 1 {
            return Err(not_solvable("non-linear self-dependency"));
        }
        let coefficient = expr
            .collect_by(|s| s == variable)
            .remove(&Monomial::symbol(variable.clone(), 1))
            .unwrap_or_default();
        if coefficient.as_constant().is_none() {
            return Err(not_solvable("self-dependency with a non-constant coefficient"));
        }
    }
    Ok(())
}

fn validate_initial(variable: &Symbol, value: &Update) -> Result<()> {
    match value {
        Update::Random(_) => Ok(()),
        Update::Branches(branches) => {
            validate_probabilities(variable, branches)?;
            if branches.iter().any(|(e, _)| e.as_constant().is_none()) {
                return Err(Error::NotProbSolvable {
                    variable: variable.to_string(),
                    reason: "initial values must be numbers".to_string(),
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::expr::ratio;

    fn x() -> Expr {
        Expr::var("x")
    }

    fn y() -> Expr {
        Expr::var("y")
    }

    fn walk() -> Update {
        Update::Branches(vec![
            (x() - Expr::one(), ratio(1, 2)),
            (x() + Expr::one(), ratio(1, 2)),
        ])
    }

    #[test]
    fn test_build_random_walk() {
        let program = Program::builder()
            .initial("x", Update::deterministic(Expr::from(10)))
            .update("x", walk())
            .guard(x())
            .build()
            .unwrap();
        let xs = Symbol::var("x");
        assert_eq!(program.variables(), &[xs.clone()]);
        assert!(program.is_probabilistic(&xs));
        assert!(!program.contains_rvs());
        assert_eq!(program.ancestors(&xs).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_initial_value_is_unknown() {
        let program = Program::builder()
            .update("x", Update::deterministic(x() - Expr::one()))
            .guard(x())
            .build()
            .unwrap();
        let xs = Symbol::var("x");
        let init = program.initial_value(&xs).unwrap();
        assert_eq!(init.moment(2), Expr::symbol(Symbol::real("x0")).pow(2));
        assert!(!program.is_probabilistic(&xs));
    }

    #[test]
    fn test_constants_come_first() {
        let program = Program::builder()
            .initial("c", Update::deterministic(Expr::from(3)))
            .update("x", Update::deterministic(x() - Expr::var("c")))
            .guard(x())
            .build()
            .unwrap();
        assert_eq!(program.variables()[0], Symbol::var("c"));
        assert_eq!(
            program.update(&Symbol::var("c")).unwrap().single_branch(),
            Some(&Expr::var("c"))
        );
    }

    #[test]
    fn test_probabilities_must_sum_to_one() {
        let result = Program::builder()
            .update(
                "x",
                Update::Branches(vec![(x(), ratio(1, 2)), (x() + Expr::one(), ratio(1, 3))]),
            )
            .guard(x())
            .build();
        assert!(matches!(result, Err(Error::ProbabilitySum { .. })));

        let result = Program::builder()
            .update("x", Update::Branches(vec![(x(), ratio(3, 2)), (x(), ratio(-1, 2))]))
            .guard(x())
            .build();
        assert!(matches!(result, Err(Error::InvalidProbability { .. })));
    }

    #[test]
    fn test_circular_dependency() {
        let result = Program::builder()
            .update("x", Update::deterministic(x() + y()))
            .update("y", Update::deterministic(y() + x()))
            .guard(x())
            .build();
        assert!(matches!(result, Err(Error::CircularDependency { .. })));
    }

    #[test]
    fn test_non_linear_self_dependency() {
        let result = Program::builder()
            .update("x", Update::deterministic(x().pow(2)))
            .guard(x())
            .build();
        assert!(matches!(result, Err(Error::NotProbSolvable { .. })));

        let result = Program::builder()
            .update("y", Update::deterministic(y()))
            .update("x", Update::deterministic(x() * y()))
            .guard(x())
            .build();
        assert!(matches!(result, Err(Error::NotProbSolvable { .. })));
    }

    #[test]
    fn test_unknown_variable_and_missing_guard() {
        let result = Program::builder()
            .update("x", Update::deterministic(x()))
            .guard(y())
            .build();
        assert!(matches!(result, Err(Error::UnknownVariable(_))));

        let result = Program::builder()
            .update("x", Update::deterministic(x()))
            .build();
        assert!(matches!(result, Err(Error::MissingLoopGuard)));
    }

    #[test]
    fn test_probabilistic_propagates() {
        let program = Program::builder()
            .update("y", Update::Random(RandomVar::Uniform { low: int(0), high: int(1) }))
            .update("x", Update::deterministic(x() + y()))
            .update("z", Update::deterministic(Expr::var("z") + Expr::one()))
            .guard(x())
            .build()
            .unwrap();
        assert!(program.is_probabilistic(&Symbol::var("x")));
        assert!(program.is_probabilistic(&Symbol::var("y")));
        assert!(!program.is_probabilistic(&Symbol::var("z")));
        assert!(program.contains_rvs());
        assert!(program.ancestors(&Symbol::var("y")).unwrap().is_empty());
    }

    #[test]
    fn test_random_initial_value_is_probabilistic() {
        let program = Program::builder()
            .initial(
                "x",
                Update::Branches(vec![(Expr::from(1), ratio(1, 2)), (Expr::from(2), ratio(1, 2))]),
            )
            .update("x", Update::deterministic(x() - Expr::one()))
            .guard(x())
            .build()
            .unwrap();
        assert!(program.is_probabilistic(&Symbol::var("x")));
    }

    #[test]
    fn test_moments() {
        let uniform = RandomVar::Uniform { low: int(0), high: int(2) };
        assert_eq!(uniform.moment(1), Expr::from(1));
        assert_eq!(uniform.moment(2), Expr::constant(ratio(4, 3)));

        let gauss = RandomVar::Gauss { mean: int(1), variance: int(2) };
        assert_eq!(gauss.moment(2), Expr::from(3));
        assert_eq!(gauss.moment(4), Expr::from(1 + 6 * 2 + 3 * 4));

        let laplace = RandomVar::Laplace { location: int(0), scale: int(1) };
        assert_eq!(laplace.moment(2), Expr::from(2));
        assert_eq!(laplace.moment(3), Expr::zero());

        let exponential = RandomVar::Exponential { rate: int(2) };
        assert_eq!(exponential.moment(2), Expr::constant(ratio(1, 2)));

        let beta = RandomVar::Beta { alpha: int(1), beta: int(1) };
        assert_eq!(beta.moment(2), Expr::constant(ratio(1, 3)));

        let geometric = RandomVar::Geometric { p: ratio(1, 2) };
        assert_eq!(geometric.moment(1), Expr::from(2));
        assert_eq!(geometric.moment(2), Expr::from(6));
        assert_eq!(RandomVar::Geometric { p: int(1) }.moment(3), Expr::from(1));
    }

    #[test]
    fn test_supports() {
        let uniform = RandomVar::Uniform { low: int(-2), high: int(1) };
        assert_eq!(
            uniform.support(1),
            (Endpoint::Finite(int(-2)), Endpoint::Finite(int(1)))
        );
        assert_eq!(
            uniform.support(2),
            (Endpoint::Finite(int(0)), Endpoint::Finite(int(4)))
        );
        let gauss = RandomVar::Gauss { mean: int(0), variance: int(1) };
        assert_eq!(gauss.support(2), (Endpoint::Finite(int(0)), Endpoint::PosInf));
        assert_eq!(gauss.support(3), (Endpoint::NegInf, Endpoint::PosInf));
        let negative = interval_to_power(&Endpoint::Finite(int(-3)), &Endpoint::Finite(int(-1)), 2);
        assert_eq!(negative, (Endpoint::Finite(int(1)), Endpoint::Finite(int(9))));
    }

    #[test]
    fn test_from_name() {
        assert!(RandomVar::from_name("uniform", &[int(0), int(1)]).is_ok());
        assert!(RandomVar::from_name("uniform", &[int(2), int(1)]).is_err());
        assert!(RandomVar::from_name("bernoulli", &[int(2)]).is_err());
        assert!(RandomVar::from_name("poisson", &[int(2)]).is_err());
        assert!(RandomVar::from_name("gauss", &[int(0)]).is_err());
    }

    #[test]
    fn test_display() {
        let program = Program::builder()
            .initial("x", Update::deterministic(Expr::from(10)))
            .update("x", walk())
            .guard(x())
            .build()
            .unwrap();
        assert_eq!(
            program.to_string(),
            "x = 10\nwhile x > 0:\n    x = x - 1 @ 1/2; x + 1 @ 1/2\nend"
        );
    }
}
