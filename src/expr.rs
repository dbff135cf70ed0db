//! Exact exponential polynomials.
//!
//! Every expression handled by the analysis is kept in a canonical, fully expanded form
//!
//! ```text
//! Σ c · s₁^k₁ · … · sₘ^kₘ · λ^n
//! ```
//!
//! with rational coefficients `c`, symbols `sᵢ` (including the iteration counter `n`) and a
//! nonzero rational base `λ` for the exponential factor in `n`. Structurally equal expressions
//! are equal as values, so [`Expr`] doubles as the memoization key of the analysis.
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::symbol::Symbol;

pub type Rational = BigRational;

pub fn int(value: i64) -> Rational {
    Rational::from_integer(BigInt::from(value))
}

pub fn ratio(numer: i64, denom: i64) -> Rational {
    Rational::new(BigInt::from(numer), BigInt::from(denom))
}

/// Computes `base^exp` by repeated squaring.
pub fn rational_pow(base: &Rational, exp: u32) -> Rational {
    let mut result = Rational::one();
    let mut square = base.clone();
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = &result * &square;
        }
        exp >>= 1;
        if exp > 0 {
            square = &square * &square;
        }
    }
    result
}

/// Computes `base^exp` for a possibly negative exponent. The base must be nonzero if `exp < 0`.
pub fn rational_powi(base: &Rational, exp: i64) -> Rational {
    let magnitude = exp.unsigned_abs() as u32;
    if exp >= 0 {
        rational_pow(base, magnitude)
    } else {
        rational_pow(&base.recip(), magnitude)
    }
}

pub fn binomial(n: u32, k: u32) -> Rational {
    if k > n {
        return Rational::zero();
    }
    let k = k.min(n - k);
    let mut result = BigInt::one();
    for i in 0..k {
        result = result * BigInt::from(n - i) / BigInt::from(i + 1);
    }
    Rational::from_integer(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

impl Sign {
    pub fn of(value: &Rational) -> Self {
        if value.is_positive() {
            Sign::Positive
        } else if value.is_negative() {
            Sign::Negative
        } else {
            Sign::Zero
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Sign::Negative => Sign::Positive,
            Sign::Zero => Sign::Zero,
            Sign::Positive => Sign::Negative,
        }
    }
}

/// Product of symbol powers times an exponential `λ^n`.
///
/// Zero powers are never stored, and `base` is never zero (a base of one means "no exponential").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Monomial {
    powers: BTreeMap<Symbol, u32>,
    base: Rational,
}

impl Monomial {
    pub fn one() -> Self {
        Self {
            powers: BTreeMap::new(),
            base: Rational::one(),
        }
    }

    pub fn symbol(symbol: Symbol, power: u32) -> Self {
        let mut powers = BTreeMap::new();
        if power > 0 {
            powers.insert(symbol, power);
        }
        Self {
            powers,
            base: Rational::one(),
        }
    }

    pub fn exponential(base: Rational) -> Self {
        debug_assert!(!base.is_zero(), "exponential base must be nonzero");
        Self {
            powers: BTreeMap::new(),
            base,
        }
    }

    pub fn from_powers(powers: impl IntoIterator<Item = (Symbol, u32)>) -> Self {
        let mut result = Self::one();
        for (symbol, power) in powers {
            if power > 0 {
                *result.powers.entry(symbol).or_insert(0) += power;
            }
        }
        result
    }

    pub fn powers(&self) -> &BTreeMap<Symbol, u32> {
        &self.powers
    }

    pub fn base(&self) -> &Rational {
        &self.base
    }

    pub fn power_of(&self, symbol: &Symbol) -> u32 {
        self.powers.get(symbol).copied().unwrap_or(0)
    }

    pub fn n_degree(&self) -> u32 {
        self.power_of(&Symbol::N)
    }

    pub fn total_degree(&self) -> u32 {
        self.powers.values().sum()
    }

    pub fn is_one(&self) -> bool {
        self.powers.is_empty() && self.base.is_one()
    }

    pub fn is_exponential(&self) -> bool {
        !self.base.is_one()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.powers.keys()
    }

    /// Splits off the power of `symbol`, returning the rest of the monomial and the power.
    pub fn without(&self, symbol: &Symbol) -> (Monomial, u32) {
        let mut rest = self.clone();
        let power = rest.powers.remove(symbol).unwrap_or(0);
        (rest, power)
    }

    /// Splits the monomial into the part over symbols accepted by `keep` and the rest.
    /// The exponential factor always goes to the rest.
    pub fn split(&self, keep: impl Fn(&Symbol) -> bool) -> (Monomial, Monomial) {
        let mut kept = Monomial::one();
        let mut rest = Monomial::exponential(self.base.clone());
        for (symbol, &power) in &self.powers {
            if keep(symbol) {
                kept.powers.insert(symbol.clone(), power);
            } else {
                rest.powers.insert(symbol.clone(), power);
            }
        }
        (kept, rest)
    }

    /// Returns `true` if the monomial is positive for every positive `n` and every
    /// assignment of its symbols.
    pub fn is_positive_definite(&self) -> bool {
        self.base.is_positive() && self.powers.keys().all(|s| s.is_n() || s.is_positive())
    }

    /// Greatest common divisor of all exponents (zero for the unit monomial).
    pub fn power_gcd(&self) -> u32 {
        fn gcd(a: u32, b: u32) -> u32 {
            if b == 0 {
                a
            } else {
                gcd(b, a % b)
            }
        }
        self.powers.values().fold(0, |acc, &p| gcd(acc, p))
    }

    /// Divides all exponents by `d`, which must divide each of them.
    pub fn root(&self, d: u32) -> Monomial {
        Monomial {
            powers: self.powers.iter().map(|(s, &p)| (s.clone(), p / d)).collect(),
            base: self.base.clone(),
        }
    }
}

impl Mul for &Monomial {
    type Output = Monomial;

    fn mul(self, rhs: Self) -> Monomial {
        let mut result = self.clone();
        for (symbol, &power) in &rhs.powers {
            *result.powers.entry(symbol.clone()).or_insert(0) += power;
        }
        result.base = &self.base * &rhs.base;
        result
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut factors = Vec::new();
        for (symbol, &power) in &self.powers {
            if power == 1 {
                factors.push(symbol.to_string());
            } else {
                factors.push(format!("{}**{}", symbol, power));
            }
        }
        if !self.base.is_one() {
            if self.base.is_integer() && self.base.is_positive() {
                factors.push(format!("{}**n", self.base));
            } else {
                factors.push(format!("({})**n", self.base));
            }
        }
        if factors.is_empty() {
            write!(f, "1")
        } else {
            write!(f, "{}", factors.join("*"))
        }
    }
}

/// Canonical exponential polynomial with rational coefficients.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Expr {
    terms: BTreeMap<Monomial, Rational>,
}

impl Expr {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(Rational::one())
    }

    pub fn constant(value: Rational) -> Self {
        Self::term(Monomial::one(), value)
    }

    pub fn symbol(symbol: Symbol) -> Self {
        Self::term(Monomial::symbol(symbol, 1), Rational::one())
    }

    pub fn var(name: &str) -> Self {
        Self::symbol(Symbol::var(name))
    }

    /// The iteration counter `n`.
    pub fn n() -> Self {
        Self::symbol(Symbol::N)
    }

    /// The exponential `base^n`.
    pub fn exponential(base: Rational) -> Self {
        if base.is_zero() {
            return Self::zero();
        }
        Self::term(Monomial::exponential(base), Rational::one())
    }

    pub fn term(monomial: Monomial, coefficient: Rational) -> Self {
        let mut result = Self::zero();
        result.add_term(monomial, coefficient);
        result
    }

    pub fn from_terms(terms: impl IntoIterator<Item = (Monomial, Rational)>) -> Self {
        let mut result = Self::zero();
        for (monomial, coefficient) in terms {
            result.add_term(monomial, coefficient);
        }
        result
    }

    fn add_term(&mut self, monomial: Monomial, coefficient: Rational) {
        if coefficient.is_zero() {
            return;
        }
        match self.terms.entry(monomial) {
            Entry::Vacant(e) => {
                e.insert(coefficient);
            }
            Entry::Occupied(mut e) => {
                let sum = e.get() + coefficient;
                if sum.is_zero() {
                    e.remove();
                } else {
                    *e.get_mut() = sum;
                }
            }
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &Rational)> + '_ {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.as_constant().is_some_and(|c| c.is_one())
    }

    /// Returns the value of a constant expression.
    pub fn as_constant(&self) -> Option<Rational> {
        match self.terms.len() {
            0 => Some(Rational::zero()),
            1 => self
                .terms
                .iter()
                .next()
                .filter(|(m, _)| m.is_one())
                .map(|(_, c)| c.clone()),
            _ => None,
        }
    }

    pub fn constant_part(&self) -> Rational {
        self.coefficient(&Monomial::one())
    }

    pub fn coefficient(&self, monomial: &Monomial) -> Rational {
        self.terms.get(monomial).cloned().unwrap_or_else(Rational::zero)
    }

    pub fn scale(&self, factor: &Rational) -> Expr {
        if factor.is_zero() {
            return Expr::zero();
        }
        Expr {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), c * factor)).collect(),
        }
    }

    pub fn pow(&self, exp: u32) -> Expr {
        let mut result = Expr::one();
        let mut square = self.clone();
        let mut exp = exp;
        while exp > 0 {
            if exp & 1 == 1 {
                result = &result * &square;
            }
            exp >>= 1;
            if exp > 0 {
                square = &square * &square;
            }
        }
        result
    }

    /// Substitutes `value` for `symbol`.
    ///
    /// Substituting for `n` only replaces polynomial occurrences of `n`; exponentials `λ^n` are
    /// kept as they are. Use [`Expr::shift`] or [`Expr::at_n`] to move along the iterations.
    pub fn subs(&self, symbol: &Symbol, value: &Expr) -> Expr {
        if !self.contains_symbol(symbol) {
            return self.clone();
        }
        let mut result = Expr::zero();
        for (monomial, coefficient) in &self.terms {
            let (rest, power) = monomial.without(symbol);
            if power == 0 {
                result.add_term(rest, coefficient.clone());
            } else {
                result = result + Expr::term(rest, coefficient.clone()) * value.pow(power);
            }
        }
        result
    }

    /// Simultaneously substitutes every symbol in `map`.
    pub fn subs_all(&self, map: &BTreeMap<Symbol, Expr>) -> Expr {
        let mut result = Expr::zero();
        for (monomial, coefficient) in &self.terms {
            let mut rest = Monomial::exponential(monomial.base.clone());
            let mut product = Expr::one();
            for (symbol, &power) in &monomial.powers {
                match map.get(symbol) {
                    Some(value) => product = product * value.pow(power),
                    None => {
                        rest.powers.insert(symbol.clone(), power);
                    }
                }
            }
            result = result + Expr::term(rest, coefficient.clone()) * product;
        }
        result
    }

    /// Rewrites `f(n)` as `f(n + k)`.
    pub fn shift(&self, k: i64) -> Expr {
        if k == 0 || !self.depends_on_n() {
            return self.clone();
        }
        let n_plus_k = Expr::n() + Expr::constant(int(k));
        let mut result = Expr::zero();
        for (monomial, coefficient) in &self.terms {
            let (mut rest, degree) = monomial.without(&Symbol::N);
            let factor = rational_powi(&rest.base, k);
            let base = std::mem::replace(&mut rest.base, Rational::one());
            let moved = Expr::term(rest, coefficient * factor) * Expr::exponential(base);
            result = result + moved * n_plus_k.pow(degree);
        }
        result
    }

    /// Evaluates the expression at the iteration `n = m`.
    pub fn at_n(&self, m: u32) -> Expr {
        let n_value = int(m as i64);
        let mut result = Expr::zero();
        for (monomial, coefficient) in &self.terms {
            let (mut rest, degree) = monomial.without(&Symbol::N);
            let factor = rational_pow(&n_value, degree) * rational_pow(&rest.base, m);
            rest.base = Rational::one();
            result.add_term(rest, coefficient * factor);
        }
        result
    }

    /// Free symbols, including `n` whenever the expression depends on it.
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut result = BTreeSet::new();
        for monomial in self.terms.keys() {
            result.extend(monomial.symbols().cloned());
            if monomial.is_exponential() {
                result.insert(Symbol::N);
            }
        }
        result
    }

    pub fn depends_on_n(&self) -> bool {
        self.terms
            .keys()
            .any(|m| m.is_exponential() || m.powers.contains_key(&Symbol::N))
    }

    pub fn contains_symbol(&self, symbol: &Symbol) -> bool {
        if symbol.is_n() {
            return self.depends_on_n();
        }
        self.terms.keys().any(|m| m.powers.contains_key(symbol))
    }

    pub fn contains_vars(&self) -> bool {
        self.terms.keys().any(|m| m.symbols().any(|s| s.is_var()))
    }

    pub fn degree_in(&self, symbol: &Symbol) -> u32 {
        self.terms
            .keys()
            .map(|m| m.power_of(symbol))
            .max()
            .unwrap_or(0)
    }

    /// Groups terms by their part over the symbols accepted by `keep`.
    ///
    /// This is the polynomial view of the expression over those symbols: every key is a
    /// monomial over kept symbols only, and its value is the coefficient expression.
    pub fn collect_by(&self, keep: impl Fn(&Symbol) -> bool) -> BTreeMap<Monomial, Expr> {
        let mut result: BTreeMap<Monomial, Expr> = BTreeMap::new();
        for (monomial, coefficient) in &self.terms {
            let (kept, rest) = monomial.split(&keep);
            result
                .entry(kept)
                .or_default()
                .add_term(rest, coefficient.clone());
        }
        result.retain(|_, c| !c.is_zero());
        result
    }

    /// If the expression is `a·symbol + rest` with a rational `a ≠ 0` and `rest` free of
    /// `symbol`, returns `(a, rest)`.
    pub fn linear_in(&self, symbol: &Symbol) -> Option<(Rational, Expr)> {
        let unit = Monomial::symbol(symbol.clone(), 1);
        let mut coefficient = None;
        let mut rest = Expr::zero();
        for (monomial, c) in &self.terms {
            if monomial == &unit {
                coefficient = Some(c.clone());
            } else if monomial.powers.contains_key(symbol) {
                return None;
            } else {
                rest.add_term(monomial.clone(), c.clone());
            }
        }
        coefficient.map(|c| (c, rest))
    }

    /// Sign of an expression free of `n`, if it can be determined for every value of its
    /// constants.
    ///
    /// The sign is known for numbers, and for sums of terms sharing one sign whose symbols are
    /// all positive constants.
    pub fn sign(&self) -> Option<Sign> {
        if let Some(c) = self.as_constant() {
            return Some(Sign::of(&c));
        }
        if self.depends_on_n() {
            return None;
        }
        let mut signs = self.terms.iter().map(|(m, c)| {
            if m.symbols().all(|s| s.is_positive()) {
                Some(Sign::of(c))
            } else {
                None
            }
        });
        let first = signs.next().flatten()?;
        if signs.all(|s| s == Some(first)) {
            Some(first)
        } else {
            None
        }
    }

    /// Numerically evaluates the expression, with `lookup` providing the values of all symbols
    /// (including `n`).
    pub fn eval_f64(&self, lookup: impl Fn(&Symbol) -> f64) -> f64 {
        let n = lookup(&Symbol::N);
        let mut total = 0.0;
        for (monomial, coefficient) in &self.terms {
            let mut value = coefficient.to_f64().unwrap_or(f64::NAN);
            for (symbol, &power) in &monomial.powers {
                value *= lookup(symbol).powi(power as i32);
            }
            if monomial.is_exponential() {
                let base = monomial.base.to_f64().unwrap_or(f64::NAN);
                value *= base.powi(n.round() as i32);
            }
            total += value;
        }
        total
    }

    fn display_key(monomial: &Monomial) -> (Rational, u32, u32) {
        (monomial.base.abs(), monomial.n_degree(), monomial.total_degree())
    }
}

impl From<Rational> for Expr {
    fn from(value: Rational) -> Self {
        Expr::constant(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::constant(int(value))
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Expr::symbol(symbol)
    }
}

impl Add for &Expr {
    type Output = Expr;

    fn add(self, rhs: Self) -> Expr {
        let mut result = self.clone();
        for (monomial, coefficient) in &rhs.terms {
            result.add_term(monomial.clone(), coefficient.clone());
        }
        result
    }
}

impl Sub for &Expr {
    type Output = Expr;

    fn sub(self, rhs: Self) -> Expr {
        let mut result = self.clone();
        for (monomial, coefficient) in &rhs.terms {
            result.add_term(monomial.clone(), -coefficient);
        }
        result
    }
}

impl Mul for &Expr {
    type Output = Expr;

    fn mul(self, rhs: Self) -> Expr {
        let mut result = Expr::zero();
        for (m1, c1) in &self.terms {
            for (m2, c2) in &rhs.terms {
                result.add_term(m1 * m2, c1 * c2);
            }
        }
        result
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), -c)).collect(),
        }
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        -&self
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<Expr> for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                (&self).$method(&rhs)
            }
        }

        impl $imp<&Expr> for Expr {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                (&self).$method(rhs)
            }
        }

        impl $imp<Expr> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                self.$method(&rhs)
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);

impl Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Self {
        iter.fold(Expr::zero(), |acc, e| acc + e)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let mut terms: Vec<_> = self.terms.iter().collect();
        terms.sort_by(|(a, _), (b, _)| match Expr::display_key(b).cmp(&Expr::display_key(a)) {
            Ordering::Equal => a.cmp(b),
            other => other,
        });
        for (i, (monomial, coefficient)) in terms.into_iter().enumerate() {
            let negative = coefficient.is_negative();
            let magnitude = coefficient.abs();
            if i == 0 {
                if negative {
                    write!(f, "-")?;
                }
            } else if negative {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            if monomial.is_one() {
                write!(f, "{}", magnitude)?;
            } else if magnitude.is_one() {
                write!(f, "{}", monomial)?;
            } else {
                write!(f, "{}*{}", magnitude, monomial)?;
            }
        }
        Ok(())
    }
}
