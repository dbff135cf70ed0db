//! Symbols occurring in expressions.
//!
//! Four kinds of symbols are distinguished, because the analysis reasons differently about each:
//!
//! - the iteration counter `n`, the only symbol limits are taken in;
//! - program variables, which are substituted by the enumerator and bounded by the bound engine;
//! - real constants of unknown sign (for instance an unspecified initial value `x0`);
//! - positive constants, introduced when bounds are collapsed "up to a positive constant".
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static FRESH_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    /// The iteration counter `n`.
    N,
    /// A program variable.
    Var(Arc<str>),
    /// A real constant of unknown sign.
    Real(Arc<str>),
    /// A strictly positive constant.
    Positive(Arc<str>),
}

impl Symbol {
    pub fn var(name: &str) -> Self {
        Symbol::Var(Arc::from(name))
    }

    pub fn real(name: &str) -> Self {
        Symbol::Real(Arc::from(name))
    }

    pub fn positive(name: &str) -> Self {
        Symbol::Positive(Arc::from(name))
    }

    /// Creates a positive constant whose name has never been handed out before.
    ///
    /// Names are `<prefix><k>` with a process-wide counter `k`, so constants created by
    /// different analyses never collide.
    pub fn fresh_positive(prefix: &str) -> Self {
        let k = FRESH_COUNTER.fetch_add(1, Ordering::Relaxed);
        Symbol::Positive(Arc::from(format!("{}{}", prefix, k)))
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::N => "n",
            Symbol::Var(name) | Symbol::Real(name) | Symbol::Positive(name) => name,
        }
    }

    pub fn is_n(&self) -> bool {
        matches!(self, Symbol::N)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Symbol::Var(_))
    }

    /// Returns `true` for symbols standing for a fixed (but unknown) number.
    pub fn is_constant(&self) -> bool {
        matches!(self, Symbol::Real(_) | Symbol::Positive(_))
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Symbol::Positive(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
