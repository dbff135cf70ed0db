//! Martingale proof rules.
//!
//! Every rule looks at the loop guard `G` through two derived expressions:
//!
//! - the loop guard change `E[G(n+1)] - E[G(n)]`, which decides whether a rule applies;
//! - the martingale expression `E[G(n+1) - G(n) | F(n)]`, which the rule bounds.
//!
//! Rules only ever refine a [`TerminationResult`]: an answer that is already known is never
//! changed.
use std::fmt;
use std::str::FromStr;

use crate::analysis::Analysis;
use crate::asymptotics::limit_at;
use crate::error::Result;
use crate::expr::Expr;
use crate::result::TerminationResult;

mod geometric;
mod initial_state;
mod ranking;
mod repulsing;
mod supermartingale;

/// Expressions shared by all rules.
#[derive(Debug, Clone)]
pub struct RuleInput {
    pub loop_guard_change: Expr,
    pub martingale_expression: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// The loop guard is not positive initially.
    InitialState,
    /// The guard decreases in expectation by at least a constant.
    RankingSupermartingale,
    /// The guard is a supermartingale with a branch decreasing by at least a constant.
    Supermartingale,
    /// The negated guard is a repulsing supermartingale with bounded differences.
    RepulsingSupermartingale,
    /// Some branch of the guard is eventually below a negative constant.
    Geometric,
}

impl Rule {
    /// All rules in their default order.
    pub const ALL: [Rule; 5] = [
        Rule::InitialState,
        Rule::RankingSupermartingale,
        Rule::Supermartingale,
        Rule::RepulsingSupermartingale,
        Rule::Geometric,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rule::InitialState => "initial-state",
            Rule::RankingSupermartingale => "ranking-sm",
            Rule::Supermartingale => "supermartingale",
            Rule::RepulsingSupermartingale => "repulsing-sm",
            Rule::Geometric => "geometric",
        }
    }

    pub fn is_applicable(&self, input: &RuleInput) -> bool {
        match self {
            Rule::InitialState | Rule::Geometric => true,
            Rule::RankingSupermartingale => limit_at(&input.loop_guard_change).is_negative(),
            Rule::Supermartingale => limit_at(&input.loop_guard_change).is_nonpositive(),
            Rule::RepulsingSupermartingale => limit_at(&input.loop_guard_change).is_nonnegative(),
        }
    }

    /// Runs the rule, refining `result`.
    ///
    /// [`Unsupported`][crate::error::Error::Unsupported] errors mean the rule is inconclusive.
    pub fn run(
        &self,
        analysis: &mut Analysis<'_>,
        input: &RuleInput,
        result: &mut TerminationResult,
    ) -> Result<()> {
        match self {
            Rule::InitialState => initial_state::run(analysis, result),
            Rule::RankingSupermartingale => ranking::run(analysis, input, result),
            Rule::Supermartingale => supermartingale::run(analysis, input, result),
            Rule::RepulsingSupermartingale => repulsing::run(analysis, input, result),
            Rule::Geometric => geometric::run(analysis, result),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Rule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Rule::ALL
            .iter()
            .copied()
            .find(|rule| rule.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Rule::ALL.iter().map(|r| r.name()).collect();
                format!("unknown rule `{}`, expected one of: {}", s, names.join(", "))
            })
    }
}
