//! Entry point of the termination analysis.
use log::{debug, info};

use crate::analysis::Analysis;
use crate::error::Result;
use crate::program::Program;
use crate::result::TerminationResult;
use crate::rules::{Rule, RuleInput};

/// Selects the proof rules to try, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rules: Vec<Rule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules: Rule::ALL.to_vec(),
        }
    }
}

impl Config {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }
}

/// Decides PAST and AST of `program` with all rules.
pub fn decide_termination(program: &Program) -> Result<TerminationResult> {
    decide_termination_with(program, &Config::default())
}

/// Decides PAST and AST of `program`, trying the configured rules in order until both answers
/// are known.
///
/// Rules that cannot decide something are skipped. Errors other than
/// [`Unsupported`][crate::error::Error::Unsupported] abort the analysis.
pub fn decide_termination_with(program: &Program, config: &Config) -> Result<TerminationResult> {
    let mut analysis = Analysis::new(program);
    let input = RuleInput {
        loop_guard_change: analysis.moments().loop_guard_change()?,
        martingale_expression: analysis.moments().martingale_expression()?,
    };
    info!("Loop guard change: {}", input.loop_guard_change);
    info!("Martingale expression: {}", input.martingale_expression);

    let mut result = TerminationResult::new();
    for rule in &config.rules {
        if !rule.is_applicable(&input) {
            debug!("Rule {} is not applicable", rule);
            continue;
        }
        match rule.run(&mut analysis, &input, &mut result) {
            Ok(()) => info!(
                "After rule {}: PAST {}, AST {}",
                rule,
                result.past(),
                result.ast()
            ),
            Err(e) if e.is_incompleteness() => info!("Rule {} is inconclusive: {}", rule, e),
            Err(e) => return Err(e),
        }
        if result.all_known() {
            break;
        }
    }
    debug!(
        "Bound store: {} entries, {} hits, {} misses",
        analysis.bound_store().len(),
        analysis.bound_store().hits(),
        analysis.bound_store().misses()
    );
    Ok(result)
}
