use log::info;

use crate::analysis::Analysis;
use crate::asymptotics::{dominates_or_same, Direction};
use crate::cases::get_cases;
use crate::error::Result;
use crate::expr::Expr;
use crate::result::{Answer, TerminationResult, Witness, WitnessKind};
use crate::rules::RuleInput;

/// AST follows if the guard is eventually a supermartingale and some branch decreases it by at
/// least a constant.
pub(super) fn run(
    analysis: &mut Analysis<'_>,
    input: &RuleInput,
    result: &mut TerminationResult,
) -> Result<()> {
    if result.ast().is_known() {
        return Ok(());
    }
    if !analysis.is_invariant(&input.martingale_expression)?.is_true() {
        return Ok(());
    }

    let guard = analysis.program().loop_guard();
    for case in get_cases(guard, analysis.program()) {
        let bounds = analysis.bounds_of_expr(&(&case.expr - guard))?;
        if !dominates_or_same(&bounds.upper, &Expr::from(-1), Direction::NegInf) {
            continue;
        }
        info!("{} is a supermartingale decreasing in branch {}", guard, case.expr);
        result.set_ast(Answer::True);
        result.add_witness(
            Witness::new(
                WitnessKind::Ast,
                format!(
                    "Eventually, '{}' is a supermartingale. Also eventually, taking the branch\n\
                     '{}' (which happens with probability {}) changes the supermartingale by at \
                     least {}.",
                    guard, case.expr, case.probability, bounds.upper
                ),
            )
            .with("SM", guard)
            .with("SM expression", &input.martingale_expression)
            .with("Decreasing branch", &case.expr)
            .with("Branch change bound", &bounds.upper)
            .with("Probability", &case.probability),
        );
        return Ok(());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::parser::parse_program;

    fn run_on(source: &str) -> TerminationResult {
        let program = parse_program(source).unwrap();
        let mut analysis = Analysis::new(&program);
        let input = RuleInput {
            loop_guard_change: analysis.moments().loop_guard_change().unwrap(),
            martingale_expression: analysis.moments().martingale_expression().unwrap(),
        };
        let mut result = TerminationResult::new();
        run(&mut analysis, &input, &mut result).unwrap();
        result
    }

    #[test]
    fn test_fair_walk() {
        let result = run_on("x = 10\nwhile x > 0:\n    x = x - 1 @ 1/2; x + 1\nend\n");
        assert_eq!(result.ast(), Answer::True);
        assert!(!result.past().is_known());
        let witness = &result.witnesses()[0];
        assert_eq!(witness.kind(), WitnessKind::Ast);
        assert_eq!(witness.get("Decreasing branch"), Some("x - 1"));
        assert_eq!(witness.get("Branch change bound"), Some("-1"));
        assert_eq!(witness.get("Probability"), Some("1/2"));
    }

    #[test]
    fn test_no_decreasing_branch() {
        let result = run_on("x = 10\nwhile x > 0:\n    x = x\nend\n");
        assert!(!result.ast().is_known());
    }
}
