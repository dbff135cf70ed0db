use log::info;

use crate::analysis::Analysis;
use crate::asymptotics::{dominates_or_same, Direction};
use crate::error::Result;
use crate::expr::Expr;
use crate::result::{Answer, TerminationResult, Witness, WitnessKind};
use crate::rules::RuleInput;

/// The guard is a ranking supermartingale if its expected change is eventually below a
/// negative constant in every reachable state.
pub(super) fn run(
    analysis: &mut Analysis<'_>,
    input: &RuleInput,
    result: &mut TerminationResult,
) -> Result<()> {
    if result.past().is_known() {
        return Ok(());
    }
    let bounds = analysis.bounds_of_expr(&input.martingale_expression)?;
    if !dominates_or_same(&bounds.upper, &Expr::from(-1), Direction::NegInf) {
        return Ok(());
    }

    let guard = analysis.program().loop_guard();
    info!("{} is a ranking supermartingale", guard);
    result.set_past(Answer::True);
    result.set_ast(Answer::True);
    result.add_witness(
        Witness::new(
            WitnessKind::Past,
            format!(
                "Eventually, '{}' is a ranking supermartingale: in every iteration its expected\n\
                 change is at most '{}', which is bounded away from zero.",
                guard, bounds.upper
            ),
        )
        .with("RSM", guard)
        .with("RSM expression", &input.martingale_expression)
        .with("Change bound", &bounds.upper),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::expr::{int, ratio};
    use crate::parser::parse_program;

    #[test]
    fn test_countdown() {
        let program = parse_program("x = 10\nwhile x > 0:\n    x = x - 1\nend\n").unwrap();
        let mut analysis = Analysis::new(&program);
        let input = RuleInput {
            loop_guard_change: Expr::from(-1),
            martingale_expression: Expr::from(-1),
        };
        let mut result = TerminationResult::new();
        run(&mut analysis, &input, &mut result).unwrap();
        assert_eq!(result.past(), Answer::True);
        assert_eq!(result.ast(), Answer::True);
        assert_eq!(result.witnesses()[0].kind(), WitnessKind::Past);
    }

    #[test]
    fn test_vanishing_drift() {
        let program =
            parse_program("x = 10\nwhile x > 0:\n    x = x - 1 @ 1/2; x\nend\n").unwrap();
        let mut analysis = Analysis::new(&program);
        let input = RuleInput {
            loop_guard_change: Expr::from(-1),
            martingale_expression: Expr::exponential(ratio(1, 2)).scale(&int(-1)),
        };
        let mut result = TerminationResult::new();
        run(&mut analysis, &input, &mut result).unwrap();
        assert!(!result.past().is_known());
    }
}
