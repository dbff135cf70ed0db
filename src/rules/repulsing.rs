use log::info;

use crate::analysis::Analysis;
use crate::asymptotics::{dominates_or_same, dominating, Direction};
use crate::cases::get_cases;
use crate::error::Result;
use crate::expr::Expr;
use crate::result::{Answer, TerminationResult, Witness, WitnessKind};
use crate::rules::RuleInput;

/// Refutes PAST (and possibly AST) if `-G` is eventually a repulsing supermartingale with
/// differences bounded by a constant.
///
/// The differences are bounded by `cs`, and `-G` decreases in expectation by at least
/// `epsilons`. If the epsilons do not vanish and dominate the cs, the loop diverges with
/// positive probability. If they vanish, the loop still has an infinite expected runtime.
pub(super) fn run(
    analysis: &mut Analysis<'_>,
    input: &RuleInput,
    result: &mut TerminationResult,
) -> Result<()> {
    if result.all_known() {
        return Ok(());
    }
    let expression = -&input.martingale_expression;
    if !analysis.is_invariant(&expression)?.is_true() {
        return Ok(());
    }

    let guard = analysis.program().loop_guard();
    let mut differences = Vec::new();
    for case in get_cases(guard, analysis.program()) {
        differences.push(analysis.bounds_of_expr(&(&case.expr - guard))?);
    }
    // Some branch must keep the loop running.
    if differences.iter().all(|b| b.maybe_negative) {
        return Ok(());
    }

    let mut absolute = Vec::with_capacity(differences.len());
    for bounds in &differences {
        absolute.push(bounds.absolute_upper()?);
    }
    let cs = dominating(&absolute)?;
    let epsilons = -analysis.bounds_of_expr(&expression)?.upper;

    let one = Expr::one();
    let zero = Expr::zero();
    let dominates = |f: &Expr, g: &Expr| dominates_or_same(f, g, Direction::PosInf);
    if !dominates(&one, &epsilons) || !dominates(&one, &cs) {
        return Ok(());
    }

    let repulsing = -guard;
    if !dominates(&zero, &epsilons) && dominates(&epsilons, &cs) {
        info!("{} is a repulsing supermartingale, the loop is not AST", repulsing);
        result.set_past(Answer::False);
        result.set_ast(Answer::False);
        result.add_witness(
            Witness::new(
                WitnessKind::NotAst,
                format!(
                    "There is always a positive probability of having a next iteration.\n\
                     Moreover, '{}' eventually is a repulsing supermartingale\n\
                     decreasing with epsilons '{}'. Also, the repulsing SM has differences bound\n\
                     by '{}' which is O(epsilons).",
                    repulsing, epsilons, cs
                ),
            )
            .with("Repulsing SM", &repulsing)
            .with("SM expression", &expression)
            .with("Epsilons", &epsilons)
            .with("Cs", &cs),
        );
    } else if dominates(&zero, &epsilons) {
        info!("{} is a repulsing supermartingale, the loop is not PAST", repulsing);
        result.set_past(Answer::False);
        result.add_witness(
            Witness::new(
                WitnessKind::NotPast,
                format!(
                    "There is always a positive probability of having a next iteration.\n\
                     Moreover, '{}' eventually is a repulsing supermartingale\n\
                     decreasing with epsilons '0'. Also, the repulsing SM has differences bound\n\
                     by a constant.",
                    repulsing
                ),
            )
            .with("Repulsing SM", &repulsing)
            .with("SM expression", &expression),
        );
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
    fn test_biased_walk() {
        let result = run_on("x = 10\nwhile x > 0:\n    x = x + 1 @ 2/3; x - 1\nend\n");
        assert_eq!(result.past(), Answer::False);
        assert_eq!(result.ast(), Answer::False);
        let witness = &result.witnesses()[0];
        assert_eq!(witness.kind(), WitnessKind::NotAst);
        assert_eq!(witness.get("Repulsing SM"), Some("-x"));
        assert_eq!(witness.get("Epsilons"), Some("1/3"));
        assert_eq!(witness.get("Cs"), Some("1"));
    }

    #[test]
    fn test_fair_walk() {
        let result = run_on("x = 10\nwhile x > 0:\n    x = x - 1 @ 1/2; x + 1\nend\n");
        assert_eq!(result.past(), Answer::False);
        assert!(!result.ast().is_known());
        assert_eq!(result.witnesses()[0].kind(), WitnessKind::NotPast);
    }

    #[test]
    fn test_always_decreasing() {
        let result = run_on("x = 10\nwhile x > 0:\n    x = x - 1 @ 1/2; x - 2\nend\n");
        assert!(!result.past().is_known());
        assert!(result.witnesses().is_empty());
    }
}
