use log::info;

use crate::analysis::Analysis;
use crate::asymptotics::{dominates_or_same, Direction};
use crate::cases::get_cases;
use crate::error::Result;
use crate::expr::Expr;
use crate::result::{Answer, TerminationResult, Witness, WitnessKind};

/// PAST follows if some branch of the guard is eventually below a negative constant: from then
/// on, every iteration exits the loop with a fixed positive probability.
pub(super) fn run(analysis: &mut Analysis<'_>, result: &mut TerminationResult) -> Result<()> {
    if result.past().is_known() {
        return Ok(());
    }
    let guard = analysis.program().loop_guard();
    for case in get_cases(guard, analysis.program()) {
        let bounds = analysis.bounds_of_expr(&case.expr)?;
        if !dominates_or_same(&bounds.upper, &Expr::from(-1), Direction::NegInf) {
            continue;
        }
        info!("Loop guard branch {} is eventually negative", case.expr);
        result.set_past(Answer::True);
        result.set_ast(Answer::True);
        result.add_witness(
            Witness::new(
                WitnessKind::Past,
                format!(
                    "The loop guard has the branch '{}' which is eventually upper bounded by '{}'.\n\
                     Therefore, the termination time follows a geometric distribution after the \
                     point from\nwhich the bound holds.",
                    case.expr, bounds.upper
                ),
            )
            .with("Loop Guard Branch", &case.expr)
            .with("Bound", &bounds.upper),
        );
        return Ok(());
    }
    Ok(())
}
