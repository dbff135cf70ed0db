use log::info;

use crate::analysis::Analysis;
use crate::cases::{initial_polarity, initial_value};
use crate::error::Result;
use crate::result::{Answer, TerminationResult, Witness, WitnessKind};

/// The loop is never entered if the guard cannot be positive initially.
pub(super) fn run(analysis: &mut Analysis<'_>, result: &mut TerminationResult) -> Result<()> {
    if result.all_known() {
        return Ok(());
    }
    let program = analysis.program();
    let guard = program.loop_guard();
    if initial_polarity(guard, program).maybe_positive {
        return Ok(());
    }

    let value = initial_value(guard, program);
    info!("Loop guard is initially {}, the loop is never entered", value);
    result.set_past(Answer::True);
    result.set_ast(Answer::True);
    result.add_witness(
        Witness::new(
            WitnessKind::Past,
            format!(
                "Initially the loop guard '{}' evaluates to '{}', which is not positive.\n\
                 Therefore, the loop body is never executed.",
                guard, value
            ),
        )
        .with("Loop guard", guard)
        .with("Initial value", &value),
    );
    Ok(())
}
