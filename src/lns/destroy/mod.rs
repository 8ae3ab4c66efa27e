mod random_removal;
mod shaw_removal;
mod worst_removal;

use anyhow::{ensure, Result};

pub use random_removal::RandomRemoval;
pub use shaw_removal::ShawRemoval;
pub use worst_removal::WorstRemoval;

use crate::problem::RequestId;
use crate::solution::Solution;
use crate::utils::Random;

pub enum DestroyOperators<'a> {
    Shaw(ShawRemoval<'a>),
    Random(RandomRemoval),
    Worst(WorstRemoval<'a>),
}

impl<'a> DestroyOperators<'a> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Shaw(_) => "shaw-removal",
            Self::Random(_) => "random-removal",
            Self::Worst(_) => "worst-removal",
        }
    }
}

pub fn handle_destroy_operator_generic(
    op: &DestroyOperators,
    solution: &mut Solution,
    rng: &mut Random,
    num_destroy: usize,
) -> Result<()> {
    match op {
        DestroyOperators::Shaw(op) => op.destroy(solution, rng, num_destroy),
        DestroyOperators::Random(op) => op.destroy(solution, rng, num_destroy),
        DestroyOperators::Worst(op) => op.destroy(solution, rng, num_destroy),
    }
}

/// Removal quantities outside `1..=assigned` are programming errors, not
/// search conditions.
pub(crate) fn assigned_requests_checked(
    solution: &Solution,
    num: usize,
) -> Result<Vec<RequestId>> {
    let assigned = solution.assigned_request_ids();
    ensure!(num > 0, "cannot remove zero requests");
    ensure!(
        num <= assigned.len(),
        "cannot remove {} of {} assigned requests",
        num,
        assigned.len()
    );
    Ok(assigned)
}
