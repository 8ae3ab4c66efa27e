use anyhow::Result;
use rand::seq::SliceRandom;

use crate::lns::destroy::assigned_requests_checked;
use crate::problem::RequestId;
use crate::solution::Solution;
use crate::utils::Random;

/// Uniform sample of assigned requests, removed in one batch.
pub struct RandomRemoval;

impl RandomRemoval {
    pub fn new() -> Self {
        Self
    }

    pub fn destroy(&self, solution: &mut Solution, rng: &mut Random, num: usize) -> Result<()> {
        let assigned = assigned_requests_checked(solution, num)?;
        let picked: Vec<RequestId> = assigned.choose_multiple(rng, num).copied().collect();
        solution.remove_requests(&picked)
    }
}
