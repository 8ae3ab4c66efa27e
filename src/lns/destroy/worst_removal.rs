use anyhow::Result;

use crate::lns::destroy::assigned_requests_checked;
use crate::problem::pdptw::PDPTWInstance;
use crate::problem::{Num, RequestId};
use crate::solution::Solution;
use crate::utils::{biased_rank_index, Random};

/// Removes the requests whose absence saves the most cost, one at a time
/// with re-evaluation after each removal, picked through a rank-biased
/// roulette so the choice is not fully deterministic.
pub struct WorstRemoval<'a> {
    instance: &'a PDPTWInstance,
}

impl<'a> WorstRemoval<'a> {
    pub fn with_instance(instance: &'a PDPTWInstance) -> Self {
        Self { instance }
    }

    pub fn destroy(&self, solution: &mut Solution, rng: &mut Random, num: usize) -> Result<()> {
        assigned_requests_checked(solution, num)?;
        let p_worst = self.instance.params().p_worst;

        for _ in 0..num {
            let assigned = solution.assigned_request_ids();
            let mut ranked: Vec<(Num, RequestId)> = assigned
                .iter()
                .map(|r| Ok((solution.cost_if_remove(*r)?, *r)))
                .collect::<Result<_>>()?;
            // largest saving first, ids break ties
            ranked.sort_unstable_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
            let idx = biased_rank_index(rng, p_worst, ranked.len());
            solution.remove_requests(&[ranked[idx].1])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::params::Parameters;
    use crate::problem::test_fixtures::{instance_with_requests, relaxed_request};
    use crate::utils::create_seeded_rng;
    use crate::utils::validator::assert_valid_solution;

    #[test]
    fn single_removal_drops_an_assigned_request() {
        let instance = instance_with_requests(
            1,
            10,
            &[relaxed_request(1.0, 2.0), relaxed_request(30.0, 31.0)],
            Parameters::default(),
        );
        let mut solution = Solution::new(&instance);
        solution.insert_request_to_vehicle(0, 0).unwrap();
        solution.insert_request_to_vehicle(1, 0).unwrap();

        let mut rng = create_seeded_rng(5);
        WorstRemoval::with_instance(&instance)
            .destroy(&mut solution, &mut rng, 1)
            .unwrap();
        assert_eq!(solution.number_of_unassigned_requests(), 1);
        assert_eq!(solution.number_of_assigned_requests(), 1);
        assert_valid_solution(&instance, &solution);
    }

    #[test]
    fn lone_assigned_request_is_removed_for_every_draw() {
        let instance = instance_with_requests(
            1,
            10,
            &[relaxed_request(1.0, 2.0)],
            Parameters::default(),
        );
        for seed in 0..8i128 {
            let mut solution = Solution::new(&instance);
            solution.insert_request_to_vehicle(0, 0).unwrap();
            let mut rng = create_seeded_rng(seed);
            WorstRemoval::with_instance(&instance)
                .destroy(&mut solution, &mut rng, 1)
                .unwrap();
            assert_eq!(solution.number_of_assigned_requests(), 0);
            assert_eq!(solution.unassigned_request_ids(), vec![0]);
        }
    }

    #[test]
    fn removing_everything_banks_the_vehicle() {
        let instance = instance_with_requests(
            1,
            10,
            &[relaxed_request(1.0, 2.0), relaxed_request(3.0, 4.0)],
            Parameters::default(),
        );
        let mut solution = Solution::new(&instance);
        solution.insert_request_to_vehicle(0, 0).unwrap();
        solution.insert_request_to_vehicle(1, 0).unwrap();

        let mut rng = create_seeded_rng(5);
        WorstRemoval::with_instance(&instance)
            .destroy(&mut solution, &mut rng, 2)
            .unwrap();
        assert_eq!(solution.number_of_vehicles_used(), 0);
        assert_eq!(solution.number_of_unassigned_requests(), 2);
    }
}
