use anyhow::Result;

use crate::lns::noise::NoiseMode;
use crate::lns::repair::{insertion_budget, InsertionCosts, INFEASIBLE_COST};
use crate::solution::Solution;
use crate::utils::Random;

/// Repeatedly commits the globally cheapest feasible request/vehicle pair.
pub struct GreedyInsertion;

impl GreedyInsertion {
    pub fn new() -> Self {
        Self
    }

    pub fn repair(
        &self,
        solution: &mut Solution,
        rng: &mut Random,
        num_insert: usize,
        insert_unlimited: bool,
        noise: NoiseMode,
    ) -> Result<()> {
        let bank = solution.number_of_unassigned_requests();
        if bank == 0 {
            return Ok(());
        }
        let target = if insert_unlimited {
            bank
        } else {
            num_insert.min(bank)
        };
        let mut matrix = InsertionCosts::build(solution, rng, noise);
        let mut inserted = 0;
        for _ in 0..insertion_budget(num_insert, bank) {
            if inserted >= target || matrix.is_empty() {
                break;
            }
            let (row, col, cost) = match matrix.min_cell() {
                Some(cell) => cell,
                None => break,
            };
            if cost >= INFEASIBLE_COST {
                break;
            }
            let request_id = matrix.request_ids()[row];
            let vehicle_id = matrix.vehicle_ids()[col];
            if solution.insert_request_to_vehicle(request_id, vehicle_id)? {
                inserted += 1;
                matrix.remove_request_row(request_id);
                matrix.refresh_vehicle_column(solution, rng, noise, vehicle_id);
            } else {
                // noise can advertise a position the exact evaluation rejects
                matrix.set_infeasible(row, col);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::params::Parameters;
    use crate::problem::test_fixtures::{instance_with_requests, relaxed_request, FixtureRequest};
    use crate::utils::create_seeded_rng;
    use crate::utils::validator::assert_valid_solution;

    #[test]
    fn drains_a_small_bank_into_one_vehicle() {
        let instance = instance_with_requests(
            1,
            10,
            &[relaxed_request(1.0, 2.0), relaxed_request(3.0, 4.0)],
            Parameters::default(),
        );
        let mut solution = Solution::new(&instance);
        let mut rng = create_seeded_rng(1);
        GreedyInsertion::new()
            .repair(&mut solution, &mut rng, 2, false, NoiseMode::Disabled)
            .unwrap();
        assert_eq!(solution.number_of_unassigned_requests(), 0);
        assert_eq!(solution.number_of_vehicles_used(), 1);
        assert_valid_solution(&instance, &solution);
    }

    #[test]
    fn respects_the_insertion_quantity() {
        let instance = instance_with_requests(
            2,
            10,
            &[
                relaxed_request(1.0, 2.0),
                relaxed_request(3.0, 4.0),
                relaxed_request(5.0, 6.0),
            ],
            Parameters::default(),
        );
        let mut solution = Solution::new(&instance);
        let mut rng = create_seeded_rng(1);
        GreedyInsertion::new()
            .repair(&mut solution, &mut rng, 1, false, NoiseMode::Disabled)
            .unwrap();
        assert_eq!(solution.number_of_unassigned_requests(), 2);
    }

    #[test]
    fn unlimited_mode_ignores_the_quantity() {
        let instance = instance_with_requests(
            2,
            10,
            &[
                relaxed_request(1.0, 2.0),
                relaxed_request(3.0, 4.0),
                relaxed_request(5.0, 6.0),
            ],
            Parameters::default(),
        );
        let mut solution = Solution::new(&instance);
        let mut rng = create_seeded_rng(1);
        GreedyInsertion::new()
            .repair(&mut solution, &mut rng, 1, true, NoiseMode::Disabled)
            .unwrap();
        assert_eq!(solution.number_of_unassigned_requests(), 0);
        assert_valid_solution(&instance, &solution);
    }

    #[test]
    fn leaves_unservable_requests_in_the_bank() {
        // delivery closes before any vehicle can reach it
        let impossible = FixtureRequest {
            pickup: (1.0, 0.0),
            delivery: (500.0, 0.0),
            pickup_window: (0.0, 100.0),
            delivery_window: (0.0, 10.0),
            demand: 1,
        };
        let instance = instance_with_requests(
            1,
            10,
            &[relaxed_request(1.0, 2.0), impossible],
            Parameters::default(),
        );
        let mut solution = Solution::new(&instance);
        let mut rng = create_seeded_rng(1);
        GreedyInsertion::new()
            .repair(&mut solution, &mut rng, 2, true, NoiseMode::Disabled)
            .unwrap();
        assert_eq!(solution.number_of_unassigned_requests(), 1);
        assert_eq!(solution.unassigned_request_ids(), vec![1]);
    }
}
