use anyhow::{ensure, Result};

use crate::lns::noise::NoiseMode;
use crate::lns::repair::{insertion_budget, InsertionCosts, INFEASIBLE_COST};
use crate::problem::Num;
use crate::solution::Solution;
use crate::utils::Random;

/// Inserts the request that would lose the most by not being placed now: the
/// regret is the summed cost gap between its best vehicle and its `k - 1`
/// runners-up. Requests running out of feasible vehicles score sentinel-sized
/// regrets and get placed first.
pub struct RegretInsertion {
    k: usize,
}

impl RegretInsertion {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn repair(
        &self,
        solution: &mut Solution,
        rng: &mut Random,
        num_insert: usize,
        insert_unlimited: bool,
        noise: NoiseMode,
    ) -> Result<()> {
        ensure!(self.k >= 1, "regret horizon must be at least 1");
        let fleet = solution.instance.num_vehicles();
        ensure!(
            self.k <= fleet,
            "regret-{} insertion needs {} vehicles but the fleet has {}",
            self.k,
            self.k,
            fleet
        );

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
            let mut chosen: Option<(usize, usize, Num)> = None;
            for row in 0..matrix.request_ids().len() {
                let mut sorted: Vec<(Num, usize)> = matrix
                    .row(row)
                    .iter()
                    .enumerate()
                    .map(|(col, cost)| (*cost, col))
                    .collect();
                sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                let (best_cost, best_col) = sorted[0];
                if best_cost >= INFEASIBLE_COST {
                    continue;
                }
                let regret: Num = sorted
                    .iter()
                    .take(self.k)
                    .map(|(cost, _)| cost - best_cost)
                    .sum();
                // strictly greater keeps the earlier request on ties
                if chosen.map_or(true, |(_, _, r)| regret > r) {
                    chosen = Some((row, best_col, regret));
                }
            }
            let (row, col) = match chosen {
                Some((row, col, _)) => (row, col),
                None => break,
            };
            let request_id = matrix.request_ids()[row];
            let vehicle_id = matrix.vehicle_ids()[col];
            if solution.insert_request_to_vehicle(request_id, vehicle_id)? {
                inserted += 1;
                matrix.remove_request_row(request_id);
                matrix.refresh_vehicle_column(solution, rng, noise, vehicle_id);
            } else {
                matrix.set_infeasible(row, col);
            }
        }
        Ok(())
    }
}
