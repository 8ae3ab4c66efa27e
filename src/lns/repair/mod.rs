mod greedy_insertion;
mod regret_insertion;

use anyhow::Result;

pub use greedy_insertion::GreedyInsertion;
pub use regret_insertion::RegretInsertion;

use crate::lns::noise::NoiseMode;
use crate::problem::{Num, RequestId, VehicleId};
use crate::solution::Solution;
use crate::utils::Random;

/// Stand-in cost for pairs without a feasible position; far above any real
/// routing cost and never perturbed by noise.
pub(crate) const INFEASIBLE_COST: Num = 1e16;

pub enum RepairOperators {
    Greedy(GreedyInsertion),
    Regret(RegretInsertion),
}

impl RepairOperators {
    pub fn name(&self) -> String {
        match self {
            Self::Greedy(_) => "greedy-insertion".to_string(),
            Self::Regret(op) => format!("regret-{}-insertion", op.k()),
        }
    }
}

pub fn handle_repair_operator_generic(
    op: &RepairOperators,
    solution: &mut Solution,
    rng: &mut Random,
    num_insert: usize,
    insert_unlimited: bool,
    noise: NoiseMode,
) -> Result<()> {
    match op {
        RepairOperators::Greedy(op) => {
            op.repair(solution, rng, num_insert, insert_unlimited, noise)
        }
        RepairOperators::Regret(op) => {
            op.repair(solution, rng, num_insert, insert_unlimited, noise)
        }
    }
}

/// Request-by-vehicle matrix of best insertion costs. Rows are banked
/// requests, columns the whole fleet, both ascending by id. Only the column
/// of a vehicle that changed needs re-evaluation.
pub(crate) struct InsertionCosts {
    request_ids: Vec<RequestId>,
    vehicle_ids: Vec<VehicleId>,
    costs: Vec<Vec<Num>>,
}

impl InsertionCosts {
    pub fn build(solution: &Solution, rng: &mut Random, noise: NoiseMode) -> Self {
        let request_ids = solution.unassigned_request_ids();
        let vehicle_ids = solution.instance.vehicle_ids().to_vec();
        let costs = request_ids
            .iter()
            .map(|r| {
                vehicle_ids
                    .iter()
                    .map(|v| Self::evaluate(solution, rng, noise, *r, *v))
                    .collect()
            })
            .collect();
        Self {
            request_ids,
            vehicle_ids,
            costs,
        }
    }

    fn evaluate(
        solution: &Solution,
        rng: &mut Random,
        noise: NoiseMode,
        request_id: RequestId,
        vehicle_id: VehicleId,
    ) -> Num {
        match solution.cost_if_insert(request_id, vehicle_id) {
            Some(cost) => noise.apply(cost, rng),
            None => INFEASIBLE_COST,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.request_ids.is_empty()
    }

    pub fn request_ids(&self) -> &[RequestId] {
        &self.request_ids
    }

    pub fn vehicle_ids(&self) -> &[VehicleId] {
        &self.vehicle_ids
    }

    pub fn row(&self, row: usize) -> &[Num] {
        &self.costs[row]
    }

    /// Globally cheapest cell; earlier rows and columns win ties.
    pub fn min_cell(&self) -> Option<(usize, usize, Num)> {
        let mut best: Option<(usize, usize, Num)> = None;
        for (row, costs) in self.costs.iter().enumerate() {
            for (col, cost) in costs.iter().enumerate() {
                if best.map_or(true, |(_, _, c)| *cost < c) {
                    best = Some((row, col, *cost));
                }
            }
        }
        best
    }

    pub fn remove_request_row(&mut self, request_id: RequestId) {
        if let Some(row) = self.request_ids.iter().position(|r| *r == request_id) {
            self.request_ids.remove(row);
            self.costs.remove(row);
        }
    }

    pub fn refresh_vehicle_column(
        &mut self,
        solution: &Solution,
        rng: &mut Random,
        noise: NoiseMode,
        vehicle_id: VehicleId,
    ) {
        if let Some(col) = self.vehicle_ids.iter().position(|v| *v == vehicle_id) {
            for (row, request_id) in self.request_ids.iter().enumerate() {
                self.costs[row][col] =
                    Self::evaluate(solution, rng, noise, *request_id, vehicle_id);
            }
        }
    }

    pub fn set_infeasible(&mut self, row: usize, col: usize) {
        self.costs[row][col] = INFEASIBLE_COST;
    }
}

/// Insertion loops are bounded even when the bank cannot be drained.
pub(crate) fn insertion_budget(num_insert: usize, bank: usize) -> usize {
    2 * num_insert.max(bank)
}
