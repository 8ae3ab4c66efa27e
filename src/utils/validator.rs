use ahash::AHashSet;

use crate::problem::pdptw::PDPTWInstance;
use crate::problem::{NodeId, Num, VehicleId};
use crate::solution::Solution;

#[derive(Debug)]
pub enum Violation {
    Precedence,
    Demand(Num),
    TimeWindow(Num),
}

#[derive(Debug)]
pub enum ValidatorResult {
    Valid { distance: Num, time: Num },
    ConstraintViolation(Violation),
}

impl ValidatorResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Re-walks a route from scratch, independent of the schedule lines the
/// search maintains.
pub fn validate_route(
    instance: &PDPTWInstance,
    vehicle_id: VehicleId,
    route: &[NodeId],
) -> ValidatorResult {
    use ValidatorResult::*;
    use Violation::*;

    let capacity = instance.vehicle(vehicle_id).capacity;

    let mut pickups_visited = AHashSet::new();
    let mut deliveries_visited = AHashSet::new();

    let first = instance.node(route[0]);
    let mut load = first.demand;
    let mut distance: Num = 0.0;
    let mut travel_time: Num = 0.0;
    let mut time = first.ready + first.servicetime;

    for i in 1..route.len() {
        let node = instance.node(route[i]);
        if node.node_type.is_pickup() {
            pickups_visited.insert(node.id);
        } else if node.node_type.is_delivery() {
            if let Some(request_id) = instance.request_id_of_node(node.id) {
                if !pickups_visited.contains(&instance.request(request_id).pickup) {
                    return ConstraintViolation(Precedence);
                }
            }
            deliveries_visited.insert(node.id);
        }

        load += node.demand;
        if load > capacity {
            return ConstraintViolation(Demand((load - capacity) as Num));
        }

        distance += instance.distance(route[i - 1], route[i]);
        let travel = instance.time(vehicle_id, route[i - 1], route[i]);
        travel_time += travel;
        time += travel;

        if time > node.due {
            return ConstraintViolation(TimeWindow(time - node.due));
        } else if time < node.ready {
            time = node.ready;
        }
        time += node.servicetime;
    }

    for pickup in &pickups_visited {
        if let Some(request_id) = instance.request_id_of_node(*pickup) {
            if !deliveries_visited.contains(&instance.request(request_id).delivery) {
                return ConstraintViolation(Precedence);
            }
        }
    }

    Valid {
        distance,
        time: travel_time,
    }
}

/// Panics with the violation when any route of the solution fails the
/// independent re-walk or the cached costs drifted from the recomputed ones.
pub fn assert_valid_solution(instance: &PDPTWInstance, solution: &Solution) {
    use ValidatorResult::*;
    use Violation::*;

    let mut total_distance: Num = 0.0;
    let mut total_time: Num = 0.0;
    for (vehicle_id, route) in solution.to_description().routes() {
        match validate_route(instance, *vehicle_id, route) {
            Valid { distance, time } => {
                total_distance += distance;
                total_time += time;
            }
            ConstraintViolation(violation) => match violation {
                Precedence => panic!("precedence violation in vehicle {}", vehicle_id),
                Demand(excess) => {
                    panic!("demand violation in vehicle {} (excess: {})", vehicle_id, excess)
                }
                TimeWindow(excess) => panic!(
                    "time-window violation in vehicle {} (excess: {})",
                    vehicle_id, excess
                ),
            },
        }
    }

    let params = instance.params();
    let recomputed = params.alpha * total_distance + params.beta * total_time;
    let cached = solution.objective_without_bank();
    assert!(
        (recomputed - cached).abs() < 1e-6,
        "cached costs drifted (recomputed: {}, cached: {})",
        recomputed,
        cached
    );
}
