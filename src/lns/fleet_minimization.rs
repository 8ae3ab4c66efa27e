use anyhow::{ensure, Result};
use log::{debug, info};
use took::Timer;

use crate::lns::{adaptive_large_neighbourhood_search, SearchOutcome, SearchSettings};
use crate::problem::pdptw::PDPTWInstance;
use crate::problem::{NodeId, RequestId, VehicleId};
use crate::solution::{Solution, SolutionDescription};
use crate::utils::logging::{format_log_solution, format_log_solution_desc};
use crate::utils::Random;

pub struct TwoStageOutcome {
    /// the instance after fleet growth and shrinkage; its vehicle set can
    /// differ from the caller's
    pub instance: PDPTWInstance,
    pub best: SolutionDescription,
    pub iterations: u64,
}

/// Two-stage fleet minimization for interchangeable vehicles. Stage one
/// grows the fleet until every request is served, then parks unused
/// vehicles. Stage two probes smaller fleets: drop the highest-id vehicle,
/// let a short search try to reassign its requests, and keep the smaller
/// fleet only when full service survives. A full-length search on the final
/// fleet polishes the routing.
pub fn two_stage_fleet_minimization(
    mut instance: PDPTWInstance,
    rng: &mut Random,
) -> Result<TwoStageOutcome> {
    ensure!(
        instance.is_homogeneous_fleet(),
        "fleet minimization assumes interchangeable vehicles"
    );
    ensure!(
        instance.num_requests() > 0,
        "nothing to serve in instance '{}'",
        instance.name
    );
    let timer = Timer::new();

    // stage one: one request at a time; a request nothing absorbs gets a
    // fresh vehicle and one retry. Each insertion attempt counts against
    // the shared theta budget the shrink stage draws from.
    let pending: Vec<RequestId> = instance.request_ids().to_vec();
    let mut snapshot: Vec<(VehicleId, Vec<NodeId>)> = Vec::new();
    let mut next = 0usize;
    let mut grew_for_current = false;
    let mut total_iterations = 0u64;
    loop {
        let (routes, failed) = {
            let mut solution = Solution::from_routes(&instance, snapshot)?;
            let mut failed = None;
            while next < pending.len() {
                let request_id = pending[next];
                total_iterations += 1;
                if solution.insert_request_to_any_vehicle(request_id)? {
                    next += 1;
                    grew_for_current = false;
                } else {
                    failed = Some(request_id);
                    break;
                }
            }
            debug!(
                "construction progress - {}",
                format_log_solution(&solution)
            );
            (
                solution
                    .to_description()
                    .routes()
                    .to_vec(),
                failed,
            )
        };
        snapshot = routes;
        match failed {
            Some(request_id) => {
                ensure!(
                    !grew_for_current,
                    "request {} does not fit even into an idle vehicle",
                    request_id
                );
                let added = instance.add_same_type_vehicle()?;
                grew_for_current = true;
                debug!("added vehicle {} for request {}", added, request_id);
            }
            None => break,
        }
    }

    let used: Vec<VehicleId> = snapshot.iter().map(|(v, _)| *v).collect();
    let idle: Vec<VehicleId> = instance
        .vehicle_ids()
        .iter()
        .copied()
        .filter(|v| !used.contains(v))
        .collect();
    for vehicle_id in idle {
        instance.remove_vehicle(vehicle_id)?;
    }
    info!(
        "construction stage done with {} vehicles, took: {}",
        instance.num_vehicles(),
        timer.took(),
    );

    let theta = instance.params().theta;
    let tau = instance.params().tau;
    let iteration_num = instance.params().iteration_num;

    // stage two: peel off the highest-id vehicle while a short search can
    // still serve everything
    let mut best_instance = instance;
    let mut best_routes = snapshot;
    while total_iterations < theta && best_instance.num_vehicles() > 1 {
        let removed = match best_instance.max_vehicle_id() {
            Some(v) => v,
            None => break,
        };
        let reduced_routes: Vec<(VehicleId, Vec<NodeId>)> = best_routes
            .iter()
            .filter(|(v, _)| *v != removed)
            .cloned()
            .collect();
        let mut probe_instance = best_instance.clone();
        probe_instance.remove_vehicle(removed)?;

        let outcome = match shrink_probe(&probe_instance, reduced_routes, rng, tau) {
            Some(outcome) => outcome,
            None => break,
        };
        total_iterations += outcome.iterations;
        if outcome.best.number_of_unassigned_requests() == 0 {
            info!(
                "fleet reduced to {} vehicles - {}",
                probe_instance.num_vehicles(),
                format_log_solution_desc(&outcome.best),
            );
            best_routes = outcome.best.routes().to_vec();
            best_instance = probe_instance;
        } else {
            break;
        }
    }

    let final_outcome = {
        let initial = Solution::from_routes(&best_instance, best_routes)?;
        adaptive_large_neighbourhood_search(
            &best_instance,
            &initial,
            rng,
            &SearchSettings::with_iterations(iteration_num),
        )?
    };
    total_iterations += final_outcome.iterations;
    info!(
        "fleet minimization finished - {} vehicles, best {}, took: {}",
        best_instance.num_vehicles(),
        format_log_solution_desc(&final_outcome.best),
        timer.took(),
    );
    Ok(TwoStageOutcome {
        instance: best_instance,
        best: final_outcome.best,
        iterations: total_iterations,
    })
}

/// Runs the short reassignment search for one shrink attempt. A probe that
/// cannot even be started, for example when every route sat on the removed
/// vehicle, is abandoned rather than treated as fatal; the caller keeps the
/// last fully served fleet.
fn shrink_probe(
    instance: &PDPTWInstance,
    routes: Vec<(VehicleId, Vec<NodeId>)>,
    rng: &mut Random,
    tau: u64,
) -> Option<SearchOutcome> {
    let initial = match Solution::from_routes(instance, routes) {
        Ok(solution) => solution,
        Err(err) => {
            debug!("shrink probe abandoned: {:#}", err);
            return None;
        }
    };
    match adaptive_large_neighbourhood_search(
        instance,
        &initial,
        rng,
        &SearchSettings {
            max_iterations: tau,
            insert_unlimited: true,
            stop_when_all_assigned: true,
        },
    ) {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            debug!("shrink probe abandoned: {:#}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;
    use crate::problem::params::{Parameters, ParametersBuilder};
    use crate::problem::pdptw::{Node, NodeType, Request, Vehicle};
    use crate::problem::test_fixtures::{
        exclusive_request, instance_with_requests, relaxed_request, FixtureRequest,
    };
    use crate::utils::create_seeded_rng;

    fn small_budget_params() -> Parameters {
        ParametersBuilder::default()
            .iteration_num(50u64)
            .tau(20u64)
            .theta(100u64)
            .remove_lower_bound(1usize)
            .remove_upper_bound(1usize)
            .epsilon(0.5)
            .segment_num(10u64)
            .build()
            .unwrap()
    }

    #[test]
    fn growth_stage_opens_one_vehicle_per_exclusive_request() {
        let requests = vec![
            exclusive_request(3),
            exclusive_request(3),
            exclusive_request(3),
        ];
        let instance = instance_with_requests(1, 3, &requests, small_budget_params());
        let mut rng = create_seeded_rng(31);
        let outcome = two_stage_fleet_minimization(instance, &mut rng).unwrap();
        assert_eq!(outcome.instance.num_vehicles(), 3);
        assert_eq!(outcome.best.number_of_unassigned_requests(), 0);
        assert_eq!(outcome.best.number_of_vehicles_used(), 3);
    }

    #[test]
    fn surplus_vehicles_are_parked_after_construction() {
        let instance = instance_with_requests(
            3,
            10,
            &[relaxed_request(1.0, 2.0), relaxed_request(3.0, 4.0)],
            small_budget_params(),
        );
        let mut rng = create_seeded_rng(31);
        let outcome = two_stage_fleet_minimization(instance, &mut rng).unwrap();
        assert_eq!(outcome.instance.num_vehicles(), 1);
        assert_eq!(outcome.best.number_of_unassigned_requests(), 0);
    }

    #[test]
    fn construction_attempts_count_against_the_shrink_budget() {
        let params = ParametersBuilder::default()
            .iteration_num(50u64)
            .tau(20u64)
            .theta(1u64)
            .remove_lower_bound(1usize)
            .remove_upper_bound(1usize)
            .epsilon(0.5)
            .segment_num(10u64)
            .build()
            .unwrap();
        let requests = vec![exclusive_request(3), exclusive_request(3)];
        let instance = instance_with_requests(1, 3, &requests, params);
        let mut rng = create_seeded_rng(31);
        let outcome = two_stage_fleet_minimization(instance, &mut rng).unwrap();
        // construction needs three attempts (one failure forces the second
        // vehicle), which already exhausts theta = 1; only the full-length
        // final search may add iterations after that
        assert_eq!(outcome.iterations, 3 + 50);
        assert_eq!(outcome.instance.num_vehicles(), 2);
        assert_eq!(outcome.best.number_of_unassigned_requests(), 0);
    }

    #[test]
    fn shrink_probe_without_routes_is_abandoned() {
        let instance = instance_with_requests(
            1,
            10,
            &[relaxed_request(1.0, 2.0)],
            small_budget_params(),
        );
        let mut rng = create_seeded_rng(31);
        assert!(shrink_probe(&instance, Vec::new(), &mut rng, 20).is_none());
    }

    #[test]
    fn unservable_request_is_a_fatal_error() {
        let impossible = FixtureRequest {
            pickup: (1.0, 0.0),
            delivery: (500.0, 0.0),
            pickup_window: (0.0, 100.0),
            delivery_window: (0.0, 10.0),
            demand: 1,
        };
        let instance = instance_with_requests(1, 10, &[impossible], small_budget_params());
        let mut rng = create_seeded_rng(31);
        assert!(two_stage_fleet_minimization(instance, &mut rng).is_err());
    }

    #[test]
    fn mixed_fleets_are_rejected() {
        let nodes = vec![
            Node {
                id: 0,
                node_type: NodeType::Depot,
                x: 0.0,
                y: 0.0,
                demand: 0,
                ready: 0.0,
                due: 1000.0,
                servicetime: 0.0,
            },
            Node {
                id: 1,
                node_type: NodeType::Depot,
                x: 0.0,
                y: 0.0,
                demand: 0,
                ready: 0.0,
                due: 1000.0,
                servicetime: 0.0,
            },
            Node {
                id: 2,
                node_type: NodeType::Pickup,
                x: 1.0,
                y: 0.0,
                demand: 1,
                ready: 0.0,
                due: 1000.0,
                servicetime: 0.0,
            },
            Node {
                id: 3,
                node_type: NodeType::Delivery,
                x: 2.0,
                y: 0.0,
                demand: -1,
                ready: 0.0,
                due: 1000.0,
                servicetime: 0.0,
            },
        ];
        let vehicles = vec![
            Vehicle {
                id: 0,
                capacity: 10,
                speed: 1.0,
                start_depot: 0,
                end_depot: 1,
            },
            Vehicle {
                id: 1,
                capacity: 5,
                speed: 1.0,
                start_depot: 0,
                end_depot: 1,
            },
        ];
        let requests = vec![Request {
            id: 0,
            pickup: 2,
            delivery: 3,
            demand: 1,
            eligible_vehicles: AHashSet::from_iter([0, 1]),
        }];
        let instance = PDPTWInstance::build(
            "mixed",
            nodes,
            requests,
            vehicles,
            small_budget_params(),
        )
        .unwrap();
        let mut rng = create_seeded_rng(31);
        assert!(two_stage_fleet_minimization(instance, &mut rng).is_err());
    }
}
