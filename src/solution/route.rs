use anyhow::{bail, Result};

use crate::problem::params::Parameters;
use crate::problem::pdptw::PDPTWInstance;
use crate::problem::{Capacity, NodeId, Num, RequestId, VehicleId};

/// Raw cost change of a route edit. Positive values mean "more" for
/// insertions and "saved" for removals.
#[derive(Clone, Copy, Debug, Default)]
pub struct CostDelta {
    pub distance: Num,
    pub time: Num,
}

impl CostDelta {
    pub fn weighted(&self, params: &Parameters) -> Num {
        params.alpha * self.distance + params.beta * self.time
    }
}

/// One vehicle's tour, depot to depot, with schedule lines kept in lockstep
/// with the node sequence: service-start times, onboard loads, cumulative
/// distance and cumulative travel time.
#[derive(Clone, Debug)]
pub struct Route {
    pub vehicle_id: VehicleId,
    nodes: Vec<NodeId>,
    start_times: Vec<Num>,
    loads: Vec<Capacity>,
    cum_distance: Vec<Num>,
    cum_time: Vec<Num>,
}

struct Lines {
    start_times: Vec<Num>,
    loads: Vec<Capacity>,
    cum_distance: Vec<Num>,
    cum_time: Vec<Num>,
}

impl Route {
    /// Builds a route over the given node sequence, or `None` when a time
    /// window or the capacity is violated along it.
    pub fn new(instance: &PDPTWInstance, vehicle_id: VehicleId, nodes: Vec<NodeId>) -> Option<Self> {
        let lines = compute_lines(instance, vehicle_id, &nodes)?;
        Some(Self {
            vehicle_id,
            nodes,
            start_times: lines.start_times,
            loads: lines.loads,
            cum_distance: lines.cum_distance,
            cum_time: lines.cum_time,
        })
    }

    pub fn empty(instance: &PDPTWInstance, vehicle_id: VehicleId) -> Option<Self> {
        let vehicle = instance.vehicle(vehicle_id);
        Self::new(instance, vehicle_id, vec![vehicle.start_depot, vehicle.end_depot])
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Only the depot pair left.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 2
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn whole_distance_cost(&self) -> Num {
        self.cum_distance.last().copied().unwrap_or_default()
    }

    pub fn whole_time_cost(&self) -> Num {
        self.cum_time.last().copied().unwrap_or_default()
    }

    pub fn node_start_time(&self, node_id: NodeId) -> Option<Num> {
        self.nodes
            .iter()
            .position(|n| *n == node_id)
            .map(|idx| self.start_times[idx])
    }

    /// Splices the request's pickup before position `pickup_pos` and its
    /// delivery before `delivery_pos` (counted in the pickup-extended
    /// sequence). Commits only when the edited route stays feasible and
    /// returns the cost added.
    pub fn try_insert_request(
        &mut self,
        instance: &PDPTWInstance,
        request_id: RequestId,
        pickup_pos: usize,
        delivery_pos: usize,
    ) -> Option<CostDelta> {
        let request = instance.request(request_id);
        if !request.eligible_vehicles.contains(&self.vehicle_id) {
            return None;
        }
        // positions outside the splice range are rejected, not committed
        if pickup_pos < 1 || pickup_pos >= delivery_pos || delivery_pos > self.nodes.len() {
            return None;
        }

        let mut candidate = Vec::with_capacity(self.nodes.len() + 2);
        candidate.extend_from_slice(&self.nodes[..pickup_pos]);
        candidate.push(request.pickup);
        candidate.extend_from_slice(&self.nodes[pickup_pos..delivery_pos - 1]);
        candidate.push(request.delivery);
        candidate.extend_from_slice(&self.nodes[delivery_pos - 1..]);

        let lines = compute_lines(instance, self.vehicle_id, &candidate)?;
        let delta = CostDelta {
            distance: lines.cum_distance.last().copied().unwrap_or_default()
                - self.whole_distance_cost(),
            time: lines.cum_time.last().copied().unwrap_or_default() - self.whole_time_cost(),
        };
        self.nodes = candidate;
        self.start_times = lines.start_times;
        self.loads = lines.loads;
        self.cum_distance = lines.cum_distance;
        self.cum_time = lines.cum_time;
        Some(delta)
    }

    /// Scans every ordered pickup/delivery position pair and returns the
    /// cheapest feasible one. Earlier pairs win ties.
    pub fn find_best_insertion(
        &self,
        instance: &PDPTWInstance,
        request_id: RequestId,
    ) -> Option<(usize, usize, CostDelta)> {
        let request = instance.request(request_id);
        if !request.eligible_vehicles.contains(&self.vehicle_id) {
            return None;
        }
        let params = instance.params();
        let mut best: Option<(usize, usize, CostDelta)> = None;
        let mut best_cost = Num::MAX;
        let mut candidate = Vec::with_capacity(self.nodes.len() + 2);
        for pickup_pos in 1..self.nodes.len() {
            for delivery_pos in (pickup_pos + 1)..=self.nodes.len() {
                candidate.clear();
                candidate.extend_from_slice(&self.nodes[..pickup_pos]);
                candidate.push(request.pickup);
                candidate.extend_from_slice(&self.nodes[pickup_pos..delivery_pos - 1]);
                candidate.push(request.delivery);
                candidate.extend_from_slice(&self.nodes[delivery_pos - 1..]);

                if let Some(lines) = compute_lines(instance, self.vehicle_id, &candidate) {
                    let delta = CostDelta {
                        distance: lines.cum_distance.last().copied().unwrap_or_default()
                            - self.whole_distance_cost(),
                        time: lines.cum_time.last().copied().unwrap_or_default()
                            - self.whole_time_cost(),
                    };
                    let cost = delta.weighted(params);
                    if cost < best_cost {
                        best_cost = cost;
                        best = Some((pickup_pos, delivery_pos, delta));
                    }
                }
            }
        }
        best
    }

    /// Drops the request's node pair and returns the cost saved. The
    /// remaining sequence can only relax, so a violation here is an internal
    /// error.
    pub fn remove_request(
        &mut self,
        instance: &PDPTWInstance,
        request_id: RequestId,
    ) -> Result<CostDelta> {
        let request = instance.request(request_id);
        if !self.nodes.contains(&request.pickup) {
            bail!(
                "request {} is not part of the route of vehicle {}",
                request_id,
                self.vehicle_id
            );
        }
        let candidate: Vec<NodeId> = self
            .nodes
            .iter()
            .copied()
            .filter(|n| *n != request.pickup && *n != request.delivery)
            .collect();
        debug_assert_eq!(candidate.len(), self.nodes.len() - 2);

        let lines = match compute_lines(instance, self.vehicle_id, &candidate) {
            Some(lines) => lines,
            None => bail!(
                "removing request {} broke the route of vehicle {}",
                request_id,
                self.vehicle_id
            ),
        };
        let delta = CostDelta {
            distance: self.whole_distance_cost()
                - lines.cum_distance.last().copied().unwrap_or_default(),
            time: self.whole_time_cost() - lines.cum_time.last().copied().unwrap_or_default(),
        };
        self.nodes = candidate;
        self.start_times = lines.start_times;
        self.loads = lines.loads;
        self.cum_distance = lines.cum_distance;
        self.cum_time = lines.cum_time;
        Ok(delta)
    }
}

fn compute_lines(
    instance: &PDPTWInstance,
    vehicle_id: VehicleId,
    nodes: &[NodeId],
) -> Option<Lines> {
    let capacity = instance.vehicle(vehicle_id).capacity;
    let first = instance.node(nodes[0]);

    let mut start_times = Vec::with_capacity(nodes.len());
    let mut loads = Vec::with_capacity(nodes.len());
    let mut cum_distance = Vec::with_capacity(nodes.len());
    let mut cum_time = Vec::with_capacity(nodes.len());

    start_times.push(first.ready);
    loads.push(first.demand);
    cum_distance.push(0.0);
    cum_time.push(0.0);

    for i in 1..nodes.len() {
        let prev = instance.node(nodes[i - 1]);
        let node = instance.node(nodes[i]);
        let travel = instance.time(vehicle_id, prev.id, node.id);
        let arrival = start_times[i - 1] + prev.servicetime + travel;
        let start = arrival.max(node.ready);
        if start > node.due {
            return None;
        }
        let load = loads[i - 1] + node.demand;
        if load > capacity {
            return None;
        }
        start_times.push(start);
        loads.push(load);
        cum_distance.push(cum_distance[i - 1] + instance.distance(prev.id, node.id));
        cum_time.push(cum_time[i - 1] + travel);
    }
    Some(Lines {
        start_times,
        loads,
        cum_distance,
        cum_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::params::Parameters;
    use crate::problem::test_fixtures::{instance_with_requests, relaxed_request, FixtureRequest};

    #[test]
    fn insert_then_remove_restores_the_empty_route() {
        let instance =
            instance_with_requests(1, 10, &[relaxed_request(1.0, 2.0)], Parameters::default());
        let mut route = Route::empty(&instance, 0).unwrap();
        let before = route.nodes().to_vec();

        let added = route.try_insert_request(&instance, 0, 1, 2).unwrap();
        assert_eq!(route.len(), 4);
        assert!(added.distance > 0.0);

        let saved = route.remove_request(&instance, 0).unwrap();
        assert_eq!(route.nodes(), &before[..]);
        assert!((saved.distance - added.distance).abs() < 1e-9);
        assert_eq!(route.whole_distance_cost(), 0.0);
    }

    #[test]
    fn out_of_range_positions_are_rejected() {
        let instance =
            instance_with_requests(1, 10, &[relaxed_request(1.0, 2.0)], Parameters::default());
        let mut route = Route::empty(&instance, 0).unwrap();
        assert!(route.try_insert_request(&instance, 0, 0, 1).is_none());
        assert!(route.try_insert_request(&instance, 0, 2, 1).is_none());
        assert!(route.try_insert_request(&instance, 0, 1, route.len() + 1).is_none());
        assert!(route.is_empty());
    }

    #[test]
    fn infeasible_position_leaves_the_route_untouched() {
        // delivery window closes before any vehicle can get there
        let late = FixtureRequest {
            pickup: (1.0, 0.0),
            delivery: (500.0, 0.0),
            pickup_window: (0.0, 100.0),
            delivery_window: (0.0, 10.0),
            demand: 1,
        };
        let instance = instance_with_requests(1, 10, &[late], Parameters::default());
        let mut route = Route::empty(&instance, 0).unwrap();
        assert!(route.try_insert_request(&instance, 0, 1, 2).is_none());
        assert!(route.is_empty());
    }

    #[test]
    fn capacity_overflow_is_rejected() {
        let mut heavy = relaxed_request(1.0, 2.0);
        heavy.demand = 4;
        let instance = instance_with_requests(
            1,
            6,
            &[heavy, {
                let mut other = relaxed_request(1.5, 2.5);
                other.demand = 4;
                other
            }],
            Parameters::default(),
        );
        let mut route = Route::empty(&instance, 0).unwrap();
        assert!(route.try_insert_request(&instance, 0, 1, 2).is_some());
        // nesting the second request inside the first exceeds capacity
        assert!(route.try_insert_request(&instance, 1, 2, 3).is_none());
        // appending it after the first delivery is fine
        assert!(route.try_insert_request(&instance, 1, 3, 4).is_some());
    }

    #[test]
    fn best_insertion_prefers_the_cheaper_pair() {
        let instance = instance_with_requests(
            1,
            10,
            &[relaxed_request(1.0, 2.0), relaxed_request(3.0, 4.0)],
            Parameters::default(),
        );
        let mut route = Route::empty(&instance, 0).unwrap();
        route.try_insert_request(&instance, 0, 1, 2).unwrap();

        let (pickup_pos, delivery_pos, delta) =
            route.find_best_insertion(&instance, 1).unwrap();
        // interleaving (2,3) and appending (3,4) both add a cost of 4; the
        // earlier pair wins the tie
        assert_eq!((pickup_pos, delivery_pos), (2, 3));
        let committed = route
            .try_insert_request(&instance, 1, pickup_pos, delivery_pos)
            .unwrap();
        assert!((committed.weighted(instance.params()) - delta.weighted(instance.params())).abs() < 1e-9);
    }

    #[test]
    fn schedule_respects_ready_times() {
        let waiting = FixtureRequest {
            pickup: (1.0, 0.0),
            pickup_window: (50.0, 100.0),
            delivery: (2.0, 0.0),
            delivery_window: (0.0, 200.0),
            demand: 1,
        };
        let instance = instance_with_requests(1, 10, &[waiting], Parameters::default());
        let mut route = Route::empty(&instance, 0).unwrap();
        route.try_insert_request(&instance, 0, 1, 2).unwrap();
        let pickup = instance.request(0).pickup;
        let delivery = instance.request(0).delivery;
        assert_eq!(route.node_start_time(pickup), Some(50.0));
        assert_eq!(route.node_start_time(delivery), Some(51.0));
    }
}
