use std::cell::Cell;
use std::hash::{BuildHasher, Hasher};

use ahash::{AHashMap, AHashSet, RandomState};
use anyhow::{bail, ensure, Result};

use crate::problem::pdptw::PDPTWInstance;
use crate::problem::{NodeId, Num, RequestId, VehicleId};

pub mod description;
pub mod route;

pub use description::SolutionDescription;
pub use route::{CostDelta, Route};

// fixed hasher seeds so fingerprints are comparable across runs
const FINGERPRINT_SEEDS: (u64, u64, u64, u64) = (
    0x9e3779b97f4a7c15,
    0x6a09e667f3bcc909,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
);

/// One assignment of requests to vehicle tours, always kept feasible. Banked
/// vehicles are idle, banked requests unserved.
#[derive(Clone)]
pub struct Solution<'a> {
    pub instance: &'a PDPTWInstance,
    routes: AHashMap<VehicleId, Route>,
    vehicle_bank: AHashSet<VehicleId>,
    request_bank: AHashSet<RequestId>,
    request_to_vehicle: AHashMap<RequestId, VehicleId>,
    node_to_vehicle: AHashMap<NodeId, VehicleId>,
    distance_cost: Num,
    time_cost: Num,
    fingerprint: Cell<Option<u64>>,
}

impl<'a> Solution<'a> {
    /// All vehicles idle, all requests unserved.
    pub fn new(instance: &'a PDPTWInstance) -> Self {
        Self {
            instance,
            routes: AHashMap::new(),
            vehicle_bank: instance.vehicle_ids().iter().copied().collect(),
            request_bank: instance.request_ids().iter().copied().collect(),
            request_to_vehicle: AHashMap::new(),
            node_to_vehicle: AHashMap::new(),
            distance_cost: 0.0,
            time_cost: 0.0,
            fingerprint: Cell::new(None),
        }
    }

    /// Rebuilds a solution from plain route sequences, e.g. out of a
    /// [`SolutionDescription`] taken before the instance was modified.
    /// Requests absent from every route end up in the bank.
    pub fn from_routes(
        instance: &'a PDPTWInstance,
        routes: Vec<(VehicleId, Vec<NodeId>)>,
    ) -> Result<Self> {
        let mut solution = Self::new(instance);
        for (vehicle_id, nodes) in routes {
            ensure!(
                instance.vehicle_ids().binary_search(&vehicle_id).is_ok(),
                "route references unknown vehicle {}",
                vehicle_id
            );
            ensure!(
                !solution.routes.contains_key(&vehicle_id),
                "vehicle {} appears in two routes",
                vehicle_id
            );
            ensure!(
                nodes.len() >= 2,
                "route of vehicle {} is missing its depots",
                vehicle_id
            );
            let mut open: AHashSet<RequestId> = AHashSet::new();
            for node_id in &nodes[1..nodes.len() - 1] {
                let request_id = match instance.request_id_of_node(*node_id) {
                    Some(id) => id,
                    None => bail!("route of vehicle {} visits depot node {}", vehicle_id, node_id),
                };
                if instance.is_pickup(*node_id) {
                    ensure!(
                        solution.request_bank.remove(&request_id),
                        "request {} appears twice",
                        request_id
                    );
                    open.insert(request_id);
                } else {
                    ensure!(
                        open.remove(&request_id),
                        "delivery of request {} precedes its pickup",
                        request_id
                    );
                }
                solution.node_to_vehicle.insert(*node_id, vehicle_id);
                solution.request_to_vehicle.insert(request_id, vehicle_id);
            }
            ensure!(
                open.is_empty(),
                "route of vehicle {} drops off-route deliveries",
                vehicle_id
            );
            let route = match Route::new(instance, vehicle_id, nodes) {
                Some(route) => route,
                None => bail!("route of vehicle {} is infeasible", vehicle_id),
            };
            solution.distance_cost += route.whole_distance_cost();
            solution.time_cost += route.whole_time_cost();
            solution.vehicle_bank.remove(&vehicle_id);
            solution.routes.insert(vehicle_id, route);
        }
        Ok(solution)
    }

    pub fn objective(&self) -> Num {
        let params = self.instance.params();
        self.objective_without_bank() + params.gamma * self.request_bank.len() as Num
    }

    /// Routing cost alone; seeds the annealing temperature.
    pub fn objective_without_bank(&self) -> Num {
        let params = self.instance.params();
        params.alpha * self.distance_cost + params.beta * self.time_cost
    }

    pub fn number_of_unassigned_requests(&self) -> usize {
        self.request_bank.len()
    }

    pub fn number_of_assigned_requests(&self) -> usize {
        self.request_to_vehicle.len()
    }

    pub fn number_of_vehicles_used(&self) -> usize {
        self.routes.len()
    }

    pub fn is_request_assigned(&self, request_id: RequestId) -> bool {
        self.request_to_vehicle.contains_key(&request_id)
    }

    pub fn vehicle_of_request(&self, request_id: RequestId) -> Option<VehicleId> {
        self.request_to_vehicle.get(&request_id).copied()
    }

    pub fn route(&self, vehicle_id: VehicleId) -> Option<&Route> {
        self.routes.get(&vehicle_id)
    }

    /// Assigned request ids in ascending order.
    pub fn assigned_request_ids(&self) -> Vec<RequestId> {
        let mut ids: Vec<_> = self.request_to_vehicle.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Banked request ids in ascending order.
    pub fn unassigned_request_ids(&self) -> Vec<RequestId> {
        let mut ids: Vec<_> = self.request_bank.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn node_start_time(&self, node_id: NodeId) -> Option<Num> {
        let vehicle_id = self.node_to_vehicle.get(&node_id)?;
        self.routes[vehicle_id].node_start_time(node_id)
    }

    /// Weighted cost saved by taking the request out of its route.
    pub fn cost_if_remove(&self, request_id: RequestId) -> Result<Num> {
        let vehicle_id = match self.request_to_vehicle.get(&request_id) {
            Some(v) => *v,
            None => bail!("cannot evaluate removing unassigned request {}", request_id),
        };
        let mut scratch = self.routes[&vehicle_id].clone();
        let delta = scratch.remove_request(self.instance, request_id)?;
        Ok(delta.weighted(self.instance.params()))
    }

    /// Weighted cost of the request's best position in the given vehicle, or
    /// `None` when no feasible position exists. Leaves the solution as is.
    pub fn cost_if_insert(&self, request_id: RequestId, vehicle_id: VehicleId) -> Option<Num> {
        debug_assert!(self.request_bank.contains(&request_id));
        let best = match self.routes.get(&vehicle_id) {
            Some(route) => route.find_best_insertion(self.instance, request_id),
            None => Route::empty(self.instance, vehicle_id)?
                .find_best_insertion(self.instance, request_id),
        };
        best.map(|(_, _, delta)| delta.weighted(self.instance.params()))
    }

    /// Inserts the request at its best position in the given vehicle.
    /// `Ok(false)` when the vehicle has no feasible position.
    pub fn insert_request_to_vehicle(
        &mut self,
        request_id: RequestId,
        vehicle_id: VehicleId,
    ) -> Result<bool> {
        ensure!(
            self.request_bank.contains(&request_id),
            "request {} is already assigned",
            request_id
        );
        ensure!(
            self.instance.vehicle_ids().binary_search(&vehicle_id).is_ok(),
            "unknown vehicle {}",
            vehicle_id
        );
        let mut route = match self.routes.get(&vehicle_id) {
            Some(route) => route.clone(),
            None => match Route::empty(self.instance, vehicle_id) {
                Some(route) => route,
                None => bail!("vehicle {} cannot even run its empty tour", vehicle_id),
            },
        };
        let (pickup_pos, delivery_pos) = match route.find_best_insertion(self.instance, request_id)
        {
            Some((p, d, _)) => (p, d),
            None => return Ok(false),
        };
        let delta = match route.try_insert_request(self.instance, request_id, pickup_pos, delivery_pos)
        {
            Some(delta) => delta,
            None => bail!(
                "best position for request {} in vehicle {} did not commit",
                request_id,
                vehicle_id
            ),
        };

        let request = self.instance.request(request_id);
        self.routes.insert(vehicle_id, route);
        self.vehicle_bank.remove(&vehicle_id);
        self.request_bank.remove(&request_id);
        self.request_to_vehicle.insert(request_id, vehicle_id);
        self.node_to_vehicle.insert(request.pickup, vehicle_id);
        self.node_to_vehicle.insert(request.delivery, vehicle_id);
        self.distance_cost += delta.distance;
        self.time_cost += delta.time;
        self.fingerprint.set(None);
        Ok(true)
    }

    /// Inserts the request at its globally cheapest position over the whole
    /// fleet, idle vehicles included. Lower vehicle ids win ties.
    pub fn insert_request_to_any_vehicle(&mut self, request_id: RequestId) -> Result<bool> {
        let mut best: Option<(VehicleId, Num)> = None;
        for vehicle_id in self.instance.vehicle_ids() {
            if let Some(cost) = self.cost_if_insert(request_id, *vehicle_id) {
                if best.map_or(true, |(_, c)| cost < c) {
                    best = Some((*vehicle_id, cost));
                }
            }
        }
        match best {
            Some((vehicle_id, _)) => self.insert_request_to_vehicle(request_id, vehicle_id),
            None => Ok(false),
        }
    }

    /// Takes all given requests out of their routes. A vehicle whose route
    /// runs empty returns to the bank.
    pub fn remove_requests(&mut self, request_ids: &[RequestId]) -> Result<()> {
        for request_id in request_ids {
            let vehicle_id = match self.request_to_vehicle.remove(request_id) {
                Some(v) => v,
                None => bail!("cannot remove unassigned request {}", request_id),
            };
            let route = match self.routes.get_mut(&vehicle_id) {
                Some(route) => route,
                None => bail!("missing route for vehicle {}", vehicle_id),
            };
            let delta = route.remove_request(self.instance, *request_id)?;
            self.distance_cost -= delta.distance;
            self.time_cost -= delta.time;

            let request = self.instance.request(*request_id);
            self.node_to_vehicle.remove(&request.pickup);
            self.node_to_vehicle.remove(&request.delivery);
            self.request_bank.insert(*request_id);
            if route.is_empty() {
                self.routes.remove(&vehicle_id);
                self.vehicle_bank.insert(vehicle_id);
            }
        }
        self.fingerprint.set(None);
        Ok(())
    }

    /// Structural hash over the sorted routes; cached until the next edit.
    pub fn fingerprint(&self) -> u64 {
        if let Some(fp) = self.fingerprint.get() {
            return fp;
        }
        let (k0, k1, k2, k3) = FINGERPRINT_SEEDS;
        let mut hasher = RandomState::with_seeds(k0, k1, k2, k3).build_hasher();
        let mut vehicle_ids: Vec<_> = self.routes.keys().copied().collect();
        vehicle_ids.sort_unstable();
        for vehicle_id in vehicle_ids {
            hasher.write_usize(vehicle_id);
            let route = &self.routes[&vehicle_id];
            hasher.write_usize(route.len());
            for node_id in route.nodes() {
                hasher.write_usize(*node_id);
            }
        }
        let fp = hasher.finish();
        self.fingerprint.set(Some(fp));
        fp
    }

    pub fn to_description(&self) -> SolutionDescription {
        SolutionDescription::new(
            self.routes
                .iter()
                .map(|(vehicle_id, route)| (*vehicle_id, route.nodes().to_vec()))
                .collect(),
            self.request_bank.iter().copied().collect(),
            self.distance_cost,
            self.time_cost,
            self.objective(),
        )
    }
}
