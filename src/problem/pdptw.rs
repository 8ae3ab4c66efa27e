use std::fmt::{Debug, Formatter};

use ahash::{AHashMap, AHashSet};
use anyhow::{bail, ensure, Result};

use crate::problem::params::Parameters;
use crate::problem::{Capacity, NodeId, Num, RequestId, VehicleId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeType {
    Depot,
    Pickup,
    Delivery,
}

impl NodeType {
    pub fn is_depot(&self) -> bool {
        matches!(self, Self::Depot)
    }
    pub fn is_pickup(&self) -> bool {
        matches!(self, Self::Pickup)
    }
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery)
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub x: f64,
    pub y: f64,
    /// load change on visiting; positive for pickups, negative for deliveries
    pub demand: Capacity,
    pub ready: Num,
    pub due: Num,
    pub servicetime: Num,
}

#[derive(Clone, Debug)]
pub struct Request {
    pub id: RequestId,
    pub pickup: NodeId,
    pub delivery: NodeId,
    pub demand: Capacity,
    pub eligible_vehicles: AHashSet<VehicleId>,
}

#[derive(Clone, Debug)]
pub struct Vehicle {
    pub id: VehicleId,
    pub capacity: Capacity,
    pub speed: Num,
    pub start_depot: NodeId,
    pub end_depot: NodeId,
}

/// Immutable problem data during a search. Between searches the fleet can be
/// grown or shrunk, which keeps the matrices and eligibility sets in sync.
#[derive(Clone)]
pub struct PDPTWInstance {
    pub name: String,
    nodes: AHashMap<NodeId, Node>,
    requests: AHashMap<RequestId, Request>,
    vehicles: AHashMap<VehicleId, Vehicle>,
    node_to_request: AHashMap<NodeId, RequestId>,
    request_ids: Vec<RequestId>,
    vehicle_ids: Vec<VehicleId>,
    distances: AHashMap<(NodeId, NodeId), Num>,
    travel_times: AHashMap<VehicleId, AHashMap<(NodeId, NodeId), Num>>,
    max_distance: Num,
    params: Parameters,
}

impl Debug for PDPTWInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PDPTW instance '{}': {} requests, {} vehicles, {} nodes",
            self.name,
            self.request_ids.len(),
            self.vehicle_ids.len(),
            self.nodes.len(),
        )
    }
}

impl PDPTWInstance {
    /// Builds an instance from raw elements, computing the Euclidean distance
    /// matrix and per-vehicle travel times, and checks referential integrity.
    pub fn build(
        name: impl Into<String>,
        nodes: Vec<Node>,
        requests: Vec<Request>,
        vehicles: Vec<Vehicle>,
        params: Parameters,
    ) -> Result<Self> {
        params.validate()?;

        let mut node_map = AHashMap::with_capacity(nodes.len());
        for node in nodes {
            ensure!(
                node.ready <= node.due,
                "node {} has an empty time window [{}, {}]",
                node.id,
                node.ready,
                node.due
            );
            ensure!(
                node_map.insert(node.id, node).is_none(),
                "duplicate node id"
            );
        }

        let mut vehicle_map = AHashMap::with_capacity(vehicles.len());
        let mut vehicle_ids = Vec::with_capacity(vehicles.len());
        for vehicle in vehicles {
            ensure!(
                vehicle.speed > 0.0,
                "vehicle {} has non-positive speed",
                vehicle.id
            );
            for depot in [vehicle.start_depot, vehicle.end_depot] {
                match node_map.get(&depot) {
                    Some(node) => ensure!(
                        node.node_type.is_depot(),
                        "vehicle {} references node {} as depot",
                        vehicle.id,
                        depot
                    ),
                    None => bail!("vehicle {} references unknown node {}", vehicle.id, depot),
                }
            }
            vehicle_ids.push(vehicle.id);
            ensure!(
                vehicle_map.insert(vehicle.id, vehicle).is_none(),
                "duplicate vehicle id"
            );
        }
        vehicle_ids.sort_unstable();

        let mut request_map = AHashMap::with_capacity(requests.len());
        let mut request_ids = Vec::with_capacity(requests.len());
        let mut node_to_request = AHashMap::new();
        for request in requests {
            ensure!(request.demand > 0, "request {} has no demand", request.id);
            match (node_map.get(&request.pickup), node_map.get(&request.delivery)) {
                (Some(pickup), Some(delivery)) => {
                    ensure!(
                        pickup.node_type.is_pickup() && pickup.demand == request.demand,
                        "pickup node {} does not match request {}",
                        request.pickup,
                        request.id
                    );
                    ensure!(
                        delivery.node_type.is_delivery() && delivery.demand == -request.demand,
                        "delivery node {} does not match request {}",
                        request.delivery,
                        request.id
                    );
                }
                _ => bail!("request {} references unknown nodes", request.id),
            }
            ensure!(
                !request.eligible_vehicles.is_empty()
                    && request
                        .eligible_vehicles
                        .iter()
                        .all(|v| vehicle_map.contains_key(v)),
                "request {} has an invalid eligible-vehicle set",
                request.id
            );
            node_to_request.insert(request.pickup, request.id);
            node_to_request.insert(request.delivery, request.id);
            request_ids.push(request.id);
            ensure!(
                request_map.insert(request.id, request).is_none(),
                "duplicate request id"
            );
        }
        request_ids.sort_unstable();

        let mut distances = AHashMap::with_capacity(node_map.len() * node_map.len());
        let mut max_distance: Num = 0.0;
        for from in node_map.values() {
            for to in node_map.values() {
                let d = ((from.x - to.x).powi(2) + (from.y - to.y).powi(2)).sqrt();
                max_distance = max_distance.max(d);
                distances.insert((from.id, to.id), d);
            }
        }

        let mut travel_times = AHashMap::with_capacity(vehicle_map.len());
        for vehicle in vehicle_map.values() {
            let times = distances
                .iter()
                .map(|(arc, d)| (*arc, d / vehicle.speed))
                .collect();
            travel_times.insert(vehicle.id, times);
        }

        Ok(Self {
            name: name.into(),
            nodes: node_map,
            requests: request_map,
            vehicles: vehicle_map,
            node_to_request,
            request_ids,
            vehicle_ids,
            distances,
            travel_times,
            max_distance,
            params,
        })
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[&id]
    }
    pub fn request(&self, id: RequestId) -> &Request {
        &self.requests[&id]
    }
    pub fn vehicle(&self, id: VehicleId) -> &Vehicle {
        &self.vehicles[&id]
    }

    pub fn num_requests(&self) -> usize {
        self.request_ids.len()
    }
    pub fn num_vehicles(&self) -> usize {
        self.vehicle_ids.len()
    }

    /// Request ids in ascending order.
    pub fn request_ids(&self) -> &[RequestId] {
        &self.request_ids
    }
    /// Vehicle ids in ascending order.
    pub fn vehicle_ids(&self) -> &[VehicleId] {
        &self.vehicle_ids
    }

    pub fn request_id_of_node(&self, node_id: NodeId) -> Option<RequestId> {
        self.node_to_request.get(&node_id).copied()
    }
    pub fn is_pickup(&self, node_id: NodeId) -> bool {
        self.nodes[&node_id].node_type.is_pickup()
    }

    pub fn distance(&self, from: NodeId, to: NodeId) -> Num {
        self.distances[&(from, to)]
    }
    pub fn time(&self, vehicle_id: VehicleId, from: NodeId, to: NodeId) -> Num {
        self.travel_times[&vehicle_id][&(from, to)]
    }
    pub fn max_distance(&self) -> Num {
        self.max_distance
    }

    pub fn max_vehicle_id(&self) -> Option<VehicleId> {
        self.vehicle_ids.last().copied()
    }

    /// Whether all vehicles are interchangeable: same capacity and speed,
    /// depots identical in place and time window, and every request open to
    /// every vehicle.
    pub fn is_homogeneous_fleet(&self) -> bool {
        let mut iter = self.vehicle_ids.iter();
        let first = match iter.next() {
            Some(id) => &self.vehicles[id],
            None => return true,
        };
        let depots_match = |a: NodeId, b: NodeId| {
            let (a, b) = (&self.nodes[&a], &self.nodes[&b]);
            a.x == b.x
                && a.y == b.y
                && a.ready == b.ready
                && a.due == b.due
                && a.servicetime == b.servicetime
        };
        iter.all(|id| {
            let v = &self.vehicles[id];
            v.capacity == first.capacity
                && v.speed == first.speed
                && depots_match(v.start_depot, first.start_depot)
                && depots_match(v.end_depot, first.end_depot)
        }) && self
            .requests
            .values()
            .all(|r| r.eligible_vehicles.len() == self.vehicle_ids.len())
    }

    /// Adds a vehicle identical to the highest-id one, with fresh depot node
    /// copies. Matrices and eligibility sets are extended accordingly.
    pub fn add_same_type_vehicle(&mut self) -> Result<VehicleId> {
        let reference = match self.max_vehicle_id() {
            Some(id) => self.vehicles[&id].clone(),
            None => bail!("cannot clone a vehicle out of an empty fleet"),
        };
        let next_node_id = self
            .nodes
            .keys()
            .max()
            .map(|id| id + 1)
            .unwrap_or_default();
        let new_vehicle_id = reference.id + 1;

        let mut start_depot = self.nodes[&reference.start_depot].clone();
        start_depot.id = next_node_id;
        let mut end_depot = self.nodes[&reference.end_depot].clone();
        end_depot.id = next_node_id + 1;

        for depot in [&start_depot, &end_depot] {
            for node in self.nodes.values() {
                let d = ((depot.x - node.x).powi(2) + (depot.y - node.y).powi(2)).sqrt();
                self.max_distance = self.max_distance.max(d);
                self.distances.insert((depot.id, node.id), d);
                self.distances.insert((node.id, depot.id), d);
            }
        }
        let depot_dist = ((start_depot.x - end_depot.x).powi(2)
            + (start_depot.y - end_depot.y).powi(2))
        .sqrt();
        for arc in [
            (start_depot.id, end_depot.id),
            (end_depot.id, start_depot.id),
        ] {
            self.distances.insert(arc, depot_dist);
        }
        for arc in [
            (start_depot.id, start_depot.id),
            (end_depot.id, end_depot.id),
        ] {
            self.distances.insert(arc, 0.0);
        }

        let new_node_ids = [start_depot.id, end_depot.id];
        self.nodes.insert(start_depot.id, start_depot);
        self.nodes.insert(end_depot.id, end_depot);

        // existing vehicles never visit the new depots, but their matrices
        // stay total over the node set
        for (vehicle_id, times) in self.travel_times.iter_mut() {
            let speed = self.vehicles[vehicle_id].speed;
            for new_id in new_node_ids {
                for node_id in self.nodes.keys() {
                    times.insert(
                        (new_id, *node_id),
                        self.distances[&(new_id, *node_id)] / speed,
                    );
                    times.insert(
                        (*node_id, new_id),
                        self.distances[&(*node_id, new_id)] / speed,
                    );
                }
            }
        }
        let times = self
            .distances
            .iter()
            .map(|(arc, d)| (*arc, d / reference.speed))
            .collect();
        self.travel_times.insert(new_vehicle_id, times);

        self.vehicles.insert(
            new_vehicle_id,
            Vehicle {
                id: new_vehicle_id,
                capacity: reference.capacity,
                speed: reference.speed,
                start_depot: new_node_ids[0],
                end_depot: new_node_ids[1],
            },
        );
        self.vehicle_ids.push(new_vehicle_id);
        for request in self.requests.values_mut() {
            request.eligible_vehicles.insert(new_vehicle_id);
        }
        Ok(new_vehicle_id)
    }

    /// Removes a vehicle, its private depot nodes, and all matrix rows and
    /// eligibility entries referring to it.
    pub fn remove_vehicle(&mut self, vehicle_id: VehicleId) -> Result<()> {
        let vehicle = match self.vehicles.remove(&vehicle_id) {
            Some(v) => v,
            None => bail!("cannot remove unknown vehicle {}", vehicle_id),
        };
        self.vehicle_ids.retain(|id| *id != vehicle_id);
        self.travel_times.remove(&vehicle_id);

        for depot in [vehicle.start_depot, vehicle.end_depot] {
            let shared = self
                .vehicles
                .values()
                .any(|v| v.start_depot == depot || v.end_depot == depot);
            if !shared && self.nodes.remove(&depot).is_some() {
                self.distances
                    .retain(|(from, to), _| *from != depot && *to != depot);
                for times in self.travel_times.values_mut() {
                    times.retain(|(from, to), _| *from != depot && *to != depot);
                }
            }
        }

        for request in self.requests.values_mut() {
            request.eligible_vehicles.remove(&vehicle_id);
            ensure!(
                !request.eligible_vehicles.is_empty(),
                "removing vehicle {} leaves request {} unservable",
                vehicle_id,
                request.id
            );
        }
        Ok(())
    }
}
