//! Small hand-built instances shared by the unit tests.

use ahash::AHashSet;

use crate::problem::params::Parameters;
use crate::problem::pdptw::{Node, NodeType, PDPTWInstance, Request, Vehicle};
use crate::problem::{Capacity, Num};

pub struct FixtureRequest {
    pub pickup: (f64, f64),
    pub delivery: (f64, f64),
    pub pickup_window: (Num, Num),
    pub delivery_window: (Num, Num),
    pub demand: Capacity,
}

/// A request with wide-open windows and unit demand.
pub fn relaxed_request(pickup_x: f64, delivery_x: f64) -> FixtureRequest {
    FixtureRequest {
        pickup: (pickup_x, 0.0),
        delivery: (delivery_x, 0.0),
        pickup_window: (0.0, 10_000.0),
        delivery_window: (0.0, 10_000.0),
        demand: 1,
    }
}

/// A request whose pickup deadline is so tight that a vehicle cannot serve
/// any other such request first. Combined with demand equal to the vehicle
/// capacity this forces one vehicle per request.
pub fn exclusive_request(capacity: Capacity) -> FixtureRequest {
    FixtureRequest {
        pickup: (2.0, 0.0),
        delivery: (4.0, 0.0),
        pickup_window: (0.0, 5.0),
        delivery_window: (0.0, 40.0),
        demand: capacity,
    }
}

/// Builds an instance with `num_vehicles` identical unit-speed vehicles, each
/// with its own depot node pair at the origin, and the given requests open to
/// the whole fleet.
pub fn instance_with_requests(
    num_vehicles: usize,
    vehicle_capacity: Capacity,
    requests: &[FixtureRequest],
    params: Parameters,
) -> PDPTWInstance {
    let mut nodes = Vec::new();
    let mut vehicles = Vec::new();
    for v in 0..num_vehicles {
        for offset in 0..2 {
            nodes.push(Node {
                id: v * 2 + offset,
                node_type: NodeType::Depot,
                x: 0.0,
                y: 0.0,
                demand: 0,
                ready: 0.0,
                due: 10_000.0,
                servicetime: 0.0,
            });
        }
        vehicles.push(Vehicle {
            id: v,
            capacity: vehicle_capacity,
            speed: 1.0,
            start_depot: v * 2,
            end_depot: v * 2 + 1,
        });
    }

    let all_vehicles: AHashSet<_> = (0..num_vehicles).collect();
    let base = num_vehicles * 2;
    let mut request_records = Vec::new();
    for (r, fixture) in requests.iter().enumerate() {
        let pickup_id = base + r * 2;
        let delivery_id = base + r * 2 + 1;
        nodes.push(Node {
            id: pickup_id,
            node_type: NodeType::Pickup,
            x: fixture.pickup.0,
            y: fixture.pickup.1,
            demand: fixture.demand,
            ready: fixture.pickup_window.0,
            due: fixture.pickup_window.1,
            servicetime: 0.0,
        });
        nodes.push(Node {
            id: delivery_id,
            node_type: NodeType::Delivery,
            x: fixture.delivery.0,
            y: fixture.delivery.1,
            demand: -fixture.demand,
            ready: fixture.delivery_window.0,
            due: fixture.delivery_window.1,
            servicetime: 0.0,
        });
        request_records.push(Request {
            id: r,
            pickup: pickup_id,
            delivery: delivery_id,
            demand: fixture.demand,
            eligible_vehicles: all_vehicles.clone(),
        });
    }

    PDPTWInstance::build("fixture", nodes, request_records, vehicles, params).unwrap()
}
