use crate::problem::{NodeId, Num, RequestId, VehicleId};

/// Owned snapshot of a solution, detached from the instance borrow. Routes
/// are sorted by vehicle id, unassigned requests ascending, so equal
/// solutions produce identical descriptions.
#[derive(Clone, Debug)]
pub struct SolutionDescription {
    routes: Vec<(VehicleId, Vec<NodeId>)>,
    unassigned_requests: Vec<RequestId>,
    pub distance_cost: Num,
    pub time_cost: Num,
    pub objective: Num,
}

impl SolutionDescription {
    pub(crate) fn new(
        mut routes: Vec<(VehicleId, Vec<NodeId>)>,
        mut unassigned_requests: Vec<RequestId>,
        distance_cost: Num,
        time_cost: Num,
        objective: Num,
    ) -> Self {
        routes.sort_unstable_by_key(|(vehicle_id, _)| *vehicle_id);
        unassigned_requests.sort_unstable();
        Self {
            routes,
            unassigned_requests,
            distance_cost,
            time_cost,
            objective,
        }
    }

    pub fn routes(&self) -> &[(VehicleId, Vec<NodeId>)] {
        &self.routes
    }

    pub fn unassigned_requests(&self) -> &[RequestId] {
        &self.unassigned_requests
    }

    pub fn number_of_unassigned_requests(&self) -> usize {
        self.unassigned_requests.len()
    }

    pub fn number_of_vehicles_used(&self) -> usize {
        self.routes.len()
    }

    pub fn objective(&self) -> Num {
        self.objective
    }
}
