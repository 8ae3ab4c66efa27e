pub mod params;
pub mod pdptw;
#[cfg(test)]
pub mod test_fixtures;

pub type Num = f64;

pub type NodeId = usize;
pub type RequestId = usize;
pub type VehicleId = usize;

pub(crate) type Capacity = i64;
