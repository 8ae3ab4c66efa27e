//! Adaptive large neighbourhood search for the pickup-and-delivery problem
//! with time windows, plus a two-stage fleet-minimization wrapper for
//! homogeneous fleets.
//!
//! Callers hand over a populated [`problem::pdptw::PDPTWInstance`] together
//! with [`problem::params::Parameters`] and get back a
//! [`solution::SolutionDescription`] of the best solution encountered.

pub mod lns;
pub mod problem;
pub mod solution;
pub mod utils;
