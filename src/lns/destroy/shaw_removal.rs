use anyhow::{bail, Result};
use itertools::Itertools;
use rand::Rng;

use crate::lns::destroy::assigned_requests_checked;
use crate::problem::pdptw::PDPTWInstance;
use crate::problem::Num;
use crate::solution::Solution;
use crate::utils::{biased_rank_index, Random};

// spans below this are treated as constant and normalize to zero
const DEGENERATE_SPAN: Num = 1e-6;

/// Shaw-style relatedness removal: grows a set of mutually similar requests
/// around a random seed. Similarity mixes pickup and delivery distances,
/// service-time offsets, demand differences, and how few vehicles the two
/// requests share.
pub struct ShawRemoval<'a> {
    instance: &'a PDPTWInstance,
}

struct RequestMeasures {
    pickup_start: Num,
    delivery_start: Num,
}

impl<'a> ShawRemoval<'a> {
    pub fn with_instance(instance: &'a PDPTWInstance) -> Self {
        Self { instance }
    }

    pub fn destroy(&self, solution: &mut Solution, rng: &mut Random, num: usize) -> Result<()> {
        let assigned = assigned_requests_checked(solution, num)?;
        let params = self.instance.params();
        let n = assigned.len();

        let mut measures = Vec::with_capacity(n);
        for request_id in &assigned {
            let request = self.instance.request(*request_id);
            let pickup_start = match solution.node_start_time(request.pickup) {
                Some(t) => t,
                None => bail!("assigned request {} has no schedule", request_id),
            };
            let delivery_start = match solution.node_start_time(request.delivery) {
                Some(t) => t,
                None => bail!("assigned request {} has no schedule", request_id),
            };
            measures.push(RequestMeasures {
                pickup_start,
                delivery_start,
            });
        }

        // raw measure values per pair plus min/max bounds for normalization
        let mut raw = vec![vec![[0.0 as Num; 4]; n]; n];
        let mut lo = [Num::MAX; 4];
        let mut hi = [Num::MIN; 4];
        for (i, j) in (0..n).tuple_combinations() {
            let ri = self.instance.request(assigned[i]);
            let rj = self.instance.request(assigned[j]);
            let values = [
                self.instance.distance(ri.pickup, rj.pickup),
                self.instance.distance(ri.delivery, rj.delivery),
                (measures[i].pickup_start - measures[j].pickup_start).abs()
                    + (measures[i].delivery_start - measures[j].delivery_start).abs(),
                (ri.demand - rj.demand).abs() as Num,
            ];
            for m in 0..4 {
                lo[m] = lo[m].min(values[m]);
                hi[m] = hi[m].max(values[m]);
            }
            raw[i][j] = values;
            raw[j][i] = values;
        }

        let normalize = |m: usize, value: Num| {
            let span = hi[m] - lo[m];
            if span < DEGENERATE_SPAN {
                0.0
            } else {
                (value - lo[m]) / span
            }
        };
        let relatedness = |i: usize, j: usize| {
            let ei = &self.instance.request(assigned[i]).eligible_vehicles;
            let ej = &self.instance.request(assigned[j]).eligible_vehicles;
            let shared = ei.intersection(ej).count() as Num;
            let dissimilarity = 1.0 - shared / ei.len().min(ej.len()) as Num;
            params.shaw_param_1 * (normalize(0, raw[i][j][0]) + normalize(1, raw[i][j][1]))
                + params.shaw_param_2 * normalize(2, raw[i][j][2])
                + params.shaw_param_3 * normalize(3, raw[i][j][3])
                + params.shaw_param_4 * dissimilarity
        };

        let seed = rng.gen_range(0..n);
        let mut removed = vec![seed];
        let mut remaining: Vec<usize> = (0..n).filter(|i| *i != seed).collect();
        while removed.len() < num {
            let anchor = removed[rng.gen_range(0..removed.len())];
            // most related first, ids break ties
            remaining.sort_unstable_by(|a, b| {
                relatedness(anchor, *a)
                    .total_cmp(&relatedness(anchor, *b))
                    .then(assigned[*a].cmp(&assigned[*b]))
            });
            let idx = biased_rank_index(rng, params.p, remaining.len());
            removed.push(remaining.swap_remove(idx));
        }

        let request_ids: Vec<_> = removed.into_iter().map(|i| assigned[i]).collect();
        solution.remove_requests(&request_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::params::{Parameters, ParametersBuilder};
    use crate::problem::test_fixtures::{instance_with_requests, relaxed_request};
    use crate::utils::create_seeded_rng;
    use crate::utils::validator::assert_valid_solution;

    fn solved_instance_with(
        params: Parameters,
    ) -> (crate::problem::pdptw::PDPTWInstance, Vec<usize>) {
        // two tight clusters far apart
        let requests = vec![
            relaxed_request(1.0, 2.0),
            relaxed_request(1.5, 2.5),
            relaxed_request(100.0, 101.0),
            relaxed_request(100.5, 101.5),
        ];
        let instance = instance_with_requests(4, 10, &requests, params);
        (instance, vec![0, 1, 2, 3])
    }

    #[test]
    fn removes_the_requested_number_and_keeps_feasibility() {
        let (instance, requests) = solved_instance_with(Parameters::default());
        let mut solution = Solution::new(&instance);
        for r in requests {
            assert!(solution.insert_request_to_any_vehicle(r).unwrap());
        }
        let mut rng = create_seeded_rng(17);
        ShawRemoval::with_instance(&instance)
            .destroy(&mut solution, &mut rng, 3)
            .unwrap();
        assert_eq!(solution.number_of_unassigned_requests(), 3);
        assert_valid_solution(&instance, &solution);
    }

    #[test]
    fn deterministic_growth_picks_the_nearest_cluster_mate() {
        // with a huge determinism power the roulette always takes the most
        // related remaining request
        let params = ParametersBuilder::default().p(512.0).build().unwrap();
        let (instance, requests) = solved_instance_with(params);
        let mut solution = Solution::new(&instance);
        for r in requests {
            assert!(solution.insert_request_to_any_vehicle(r).unwrap());
        }
        let mut rng = create_seeded_rng(2);
        ShawRemoval::with_instance(&instance)
            .destroy(&mut solution, &mut rng, 2)
            .unwrap();

        let unassigned = solution.unassigned_request_ids();
        // whichever request seeded the set, its cluster mate must follow
        assert!(unassigned == vec![0, 1] || unassigned == vec![2, 3]);
    }
}
