use crate::solution::{Solution, SolutionDescription};

pub fn format_log_solution(sol: &Solution) -> String {
    format!(
        "{}/{}/{}",
        sol.number_of_unassigned_requests(),
        sol.number_of_vehicles_used(),
        sol.objective(),
    )
}

pub fn format_log_solution_desc(desc: &SolutionDescription) -> String {
    format!(
        "{}/{}/{}",
        desc.number_of_unassigned_requests(),
        desc.number_of_vehicles_used(),
        desc.objective(),
    )
}
