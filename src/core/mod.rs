mod engine;
mod solver;
mod types;

pub use engine::{MONTHS_PER_YEAR, calculate_forward, calculate_plan, effective_monthly_rate};
pub use solver::{
    MAX_ITERATIONS, MAX_SEARCH_RETURN, RELATIVE_TOLERANCE, calculate_required_monthly,
    calculate_required_return, calculate_required_years,
};
pub use types::{
    InputError, MAX_HORIZON_YEARS, PlanReport, SimulationInput, SimulationResult, YearlyData,
};
