use super::solver::{
    calculate_required_monthly, calculate_required_return, calculate_required_years,
};
use super::types::{PlanReport, SimulationInput, SimulationResult, YearlyData};

pub const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    total: f64,
    principal: f64,
}

impl Accumulator {
    fn seed(initial_asset: f64) -> Self {
        Self {
            total: initial_asset,
            principal: initial_asset,
        }
    }

    // Interest accrues on the opening balance; the contribution lands at month end.
    fn step_month(&mut self, monthly_rate: f64, contribution: f64) {
        self.total = self.total * (1.0 + monthly_rate) + contribution;
        self.principal += contribution;
    }

    fn snapshot(self, year: u32) -> YearlyData {
        YearlyData {
            year,
            amount: floor_currency(self.total),
            principal: floor_currency(self.principal),
        }
    }
}

/// Effective monthly rate equivalent to a nominal annual return given in percent.
pub fn effective_monthly_rate(annual_return: f64) -> f64 {
    (1.0 + annual_return / 100.0).powf(1.0 / MONTHS_PER_YEAR as f64) - 1.0
}

pub fn calculate_forward(input: &SimulationInput) -> SimulationResult {
    let monthly_rate = effective_monthly_rate(input.annual_return);
    let mut acc = Accumulator::seed(input.initial_asset);
    let mut yearly_data = Vec::with_capacity(input.years as usize + 1);
    yearly_data.push(acc.snapshot(0));

    let mut reach: Option<f64> = None;
    for year in 1..=input.years {
        for month in 1..=MONTHS_PER_YEAR {
            acc.step_month(monthly_rate, input.monthly_investment);
            if reach.is_none() && acc.total >= input.target_asset {
                reach = Some((year - 1) as f64 + month as f64 / MONTHS_PER_YEAR as f64);
            }
        }
        yearly_data.push(acc.snapshot(year));
    }

    if input.initial_asset >= input.target_asset {
        reach = Some(0.0);
    }

    SimulationResult {
        final_amount: floor_currency(acc.total),
        yearly_data,
        target_reach_year: reach.map(round_one_decimal),
    }
}

/// Forward projection plus every inverse solution for the same input.
pub fn calculate_plan(input: &SimulationInput) -> PlanReport {
    PlanReport {
        forward: calculate_forward(input),
        required_return: calculate_required_return(
            input.target_asset,
            input.initial_asset,
            input.monthly_investment,
            input.years,
        ),
        required_monthly: calculate_required_monthly(
            input.target_asset,
            input.initial_asset,
            input.years,
            input.annual_return,
        ),
        required_years: calculate_required_years(
            input.target_asset,
            input.initial_asset,
            input.monthly_investment,
            input.annual_return,
        ),
    }
}

fn floor_currency(value: f64) -> f64 {
    value.floor()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
