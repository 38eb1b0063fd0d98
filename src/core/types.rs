use serde::Serialize;
use thiserror::Error;

/// Longest horizon any solver projects over, in years.
pub const MAX_HORIZON_YEARS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInput {
    pub initial_asset: f64,
    pub monthly_investment: f64,
    pub years: u32,
    /// Nominal annual return in percent, e.g. `5.0` for 5%.
    pub annual_return: f64,
    pub target_asset: f64,
}

impl SimulationInput {
    pub fn new(
        initial_asset: f64,
        monthly_investment: f64,
        years: u32,
        annual_return: f64,
        target_asset: f64,
    ) -> Result<Self, InputError> {
        let input = Self {
            initial_asset,
            monthly_investment,
            years,
            annual_return,
            target_asset,
        };
        input.validate()?;
        Ok(input)
    }

    /// Checks the ranges the projection is meant for. The engine itself runs on
    /// any finite input; this is the gate callers put in front of it.
    pub fn validate(&self) -> Result<(), InputError> {
        let amounts = [
            ("initialAsset", self.initial_asset),
            ("monthlyInvestment", self.monthly_investment),
            ("annualReturn", self.annual_return),
            ("targetAsset", self.target_asset),
        ];
        for (field, value) in amounts {
            if !value.is_finite() {
                return Err(InputError::NonFinite { field });
            }
        }

        let non_negative = [
            ("initialAsset", self.initial_asset),
            ("monthlyInvestment", self.monthly_investment),
            ("targetAsset", self.target_asset),
        ];
        for (field, value) in non_negative {
            if value < 0.0 {
                return Err(InputError::Negative { field, value });
            }
        }

        if self.years == 0 {
            return Err(InputError::ZeroYears);
        }
        if self.years > MAX_HORIZON_YEARS {
            return Err(InputError::YearsTooLarge {
                years: self.years,
                max: MAX_HORIZON_YEARS,
            });
        }
        if self.annual_return <= -100.0 {
            return Err(InputError::ReturnBelowTotalLoss {
                value: self.annual_return,
            });
        }
        Ok(())
    }
}

/// Year-end snapshot. Currency values are floored but kept as `f64`, so long
/// high-return horizons are not capped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyData {
    pub year: u32,
    pub amount: f64,
    pub principal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub final_amount: f64,
    pub yearly_data: Vec<YearlyData>,
    /// Fractional year of the first month-end at or above target, one decimal.
    pub target_reach_year: Option<f64>,
}

impl SimulationResult {
    pub fn is_target_reached(&self, target_asset: f64) -> bool {
        self.final_amount >= target_asset
    }

    /// Snapshots at every tenth year, skipping the seed year.
    pub fn decade_milestones(&self) -> Vec<YearlyData> {
        self.yearly_data
            .iter()
            .filter(|d| d.year > 0 && d.year % 10 == 0)
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub forward: SimulationResult,
    pub required_return: f64,
    pub required_monthly: f64,
    pub required_years: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("years must be >= 1")]
    ZeroYears,
    #[error("years must be <= {max}, got {years}")]
    YearsTooLarge { years: u32, max: u32 },
    #[error("annualReturn must be > -100, got {value}")]
    ReturnBelowTotalLoss { value: f64 },
}
