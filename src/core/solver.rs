use tracing::{debug, trace};

use super::engine::{MONTHS_PER_YEAR, calculate_forward};
use super::types::{MAX_HORIZON_YEARS, SimulationInput};

/// Fixed iteration budget for every bisection search.
pub const MAX_ITERATIONS: u32 = 100;

/// Accepted gap between projected and target amount, as a fraction of target.
pub const RELATIVE_TOLERANCE: f64 = 0.001;

/// Upper edge of the annual return search, in percent.
pub const MAX_SEARCH_RETURN: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bracket {
    lo: f64,
    hi: f64,
}

impl Bracket {
    fn mid(self) -> f64 {
        (self.lo + self.hi) * 0.5
    }
}

/// Bisects `[lo, hi]` for a candidate whose projected final amount lands within
/// tolerance of `target`. `project` must be non-decreasing in its argument.
///
/// Returns the first candidate inside tolerance, or the midpoint of the last
/// bracket once the iteration budget is spent.
fn bisect_final_amount<F>(target: f64, lo: f64, hi: f64, project: F) -> f64
where
    F: Fn(f64) -> f64,
{
    let tolerance = target * RELATIVE_TOLERANCE;
    let mut bracket = Bracket { lo, hi };

    for it in 0..MAX_ITERATIONS {
        let mid = bracket.mid();
        let projected = project(mid);
        trace!(
            iteration = it,
            lo = bracket.lo,
            hi = bracket.hi,
            mid,
            projected,
            "bisection step"
        );

        if (projected - target).abs() <= tolerance {
            debug!(iterations = it + 1, solution = mid, "bisection within tolerance");
            return mid;
        }
        if projected < target {
            bracket.lo = mid;
        } else {
            bracket.hi = mid;
        }
    }

    debug!(
        lo = bracket.lo,
        hi = bracket.hi,
        "bisection budget exhausted"
    );
    bracket.mid()
}

/// Annual return in percent that grows the inputs to `target_asset`.
///
/// Returns `0` when contributions alone already cover the target. Solutions
/// above 100% are capped at the search edge.
pub fn calculate_required_return(
    target_asset: f64,
    initial_asset: f64,
    monthly_investment: f64,
    years: u32,
) -> f64 {
    let contributed =
        initial_asset + monthly_investment * MONTHS_PER_YEAR as f64 * years as f64;
    if target_asset <= contributed {
        debug!(target_asset, contributed, "contributions cover target at 0% return");
        return 0.0;
    }

    bisect_final_amount(target_asset, 0.0, MAX_SEARCH_RETURN, |annual_return| {
        calculate_forward(&SimulationInput {
            initial_asset,
            monthly_investment,
            years,
            annual_return,
            target_asset,
        })
        .final_amount
    })
}

/// Monthly contribution needed to reach `target_asset` after `years`.
pub fn calculate_required_monthly(
    target_asset: f64,
    initial_asset: f64,
    years: u32,
    annual_return: f64,
) -> f64 {
    if annual_return <= 0.0 {
        // A zero horizon counts as one contribution period.
        let months = years.saturating_mul(MONTHS_PER_YEAR).max(1) as f64;
        return ((target_asset - initial_asset) / months).max(0.0);
    }

    // The search ceiling is the target itself, not a derived bound.
    bisect_final_amount(target_asset, 0.0, target_asset, |monthly_investment| {
        calculate_forward(&SimulationInput {
            initial_asset,
            monthly_investment,
            years,
            annual_return,
            target_asset,
        })
        .final_amount
    })
}

/// Fractional year at which the target is first met, searching up to
/// [`MAX_HORIZON_YEARS`]. `None` when it is never met inside that horizon.
pub fn calculate_required_years(
    target_asset: f64,
    initial_asset: f64,
    monthly_investment: f64,
    annual_return: f64,
) -> Option<f64> {
    calculate_forward(&SimulationInput {
        initial_asset,
        monthly_investment,
        years: MAX_HORIZON_YEARS,
        annual_return,
        target_asset,
    })
    .target_reach_year
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, prop_assume, proptest};

    fn assert_within_tolerance(actual: f64, target: f64) {
        let tol = target * RELATIVE_TOLERANCE;
        assert!(
            (actual - target).abs() <= tol,
            "expected {target}, got {actual}, tolerance {tol}"
        );
    }

    fn forward_final(initial: f64, monthly: f64, years: u32, annual_return: f64) -> f64 {
        calculate_forward(&SimulationInput {
            initial_asset: initial,
            monthly_investment: monthly,
            years,
            annual_return,
            target_asset: f64::MAX,
        })
        .final_amount
    }

    #[test]
    fn bisection_returns_first_hit_inside_tolerance() {
        // Identity projection: the first midpoint (50) is already within 0.1% of 50.
        let solved = bisect_final_amount(50.0, 0.0, 100.0, |x| x.floor());
        assert_eq!(solved, 50.0);
    }

    #[test]
    fn bisection_returns_bracket_midpoint_when_target_is_out_of_range() {
        let solved = bisect_final_amount(1_000.0, 0.0, 100.0, |x| x.floor());
        assert!(solved <= 100.0 && solved > 99.999_999);
    }

    #[test]
    fn required_return_fast_path_when_contributions_cover_target() {
        let r = calculate_required_return(13_000_000.0, 1_000_000.0, 50_000.0, 20);
        assert_eq!(r, 0.0);
        let r = calculate_required_return(500.0, 1_000.0, 0.0, 5);
        assert_eq!(r, 0.0);
    }

    #[test]
    fn required_return_reproduces_target() {
        let r = calculate_required_return(100_000_000.0, 1_000_000.0, 50_000.0, 20);
        assert!(r > 5.0 && r < 100.0, "got {r}");
        assert_within_tolerance(forward_final(1_000_000.0, 50_000.0, 20, r), 100_000_000.0);
    }

    #[test]
    fn required_return_is_capped_at_search_edge() {
        // 1 -> 1e12 in one year needs far more than 100%.
        let r = calculate_required_return(1e12, 1.0, 0.0, 1);
        assert!(r <= MAX_SEARCH_RETURN && r > MAX_SEARCH_RETURN - 1e-6, "got {r}");
    }

    #[test]
    fn required_return_solves_targets_beyond_i64_range() {
        // 1e6 grown at 60% for a century is about 2.6e26.
        let target = 1e6 * 1.6f64.powi(100);
        let r = calculate_required_return(target, 1e6, 0.0, 100);
        assert!((r - 60.0).abs() < 0.01, "got {r}");
        assert_within_tolerance(forward_final(1e6, 0.0, 100, r), target);
    }

    #[test]
    fn required_monthly_already_met_with_zero_return_is_zero() {
        let m = calculate_required_monthly(10_000_000.0, 10_000_000.0, 5, 0.0);
        assert_eq!(m, 0.0);
    }

    #[test]
    fn required_monthly_zero_return_is_linear() {
        let m = calculate_required_monthly(1_300_000.0, 100_000.0, 10, 0.0);
        assert_eq!(m, 10_000.0);
        let m = calculate_required_monthly(1_300_000.0, 100_000.0, 10, -3.0);
        assert_eq!(m, 10_000.0);
    }

    #[test]
    fn required_monthly_zero_horizon_is_single_period() {
        assert_eq!(calculate_required_monthly(1_000.0, 400.0, 0, 0.0), 600.0);
    }

    #[test]
    fn required_monthly_reproduces_target() {
        let m = calculate_required_monthly(100_000_000.0, 1_000_000.0, 20, 5.0);
        assert!(m > 50_000.0 && m < 100_000_000.0, "got {m}");
        assert_within_tolerance(forward_final(1_000_000.0, m, 20, 5.0), 100_000_000.0);
    }

    #[test]
    fn required_monthly_with_large_initial_asset_solves_near_zero() {
        // Initial asset alone overshoots; the search collapses toward zero.
        let m = calculate_required_monthly(1_000_000.0, 10_000_000.0, 10, 5.0);
        assert!(m >= 0.0 && m < 1e-6, "got {m}");
    }

    #[test]
    fn required_years_matches_forward_reach_year() {
        let y = calculate_required_years(100_000_000.0, 1_000_000.0, 50_000.0, 5.0)
            .expect("reachable");
        assert!(y > 40.0 && y < 50.0, "got {y}");
        assert_eq!(y, (y * 10.0).round() / 10.0);
    }

    #[test]
    fn required_years_is_none_when_unreachable() {
        assert_eq!(calculate_required_years(1.0, 0.0, 0.0, 5.0), None);
    }

    #[test]
    fn required_years_is_zero_when_already_met() {
        assert_eq!(calculate_required_years(10.0, 10.0, 0.0, -50.0), Some(0.0));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_required_monthly_round_trip(
            initial in 0u32..5_000_000,
            years in 1u32..40,
            return_bp in 1i32..1_500,
            target in 1_000_000u32..200_000_000,
        ) {
            let initial = initial as f64;
            let target = target as f64;
            let annual_return = return_bp as f64 / 100.0;
            // Feasible only if the initial asset alone does not already overshoot.
            prop_assume!(forward_final(initial, 0.0, years, annual_return) <= target);

            let m = calculate_required_monthly(target, initial, years, annual_return);
            prop_assert!(m >= 0.0 && m <= target);
            let achieved = forward_final(initial, m, years, annual_return);
            prop_assert!((achieved - target).abs() <= target * RELATIVE_TOLERANCE,
                "target {}, achieved {}", target, achieved);
        }

        #[test]
        fn prop_required_return_round_trip(
            initial in 0u32..5_000_000,
            monthly in 0u32..200_000,
            years in 5u32..40,
            return_bp in 1i32..3_000,
        ) {
            let initial = initial as f64;
            let monthly = monthly as f64;
            prop_assume!(initial + monthly > 0.0);
            // Build a target that some return in [0, 100] actually reaches.
            let target = forward_final(initial, monthly, years, return_bp as f64 / 100.0);
            prop_assume!(target > initial + monthly * 12.0 * years as f64);

            let r = calculate_required_return(target, initial, monthly, years);
            prop_assert!((0.0..=MAX_SEARCH_RETURN).contains(&r));
            let achieved = forward_final(initial, monthly, years, r);
            prop_assert!((achieved - target).abs() <= target * RELATIVE_TOLERANCE,
                "target {}, achieved {}", target, achieved);
        }

        #[test]
        fn prop_solvers_are_idempotent(
            initial in 0u32..5_000_000,
            monthly in 0u32..200_000,
            years in 1u32..50,
            return_bp in -500i32..2_000,
            target in 0u32..300_000_000,
        ) {
            let (i, m, r, t) = (initial as f64, monthly as f64, return_bp as f64 / 100.0, target as f64);
            prop_assert_eq!(
                calculate_required_return(t, i, m, years).to_bits(),
                calculate_required_return(t, i, m, years).to_bits()
            );
            prop_assert_eq!(
                calculate_required_monthly(t, i, years, r).to_bits(),
                calculate_required_monthly(t, i, years, r).to_bits()
            );
            prop_assert_eq!(
                calculate_required_years(t, i, m, r).map(f64::to_bits),
                calculate_required_years(t, i, m, r).map(f64::to_bits)
            );
        }

        #[test]
        fn prop_initial_at_or_above_target_reaches_in_year_zero(
            target in 0u32..10_000_000,
            surplus in 0u32..1_000_000,
            monthly in 0u32..100_000,
            return_bp in -5_000i32..2_000,
        ) {
            let initial = target as f64 + surplus as f64;
            prop_assert_eq!(
                calculate_required_years(target as f64, initial, monthly as f64, return_bp as f64 / 100.0),
                Some(0.0)
            );
        }
    }
}
