use chrono::NaiveDate;
use portfolio_core::CashFlow;

use crate::solver::XirrSolver;

/// Dollar-weighted holding age (days) at which damping stops.
const FULL_DAMPING_DAYS: f64 = 60.0;

/// Below this weighted age there is not enough history for any meaningful
/// annualized figure.
const MIN_WEIGHTED_AGE_DAYS: f64 = 2.0;

/// Raw solver output is clamped to ±1000% before damping.
const RATE_BOUND: f64 = 10.0;

/// Wraps [`XirrSolver`] with an age-weighted damping factor.
///
/// A two-week-old position showing a raw 300% annualized return is not
/// trustworthy; the factor ramps linearly from 0 to 1 over the first
/// 60 days of dollar-weighted holding age and is 1 thereafter.
///
/// All degenerate inputs (fewer than two flows, no outflow, weighted age
/// under two days, solver failure) return `None`; 0.0 is reserved for a
/// genuinely computed zero rate.
pub struct XirrDamper;

impl XirrDamper {
    pub fn adjusted_xirr(cash_flows: &[CashFlow], calculation_date: NaiveDate) -> Option<f64> {
        if cash_flows.len() < 2 {
            return None;
        }
        let weighted_age = Self::weighted_investment_age(cash_flows, calculation_date)?;
        if weighted_age < MIN_WEIGHTED_AGE_DAYS {
            tracing::debug!(weighted_age, "position too young for XIRR");
            return None;
        }
        let raw = XirrSolver::solve(cash_flows)?;
        let damping = Self::damping_factor(weighted_age);
        Some(raw.clamp(-RATE_BOUND, RATE_BOUND) * damping)
    }

    /// Linear ramp: `min(1, weighted_age_days / 60)`.
    pub fn damping_factor(weighted_age_days: f64) -> f64 {
        (weighted_age_days / FULL_DAMPING_DAYS).min(1.0)
    }

    /// Outflow-weighted mean age in days of the invested money, as of the
    /// calculation date. `None` when there are no outflows.
    pub fn weighted_investment_age(
        cash_flows: &[CashFlow],
        calculation_date: NaiveDate,
    ) -> Option<f64> {
        let outflows: Vec<&CashFlow> = cash_flows.iter().filter(|f| f.amount < 0.0).collect();
        let total_outflow: f64 = outflows.iter().map(|f| -f.amount).sum();
        if outflows.is_empty() || total_outflow <= 0.0 {
            return None;
        }
        Some(
            outflows
                .iter()
                .map(|f| {
                    let weight = -f.amount / total_outflow;
                    let days = (calculation_date - f.date).num_days() as f64;
                    weight * days
                })
                .sum(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_too_few_flows_is_none() {
        let flows = vec![CashFlow::new(-1000.0, date(2024, 1, 1))];
        assert_eq!(XirrDamper::adjusted_xirr(&flows, date(2024, 6, 1)), None);
    }

    #[test]
    fn test_no_outflow_is_none() {
        let flows = vec![
            CashFlow::new(1000.0, date(2024, 1, 1)),
            CashFlow::new(1100.0, date(2024, 6, 1)),
        ];
        assert_eq!(XirrDamper::adjusted_xirr(&flows, date(2024, 6, 1)), None);
    }

    #[test]
    fn test_damping_factor_ramps_and_saturates() {
        assert_eq!(XirrDamper::damping_factor(0.0), 0.0);
        assert!((XirrDamper::damping_factor(30.0) - 0.5).abs() < 1e-12);
        assert_eq!(XirrDamper::damping_factor(60.0), 1.0);
        assert_eq!(XirrDamper::damping_factor(400.0), 1.0);
        // Non-decreasing along the ramp.
        let mut last = 0.0;
        for age in 0..120 {
            let f = XirrDamper::damping_factor(age as f64);
            assert!(f >= last);
            last = f;
        }
    }

    #[test]
    fn test_weighted_age_is_dollar_weighted() {
        let flows = vec![
            CashFlow::new(-3000.0, date(2024, 1, 1)),
            CashFlow::new(-1000.0, date(2024, 1, 21)),
            CashFlow::new(4500.0, date(2024, 1, 31)),
        ];
        // 0.75 * 30 + 0.25 * 10 = 25
        let age = XirrDamper::weighted_investment_age(&flows, date(2024, 1, 31)).unwrap();
        assert!((age - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_young_position_damped_below_raw() {
        // Investment one week old: the damped figure must be strictly
        // smaller in magnitude than the raw annualized rate.
        let flows = vec![
            CashFlow::new(-1000.0, date(2024, 3, 1)),
            CashFlow::new(1010.0, date(2024, 3, 8)),
        ];
        let raw = XirrSolver::solve(&flows).unwrap();
        let damped = XirrDamper::adjusted_xirr(&flows, date(2024, 3, 8)).unwrap();
        assert!(damped.abs() < raw.abs(), "raw {raw}, damped {damped}");
        assert!(damped.abs() <= RATE_BOUND);
    }

    #[test]
    fn test_result_bounded() {
        // Any non-degenerate result stays inside ±10 after clamping
        // (damping factor is at most 1).
        let flows = vec![
            CashFlow::new(-1000.0, date(2024, 1, 1)),
            CashFlow::new(-1000.0, date(2023, 1, 1)),
            CashFlow::new(4000.0, date(2024, 1, 2)),
        ];
        let damped = XirrDamper::adjusted_xirr(&flows, date(2024, 1, 2)).unwrap();
        assert!(damped.abs() <= 10.0);
    }

    #[test]
    fn test_mature_position_undamped() {
        let flows = vec![
            CashFlow::new(-1000.0, date(2023, 1, 1)),
            CashFlow::new(1100.0, date(2024, 1, 1)),
        ];
        let raw = XirrSolver::solve(&flows).unwrap();
        let damped = XirrDamper::adjusted_xirr(&flows, date(2024, 1, 1)).unwrap();
        assert!((raw - damped).abs() < 1e-12);
    }
}
