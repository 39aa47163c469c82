use chrono::{Duration, Months, NaiveDate};
use portfolio_core::{div_at_scale, CashFlow, DailyPrice, SHARE_SCALE};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::solver::XirrSolver;

/// Hypothetical amount invested at the start of every synthetic window.
const FIXED_AMOUNT: f64 = 1000.0;

/// Window end dates step backward in four-week increments.
const WINDOW_STEP_DAYS: i64 = 28;

/// One solved synthetic window: the annualized rate of buying a fixed
/// amount at the history's first close and selling at the window's last.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowXirr {
    pub rate: f64,
    pub window_end: NaiveDate,
}

/// Rolling-window rates in percent, oldest window first, with their
/// median and mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingXirrSeries {
    pub windows: Vec<WindowXirr>,
    pub median: f64,
    pub average: f64,
}

/// Replays a daily price history into a series of synthetic two-leg
/// positions ending at four-week-spaced dates, and solves each for XIRR.
///
/// Windows whose raw rate fails to solve or is `<= -1.0` (a -100% or worse
/// annualized return signals a degenerate price ratio) are discarded.
pub struct RollingXirrWindowGenerator;

impl RollingXirrWindowGenerator {
    /// Generate solved windows, most recent end date first. Fewer than two
    /// prices yields no windows.
    pub fn generate(prices: &[DailyPrice], reference_date: NaiveDate) -> Vec<WindowXirr> {
        if prices.len() < 2 {
            return Vec::new();
        }
        let mut sorted: Vec<DailyPrice> = prices.to_vec();
        sorted.sort_by_key(|p| p.date);

        let start_date = sorted[0].date;
        let cutoff = start_date
            .checked_add_months(Months::new(1))
            .unwrap_or(start_date);

        let mut windows = Vec::new();
        let mut end_date = reference_date;
        while end_date > cutoff {
            let in_window: Vec<&DailyPrice> =
                sorted.iter().filter(|p| p.date <= end_date).collect();
            // Price count only shrinks as the end date moves back; once a
            // window is too small, every earlier one is too.
            if in_window.len() < 2 {
                break;
            }
            if let Some(window) = Self::solve_window(&in_window) {
                windows.push(window);
            }
            end_date = end_date - Duration::days(WINDOW_STEP_DAYS);
        }
        windows
    }

    /// Generate the full analytic series: rates in percent, oldest first,
    /// with median and average.
    pub fn series(prices: &[DailyPrice], reference_date: NaiveDate) -> RollingXirrSeries {
        let mut windows: Vec<WindowXirr> = Self::generate(prices, reference_date)
            .into_iter()
            .map(|w| WindowXirr {
                rate: w.rate * 100.0,
                window_end: w.window_end,
            })
            .collect();
        windows.reverse();
        let rates: Vec<f64> = windows.iter().map(|w| w.rate).collect();
        RollingXirrSeries {
            median: median(&rates),
            average: average(&rates),
            windows,
        }
    }

    fn solve_window(prices: &[&DailyPrice]) -> Option<WindowXirr> {
        let first = prices.first()?;
        let last = prices.last()?;
        if first.close <= Decimal::ZERO {
            return None;
        }
        let shares = div_at_scale(Decimal::from(1000), first.close, SHARE_SCALE);
        let current_value = shares * last.close;
        if current_value <= Decimal::ZERO {
            return None;
        }
        let flows = vec![
            CashFlow::new(-FIXED_AMOUNT, first.date),
            CashFlow::new(current_value.to_f64().unwrap_or(0.0), last.date),
        ];
        let rate = XirrSolver::solve(&flows)?;
        if rate <= -1.0 {
            tracing::debug!(rate, window_end = %last.date, "dropping full-loss window");
            return None;
        }
        Some(WindowXirr {
            rate,
            window_end: last.date,
        })
    }
}

/// Median of the values; 0.0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

/// Mean of the values; 0.0 for an empty slice.
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
