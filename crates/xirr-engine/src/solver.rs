use portfolio_core::{CashFlow, DAYS_PER_YEAR};

/// Iteration cap shared by both numeric methods.
const MAX_ITERATIONS: usize = 1_000;

/// Convergence tolerance on the net present value.
const TOLERANCE: f64 = 1e-9;

/// Bisection bracket; Newton-Raphson starts inside it but may converge
/// to a root outside. Callers clamp the raw rate if they need bounds.
const BRACKET_LO: f64 = -0.99;
const BRACKET_HI: f64 = 0.99;

/// Solves for the annualized rate `r` with
/// `Σ amount_i * (1 + r)^(days_i / 365.25) = 0`, days counted from each flow
/// to the latest flow date.
///
/// Newton-Raphson from an estimated starting rate, bisection as fallback.
/// Degenerate input (fewer than two flows, single-signed amounts) and
/// non-convergence both yield `None`; this function never panics.
pub struct XirrSolver;

impl XirrSolver {
    pub fn solve(cash_flows: &[CashFlow]) -> Option<f64> {
        if cash_flows.len() < 2 {
            return None;
        }
        let has_inflow = cash_flows.iter().any(|f| f.amount > 0.0);
        let has_outflow = cash_flows.iter().any(|f| f.amount < 0.0);
        if !has_inflow || !has_outflow {
            return None;
        }

        let start = cash_flows.iter().map(|f| f.date).min()?;
        let end = cash_flows.iter().map(|f| f.date).max()?;
        if start == end {
            return simple_return(cash_flows);
        }

        let guess = estimate_initial_rate(cash_flows, start, end);
        tracing::debug!(guess, "starting XIRR solve");

        if let Some(rate) = newton_raphson(cash_flows, end, guess) {
            return Some(rate);
        }
        tracing::debug!("Newton-Raphson failed to converge, falling back to bisection");
        bisection(cash_flows, end)
    }
}

fn years_to_end(flow: &CashFlow, end: chrono::NaiveDate) -> f64 {
    (end - flow.date).num_days() as f64 / DAYS_PER_YEAR
}

/// NPV anchored at the latest flow date: Σ amount * (1 + rate)^years.
fn net_present_value(cash_flows: &[CashFlow], end: chrono::NaiveDate, rate: f64) -> f64 {
    cash_flows
        .iter()
        .map(|f| f.amount * (1.0 + rate).powf(years_to_end(f, end)))
        .sum()
}

fn net_present_value_derivative(cash_flows: &[CashFlow], end: chrono::NaiveDate, rate: f64) -> f64 {
    cash_flows
        .iter()
        .map(|f| {
            let t = years_to_end(f, end);
            f.amount * t * (1.0 + rate).powf(t - 1.0)
        })
        .sum()
}

/// All flows on one day: plain return on the first outflow.
fn simple_return(cash_flows: &[CashFlow]) -> Option<f64> {
    let initial = -cash_flows.iter().find(|f| f.amount < 0.0)?.amount;
    let final_value = cash_flows.iter().rev().find(|f| f.amount > 0.0)?.amount;
    if initial <= 0.0 {
        return None;
    }
    Some((final_value - initial) / initial)
}

/// Compound-interest estimate `(total / deposits)^(1/years) - 1`, clamped
/// to [-0.9, 0.9] for solver stability.
fn estimate_initial_rate(
    cash_flows: &[CashFlow],
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> f64 {
    let total: f64 = cash_flows.iter().map(|f| f.amount).sum();
    let deposits: f64 = cash_flows
        .iter()
        .filter(|f| f.amount < 0.0)
        .map(|f| -f.amount)
        .sum();
    let years = (end - start).num_days() as f64 / DAYS_PER_YEAR;
    if years <= 0.0 || deposits <= 0.0 {
        return 0.0;
    }
    let estimated = (total / deposits).powf(1.0 / years) - 1.0;
    if estimated.is_finite() {
        estimated.clamp(-0.9, 0.9)
    } else {
        0.0
    }
}

fn newton_raphson(cash_flows: &[CashFlow], end: chrono::NaiveDate, guess: f64) -> Option<f64> {
    let mut rate = guess;
    for _ in 0..MAX_ITERATIONS {
        let value = net_present_value(cash_flows, end, rate);
        if value.abs() < TOLERANCE {
            return Some(rate);
        }
        let derivative = net_present_value_derivative(cash_flows, end, rate);
        if derivative == 0.0 || !derivative.is_finite() {
            return None;
        }
        let next = rate - value / derivative;
        // Rates at or below -100% make the discount base non-positive.
        if !next.is_finite() || next <= -1.0 {
            return None;
        }
        if (next - rate).abs() < TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}

fn bisection(cash_flows: &[CashFlow], end: chrono::NaiveDate) -> Option<f64> {
    let mut lo = BRACKET_LO;
    let mut hi = BRACKET_HI;
    let mut f_lo = net_present_value(cash_flows, end, lo);
    let f_hi = net_present_value(cash_flows, end, hi);
    if f_lo == 0.0 {
        return Some(lo);
    }
    if f_hi == 0.0 {
        return Some(hi);
    }
    if f_lo.signum() == f_hi.signum() {
        return None;
    }
    for _ in 0..MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let f_mid = net_present_value(cash_flows, end, mid);
        if f_mid.abs() < TOLERANCE || (hi - lo) / 2.0 < TOLERANCE {
            return Some(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    None
}
