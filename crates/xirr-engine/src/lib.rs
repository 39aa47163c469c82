//! Annualized internal rate of return for irregularly dated cash flows.
//!
//! [`solver`] finds the rate making the net present value of a cash-flow set
//! zero; [`damper`] wraps it with an age-weighted damping factor so very
//! young positions cannot report absurd annualized returns; [`rolling`]
//! replays a price history into four-week-spaced synthetic windows.

pub mod damper;
pub mod flows;
pub mod rolling;
pub mod solver;

pub use damper::XirrDamper;
pub use flows::{build_cash_flows, cash_flow_for};
pub use rolling::{RollingXirrSeries, RollingXirrWindowGenerator, WindowXirr};
pub use solver::XirrSolver;
