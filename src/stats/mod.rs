//! Stats module - Descriptive statistics per year column

mod calculator;

pub use calculator::{StatsCalculator, YearStats};
