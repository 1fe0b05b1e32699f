//! PM2.5 Dashboard - air-quality dataset cleaning, summary tables & charts
//!
//! Loads a country-by-year measurement table, normalizes its headers and
//! numeric cells, and derives the views a report is built from: a preview
//! sample, a threshold filter, a top-K trend in long form, map and
//! distribution chart specs, and per-year summary statistics.

pub mod charts;
pub mod config;
pub mod data;
pub mod report;
pub mod stats;
