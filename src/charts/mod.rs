//! Charts module - Chart specs and rendering

mod plotter;
mod renderer;

pub use plotter::{
    ChartKind, ChartPlotter, ChartSpec, HistogramBin, LinePoint, LineSeries, Region,
};
pub use renderer::{ChartRenderer, RenderError};
