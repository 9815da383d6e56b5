//! Figure rendering with plotters.

pub mod figure;
pub mod palette;

pub use figure::{render_figure, FigureOptions};
