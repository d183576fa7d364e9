//! Utility modules for vehicle_mpc

pub mod visualization;

pub use visualization::{colors, signal_plot, LineStyle, Visualizer};
