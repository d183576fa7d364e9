//! Plotting for closed-loop tracking runs
//!
//! Draws the reference waypoints, the path actually driven, the predicted
//! horizon of selected cycles and the vehicle pose, using gnuplot. Series
//! are collected first and rendered onto a single set of axes on output.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{Path2D, Point2D, Pose2D, Trajectory};

/// Color palette for consistent styling
pub mod colors {
    pub const WAYPOINTS: &str = "#FFA500";
    pub const DRIVEN: &str = "#0000FF";
    pub const HORIZON: &str = "#00A000";
    pub const VEHICLE: &str = "#000000";
    pub const FALLBACK: &str = "#FF0000";
    pub const SPEED: &str = "#35C788";
    pub const STEER: &str = "#DD3355";
}

/// Style for line rendering. An empty caption leaves the series out of the legend.
#[derive(Debug, Clone)]
pub struct LineStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl LineStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

#[derive(Debug, Clone)]
enum Series {
    Lines {
        x: Vec<f64>,
        y: Vec<f64>,
        style: LineStyle,
    },
    Points {
        x: Vec<f64>,
        y: Vec<f64>,
        color: &'static str,
        caption: &'static str,
        symbol: char,
        size: f64,
    },
}

/// Top-down plot of one tracking run
pub struct Visualizer {
    series: Vec<Series>,
    title: String,
    x_label: String,
    y_label: String,
    aspect_ratio: Option<f64>,
    horizon_captioned: bool,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            series: Vec::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            aspect_ratio: Some(1.0),
            horizon_captioned: false,
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_labels(&mut self, x_label: &str, y_label: &str) -> &mut Self {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
        self
    }

    /// Set aspect ratio (None for auto)
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Number of data series collected so far
    pub fn layers(&self) -> usize {
        self.series.len()
    }

    pub fn plot_line(&mut self, x: &[f64], y: &[f64], style: &LineStyle) -> &mut Self {
        self.series.push(Series::Lines {
            x: x.to_vec(),
            y: y.to_vec(),
            style: style.clone(),
        });
        self
    }

    /// World-frame reference waypoints
    pub fn plot_waypoints(&mut self, waypoints: &Path2D) -> &mut Self {
        self.series.push(Series::Points {
            x: waypoints.x_coords(),
            y: waypoints.y_coords(),
            color: colors::WAYPOINTS,
            caption: "Waypoints",
            symbol: 'O',
            size: 0.8,
        });
        self
    }

    pub fn plot_driven_path(&mut self, path: &Path2D) -> &mut Self {
        self.plot_line(&path.x_coords(), &path.y_coords(), &LineStyle::new(colors::DRIVEN, "Driven"))
    }

    /// Predicted horizon, already transformed to the world frame.
    /// Only the first horizon gets a legend entry.
    pub fn plot_horizon(&mut self, trajectory: &Trajectory) -> &mut Self {
        let caption = if self.horizon_captioned { "" } else { "Predicted horizon" };
        self.horizon_captioned = true;
        let style = LineStyle::new(colors::HORIZON, caption).with_line_width(1.0);
        self.plot_line(&trajectory.x_coords(), &trajectory.y_coords(), &style)
    }

    /// Positions where the session issued a fallback command
    pub fn plot_fallbacks(&mut self, points: &[Point2D]) -> &mut Self {
        if points.is_empty() {
            return self;
        }
        self.series.push(Series::Points {
            x: points.iter().map(|p| p.x).collect(),
            y: points.iter().map(|p| p.y).collect(),
            color: colors::FALLBACK,
            caption: "Fallback",
            symbol: 'x',
            size: 1.2,
        });
        self
    }

    /// Vehicle position with a heading tick of the given length
    pub fn plot_vehicle(&mut self, pose: &Pose2D, length: f64) -> &mut Self {
        self.series.push(Series::Points {
            x: vec![pose.x],
            y: vec![pose.y],
            color: colors::VEHICLE,
            caption: "Vehicle",
            symbol: 'O',
            size: 1.5,
        });
        let tip = (pose.x + length * pose.psi.cos(), pose.y + length * pose.psi.sin());
        self.plot_line(&[pose.x, tip.0], &[pose.y, tip.1], &LineStyle::new(colors::VEHICLE, ""))
    }

    /// Finalize and show the plot
    pub fn show(&self) -> Result<(), String> {
        self.render().show().map_err(|e| e.to_string()).map(|_| ())
    }

    pub fn save_png(&self, path: &str, width: u32, height: u32) -> Result<(), String> {
        self.render().save_to_png(path, width, height).map_err(|e| e.to_string())
    }

    pub fn save_svg(&self, path: &str, width: u32, height: u32) -> Result<(), String> {
        self.render().save_to_svg(path, width, height).map_err(|e| e.to_string())
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();

        for series in &self.series {
            match series {
                Series::Lines { x, y, style } if style.caption.is_empty() => {
                    axes.lines(x, y, &[Color(style.color.as_str()), LineWidth(style.line_width)]);
                }
                Series::Lines { x, y, style } => {
                    axes.lines(
                        x,
                        y,
                        &[Caption(style.caption.as_str()), Color(style.color.as_str()), LineWidth(style.line_width)],
                    );
                }
                Series::Points { x, y, color, caption, symbol, size } => {
                    axes.points(x, y, &[Caption(*caption), Color(*color), PointSymbol(*symbol), PointSize(*size)]);
                }
            }
        }

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
        figure
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Speed and steering over time for one run
pub fn signal_plot(times: &[f64], speeds: &[f64], steering_deg: &[f64], title: &str) -> Visualizer {
    let mut vis = Visualizer::new();
    vis.set_title(title)
        .set_labels("Time [s]", "Value")
        .set_aspect_ratio(None)
        .plot_line(times, speeds, &LineStyle::new(colors::SPEED, "Speed"))
        .plot_line(times, steering_deg, &LineStyle::new(colors::STEER, "Steering [deg]"));
    vis
}
