//! Simple line charts written as svg.
//!
//! The charts are meant for a quick look at a run: the target function
//! trace of each iteration, the exposure of the final laminate and the
//! wound contour. Axes are linear and labelled with their end values.

use std::path::Path;

use svg::node::element::path::Data;
use svg::node::element::{Circle, Group, Line, Path as SvgPath, Rectangle, Text};
use svg::node::Text as TextNode;
use svg::Document;

use crate::error::DesignResult;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 420.0;
const MARGIN: f64 = 60.0;

static COLOURS: [&str; 6] = ["#1f77b4", "#d62728", "#2ca02c", "#ff7f0e", "#9467bd", "#8c564b"];

/// One curve of a chart.
#[derive(Debug, Clone)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// draw the points as dots instead of a line
    pub markers: bool,
}

impl Series {
    pub fn line(x: Vec<f64>, y: Vec<f64>) -> Series {
        Series { x, y, markers: false }
    }

    pub fn points(x: Vec<f64>, y: Vec<f64>) -> Series {
        Series { x, y, markers: true }
    }

    fn finite_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .map(|(&x, &y)| (x, y))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
    }
}

/// Maps data coordinates onto the drawing area.
struct Frame {
    x: (f64, f64),
    y: (f64, f64),
}

impl Frame {
    fn around(series: &[Series], equal_axes: bool) -> Frame {
        let mut x = (f64::INFINITY, f64::NEG_INFINITY);
        let mut y = (f64::INFINITY, f64::NEG_INFINITY);
        for (px, py) in series.iter().flat_map(|s| s.finite_points()) {
            x = (x.0.min(px), x.1.max(px));
            y = (y.0.min(py), y.1.max(py));
        }
        if !x.0.is_finite() {
            x = (0.0, 1.0);
            y = (0.0, 1.0);
        }
        let widen = |(lo, hi): (f64, f64)| if hi - lo > 0.0 { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        let (mut x, mut y) = (widen(x), widen(y));
        if equal_axes {
            // same scale on both axes so contours keep their shape
            let sx = (x.1 - x.0) / (WIDTH - 2.0 * MARGIN);
            let sy = (y.1 - y.0) / (HEIGHT - 2.0 * MARGIN);
            if sx > sy {
                y.1 = y.0 + sx * (HEIGHT - 2.0 * MARGIN);
            } else {
                x.1 = x.0 + sy * (WIDTH - 2.0 * MARGIN);
            }
        }
        Frame { x, y }
    }

    fn map(&self, px: f64, py: f64) -> (f32, f32) {
        let u = MARGIN + (px - self.x.0) / (self.x.1 - self.x.0) * (WIDTH - 2.0 * MARGIN);
        let v = HEIGHT - MARGIN - (py - self.y.0) / (self.y.1 - self.y.0) * (HEIGHT - 2.0 * MARGIN);
        (u as f32, v as f32)
    }
}

fn label(text: &str, x: f64, y: f64, anchor: &str) -> Text {
    Text::new()
        .set("x", x)
        .set("y", y)
        .set("font-family", "sans-serif")
        .set("font-size", 12)
        .set("text-anchor", anchor)
        .add(TextNode::new(text))
}

fn axes(frame: &Frame, title: &str, x_label: &str, y_label: &str) -> Group {
    let (left, bottom) = (MARGIN, HEIGHT - MARGIN);
    let (right, top) = (WIDTH - MARGIN, MARGIN);
    Group::new()
        .add(
            Rectangle::new()
                .set("x", left)
                .set("y", top)
                .set("width", right - left)
                .set("height", bottom - top)
                .set("fill", "none")
                .set("stroke", "black"),
        )
        .add(label(title, WIDTH / 2.0, top - 20.0, "middle"))
        .add(label(x_label, WIDTH / 2.0, HEIGHT - 15.0, "middle"))
        .add(label(y_label, 10.0, top - 5.0, "start"))
        .add(label(&format!("{:.4}", frame.x.0), left, bottom + 18.0, "middle"))
        .add(label(&format!("{:.4}", frame.x.1), right, bottom + 18.0, "middle"))
        .add(label(&format!("{:.4}", frame.y.0), left - 5.0, bottom, "end"))
        .add(label(&format!("{:.4}", frame.y.1), left - 5.0, top + 5.0, "end"))
}

fn draw(frame: &Frame, series: &Series, colour: &str) -> Group {
    let points: Vec<(f32, f32)> = series.finite_points().map(|(x, y)| frame.map(x, y)).collect();
    let mut group = Group::new();
    if series.markers {
        for &(u, v) in &points {
            group = group.add(Circle::new().set("cx", u).set("cy", v).set("r", 2.5).set("fill", colour));
        }
    } else if let Some((&first, rest)) = points.split_first() {
        let data = rest.iter().fold(Data::new().move_to(first), |data, &p| data.line_to(p));
        group = group.add(
            SvgPath::new()
                .set("fill", "none")
                .set("stroke", colour)
                .set("stroke-width", 1.5)
                .set("d", data),
        );
    }
    group
}

/// Write a chart with one or more series.
pub fn line_chart(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[Series],
    equal_axes: bool,
) -> DesignResult<()> {
    let frame = Frame::around(series, equal_axes);
    let mut document = Document::new()
        .set("viewBox", format!("0 0 {} {}", WIDTH, HEIGHT))
        .set("width", WIDTH)
        .set("height", HEIGHT)
        .add(axes(&frame, title, x_label, y_label));
    if frame.y.0 < 0.0 && frame.y.1 > 0.0 {
        let (u0, v) = frame.map(frame.x.0, 0.0);
        let (u1, _) = frame.map(frame.x.1, 0.0);
        document = document.add(
            Line::new()
                .set("x1", u0)
                .set("y1", v)
                .set("x2", u1)
                .set("y2", v)
                .set("stroke", "grey")
                .set("stroke-dasharray", "4 4"),
        );
    }
    for (i, s) in series.iter().enumerate() {
        document = document.add(draw(&frame, s, COLOURS[i % COLOURS.len()]));
    }
    svg::save(path, &document)?;
    Ok(())
}

/// Target value over the design variable of every trial of one iteration.
pub fn target_function(path: &Path, trace: &[(f64, f64)], x_label: &str) -> DesignResult<()> {
    let (x, y): (Vec<f64>, Vec<f64>) = trace.iter().cloned().unzip();
    line_chart(path, "target function", x_label, "target", &[Series::points(x, y)], false)
}

/// Exposure of every layer along the contour.
pub fn puck_exposure(path: &Path, positions: &[f64], exposure: &[Vec<f64>], criterion: &str) -> DesignResult<()> {
    let layers = exposure.first().map(|e| e.len()).unwrap_or(0);
    let series: Vec<Series> = (0..layers)
        .map(|layer| {
            let y = exposure.iter().map(|element| element[layer]).collect();
            Series::line(positions.to_vec(), y)
        })
        .collect();
    line_chart(
        path,
        &format!("{} exposure per layer", criterion),
        "contour length (mm)",
        "exposure",
        &series,
        false,
    )
}

/// Liner and outer contour of the wound vessel.
pub fn contour(path: &Path, contours: &[(Vec<f64>, Vec<f64>)]) -> DesignResult<()> {
    let series: Vec<Series> = contours.iter().map(|(x, r)| Series::line(x.clone(), r.clone())).collect();
    line_chart(path, "vessel contour", "x (mm)", "r (mm)", &series, true)
}
