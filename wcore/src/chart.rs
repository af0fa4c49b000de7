// Winefind — chart.rs
// Radar (polar) chart of match scores: plotly-compatible figure JSON and a
// plain-text rendering for the terminal.
// Author: d65v <https://github.com/d65v>

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{json, Value};

use crate::{Result, WineFindError};

pub const LINE_COLOR: &str = "#722F37";
pub const TRANSPARENT: &str = "rgba(0,0,0,0)";
/// Radial axis is pinned here whatever the scores are.
pub const RADIAL_RANGE: [f64; 2] = [0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            l: 40,
            r: 40,
            t: 40,
            b: 40,
        }
    }
}

/// A closed, filled radar trace with one axis per result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    /// "Item 1".."Item N", in result order
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub radial_range: [f64; 2],
    pub filled: bool,
    pub show_legend: bool,
    pub line_color: &'static str,
    pub background: &'static str,
    pub margin: Margin,
}

/// Build the radar chart for scores in result order.
///
/// # Errors
/// `EmptyInput` if `scores` is empty; callers suppress the chart instead.
pub fn build_radar_chart(scores: &[f64]) -> Result<ChartSpec> {
    if scores.is_empty() {
        return Err(WineFindError::EmptyInput);
    }

    Ok(ChartSpec {
        labels: (1..=scores.len()).map(|i| format!("Item {}", i)).collect(),
        values: scores.to_vec(),
        radial_range: RADIAL_RANGE,
        filled: true,
        show_legend: false,
        line_color: LINE_COLOR,
        background: TRANSPARENT,
        margin: Margin::default(),
    })
}

impl ChartSpec {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Plotly figure (`data` + `layout`). The trace repeats its first point
    /// so the outline closes.
    pub fn to_plotly(&self) -> Value {
        let mut r = self.values.clone();
        let mut theta = self.labels.clone();
        if let (Some(first_r), Some(first_theta)) = (self.values.first(), self.labels.first()) {
            r.push(*first_r);
            theta.push(first_theta.clone());
        }
        let fill = if self.filled { "toself" } else { "none" };

        json!({
            "data": [{
                "type": "scatterpolar",
                "r": r,
                "theta": theta,
                "fill": fill,
                "line": { "color": self.line_color },
            }],
            "layout": {
                "polar": {
                    "radialaxis": { "visible": true, "range": self.radial_range },
                },
                "showlegend": self.show_legend,
                "paper_bgcolor": self.background,
                "plot_bgcolor": self.background,
                "margin": self.margin,
            },
        })
    }

    /// One bar per axis, scaled to the radial range and `width` cells.
    pub fn render_text(&self, width: usize) -> String {
        let [lo, hi] = self.radial_range;
        let span = if hi > lo { hi - lo } else { 1.0 };
        let label_width = self.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        let mut out = String::new();
        for (label, &value) in self.labels.iter().zip(&self.values) {
            let clamped = if value.is_finite() { value.clamp(lo, hi) } else { lo };
            let cells = (((clamped - lo) / span) * width as f64).round() as usize;
            let cells = cells.min(width);
            let _ = writeln!(
                out,
                "{:<lw$} |{}{}| {:.2}",
                label,
                "█".repeat(cells),
                " ".repeat(width - cells),
                value,
                lw = label_width
            );
        }
        out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
