// Chart descriptor normalisation and the chart backend seam
//
// Artifact content arrives either in a flat form (type, chart_title,
// categories, x_axis_label, ...) or already shaped like a charting-library
// config (chart.type, title.text, xAxis.categories, ...). Both are folded into
// one ChartDescriptor that backends consume.

use crate::error::{ChatError, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

/// Chart kinds a backend is expected to draw
pub const SUPPORTED_KINDS: [&str; 11] = [
    "line",
    "spline",
    "area",
    "areaspline",
    "column",
    "bar",
    "pie",
    "scatter",
    "bubble",
    "bullet",
    "radar",
];

const DEFAULT_KIND: &str = "column";
const DEFAULT_Y_LABEL: &str = "Values";

/// One data series of a chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    /// Per-series kind override, already normalised
    pub kind: Option<String>,
    pub data: Vec<Value>,
}

/// Declarative chart handed to a ChartBackend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDescriptor {
    pub kind: String,
    pub title: Option<String>,
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
    pub x_axis_label: Option<String>,
    pub y_axis_label: String,
}

impl ChartDescriptor {
    /// Normalise chart artifact content
    ///
    /// # Errors
    /// `Render` when the content is not an object or has no series.
    pub fn from_content(content: &Value) -> Result<Self> {
        if !content.is_object() {
            return Err(ChatError::Render(
                "Invalid chart data: content is not an object".to_string(),
            ));
        }

        let kind = normalize_kind(
            text_at(content, &["type"]).or_else(|| text_at(content, &["chart", "type"])),
        );

        let series: Vec<ChartSeries> = match content.get("series") {
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| series_from(idx, entry))
                .collect(),
            _ => Vec::new(),
        };
        if series.is_empty() {
            return Err(ChatError::Render(
                "Invalid chart configuration: no data series".to_string(),
            ));
        }

        let categories = match content
            .get("categories")
            .or_else(|| content.pointer("/xAxis/categories"))
        {
            Some(Value::Array(items)) => items.iter().map(label_of).collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            kind,
            title: text_at(content, &["chart_title"])
                .or_else(|| text_at(content, &["title", "text"]))
                .or_else(|| text_at(content, &["title"])),
            categories,
            series,
            x_axis_label: text_at(content, &["x_axis_label"])
                .or_else(|| text_at(content, &["xAxis", "title", "text"])),
            y_axis_label: text_at(content, &["y_axis_label"])
                .or_else(|| text_at(content, &["yAxis", "title", "text"]))
                .unwrap_or_else(|| DEFAULT_Y_LABEL.to_string()),
        })
    }
}

/// Map a kind onto the supported set; `spider` is `radar`, anything
/// unrecognised is `column`
pub fn normalize_kind(kind: Option<String>) -> String {
    let Some(kind) = kind else {
        return DEFAULT_KIND.to_string();
    };
    let kind = kind.trim().to_ascii_lowercase();
    if kind == "spider" {
        return "radar".to_string();
    }
    if SUPPORTED_KINDS.contains(&kind.as_str()) {
        kind
    } else {
        DEFAULT_KIND.to_string()
    }
}

fn series_from(idx: usize, entry: &Value) -> ChartSeries {
    ChartSeries {
        name: text_at(entry, &["name"]).unwrap_or_else(|| format!("Series {}", idx + 1)),
        kind: text_at(entry, &["type"]).map(|kind| normalize_kind(Some(kind))),
        data: match entry.get("data") {
            Some(Value::Array(points)) => points.clone(),
            _ => Vec::new(),
        },
    }
}

/// Non-empty string found by walking `path`
fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn label_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// External plotting collaborator
///
/// Receives a normalised descriptor and returns the rendered visual. Errors
/// and panics are contained by the dispatcher.
pub trait ChartBackend: Send + Sync {
    fn name(&self) -> &str;

    fn plot(&self, chart: &ChartDescriptor) -> Result<String>;
}

/// Plain-text bar rendering for terminals
#[derive(Debug, Clone)]
pub struct TextChartBackend {
    width: usize,
}

impl TextChartBackend {
    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }
}

impl Default for TextChartBackend {
    fn default() -> Self {
        Self::new(24)
    }
}

impl ChartBackend for TextChartBackend {
    fn name(&self) -> &str {
        "text"
    }

    fn plot(&self, chart: &ChartDescriptor) -> Result<String> {
        let mut out = String::new();
        let title = chart.title.as_deref().unwrap_or("Chart");
        // Writing to a String cannot fail
        let _ = writeln!(out, "{} [{}]", title, chart.kind);
        let _ = writeln!(
            out,
            "x: {}  y: {}",
            chart.x_axis_label.as_deref().unwrap_or("-"),
            chart.y_axis_label
        );

        for series in &chart.series {
            let points: Vec<(String, Option<f64>)> = series
                .data
                .iter()
                .enumerate()
                .map(|(idx, point)| point_of(idx, point, &chart.categories))
                .collect();

            let max = points
                .iter()
                .filter_map(|(_, v)| v.map(f64::abs))
                .fold(0.0_f64, f64::max);
            let label_width = points.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);

            let _ = writeln!(out, "{}", series.name);
            for (label, value) in points {
                match value {
                    Some(value) => {
                        let len = if max > 0.0 {
                            ((value.abs() / max) * self.width as f64).round() as usize
                        } else {
                            0
                        };
                        let _ = writeln!(
                            out,
                            "  {:<lw$} {} {}",
                            label,
                            "#".repeat(len),
                            format_number(value),
                            lw = label_width
                        );
                    }
                    None => {
                        let _ = writeln!(out, "  {:<lw$} -", label, lw = label_width);
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Label and numeric value of one data point
///
/// Points may be bare numbers, `[x, y]` pairs, or `{name, y}` objects.
fn point_of(idx: usize, point: &Value, categories: &[String]) -> (String, Option<f64>) {
    let fallback = || {
        categories
            .get(idx)
            .cloned()
            .unwrap_or_else(|| (idx + 1).to_string())
    };
    match point {
        Value::Number(n) => (fallback(), n.as_f64()),
        Value::Array(pair) if pair.len() >= 2 => {
            (label_of(&pair[0]), pair.last().and_then(Value::as_f64))
        }
        Value::Object(obj) => (
            obj.get("name").map(label_of).unwrap_or_else(fallback),
            obj.get("y").or_else(|| obj.get("value")).and_then(Value::as_f64),
        ),
        _ => (fallback(), None),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
