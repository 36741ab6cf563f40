use serde::Serialize;
use serde_json::Value;

/// Table artifact content flattened to display strings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// Read `content.columns` and `content.rows`; missing parts are empty
    ///
    /// Null or missing cells render as empty strings. Rows shorter than the
    /// header are padded.
    pub fn from_content(content: &Value) -> Self {
        let columns: Vec<String> = match content.get("columns") {
            Some(Value::Array(items)) => items.iter().map(cell_text).collect(),
            _ => Vec::new(),
        };

        let rows = match content.get("rows") {
            Some(Value::Array(rows)) => rows
                .iter()
                .map(|row| {
                    let mut cells: Vec<String> = match row {
                        Value::Array(cells) => cells.iter().map(cell_text).collect(),
                        Value::Null => Vec::new(),
                        other => vec![cell_text(other)],
                    };
                    if cells.len() < columns.len() {
                        cells.resize(columns.len(), String::new());
                    }
                    cells
                })
                .collect(),
            _ => Vec::new(),
        };

        Self { columns, rows }
    }

    /// Fixed-width text rendering for terminals
    pub fn to_text(&self) -> String {
        let width_of = |idx: usize| {
            let header = self.columns.get(idx).map_or(0, |c| c.chars().count());
            self.rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .fold(header, usize::max)
        };
        let count = self
            .rows
            .iter()
            .map(Vec::len)
            .fold(self.columns.len(), usize::max);
        let widths: Vec<usize> = (0..count).map(width_of).collect();

        let line = |cells: &[String]| {
            widths
                .iter()
                .enumerate()
                .map(|(idx, width)| {
                    let cell = cells.get(idx).map(String::as_str).unwrap_or("");
                    format!("{:<width$}", cell, width = *width)
                })
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = Vec::with_capacity(self.rows.len() + 2);
        if !self.columns.is_empty() {
            out.push(line(self.columns.as_slice()));
            out.push(
                widths
                    .iter()
                    .map(|w| "-".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("-+-"),
            );
        }
        out.extend(self.rows.iter().map(|row| line(row.as_slice())));
        out.join("\n")
    }
}

/// Display text of one cell
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
