//! Output formatting for CLI commands

use serde::Serialize;

pub use crate::storage::OutputFormat;

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => println!("{}", envelope(true, "message", message)),
        }
    }

    /// Prints an error message
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("Error: {}", message),
            OutputFormat::Json => eprintln!("{}", envelope(false, "error", message)),
        }
    }

    /// Prints structured data; compact in JSON mode, pretty otherwise
    pub fn data<T: Serialize>(&self, data: &T) {
        let rendered = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        };
        if let Ok(json) = rendered {
            println!("{}", json);
        }
    }

    /// Prints a left-aligned table with a rule under the header (text only)
    ///
    /// Every column but the last is padded to at least its header width or
    /// the matching entry of `widths`.
    pub fn table(&self, headers: &[&str], widths: &[usize], rows: &[Vec<String>]) {
        if self.is_json() {
            return;
        }

        let width = |i: usize| {
            let header = headers.get(i).map_or(0, |h| h.len());
            widths.get(i).copied().unwrap_or(0).max(header)
        };
        let line = |cells: &[&str]| {
            let last = cells.len().saturating_sub(1);
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    if i == last {
                        cell.to_string()
                    } else {
                        format!("{:<w$}", cell, w = width(i))
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        };

        let header = line(headers);
        let rule = (0..headers.len()).map(|i| width(i) + 1).sum::<usize>().max(header.len());
        println!("{}", header);
        println!("{}", "-".repeat(rule));
        for row in rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            println!("{}", line(&cells));
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn envelope(success: bool, key: &str, message: &str) -> serde_json::Value {
    let mut value = serde_json::json!({ "success": success });
    value[key] = serde_json::Value::from(message);
    value
}
