//! Rendering of command results as an aligned table, JSON or CSV.

use std::io::Write;

use serde::Serialize;

use crate::{cli::Format, error::Result};

/// Rows for the table and CSV renderers plus the structured value for JSON.
#[derive(Debug)]
pub struct Output {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
    json: serde_json::Value,
}

impl Output {
    pub fn new<T: Serialize>(
        headers: Vec<&'static str>,
        rows: Vec<Vec<String>>,
        value: &T,
    ) -> Result<Self> {
        Ok(Self {
            headers,
            rows,
            json: serde_json::to_value(value)?,
        })
    }

    /// A one-line confirmation, e.g. after a write.
    pub fn message<T: Serialize>(text: impl Into<String>, value: &T) -> Result<Self> {
        Self::new(vec!["result"], vec![vec![text.into()]], value)
    }

    pub fn write<W: Write>(&self, format: Format, out: &mut W) -> Result<()> {
        match format {
            Format::Table => self.write_table(out)?,
            Format::Json => {
                serde_json::to_writer_pretty(&mut *out, &self.json)?;
                writeln!(out)?;
            }
            Format::Csv => self.write_csv(out)?,
        }
        Ok(())
    }

    fn write_table<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.rows.is_empty() {
            writeln!(out, "(nothing to show)")?;
            return Ok(());
        }

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let header: Vec<String> = self.headers.iter().map(ToString::to_string).collect();
        write_row(out, &header, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_row(out, &rule, &widths)?;
        for row in &self.rows {
            write_row(out, row, &widths)?;
        }
        Ok(())
    }

    fn write_csv<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn write_row<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "{}", line.trim_end())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Output {
        Output::new(
            vec!["from", "to", "amount"],
            vec![
                vec!["Bob".to_string(), "Ann".to_string(), "30.00".to_string()],
                vec!["Cid".to_string(), "Ann".to_string(), "30.00".to_string()],
            ],
            &serde_json::json!([{"from": "Bob"}]),
        )
        .unwrap()
    }

    fn render(output: &Output, format: Format) -> String {
        let mut buf = Vec::new();
        output.write(format, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn table_aligns_columns() {
        assert_eq!(
            render(&sample(), Format::Table),
            "from  to   amount\n----  ---  ------\nBob   Ann  30.00\nCid   Ann  30.00\n"
        );
    }

    #[test]
    fn csv_has_header_row() {
        assert_eq!(
            render(&sample(), Format::Csv),
            "from,to,amount\nBob,Ann,30.00\nCid,Ann,30.00\n"
        );
    }

    #[test]
    fn json_uses_structured_value() {
        let rendered = render(&sample(), Format::Json);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value[0]["from"], "Bob");
    }
}
