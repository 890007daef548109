use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format.
/// Object `data` is merged into the JSON envelope.
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(fields)), Some(target)) = (data, response.as_object_mut()) {
                target.extend(fields);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a fixed-width table with a header rule
pub fn output_table(headers: &[&str], widths: &[usize], rows: &[Vec<String>]) {
    println!("{}", table_line(headers.iter().copied(), widths));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + widths.len().saturating_sub(1)));
    for row in rows {
        println!("{}", table_line(row.iter().map(String::as_str), widths));
    }
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

/// Render an optional value for text output
pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_line_pads_to_widths() {
        let line = table_line(["a", "bb", "c"].into_iter(), &[3, 4, 2]);
        assert_eq!(line, "a   bb   c");
    }

    #[test]
    fn or_dash_renders_missing_values() {
        assert_eq!(or_dash(Some(3)), "3");
        assert_eq!(or_dash::<u8>(None), "-");
    }
}
