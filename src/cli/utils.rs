use std::io::Read;

use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::entity::{value_text, Entity};
use crate::error::ErrorDescriptor;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            match data {
                Some(Value::Object(fields)) => {
                    if let Some(object) = response.as_object_mut() {
                        object.extend(fields);
                    }
                }
                Some(other) => response["data"] = other,
                None => {}
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Report a failed remote operation. Warnings go out as plain notices.
pub fn output_descriptor(output_format: &OutputFormat, error: &ErrorDescriptor) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "success": false, "error": error }))?
            );
        }
        OutputFormat::Text => {
            eprintln!("{:?}: {}", error.severity, error.message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: []
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Print rows as a JSON array or as a tab separated listing of the id and
/// the sortable columns.
pub fn output_records<T: Entity>(
    output_format: &OutputFormat,
    collection_name: &str,
    rows: &[&T],
) -> anyhow::Result<()> {
    if rows.is_empty() {
        return output_empty_collection(
            output_format,
            collection_name,
            &format!("No {} records", T::RESOURCE.label),
        );
    }

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: rows
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", table_row(T::SORT_FIELDS.iter().map(|f| f.to_string()), "ID"));
            for row in rows {
                let cells = T::SORT_FIELDS
                    .iter()
                    .map(|field| row.sort_value(field).map(|v| value_text(&v)).unwrap_or_default());
                println!("{}", table_row(cells, &row.id().to_string()));
            }
        }
    }
    Ok(())
}

fn table_row(cells: impl Iterator<Item = String>, first: &str) -> String {
    std::iter::once(first.to_string())
        .chain(cells)
        .collect::<Vec<_>>()
        .join("\t")
}

/// Field values for add/edit: `--data` if given, stdin otherwise.
pub fn read_json_input(data: Option<String>) -> anyhow::Result<Value> {
    let raw = match data {
        Some(data) => data,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| anyhow::anyhow!("Input is not valid JSON: {}", e))?;
    if !value.is_object() {
        anyhow::bail!("Input must be a JSON object of field values");
    }
    Ok(value)
}
