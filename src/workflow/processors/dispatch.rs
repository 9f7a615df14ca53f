//! Operation dispatch - maps the selected operation onto exiftool calls
//!
//! Includes:
//! - Read, write, delete, repair and custom command handlers
//! - Input parsing for tag values, retain lists and custom commands

use crate::common::{LIST_VALUED_TAGS, errors::ExifError};
use crate::exiftool::{MetadataTool, TagValue, WriteResult, args::is_write_command};
use crate::models::{MetadataValue, NodeParameters, Operation};
use crate::workflow::processors::staging::StagingPaths;
use log::debug;
use serde_json::{Value, json};
use std::{path::Path, time::Duration};
use tokio::time::sleep;

// ────────────────────────────────────────────────────────────────
// Public API
// ────────────────────────────────────────────────────────────────

/// Run the selected operation against the staged file and return the value
/// stored in the item's output field.
pub async fn dispatch<T: MetadataTool>(
    tool: &T,
    paths: &StagingPaths,
    params: &NodeParameters,
    settle_delay: Duration,
) -> Result<Value, ExifError> {
    debug!(
        "Dispatching {} for {:?}",
        params.operation.as_str(),
        paths.staged
    );

    match params.operation {
        Operation::Read => read(tool, &paths.staged, params.options.read_raw).await,
        Operation::Write => {
            let tags = prepare_tags(
                &params.exif_metadata.metadata_values,
                params.options.parse_input_fields,
            )?;
            write(tool, &paths.staged, &tags, settle_delay).await
        }
        Operation::Delete => delete(tool, &paths.staged, &params.keep_tags).await,
        Operation::Repair => repair(tool, paths).await,
        Operation::CustomCmd => custom_command(tool, &paths.staged, &params.custom_cmd).await,
    }
}

// ────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────

async fn read<T: MetadataTool>(tool: &T, path: &Path, raw: bool) -> Result<Value, ExifError> {
    tool.read_metadata(path, raw).await
}

/// One tool call per tag, strictly one after another. exiftool locks the file
/// through its own temp file, so each write gets a settling pause before the
/// next one starts.
async fn write<T: MetadataTool>(
    tool: &T,
    path: &Path,
    tags: &[(String, TagValue)],
    settle_delay: Duration,
) -> Result<Value, ExifError> {
    let mut records = Vec::with_capacity(tags.len());

    for (name, value) in tags {
        let result = tool.write_tag(path, name, value).await.map_err(|err| match err {
            ExifError::ToolExecutionFailed(message) => {
                ExifError::tool(format!("writing tag {:?}: {}", name, message))
            }
            other => other,
        })?;
        debug!("Wrote tag {} ({} updated)", name, result.updated);
        records.push(write_record(&result, Some(name)));

        if !settle_delay.is_zero() {
            sleep(settle_delay).await;
        }
    }

    Ok(Value::Array(records))
}

async fn delete<T: MetadataTool>(tool: &T, path: &Path, keep_tags: &str) -> Result<Value, ExifError> {
    let retain = parse_keep_tags(keep_tags);
    let retain = (!retain.is_empty()).then_some(retain.as_slice());
    let result = tool.delete_all_tags(path, retain).await?;
    Ok(write_record(&result, None))
}

async fn repair<T: MetadataTool>(tool: &T, paths: &StagingPaths) -> Result<Value, ExifError> {
    tool.rewrite_all_tags(&paths.staged, &paths.processed).await?;
    Ok(json!({ "success": true }))
}

async fn custom_command<T: MetadataTool>(
    tool: &T,
    path: &Path,
    command: &str,
) -> Result<Value, ExifError> {
    let tokens = split_command(command);
    if is_write_command(&tokens) {
        return Err(ExifError::UnsupportedOperation(
            "write custom commands are not supported yet; please use the write operation instead"
                .to_string(),
        ));
    }

    let result = tool.custom_command(path, &tokens).await?;
    Ok(result.unwrap_or_else(|| json!({})))
}

fn write_record(result: &WriteResult, tag: Option<&str>) -> Value {
    let mut record = json!({
        "created": result.created,
        "updated": result.updated,
        "unchanged": result.unchanged,
        "warnings": result.warnings,
    });
    if let (Some(tag), Value::Object(fields)) = (tag, &mut record) {
        fields.insert("tag".to_string(), Value::String(tag.to_string()));
    }
    record
}

// ────────────────────────────────────────────────────────────────
// Input Parsing
// ────────────────────────────────────────────────────────────────

/// Validate the tag set and convert every value to what exiftool receives.
pub fn prepare_tags(
    values: &[MetadataValue],
    parse_input_fields: bool,
) -> Result<Vec<(String, TagValue)>, ExifError> {
    if values.is_empty() {
        return Err(ExifError::validation(
            "no metadata values provided; please provide at least one metadata value",
        ));
    }

    values
        .iter()
        .map(|tag| {
            let name = tag.name.trim();
            if name.is_empty()
                || name.starts_with('-')
                || name.contains('=')
                || name.contains(char::is_whitespace)
            {
                return Err(ExifError::validation(format!(
                    "invalid metadata tag name {:?}",
                    tag.name
                )));
            }
            Ok((name.to_string(), tag_value(name, &tag.value, parse_input_fields)))
        })
        .collect()
}

/// Whether any segment of a (possibly group prefixed) name is a list tag.
pub fn is_list_tag(name: &str) -> bool {
    name.split(':').any(|segment| LIST_VALUED_TAGS.contains(&segment))
}

pub fn tag_value(name: &str, value: &Value, parse_input_fields: bool) -> TagValue {
    match value {
        Value::Null => TagValue::Empty,
        Value::String(text) if text.is_empty() => TagValue::Empty,
        Value::String(text) if parse_input_fields && is_list_tag(name) => {
            let items = split_list(text);
            if items.is_empty() {
                TagValue::Empty
            } else {
                TagValue::List(items)
            }
        }
        Value::String(text) => TagValue::Scalar(text.clone()),
        Value::Array(items) => TagValue::List(
            items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        other => TagValue::Scalar(other.to_string()),
    }
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comma separated retain list, trimmed, empties and duplicates dropped.
pub fn parse_keep_tags(keep_tags: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in split_list(keep_tags) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
