//! Turning exiftool's textual output into structured values.

use crate::common::errors::ExifError;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static REGEX_SUMMARY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s+image files?\s+(created|updated|unchanged)\b").unwrap()
});

static REGEX_EXIF_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}):(\d{2}):(\d{2})[ T](\d{2}):(\d{2}):(\d{2})(?:\.(\d{1,9}))?(Z|[+-]\d{2}:\d{2})?$")
        .unwrap()
});

/// Outcome of a write-style exiftool call, parsed from its summary lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub warnings: Vec<String>,
}

pub fn parse_write_summary(stdout: &str, stderr: &str) -> WriteResult {
    let mut result = WriteResult::default();

    for line in stdout.lines() {
        let Some(caps) = REGEX_SUMMARY_LINE.captures(line) else {
            continue;
        };
        let count = caps[1].parse::<u32>().unwrap_or(0);
        match &caps[2] {
            "created" => result.created += count,
            "updated" => result.updated += count,
            _ => result.unchanged += count,
        }
    }

    result.warnings = stderr
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Warning:"))
        .map(|warning| warning.trim().to_string())
        .collect();

    result
}

/// First `Error:` line on stderr, or its first non-empty line.
pub fn error_message(stderr: &str) -> Option<String> {
    let mut lines = stderr.lines().map(str::trim).filter(|line| !line.is_empty());
    let first = lines.clone().next()?;
    let message = lines
        .find_map(|line| line.strip_prefix("Error:"))
        .unwrap_or(first);
    Some(message.trim().to_string())
}

/// A stay-open command has no exit status of its own. It failed when
/// exiftool reported an `Error:` line; warnings alone do not count.
pub fn reported_error(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("Error:"))
        .map(|message| message.trim().to_string())
}

/// Parse `-json` output. exiftool prints one object per file inside an array;
/// a single file yields that object.
pub fn parse_json_output(stdout: &str) -> Result<Option<Value>, ExifError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|err| ExifError::tool(format!("unreadable JSON output: {}", err)))?;

    Ok(match value {
        Value::Array(mut entries) if entries.len() <= 1 => entries.pop(),
        other => Some(other),
    })
}

/// Standardize a raw `-G -json` object: drop group prefixes (first name wins),
/// drop `SourceFile`, turn exiftool timestamps into ISO-8601 and gather
/// warnings and errors into arrays.
pub fn normalize_tags(raw: Value) -> Value {
    let Value::Object(map) = raw else {
        return raw;
    };

    let mut tags = Map::new();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    for (key, value) in map {
        let name = key.rsplit(':').next().unwrap_or(&key);
        match name {
            "SourceFile" => {}
            "Warning" => warnings.push(value),
            "Error" => errors.push(value),
            _ => {
                if !tags.contains_key(name) {
                    tags.insert(name.to_string(), normalize_value(value));
                }
            }
        }
    }

    if !warnings.is_empty() {
        tags.insert("warnings".to_string(), Value::Array(warnings));
    }
    if !errors.is_empty() {
        tags.insert("errors".to_string(), Value::Array(errors));
    }

    Value::Object(tags)
}

fn normalize_value(value: Value) -> Value {
    match value {
        Value::String(text) => match normalize_datetime(&text) {
            Some(iso) => Value::String(iso),
            None => Value::String(text),
        },
        Value::Array(values) => Value::Array(values.into_iter().map(normalize_value).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, normalize_value(value)))
                .collect(),
        ),
        other => other,
    }
}

fn normalize_datetime(text: &str) -> Option<String> {
    let caps = REGEX_EXIF_DATETIME.captures(text)?;
    let number = |i: usize| caps[i].parse::<u32>().ok();

    let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, number(2)?, number(3)?)?;
    let nanos = match caps.get(7) {
        Some(fraction) => format!("{:0<9}", fraction.as_str()).parse::<u32>().ok()?,
        None => 0,
    };
    let time = NaiveTime::from_hms_nano_opt(number(4)?, number(5)?, number(6)?, nanos)?;
    let naive = NaiveDateTime::new(date, time);

    match caps.get(8).map(|m| m.as_str()) {
        None => Some(naive.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        Some("Z") => Some(format!("{}Z", naive.format("%Y-%m-%dT%H:%M:%S%.f"))),
        Some(offset) => {
            let offset = offset.parse::<FixedOffset>().ok()?;
            let dt = offset.from_local_datetime(&naive).single()?;
            Some(dt.to_rfc3339())
        }
    }
}
