#![allow(dead_code)]

use exif_node::exiftool::{args::is_write_command, parse::normalize_tags};
use exif_node::{BinaryData, ExifError, Item, MetadataTool, NodeConfig, TagValue, WriteResult};
use serde_json::{Value, json};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake png with metadata";
pub const STRIPPED_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nstripped";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Read { path: PathBuf, raw: bool },
    Write { tag: String, value: TagValue },
    Delete { retain: Option<Vec<String>> },
    Rewrite { destination: PathBuf },
    Custom { tokens: Vec<String> },
}

/// In-process stand-in for exiftool that leaves the same sibling files
/// behind: a `_original` backup on writes and deletes, a separate output
/// file on rewrites.
#[derive(Default)]
pub struct FakeTool {
    calls: Mutex<Vec<Call>>,
    failing_tag: Option<String>,
    fail_reads: bool,
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes of `tag` fail like exiftool does on an unknown tag.
    pub fn failing_on_tag(tag: &str) -> Self {
        Self {
            failing_tag: Some(tag.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn backup(path: &Path) -> Result<(), ExifError> {
        let mut backup = path.as_os_str().to_owned();
        backup.push("_original");
        let backup = PathBuf::from(backup);
        if !backup.exists() {
            fs::copy(path, &backup).map_err(|err| ExifError::io(&backup, err))?;
        }
        Ok(())
    }
}

impl MetadataTool for FakeTool {
    fn read_metadata(
        &self,
        path: &Path,
        raw: bool,
    ) -> impl Future<Output = Result<Value, ExifError>> + Send {
        async move {
            self.record(Call::Read {
                path: path.to_path_buf(),
                raw,
            });
            if self.fail_reads {
                return Err(ExifError::tool("File format error"));
            }
            let size = fs::metadata(path)
                .map_err(|err| ExifError::io(path, err))?
                .len();
            let output = json!({
                "SourceFile": path.to_string_lossy(),
                "File:FileSize": size,
                "EXIF:Artist": "Jane Doe",
                "EXIF:DateTimeOriginal": "2023:05:01 10:20:30",
            });
            Ok(if raw { output } else { normalize_tags(output) })
        }
    }

    fn write_tag(
        &self,
        path: &Path,
        tag: &str,
        value: &TagValue,
    ) -> impl Future<Output = Result<WriteResult, ExifError>> + Send {
        async move {
            self.record(Call::Write {
                tag: tag.to_string(),
                value: value.clone(),
            });
            if self.failing_tag.as_deref() == Some(tag) {
                return Err(ExifError::tool(format!("Tag '{}' is not defined", tag)));
            }
            Self::backup(path)?;
            let mut content = fs::read(path).map_err(|err| ExifError::io(path, err))?;
            content.extend_from_slice(format!(";{}", tag).as_bytes());
            fs::write(path, content).map_err(|err| ExifError::io(path, err))?;
            Ok(WriteResult {
                updated: 1,
                ..Default::default()
            })
        }
    }

    fn delete_all_tags(
        &self,
        path: &Path,
        retain: Option<&[String]>,
    ) -> impl Future<Output = Result<WriteResult, ExifError>> + Send {
        async move {
            self.record(Call::Delete {
                retain: retain.map(<[String]>::to_vec),
            });
            Self::backup(path)?;
            fs::write(path, STRIPPED_BYTES).map_err(|err| ExifError::io(path, err))?;
            Ok(WriteResult {
                updated: 1,
                ..Default::default()
            })
        }
    }

    fn rewrite_all_tags(
        &self,
        path: &Path,
        destination: &Path,
    ) -> impl Future<Output = Result<(), ExifError>> + Send {
        async move {
            self.record(Call::Rewrite {
                destination: destination.to_path_buf(),
            });
            let mut content = b"repaired:".to_vec();
            content.extend(fs::read(path).map_err(|err| ExifError::io(path, err))?);
            fs::write(destination, content).map_err(|err| ExifError::io(destination, err))
        }
    }

    fn custom_command(
        &self,
        _path: &Path,
        tokens: &[String],
    ) -> impl Future<Output = Result<Option<Value>, ExifError>> + Send {
        async move {
            self.record(Call::Custom {
                tokens: tokens.to_vec(),
            });
            if is_write_command(tokens) {
                return Err(ExifError::UnsupportedOperation("write command".into()));
            }
            if tokens.is_empty() {
                return Ok(None);
            }
            Ok(Some(json!({ "args": tokens })))
        }
    }
}

pub fn test_config(root: &Path) -> NodeConfig {
    NodeConfig {
        storage_path: root.join("storage"),
        settle_delay_ms: 0,
        ..NodeConfig::default()
    }
}

pub fn image_item(field: &str, extension: &str, data: &[u8]) -> Item {
    let mut item = Item::with_binary(field, BinaryData::new(data.to_vec(), extension));
    item.json.insert("name".into(), json!("holiday"));
    item
}

pub fn png_item() -> Item {
    image_item("data", "png", PNG_BYTES)
}

/// Names of everything left in the storage directory.
pub fn leftovers(storage: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(storage)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
