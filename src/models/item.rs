use crate::common::{errors::ErrorRecord, mime_type_for_extension};
use crate::utils::PathExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, path::Path};

/// A binary attachment as the workflow engine hands it over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryData {
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl BinaryData {
    pub fn new(data: Vec<u8>, file_extension: impl Into<String>) -> Self {
        Self {
            data,
            file_extension: Some(file_extension.into()),
            ..Default::default()
        }
    }

    /// Lowercased extension, falling back to the one in `file_name`.
    pub fn extension(&self) -> Option<String> {
        let from_field = self
            .file_extension
            .as_deref()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty());

        from_field.or_else(|| {
            self.file_name
                .as_deref()
                .map(|name| Path::new(name).ext_lower())
                .filter(|ext| !ext.is_empty())
        })
    }

    /// Repack processed file content. `file_path` names the staged file the
    /// bytes belong to, which provides file name, extension and MIME type.
    pub fn from_file(data: Vec<u8>, file_path: &Path) -> Self {
        let ext = file_path.ext_lower();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Self {
            file_size: Some(data.len() as u64),
            mime_type: Some(mime_type_for_extension(&ext).to_string()),
            file_extension: Some(ext),
            file_name,
            data,
        }
    }
}

/// One element of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)]
    pub json: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary: BTreeMap<String, BinaryData>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_item: Option<usize>,
}

impl Item {
    pub fn with_binary(field: impl Into<String>, binary: BinaryData) -> Self {
        let mut item = Self::default();
        item.binary.insert(field.into(), binary);
        item
    }

    /// Record standing in for an item that failed under continue-on-failure.
    pub fn failed(json: Map<String, Value>, error: ErrorRecord, item_index: usize) -> Self {
        Self {
            json,
            binary: BTreeMap::new(),
            error: Some(error),
            paired_item: Some(item_index),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(bytes: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
