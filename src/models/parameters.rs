use crate::common::{DEFAULT_DATA_PROPERTY, DEFAULT_OUTPUT_PROPERTY};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    #[default]
    Read,
    Write,
    Repair,
    Delete,
    CustomCmd,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Repair => "repair",
            Operation::Delete => "delete",
            Operation::CustomCmd => "customCmd",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeOptions {
    /// Return exiftool's output untransformed
    pub read_raw: bool,
    /// Split comma separated values of list tags such as `Keywords`
    pub parse_input_fields: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            read_raw: false,
            parse_input_fields: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl MetadataValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExifMetadata {
    pub metadata_values: Vec<MetadataValue>,
}

/// Parameters shared by every item of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeParameters {
    pub operation: Operation,
    pub data_property_name: String,
    pub output_property_name: String,
    pub custom_cmd: String,
    pub keep_tags: String,
    pub exif_metadata: ExifMetadata,
    pub options: NodeOptions,
}

impl Default for NodeParameters {
    fn default() -> Self {
        Self {
            operation: Operation::default(),
            data_property_name: DEFAULT_DATA_PROPERTY.to_string(),
            output_property_name: DEFAULT_OUTPUT_PROPERTY.to_string(),
            custom_cmd: String::new(),
            keep_tags: String::new(),
            exif_metadata: ExifMetadata::default(),
            options: NodeOptions::default(),
        }
    }
}

impl NodeParameters {
    pub fn for_operation(operation: Operation) -> Self {
        Self {
            operation,
            ..Default::default()
        }
    }
}
