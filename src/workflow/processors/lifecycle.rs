//! Per-item lifecycle - stage, process, repack, clean up
//!
//! The staging reservation lives for the whole call. Once an item holds its
//! paths, every exit removes its artifacts from the storage area.

use crate::common::{SUPPORTED_IMAGE_EXTENSIONS, errors::{ExifError, log_secondary_error}};
use crate::exiftool::MetadataTool;
use crate::models::{BinaryData, Item, NodeParameters};
use crate::workflow::processors::{
    dispatch::dispatch,
    staging::{StagingPaths, allocate, read_output, write_staged},
};
use log::debug;
use std::{path::Path, time::Duration};

/// Process one item in place. On success `item.json[output]` holds the
/// operation result and `item.binary[data]` the processed file.
pub async fn process_item<T: MetadataTool>(
    tool: &T,
    storage: &Path,
    item: &mut Item,
    params: &NodeParameters,
    settle_delay: Duration,
) -> Result<(), ExifError> {
    let field = params.data_property_name.as_str();
    let (data, extension) = validate_input(item, field)?;

    let staged = allocate(storage, field, &extension)?;
    let result = run(tool, &staged.paths, data, item, params, settle_delay).await;

    match result {
        Ok(()) => staged.paths.remove_artifacts(),
        Err(err) => {
            // the original error wins over a failing cleanup
            if let Err(cleanup) = staged.paths.remove_artifacts() {
                log_secondary_error("Failed to clean up staging artifacts", &cleanup);
            }
            Err(err)
        }
    }
}

async fn run<T: MetadataTool>(
    tool: &T,
    paths: &StagingPaths,
    data: Vec<u8>,
    item: &mut Item,
    params: &NodeParameters,
    settle_delay: Duration,
) -> Result<(), ExifError> {
    write_staged(&paths.staged, data).await?;
    debug!("Staged {:?} for {}", paths.staged, params.operation.as_str());

    let output = dispatch(tool, paths, params, settle_delay).await?;
    item.json
        .insert(params.output_property_name.clone(), output);

    let bytes = read_output(paths.output_path()).await?;
    item.binary.insert(
        params.data_property_name.clone(),
        BinaryData::from_file(bytes, &paths.staged),
    );
    Ok(())
}

/// The attachment bytes and its supported extension.
fn validate_input(item: &Item, field: &str) -> Result<(Vec<u8>, String), ExifError> {
    let binary = item.binary.get(field).ok_or_else(|| {
        ExifError::validation(format!("no binary data found in property {:?}", field))
    })?;

    if binary.data.is_empty() {
        return Err(ExifError::validation(format!(
            "no file data provided in property {:?}",
            field
        )));
    }

    let extension = binary.extension().unwrap_or_default();
    if !SUPPORTED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ExifError::validation(format!(
            "unsupported file type {:?}; supported: {}",
            extension,
            SUPPORTED_IMAGE_EXTENSIONS.join(", ")
        )));
    }

    Ok((binary.data.clone(), extension))
}
