use crate::common::errors::NodeError;
use crate::config::NodeConfig;
use crate::exiftool::MetadataTool;
use crate::models::{Item, NodeParameters};
use crate::workflow::processors::{lifecycle::process_item, setup::ensure_storage_area};
use log::{info, warn};
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

/// Runs a batch of items through exiftool, one item at a time.
pub struct ExifDataNode<T: MetadataTool> {
    tool: T,
    storage_path: PathBuf,
    settle_delay: Duration,
    continue_on_fail: bool,
}

impl<T: MetadataTool> ExifDataNode<T> {
    pub fn new(tool: T, config: &NodeConfig) -> Self {
        Self {
            tool,
            storage_path: config.storage_path.clone(),
            settle_delay: config.settle_delay(),
            continue_on_fail: config.continue_on_fail,
        }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Process `items` in order and return the output collection.
    ///
    /// A missing storage area aborts before any item is touched. Item failures
    /// either become failed-item records at the item's position or abort the
    /// batch with the item index attached, depending on `continue_on_fail`.
    pub async fn execute(
        &self,
        items: Vec<Item>,
        params: &NodeParameters,
    ) -> Result<Vec<Item>, NodeError> {
        ensure_storage_area(&self.storage_path)?;

        let total = items.len();
        let mut output = Vec::with_capacity(total);

        for (index, mut item) in items.into_iter().enumerate() {
            let start_time = Instant::now();
            let input_json = item.json.clone();

            match process_item(
                &self.tool,
                &self.storage_path,
                &mut item,
                params,
                self.settle_delay,
            )
            .await
            {
                Ok(()) => {
                    info!(
                        duration = &*format!("{:?}", start_time.elapsed());
                        "Processed item {}/{} ({})", index + 1, total, params.operation.as_str()
                    );
                    item.paired_item = Some(index);
                    output.push(item);
                }
                Err(err) => {
                    let err = NodeError::from(err).with_item_index(index);
                    if !(self.continue_on_fail && err.error.is_item_scoped()) {
                        return Err(err);
                    }
                    warn!("Item failed, continuing: {}", err);
                    output.push(Item::failed(input_json, err.to_record(), index));
                }
            }
        }

        Ok(output)
    }
}
