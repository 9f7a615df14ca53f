use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use exif_node::common::errors::{handle_error, log_secondary_error};
use exif_node::workflow::processors::setup::{check_exiftool, initialize_logger};
use exif_node::{ExifDataNode, ExifTool, Item, NodeConfig, NodeParameters};
use log::info;
use serde::{Deserialize, Serialize};
use std::{fs, io::Write, path::PathBuf, time::Instant};

#[derive(Parser)]
#[command(name = "exif-node", version, about = "Read, write and repair image metadata with exiftool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a batch request file
    Run {
        /// Request file with `parameters` and `items`
        #[arg(short, long)]
        input: PathBuf,
        /// Response file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overrides EXIF_NODE_STORAGE_PATH
        #[arg(long)]
        storage_path: Option<PathBuf>,
        /// Record failed items instead of aborting the batch
        #[arg(long)]
        continue_on_fail: bool,
    },
    /// Print the installed exiftool version
    Check,
}

#[derive(Deserialize)]
struct BatchRequest {
    #[serde(default)]
    parameters: NodeParameters,
    items: Vec<Item>,
}

#[derive(Serialize)]
struct BatchResponse {
    items: Vec<Item>,
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_logger();
    let cli = Cli::parse();
    let mut config = NodeConfig::from_env().map_err(handle_error)?;

    match cli.command {
        Commands::Check => {
            let tool = ExifTool::from_config(&config);
            let version = check_exiftool(&tool).await;
            stop_exiftool(&tool).await;
            match version {
                Some(version) => {
                    println!("{}", version);
                    Ok(())
                }
                None => Err(handle_error(anyhow!(
                    "exiftool is not usable at {:?}",
                    config.exiftool_path
                ))),
            }
        }
        Commands::Run {
            input,
            output,
            storage_path,
            continue_on_fail,
        } => {
            if let Some(storage_path) = storage_path {
                config.storage_path = storage_path;
            }
            config.continue_on_fail |= continue_on_fail;
            run(&config, input, output).await.map_err(handle_error)
        }
    }
}

async fn run(config: &NodeConfig, input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let start_time = Instant::now();

    let raw = fs::read_to_string(&input)
        .with_context(|| format!("failed to read request file {:?}", input))?;
    let request: BatchRequest = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse request file {:?}", input))?;
    let count = request.items.len();

    let node = ExifDataNode::new(ExifTool::from_config(config), config);
    let result = node.execute(request.items, &request.parameters).await;
    stop_exiftool(node.tool()).await;
    let items = result?;

    let response = serde_json::to_vec_pretty(&BatchResponse { items })?;
    match output {
        Some(path) => fs::write(&path, &response)
            .with_context(|| format!("failed to write response file {:?}", path))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&response)?;
            writeln!(stdout)?;
        }
    }

    info!(
        duration = &*format!("{:?}", start_time.elapsed());
        "Processed {} item(s) with {}", count, request.parameters.operation.as_str()
    );
    Ok(())
}

async fn stop_exiftool(tool: &ExifTool) {
    if let Err(err) = tool.shutdown().await {
        log_secondary_error("Failed to stop exiftool", &err);
    }
}
