//! Pixmirror CLI — batch image upload to the primary store and the
//! secondary index.
//!
//! Set IMGBB_API_KEY, NYCKEL_CLIENT_ID, NYCKEL_SECRET_KEY, and
//! NYCKEL_FUNCTION_ID (or pass --function-id).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pixmirror_cli::{init_tracing, logical_name};
use pixmirror_core::models::UploadTask;
use pixmirror_core::Config;
use pixmirror_services::{DualUploader, ImgbbClient, NyckelClient, NyckelCredentials, TokenCache};
use pixmirror_worker::BatchUploader;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "pixmirror", about = "Dual-service image upload pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more images to both services
    Upload {
        /// Image files to upload
        files: Vec<PathBuf>,
        /// Override the secondary service function id
        #[arg(long)]
        function_id: Option<String>,
    },
    /// Delete an image from both services
    Delete {
        /// Logical image name recorded at upload time
        name: String,
        /// Primary store delete hash recorded at upload time
        #[arg(long)]
        delete_hash: String,
        /// Secondary service sample id recorded at upload time
        #[arg(long)]
        sample_id: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn build_uploader(config: &Config, function_id: Option<String>) -> DualUploader {
    let credentials = match (&config.nyckel_client_id, &config.nyckel_client_secret) {
        (Some(client_id), Some(client_secret)) => Some(NyckelCredentials {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
        }),
        _ => None,
    };
    let imgbb = ImgbbClient::new(config.imgbb_api_key.clone(), config.primary_retry());
    let nyckel = NyckelClient::new(
        credentials,
        function_id.or_else(|| config.nyckel_function_id.clone()),
        Arc::new(TokenCache::new()),
        config.secondary_retry(),
    );
    DualUploader::new(imgbb, nyckel).with_expiration(config.imgbb_expiration_seconds)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Upload { files, function_id } => {
            if files.is_empty() {
                anyhow::bail!("No files to upload");
            }
            let mut tasks = Vec::with_capacity(files.len());
            for file in &files {
                let data = std::fs::read(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                tasks.push(UploadTask::new(data, logical_name(file)));
            }

            let uploader = Arc::new(build_uploader(&config, function_id));
            let batch = BatchUploader::new(uploader, config.batch());
            let results = batch.upload_all(tasks).await;
            if results.len() < files.len() {
                tracing::warn!(
                    failed = files.len() - results.len(),
                    "Some uploads failed and were omitted from the results"
                );
            }
            print_json(&results)?;
        }
        Commands::Delete {
            name,
            delete_hash,
            sample_id,
        } => {
            let uploader = build_uploader(&config, None);
            let result = uploader
                .delete(&name, &delete_hash, sample_id.as_deref())
                .await;
            print_json(&result)?;
        }
    }

    Ok(())
}
