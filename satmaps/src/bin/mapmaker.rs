/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! command line driver for one acquisition pipeline run.
//!
//! Reads the tasking request either from an explicit file or as the latest document of a
//! request store, executes the run and writes the updated request snapshot back to where it
//! came from. Skipped runs (expired request, nothing new in the catalog) exit successfully.

use std::{fs, path::PathBuf};
use anyhow::anyhow;
use chrono::Utc;
use clap::Parser;
use tracing::info;

use satmaps::{
    config_error, load_config, pipeline, CatalogConfig, HttpCatalogService, RequestStore,
    RunConfig, RunOutcome, SkipReason, SmtpArtifactSender, SmtpConfig, TaskingRequest,
};

#[derive(Parser)]
#[command(about = "run the satellite imagery acquisition pipeline for a standing tasking request")]
struct Args {
    /// explicit request document file (mutually exclusive with --latest)
    #[arg(long)]
    request: Option<PathBuf>,

    /// act on the latest request in the store
    #[arg(long)]
    latest: bool,

    /// request store directory (required with --latest)
    #[arg(long)]
    store: Option<PathBuf>,

    /// catalog service config (RON)
    #[arg(long)]
    catalog_config: PathBuf,

    /// SMTP delivery config (RON). Without it the run only produces the artifact
    #[arg(long)]
    smtp_config: Option<PathBuf>,

    /// skip delivery even if an SMTP config is given
    #[arg(long)]
    no_send: bool,

    /// scratch directory for downloads and the working mosaic
    #[arg(long, default_value = "satmaps_work")]
    work_dir: PathBuf,

    /// output directory for packaged artifacts
    #[arg(long, default_value = "satmaps_out")]
    out_dir: PathBuf,

    /// max concurrent scene fetches
    #[arg(long, default_value_t = 1)]
    pool_size: usize,

    /// keep per-scene scratch files after the run
    #[arg(long)]
    keep_files: bool,
}

/// where the request came from, so the updated snapshot goes back to the same place
enum RequestSource {
    File( PathBuf ),
    Store( RequestStore ),
}

impl RequestSource {
    fn write_back (&self, request: &TaskingRequest) -> anyhow::Result<()> {
        match self {
            RequestSource::File(path) => Ok( fs::write( path, request.to_json_pretty()?)? ),
            RequestSource::Store(store) => Ok( store.update(request)? ),
        }
    }
}

#[tokio::main]
async fn main () -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else( |_| "info".into()))
        .init();

    let args = Args::parse();
    let now = Utc::now();

    let (request, source) = get_request( &args)?;

    let catalog_config: CatalogConfig = load_config( &args.catalog_config)?;
    let catalog = HttpCatalogService::new( catalog_config);

    let sender = get_sender( &args)?;

    let run_config = RunConfig {
        work_dir: args.work_dir.clone(),
        out_dir: args.out_dir.clone(),
        pool_size: args.pool_size,
        keep_files: args.keep_files,
    };

    match pipeline::run( &request, &catalog, sender.as_ref(), &run_config, now).await? {
        RunOutcome::Completed{ scene_ids, artifact, notify_error } => {
            let updated = request.with_run_results( &scene_ids, &artifact.name, now);
            source.write_back( &updated)?;
            info!("run complete: {} scene(s) -> {:?}", scene_ids.len(), artifact.path);

            if let Some(e) = notify_error {
                Err( anyhow!("artifact produced but delivery failed: {e}"))
            } else {
                Ok(())
            }
        }
        RunOutcome::Skipped(reason) => {
            match reason {
                SkipReason::Expired => info!("request expired, no action taken"),
                SkipReason::NoEligibleScenes => info!("no new scenes, no action taken"),
            }
            Ok(())
        }
    }
}

fn get_request (args: &Args) -> anyhow::Result<(TaskingRequest,RequestSource)> {
    match (&args.request, args.latest) {
        (Some(path), false) => {
            let request = TaskingRequest::from_file(path)?;
            Ok( (request, RequestSource::File( path.clone())) )
        }
        (None, true) => {
            let dir = args.store.as_ref()
                .ok_or_else( || config_error("--latest requires --store <dir>"))?;
            let store = RequestStore::new(dir)?;
            let request = store.latest()?;
            Ok( (request, RequestSource::Store(store)) )
        }
        _ => Err( config_error("specify either --request <file> or --latest, not both").into() )
    }
}

fn get_sender (args: &Args) -> anyhow::Result<Option<SmtpArtifactSender>> {
    if args.no_send {
        return Ok(None)
    }
    match &args.smtp_config {
        Some(path) => {
            let smtp_config: SmtpConfig = load_config(path)?;
            Ok( Some( SmtpArtifactSender::new(smtp_config)?) )
        }
        None => {
            info!("no SMTP config given, skipping delivery");
            Ok(None)
        }
    }
}
