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

//! insert a tasking request document into a request store, assigning it a store identifier.
//! Date-like string values ("2017-01-01 12:00:00 UTC") are normalized on the way in, so the
//! stored document is already in canonical form.

use std::path::PathBuf;
use chrono::Utc;
use clap::Parser;
use tracing::info;

use satmaps::{read_request_document, RequestStore};

#[derive(Parser)]
#[command(about = "insert a tasking request document into a request store")]
struct Args {
    /// request store directory (created if missing)
    #[arg(long)]
    store: PathBuf,

    /// the request document to insert (JSON)
    file: PathBuf,
}

fn main () -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else( |_| "info".into()))
        .init();

    let args = Args::parse();

    // validation runs inside insert, after the store assigned the identifier
    let doc = read_request_document( &args.file)?;

    let store = RequestStore::new( &args.store)?;
    let stored = store.insert( doc, Utc::now())?;

    info!("stored request {}", stored.identifier()?);
    Ok(())
}
