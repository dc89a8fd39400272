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

//! the pipeline run: activity check, catalog query and dedup, the two-phase
//! fetch/composite stages, packaging and delivery.
//!
//! A run never mutates its input request - it returns a [`RunOutcome`] the caller folds into
//! a new request snapshot (see [`TaskingRequest::with_run_results`]) before writing back to
//! the store. Fetching is the only concurrent stage; everything touching the shared mosaic
//! raster is strictly serial.

use std::{fs, path::PathBuf};
use chrono::{DateTime, Duration, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    acquire_scene, allocate_dst_raster, composite_all, eligible_scenes, ensure_writable_dir,
    package_mosaic, Artifact, ArtifactSender, CatalogService, SceneFiles, TaskingRequest,
};
use crate::errors::{Result, empty_result};

#[derive(Serialize,Deserialize,Debug,Clone)]
pub struct RunConfig {
    /// scratch space for archives, unpacked products and the working mosaic
    pub work_dir: PathBuf,

    /// where the packaged artifact ends up
    pub out_dir: PathBuf,

    /// max number of concurrent scene fetches (composition is always serial)
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// keep per-scene files and the working mosaic after the run (debugging aid)
    #[serde(default)]
    pub keep_files: bool,
}

fn default_pool_size()->usize { 1 }

/// why a run ended without producing an artifact. Both cases are normal outcomes, not errors
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum SkipReason {
    /// the request's end_date lies strictly in the past
    Expired,

    /// the catalog had scenes but all of them are already in the obtained ledger
    NoEligibleScenes,
}

/// what one pipeline run produced. `Completed` carries the delta the caller has to fold into
/// the request document - delivery failure is reported but does not demote the outcome, since
/// the scenes were acquired and the artifact exists
#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        scene_ids: Vec<String>,
        artifact: Artifact,
        notify_error: Option<String>,
    },
    Skipped( SkipReason ),
}

/// execute one acquisition run for the given request snapshot.
///
/// Stage order matters: an empty catalog answer is detected before any raster is allocated or
/// any byte is fetched, and the expiry check precedes even the query
pub async fn run<C: CatalogService + ?Sized, S: ArtifactSender + ?Sized> (
    request: &TaskingRequest, catalog: &C, sender: Option<&S>, config: &RunConfig, now: DateTime<Utc>
) -> Result<RunOutcome>
{
    let req_id = request.identifier()?;

    //--- activity check
    if !request.is_active(now)? {
        info!("request {req_id} expired (end_date passed), nothing to do");
        return Ok( RunOutcome::Skipped( SkipReason::Expired))
    }

    //--- catalog query over the trailing time window [now - time_window, now]
    let roi = request.roi()?;
    let window = Duration::milliseconds( (request.time_window_hours()? * 3_600_000.0) as i64);
    let start = now - window;

    let entries = catalog.query_scenes( &roi, request.sensor()?, start, now).await?;
    if entries.is_empty() {
        // no coverage at all for an active request means something upstream is broken
        return Err( empty_result( format!("catalog has no scenes for request {req_id} in [{start},{now}]")))
    }

    let obtained = request.obtained();
    let eligible = eligible_scenes( entries, &obtained);
    if eligible.is_empty() {
        info!("request {req_id}: all catalog scenes already obtained");
        return Ok( RunOutcome::Skipped( SkipReason::NoEligibleScenes))
    }
    info!("request {req_id}: {} eligible scene(s)", eligible.len());

    //--- allocate the shared destination raster
    ensure_writable_dir( &config.work_dir)?;
    ensure_writable_dir( &config.out_dir)?;

    let mosaic_path = config.work_dir.join( format!("{req_id}_mosaic.tif"));
    let dst = allocate_dst_raster( &mosaic_path, &roi, request.crs()?, request.spatial_resolution()?)?;

    //--- phase 1: fetch/unpack, bounded concurrency, catalog order preserved
    let pool_size = config.pool_size.max(1);
    let scenes: Vec<SceneFiles> = stream::iter(
        eligible.iter().map( |entry| acquire_scene( catalog, entry, &config.work_dir))
    ).buffered( pool_size).try_collect().await?;

    //--- phase 2: serial composite into the shared raster
    let scene_ids = composite_all( &dst, &scenes)?;

    //--- package and deliver
    let artifact = package_mosaic( &dst, &config.out_dir, now)?;

    let notify_error = match sender {
        Some(sender) => notify( request, sender, &artifact, &scene_ids).await,
        None => None
    };

    if !config.keep_files {
        cleanup_run_files( &dst.path, &scenes);
    }

    Ok( RunOutcome::Completed{ scene_ids, artifact, notify_error } )
}

/// deliver the artifact. A failure here is captured, not propagated - the acquisition itself
/// succeeded and the obtained ledger has to reflect that
async fn notify<S: ArtifactSender + ?Sized> (request: &TaskingRequest, sender: &S, artifact: &Artifact, scene_ids: &[String]) -> Option<String> {
    let recipients = match request.send_to() {
        Ok(recipients) => recipients,
        Err(e) => return Some( e.to_string())
    };

    let subject = format!("new satellite map {}", artifact.name);
    let body = format!("acquired scenes:\n  {}\n", scene_ids.join("\n  "));

    match sender.send_artifact( &recipients, &subject, &body, &artifact.path).await {
        Ok(()) => {
            info!("sent {} to {} recipient(s)", artifact.name, recipients.len());
            None
        }
        Err(e) => {
            warn!("artifact delivery failed: {e}");
            Some( e.to_string())
        }
    }
}

/// best effort removal of per-run scratch files (archives, unpacked products, working mosaic)
fn cleanup_run_files (mosaic_path: &PathBuf, scenes: &[SceneFiles]) {
    for scene in scenes {
        if let Err(e) = fs::remove_file( &scene.archive) { warn!("could not remove {:?}: {e}", scene.archive) }
        if let Err(e) = fs::remove_dir_all( &scene.dir) { warn!("could not remove {:?}: {e}", scene.dir) }
    }
    if let Err(e) = fs::remove_file( mosaic_path) { warn!("could not remove {:?}: {e}", mosaic_path) }
}
