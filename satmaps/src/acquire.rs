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

//! acquisition worker: fetch one scene's data product into the run working directory and
//! unpack it. All files are namespaced by scene identifier so distinct scenes can be fetched
//! concurrently without interference. The caller gets back a handle with the designated band
//! file the compositor consumes.

use std::{fs::{self,File}, path::{Path,PathBuf}};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;
use zip::ZipArchive;

use crate::{ensure_writable_dir, CatalogEntry, CatalogService};
use crate::errors::{Result, SatmapsError, service_error};

lazy_static! {
    /// the fixed naming convention of the designated band within an unpacked product, e.g.
    /// "S1A_..._VV.tif" or "T32TQM_..._B04.tif"
    static ref BAND_FILE_RE: Regex = Regex::new( r#"(?i).*[_-](vv|b0?4)([_-].*)?\.tiff?$"#).unwrap();
}

/// the per-scene result of a successful fetch - input handle for the composite phase
#[derive(Debug,Clone)]
pub struct SceneFiles {
    pub id: String,
    pub archive: PathBuf,
    pub dir: PathBuf,
    pub band_file: PathBuf,
}

/// fetch and unpack one scene. Leaves the archive and its extracted contents in the working
/// directory, namespaced by the scene identifier
pub async fn acquire_scene<C: CatalogService + ?Sized> (catalog: &C, entry: &CatalogEntry, work_dir: &Path) -> Result<SceneFiles> {
    let archive = work_dir.join( format!("{}.zip", entry.id));
    let dir = work_dir.join( &entry.id);
    ensure_writable_dir( &dir)?;

    let len = catalog.fetch_scene( entry, &archive).await?;
    info!("fetched scene {} ({} bytes)", entry.id, len);

    ZipArchive::new( File::open( &archive)?)?.extract( &dir)?;

    let band_file = find_band_file( &dir)?
        .ok_or_else( || service_error( format!("no designated band file in product of scene {}", entry.id)))?;

    Ok( SceneFiles{ id: entry.id.clone(), archive, dir, band_file } )
}

/// locate the designated band file within the unpacked product layout
fn find_band_file (dir: &Path) -> Result<Option<PathBuf>> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if let Some(found) = find_band_file( &path)? {
                return Ok( Some(found))
            }
        } else if let Some(name) = path.file_name().and_then( |n| n.to_str()) {
            if BAND_FILE_RE.is_match(name) {
                return Ok( Some(path))
            }
        }
    }
    Ok(None)
}
