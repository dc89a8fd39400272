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

//! mosaic compositor: warp fetched scene bands into the shared destination raster.
//!
//! The destination is a shared-write target, so composition is strictly serial and runs only
//! after the fetch phase completed. Scenes are composited in catalog iteration order - where
//! scenes overlap, the later write wins.

use satmaps_gdal::{Dataset, open_update, warp::{warp_band_into, Resampling}};
use tracing::info;

use crate::{DstRaster, SceneFiles};
use crate::errors::Result;

/// warp one unpacked scene band into the destination raster, resampling bilinearly. Source
/// nodata pixels never overwrite destination pixels
pub fn composite_scene (dst_ds: &mut Dataset, scene: &SceneFiles) -> Result<()> {
    let src_ds = Dataset::open( &scene.band_file)?;
    warp_band_into( &src_ds, 1, dst_ds, 1, Resampling::Bilinear)?;
    info!("composited scene {}", scene.id);
    Ok(())
}

/// composite all fetched scenes, one at a time, in the given (catalog) order. Returns the
/// identifiers of the scenes written into the mosaic
pub fn composite_all (dst: &DstRaster, scenes: &[SceneFiles]) -> Result<Vec<String>> {
    let mut dst_ds = open_update( &dst.path)?;
    let mut ids: Vec<String> = Vec::with_capacity( scenes.len());

    for scene in scenes {
        composite_scene( &mut dst_ds, scene)?;
        ids.push( scene.id.clone());
    }

    Ok(ids)
}
