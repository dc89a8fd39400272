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

//! georeferencing engine: turn the request's ROI ring, target CRS and resolution into a pixel
//! grid and allocate the empty destination raster all scenes of a run are warped into.

use std::path::{Path,PathBuf};
use geo::Rect;
use satmaps_gdal::{
    DriverManager, GdalDataType, GeoTransform,
    PointTransform, compress_create_opts, create_dataset, geotransform_from_bbox, srs_epsg_4326, srs_from_definition
};
use tracing::info;

use crate::errors::{Result, SatmapsError, schema_error};

/// nodata sentinel of the destination raster - pixel value 0 means "no valid observation"
pub const DST_NODATA: f64 = 0.0;

/// the single shared georeferenced output grid of one pipeline run
#[derive(Debug,Clone)]
pub struct DstRaster {
    pub path: PathBuf,

    pub width: usize,
    pub height: usize,

    /// target CRS definition, e.g. "EPSG:3035"
    pub crs: String,

    /// pixel to world mapping. Rotation terms are always zero and the vertical pixel size is
    /// always negative (north-up convention)
    pub geo_transform: GeoTransform,

    pub nodata: f64,
}

/// the reprojected, axis aligned bounding box of the ROI ring in target CRS coordinates
pub fn roi_bbox (roi: &[(f64,f64)], crs_def: &str) -> Result<(f64,f64,f64,f64)> {
    let s_srs = srs_epsg_4326();
    let t_srs = srs_from_definition(crs_def)?;
    let to_target = PointTransform::new( &s_srs, &t_srs)?;

    let mut xs: Vec<f64> = roi.iter().map( |(lon,_)| *lon).collect();
    let mut ys: Vec<f64> = roi.iter().map( |(_,lat)| *lat).collect();
    to_target.transform_slices( &mut xs, &mut ys).map_err( |e| schema_error( format!("cannot reproject roi to {crs_def}: {e}")))?;

    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for i in 0..xs.len() {
        if xs[i] < min_x { min_x = xs[i] }
        if xs[i] > max_x { max_x = xs[i] }
        if ys[i] < min_y { min_y = ys[i] }
        if ys[i] > max_y { max_y = ys[i] }
    }

    Ok( (min_x, min_y, max_x, max_y) )
}

/// derive the pixel grid and allocate the empty uint16 destination raster. Degenerate (zero
/// area) ROIs fail fast instead of allocating a zero sized raster
pub fn allocate_dst_raster (path: impl AsRef<Path>, roi: &[(f64,f64)], crs_def: &str, resolution: f64) -> Result<DstRaster> {
    let path = path.as_ref().to_path_buf();

    let (min_x, min_y, max_x, max_y) = roi_bbox( roi, crs_def)?;
    if max_x <= min_x || max_y <= min_y {
        return Err( schema_error( format!("degenerate roi bounding box [{min_x},{min_y},{max_x},{max_y}]")))
    }

    let width = ((max_x - min_x) / resolution).ceil() as usize;
    let height = ((max_y - min_y) / resolution).ceil() as usize;
    let bbox = Rect::new( (min_x, min_y), (max_x, max_y));
    let geo_transform = geotransform_from_bbox( bbox, resolution, -resolution);

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds = create_dataset( &driver, &path, width, height, 1, GdalDataType::UInt16, Some(compress_create_opts()))?;
    ds.set_spatial_ref( &srs_from_definition(crs_def)?)?;
    ds.set_geo_transform( &geo_transform)?;
    ds.rasterband(1)?.set_no_data_value( Some(DST_NODATA))?;

    info!("allocated {}x{} destination raster {:?} ({crs_def} @ {resolution})", width, height, path);

    Ok( DstRaster{ path, width, height, crs: crs_def.to_string(), geo_transform, nodata: DST_NODATA } )
}
