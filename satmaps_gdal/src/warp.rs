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

//! reprojecting band warp into an existing georeferenced dataset.
//!
//! This is deliberately a write-combining operation: pixels of the destination are only
//! overwritten where the source has valid (non-nodata) data, so consecutive warps of
//! overlapping scenes into the same destination compose with last-write-wins semantics.

use gdal::{Dataset, GeoTransformEx};
use gdal::raster::Buffer;

use crate::errors::{Result, SatmapsGdalError};
use crate::{pixel_center, PointTransform};

#[derive(Debug,Clone,Copy,PartialEq)]
pub enum Resampling {
    Nearest,
    Bilinear,
}

/// warp one band of the source dataset into one band of an already georeferenced destination
/// dataset, resampling with the given algorithm. Only destination pixels that map into valid
/// source data are written; source nodata never overwrites destination pixels.
pub fn warp_band_into (src_ds: &Dataset, src_band_idx: usize, dst_ds: &mut Dataset, dst_band_idx: usize, resampling: Resampling) -> Result<()> {
    let src_srs = src_ds.spatial_ref()?;
    let dst_srs = dst_ds.spatial_ref()?;

    let src_gt = src_ds.geo_transform()?;
    let src_inv = src_gt.invert()?;
    let dst_gt = dst_ds.geo_transform()?;

    let (src_w, src_h) = src_ds.raster_size();
    let (dst_w, dst_h) = dst_ds.raster_size();

    let src_band = src_ds.rasterband(src_band_idx)?;
    let src_nodata = src_band.no_data_value();

    // scenes are small compared to the mosaic so we keep the whole source band in memory
    let src_buf: Buffer<f64> = src_band.read_as( (0,0), (src_w,src_h), (src_w,src_h), None)?;
    let src_data = src_buf.data();

    let mut dst_band = dst_ds.rasterband(dst_band_idx)?;

    let mut xs: Vec<f64> = vec![0.0; dst_w];
    let mut ys: Vec<f64> = vec![0.0; dst_w];

    let to_src = PointTransform::new( &dst_srs, &src_srs)?;

    for j in 0..dst_h {
        for i in 0..dst_w {
            let (wx,wy) = pixel_center( &dst_gt, i, j);
            xs[i] = wx;
            ys[i] = wy;
        }
        if to_src.transform_slices( &mut xs, &mut ys).is_err() {
            continue; // row (partially) outside the source SRS domain - nothing to composite here
        }

        let mut row: Buffer<f64> = dst_band.read_as( (0, j as isize), (dst_w,1), (dst_w,1), None)?;
        let mut modified = false;
        {
            let row_data = row.data_mut();
            for i in 0..dst_w {
                let (px,py) = src_inv.apply( xs[i], ys[i]);
                if let Some(v) = sample( src_data, src_w, src_h, px, py, src_nodata, resampling) {
                    row_data[i] = v;
                    modified = true;
                }
            }
        }

        if modified {
            dst_band.write( (0, j as isize), (dst_w,1), &mut row)?;
        }
    }

    Ok(())
}

/// sample the source band at fractional pixel coordinates (px,py). Returns None if the position
/// is outside the source raster or any contributing source pixel is nodata
fn sample (data: &[f64], w: usize, h: usize, px: f64, py: f64, nodata: Option<f64>, resampling: Resampling) -> Option<f64> {
    match resampling {
        Resampling::Nearest => {
            let i = px.floor();
            let j = py.floor();
            if i < 0.0 || j < 0.0 || i >= w as f64 || j >= h as f64 { return None }
            valid_value( data, w, i as usize, j as usize, nodata)
        }
        Resampling::Bilinear => {
            // pixel center convention: u == 0.0 at the center of column 0
            let u = px - 0.5;
            let v = py - 0.5;
            let i0f = u.floor();
            let j0f = v.floor();
            let fx = u - i0f;
            let fy = v - j0f;

            let i0 = i0f as isize;
            let j0 = j0f as isize;
            if i0 < 0 || j0 < 0 || (i0 + 1) >= w as isize || (j0 + 1) >= h as isize { return None }
            let (i0,j0) = (i0 as usize, j0 as usize);

            let v00 = valid_value( data, w, i0,   j0,   nodata)?;
            let v10 = valid_value( data, w, i0+1, j0,   nodata)?;
            let v01 = valid_value( data, w, i0,   j0+1, nodata)?;
            let v11 = valid_value( data, w, i0+1, j0+1, nodata)?;

            let top = v00 + (v10 - v00) * fx;
            let bot = v01 + (v11 - v01) * fx;
            Some( top + (bot - top) * fy )
        }
    }
}

#[inline]
fn valid_value (data: &[f64], w: usize, i: usize, j: usize, nodata: Option<f64>) -> Option<f64> {
    let v = data[j*w + i];
    if let Some(nd) = nodata {
        if v == nd { return None }
    }
    Some(v)
}
