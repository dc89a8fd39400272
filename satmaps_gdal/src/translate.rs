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

//! byte-depth rescaling and driver based format conversion of single band rasters

use std::path::Path;
use gdal::{Dataset, DriverManager};
use gdal::raster::{Buffer, RasterCreationOptions};

use crate::errors::{Result, SatmapsGdalError, misc_error};
use crate::get_driver_name_from_filename;

/// linearly rescale one band into an in-memory byte dataset with the same georeferencing.
/// Valid values map to 1..=255, nodata maps to 0 (which becomes the byte nodata value)
pub fn rescale_to_byte (src_ds: &Dataset, band_idx: usize) -> Result<Dataset> {
    let (w,h) = src_ds.raster_size();
    let src_band = src_ds.rasterband(band_idx)?;
    let nodata = src_band.no_data_value();

    //--- first pass: value range of valid pixels
    let mut v_min = f64::MAX;
    let mut v_max = f64::MIN;
    for j in 0..h {
        let row: Buffer<f64> = src_band.read_as( (0, j as isize), (w,1), (w,1), None)?;
        for &v in row.data() {
            if nodata.map_or( true, |nd| v != nd) {
                if v < v_min { v_min = v }
                if v > v_max { v_max = v }
            }
        }
    }
    if v_min > v_max {
        return Err( misc_error("cannot rescale raster without valid pixels"))
    }
    let span = if v_max > v_min { v_max - v_min } else { 1.0 };

    //--- second pass: scale into byte target
    let mem_driver = DriverManager::get_driver_by_name("MEM")?;
    let mut tgt_ds = mem_driver.create_with_band_type::<u8,_>( "", w, h, 1)?;
    tgt_ds.set_spatial_ref( &src_ds.spatial_ref()?)?;
    tgt_ds.set_geo_transform( &src_ds.geo_transform()?)?;

    let mut tgt_band = tgt_ds.rasterband(1)?;
    tgt_band.set_no_data_value( Some(0.0))?;

    let mut tgt_row: Buffer<u8> = Buffer::new( (w,1), vec![0u8; w]);
    for j in 0..h {
        let src_row: Buffer<f64> = src_band.read_as( (0, j as isize), (w,1), (w,1), None)?;
        {
            let src_data = src_row.data();
            let tgt_data = tgt_row.data_mut();
            for i in 0..w {
                let v = src_data[i];
                tgt_data[i] = if nodata.map_or( false, |nd| v == nd) {
                    0
                } else {
                    (1.0 + (v - v_min) * 254.0 / span).round() as u8
                };
            }
        }
        tgt_band.write( (0, j as isize), (w,1), &mut tgt_row)?;
    }
    drop(tgt_band);

    Ok(tgt_ds)
}

/// store a dataset under the given path using the driver derived from the filename extension.
/// Drivers such as JPEG and PNG only support CreateCopy so this is the generic way to emit them
pub fn save_as (ds: &Dataset, path: impl AsRef<Path>, co: &RasterCreationOptions) -> Result<()> {
    let path = path.as_ref();
    let filename = path.to_str().ok_or_else( || misc_error("invalid target pathname"))?;
    let driver_name = get_driver_name_from_filename( filename)
        .ok_or_else( || misc_error( format!("no driver for target {filename}")))?;
    let driver = DriverManager::get_driver_by_name( driver_name)?;

    ds.create_copy( &driver, path, co)?;
    Ok(())
}
