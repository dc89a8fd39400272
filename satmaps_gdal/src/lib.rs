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
#![allow(unused)]

//! thin layer over the gdal crate with the raster primitives used by the satmaps pipeline:
//! driver lookup, geotransform construction, SRS-aware point transforms, dataset allocation
//! and worldfile output. The warping itself lives in [`warp`].

pub mod errors;
pub mod warp;
pub mod translate;

use lazy_static::lazy_static;
use std::{collections::HashMap, fs::File, io::Write, path::Path};

// we re-export these so that other crates don't have to use a direct gdal dependency to import.
pub use gdal::{self, Driver, DriverManager, Metadata, MetadataEntry, Dataset, DatasetOptions, GdalOpenFlags,
               errors::GdalError, GeoTransform, GeoTransformEx};
pub use gdal::raster::{GdalType, GdalDataType, RasterBand, Buffer, RasterCreationOptions};
pub use gdal::spatial_ref::{CoordTransform, CoordTransformOptions, SpatialRef};

use geo::Rect;

use crate::errors::{Result, SatmapsGdalError, misc_error};

lazy_static! {
    // note that we can't automatically populate this by iterating over DriverManager since some
    // drivers use the same file extension
    static ref EXT_MAP: HashMap<&'static str, &'static str> = HashMap::from( [ // file extension -> driver short name
        ("tif", "GTiff"),
        ("tiff", "GTiff"),
        ("png", "PNG"),
        ("jpg", "JPEG"),
        ("jpeg", "JPEG"),
        ("webp", "WEBP"),
    ]);
}

/// Note that filename extension has to be lower case
pub fn get_driver_name_from_filename (filename: &str) -> Option<&'static str> {
    get_filename_extension(filename).and_then( |ext| EXT_MAP.get( ext)).map(|v| &**v)
}

pub fn get_filename_extension<'a> (path: &'a str) -> Option<&'a str> {
    path.rfind('.').map( |idx| &path[idx+1..])
}

pub fn open_update<P:AsRef<Path>> (path: P)->Result<Dataset> {
    let dso = DatasetOptions {
        open_flags: GdalOpenFlags::GDAL_OF_UPDATE,
        allowed_drivers: None,
        open_options: None,
        sibling_files: None
    };
    Ok( Dataset::open_ex(path, dso)? )
}

/* #region geotransforms ******************************************************************************/

pub fn new_geotransform (x_upper_left: f64, x_resolution: f64, row_rotation: f64,
                         y_upper_left: f64, col_rotation: f64, y_resolution: f64) -> GeoTransform {
    [x_upper_left,x_resolution,row_rotation,y_upper_left,col_rotation,y_resolution]
}

/// axis aligned, north-up geotransform for the given bbox (y resolution has to be negative)
pub fn geotransform_from_bbox (bbox: Rect<f64>, x_resolution: f64, y_resolution: f64) -> GeoTransform {
    new_geotransform(bbox.min().x, x_resolution, 0.0,
                     bbox.max().y, 0.0, y_resolution)
}

/// world coordinate of the pixel center at (col,row)
pub fn pixel_center (gt: &GeoTransform, col: usize, row: usize) -> (f64,f64) {
    gt.apply( col as f64 + 0.5, row as f64 + 0.5)
}

/* #endregion geotransforms */

/* #region SpatialRef based coordinate transformations ************************************************/

pub fn srs_epsg_4326 () -> SpatialRef { SpatialRef::from_epsg(4326).unwrap() }

/// SpatialRef from a user level definition such as "EPSG:3035"
pub fn srs_from_definition (def: &str) -> Result<SpatialRef> {
    Ok( SpatialRef::from_definition(def)? )
}

/// a point transform between two SpatialRefs that always takes and returns (x,y)/(lon,lat) order.
/// Geographic SpatialRefs with authority compliant axis mapping expect (lat,lon), so we have to
/// swap on the respective side (we don't want to change axis_mapping_strategy in the provided SpatialRefs)
pub struct PointTransform {
    transform: CoordTransform,
    swap_in: bool,
    swap_out: bool,
}

impl PointTransform {
    pub fn new (s_srs: &SpatialRef, t_srs: &SpatialRef) -> Result<Self> {
        let mut ct_options = CoordTransformOptions::new()?;
        ct_options.desired_accuracy( 0.0);
        ct_options.set_ballpark_allowed(false);
        let transform = CoordTransform::new_with_options(s_srs, t_srs, &ct_options)?;

        Ok( PointTransform { transform, swap_in: s_srs.is_geographic(), swap_out: t_srs.is_geographic() } )
    }

    /// in-place transform of coordinate slices given in (x,y) order, returned in (x,y) order
    pub fn transform_slices (&self, xs: &mut [f64], ys: &mut [f64]) -> Result<()> {
        let mut az: [f64;0] = [];

        if self.swap_in { // geographic source wants (lat,lon) as its first/second axis
            self.transform.transform_coords( ys, xs, &mut az)?;
        } else {
            self.transform.transform_coords( xs, ys, &mut az)?;
        }

        // transform_coords writes target axis values back into its argument slices, so with
        // exactly one geographic side the results ended up in the crossed slices
        if self.swap_in != self.swap_out {
            for i in 0..xs.len() {
                std::mem::swap( &mut xs[i], &mut ys[i]);
            }
        }
        Ok(())
    }
}

/* #endregion SpatialRef based coordinate transformations */

/* #region dataset creation ****************************************************************************/

pub fn create_dataset<P> (driver: &Driver, path: P, width: usize, height: usize, n_bands: usize, data_type: GdalDataType, co: Option<RasterCreationOptions>)->Result<Dataset>
    where P: AsRef<Path>
{
    use GdalDataType::*;
    if let Some(co) = co {
        match data_type {
            UInt8   => Ok( driver.create_with_band_type_with_options::<u8,P>(path, width, height, n_bands, &co)? ),
            UInt16  => Ok( driver.create_with_band_type_with_options::<u16,P>(path, width, height, n_bands, &co)? ),
            Int16   => Ok( driver.create_with_band_type_with_options::<i16,P>(path, width, height, n_bands, &co)? ),
            UInt32  => Ok( driver.create_with_band_type_with_options::<u32,P>(path, width, height, n_bands, &co)? ),
            Int32   => Ok( driver.create_with_band_type_with_options::<i32,P>(path, width, height, n_bands, &co)? ),
            Float32 => Ok( driver.create_with_band_type_with_options::<f32,P>(path, width, height, n_bands, &co)? ),
            Float64 => Ok( driver.create_with_band_type_with_options::<f64,P>(path, width, height, n_bands, &co)? ),
            other => Err( SatmapsGdalError::DataTypeError( format!("{other:?}")))
        }
    } else {
        match data_type {
            UInt8   => Ok( driver.create_with_band_type::<u8,P>(path, width, height, n_bands)? ),
            UInt16  => Ok( driver.create_with_band_type::<u16,P>(path, width, height, n_bands)? ),
            Int16   => Ok( driver.create_with_band_type::<i16,P>(path, width, height, n_bands)? ),
            UInt32  => Ok( driver.create_with_band_type::<u32,P>(path, width, height, n_bands)? ),
            Int32   => Ok( driver.create_with_band_type::<i32,P>(path, width, height, n_bands)? ),
            Float32 => Ok( driver.create_with_band_type::<f32,P>(path, width, height, n_bands)? ),
            Float64 => Ok( driver.create_with_band_type::<f64,P>(path, width, height, n_bands)? ),
            other => Err( SatmapsGdalError::DataTypeError( format!("{other:?}")))
        }
    }
}

pub fn compress_create_opts ()->RasterCreationOptions {
    let mut co = RasterCreationOptions::new();
    co.add_name_value("COMPRESS", "DEFLATE");
    co.add_name_value("PREDICTOR", "2");
    co
}

pub fn jpeg_create_opts (quality: u8)->RasterCreationOptions {
    let mut co = RasterCreationOptions::new();
    co.add_name_value("QUALITY", &quality.to_string());
    co
}

/* #endregion dataset creation */

/// write the 6 line ESRI worldfile for the given geotransform. Note worldfiles reference
/// the center of the upper left pixel, not its corner
pub fn write_world_file (gt: &GeoTransform, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path)?;
    write!( file, "{}\n{}\n{}\n{}\n{}\n{}\n",
            gt[1], gt[4], gt[2], gt[5],
            gt[0] + gt[1]/2.0,
            gt[3] + gt[5]/2.0)?;
    Ok(())
}
