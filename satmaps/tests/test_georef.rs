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

use satmaps::{allocate_dst_raster, roi_bbox, SatmapsError, DST_NODATA};
use satmaps_gdal::Dataset;

// a high latitude ROI ring (lon,lat) with an equal area target CRS
const ROI: [(f64,f64); 5] = [(-2.21,82.84),(14.14,83.13),(13.26,73.37),(-3.9,74.25),(-2.21,82.84)];
const CRS: &str = "EPSG:3035";
const RES: f64 = 1500.0;

#[test]
fn test_grid_derivation () {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mosaic.tif");

    let (min_x, min_y, max_x, max_y) = roi_bbox( &ROI, CRS).unwrap();
    assert!( max_x > min_x && max_y > min_y);

    let dst = allocate_dst_raster( &path, &ROI, CRS, RES).unwrap();

    // width/height are ceil(extent/res), never zero for a non degenerate ROI
    assert_eq!( dst.width, ((max_x - min_x) / RES).ceil() as usize);
    assert_eq!( dst.height, ((max_y - min_y) / RES).ceil() as usize);
    assert!( dst.width >= 1 && dst.height >= 1);

    // north-up: origin at upper left, no rotation, negative vertical pixel size
    let gt = dst.geo_transform;
    assert_eq!( gt[0], min_x);
    assert_eq!( gt[3], max_y);
    assert_eq!( gt[1], RES);
    assert_eq!( gt[5], -RES);
    assert_eq!( gt[2], 0.0);
    assert_eq!( gt[4], 0.0);
}

#[test]
fn test_allocated_raster_properties () {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mosaic.tif");

    let dst = allocate_dst_raster( &path, &ROI, CRS, RES).unwrap();

    let ds = Dataset::open( &dst.path).unwrap();
    assert_eq!( ds.raster_size(), (dst.width, dst.height));
    assert_eq!( ds.geo_transform().unwrap(), dst.geo_transform);

    let band = ds.rasterband(1).unwrap();
    assert_eq!( band.no_data_value(), Some(DST_NODATA));
}

#[test]
fn test_degenerate_roi_fails_fast () {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mosaic.tif");

    // a closed ring with zero area
    let degenerate = [(5.0,45.0),(5.0,45.0),(5.0,45.0),(5.0,45.0)];

    match allocate_dst_raster( &path, &degenerate, CRS, RES) {
        Err(SatmapsError::SchemaError(_)) => assert!( !path.exists()),
        other => panic!("expected fail-fast schema error, got {other:?}")
    }
}
