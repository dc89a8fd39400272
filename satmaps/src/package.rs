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

//! packaging: rescale the finished mosaic to byte depth, compress it into a lossy JPEG with
//! worldfile and projection sidecars, and bundle everything into one distributable archive
//! named after the run's UTC timestamp.

use std::{fs::{self,File}, io::Write, path::{Path,PathBuf}};
use chrono::{DateTime,Utc};
use satmaps_gdal::{Dataset, jpeg_create_opts, srs_from_definition, translate::{rescale_to_byte, save_as}, write_world_file};
use tracing::info;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::DstRaster;
use crate::errors::Result;

const JPEG_QUALITY: u8 = 85;

/// the distributable output of one pipeline run
#[derive(Debug,Clone)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
}

/// deterministic artifact basename for a run timestamp
pub fn artifact_name (now: DateTime<Utc>) -> String {
    format!("satmap_{}", now.format("%Y%m%dT%H%M%SZ"))
}

pub fn package_mosaic (dst: &DstRaster, out_dir: &Path, now: DateTime<Utc>) -> Result<Artifact> {
    let basename = artifact_name(now);

    let jpg_path = out_dir.join( format!("{basename}.jpg"));
    let wld_path = out_dir.join( format!("{basename}.jgw"));
    let prj_path = out_dir.join( format!("{basename}.prj"));
    let zip_path = out_dir.join( format!("{basename}.zip"));

    //--- byte depth + lossy compression
    let mosaic_ds = Dataset::open( &dst.path)?;
    let byte_ds = rescale_to_byte( &mosaic_ds, 1)?;
    save_as( &byte_ds, &jpg_path, &jpeg_create_opts(JPEG_QUALITY))?;

    //--- georeferencing sidecars
    write_world_file( &dst.geo_transform, &wld_path)?;
    fs::write( &prj_path, srs_from_definition( &dst.crs)?.to_wkt()?)?;

    //--- bundle
    let mut zw = ZipWriter::new( File::create( &zip_path)?);
    let opts = SimpleFileOptions::default().compression_method( CompressionMethod::Deflated);
    for (ext, path) in [("jpg", &jpg_path), ("jgw", &wld_path), ("prj", &prj_path)] {
        zw.start_file( format!("{basename}.{ext}"), opts)?;
        zw.write_all( &fs::read(path)?)?;
    }
    zw.finish()?;

    info!("packaged mosaic into {:?}", zip_path);
    Ok( Artifact{ name: format!("{basename}.zip"), path: zip_path } )
}
