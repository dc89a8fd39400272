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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SatmapsError>;

#[derive(Error,Debug)]
pub enum SatmapsError {
    /// request document fails the required-key check, or a value cannot be used as its semantic type
    #[error("request schema error {0}")]
    SchemaError( String ),

    /// invalid run mode / missing credentials, fatal at startup
    #[error("configuration error {0}")]
    ConfigError( String ),

    /// empty request store, or catalog returned no scenes at all
    #[error("empty result error {0}")]
    EmptyResult( String ),

    #[error("catalog service error {0}")]
    ServiceError( String ),

    #[error("http error {0}")]
    HttpError( #[from] reqwest::Error),

    #[error("smtp error {0}")]
    SmtpError( String ),

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("zip archive error {0}")]
    ZipError( #[from] zip::result::ZipError),

    #[error("json error {0}")]
    JsonError( #[from] serde_json::Error),

    #[error("ron config error {0}")]
    RonError( #[from] ron::error::SpannedError),

    // pass through for errors in our gdal layer
    #[error("raster error {0}")]
    RasterError( #[from] satmaps_gdal::errors::SatmapsGdalError),

    // pass through for errors in the gdal crate
    #[error("gdal error {0}")]
    GdalError( #[from] satmaps_gdal::GdalError),

    #[error("misc error {0}")]
    MiscError( String ),
}

pub fn schema_error (msg: impl ToString)->SatmapsError {
    SatmapsError::SchemaError(msg.to_string())
}

pub fn config_error (msg: impl ToString)->SatmapsError {
    SatmapsError::ConfigError(msg.to_string())
}

pub fn empty_result (msg: impl ToString)->SatmapsError {
    SatmapsError::EmptyResult(msg.to_string())
}

pub fn service_error (msg: impl ToString)->SatmapsError {
    SatmapsError::ServiceError(msg.to_string())
}

pub fn misc_error (msg: impl ToString)->SatmapsError {
    SatmapsError::MiscError(msg.to_string())
}
