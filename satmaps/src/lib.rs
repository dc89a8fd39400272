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

//! recurring satellite imagery acquisition for a fixed region of interest.
//!
//! A standing [`TaskingRequest`] describes what to look for. Each pipeline run queries the
//! imagery catalog for scenes intersecting the ROI within a trailing time window, downloads
//! the ones not yet obtained, warps them into one shared georeferenced mosaic, packages the
//! result and notifies the recipient list. The request document is the system of record for
//! which scenes have been acquired (`obtained`) and composited (`processed`).

use std::{collections::HashSet, fs, path::{Path,PathBuf}};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};

mod errors;
pub use errors::*;

pub mod store;
pub use store::*;

pub mod catalog;
pub use catalog::*;

pub mod acquire;
pub use acquire::*;

pub mod georef;
pub use georef::*;

pub mod mosaic;
pub use mosaic::*;

pub mod package;
pub use package::*;

pub mod delivery;
pub use delivery::*;

pub mod pipeline;
pub use pipeline::*;

/* #region tasking request ****************************************************************************/

/// the canonical request document schema. Validation only checks key presence - declared keys
/// may still hold null/empty values, which typed accessors reject at point of use
pub const REQUIRED_KEYS: [&str; 12] = [
    "identifier",
    "sensor",
    "start_date",
    "end_date",
    "roi",
    "send_to",
    "spatial_resolution",
    "time_window",
    "crs",
    "obtained",
    "processed",
    "history",
];

lazy_static! {
    /// the date-like string pattern recognized during file deserialization, e.g. "2017-01-01 12:00:00 UTC"
    static ref UTC_DATE_RE: Regex = Regex::new( r#"^(\d{4}-\d{2}-\d{2})( \d{2}:\d{2}:\d{2})? UTC$"#).unwrap();
}

/// parse a string carrying the UTC marker into a timestamp. Returns None if the string does not
/// match the marker pattern at all. A marker match with invalid calendar values is a hard error,
/// not a fallback to plain text
pub fn parse_utc_marker (s: &str) -> Option<Result<DateTime<Utc>>> {
    let cap = UTC_DATE_RE.captures(s)?;

    let res = if cap.get(2).is_some() {
        NaiveDateTime::parse_from_str( s.trim_end_matches(" UTC"), "%Y-%m-%d %H:%M:%S")
            .map( |ndt| ndt.and_utc())
            .map_err( |e| schema_error( format!("invalid UTC date value '{s}': {e}")))
    } else {
        NaiveDate::parse_from_str( &cap[1], "%Y-%m-%d")
            .map( |nd| nd.and_hms_opt(0,0,0).unwrap().and_utc())
            .map_err( |e| schema_error( format!("invalid UTC date value '{s}': {e}")))
    };
    Some(res)
}

/// a validated tasking request snapshot.
///
/// This wraps the raw key-value document - values are only extracted (and type checked) at
/// point of use. Instances are immutable; pipeline stages return deltas which the caller
/// folds into a new snapshot with [`TaskingRequest::with_run_results`] before the single
/// write-back to the store.
#[derive(Debug,Clone,PartialEq)]
pub struct TaskingRequest {
    doc: Map<String,Value>
}

impl TaskingRequest {
    /// construct from a raw document, rejecting it if any canonical key is missing
    pub fn from_value (v: Value) -> Result<Self> {
        match v {
            Value::Object(doc) => {
                Self::validate( &doc)?;
                Ok( TaskingRequest{ doc } )
            }
            other => Err( schema_error( format!("request document is not an object: {other}")))
        }
    }

    /// construct from a file, turning date-like string values into timestamps before validation
    pub fn from_file (path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string( path.as_ref())?;
        let mut v: Value = serde_json::from_str( &contents)?;
        normalize_date_values( &mut v)?;
        Self::from_value(v)
    }

    /// the required-key invariant: every canonical key has to be present (values are not checked)
    pub fn validate (doc: &Map<String,Value>) -> Result<()> {
        let missing: Vec<&str> = REQUIRED_KEYS.iter().filter( |k| !doc.contains_key(**k)).map(|k| *k).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err( schema_error( format!("request document missing required keys: {}", missing.join(","))))
        }
    }

    pub fn get (&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    pub fn to_value (&self) -> Value {
        Value::Object( self.doc.clone())
    }

    pub fn to_json_pretty (&self) -> Result<String> {
        Ok( serde_json::to_string_pretty( &self.doc)? )
    }

    //--- typed accessors (value errors surface here, not during validation)

    pub fn identifier (&self) -> Result<String> {
        match self.doc.get("identifier") {
            Some(Value::String(s)) => Ok( s.clone()),
            Some(Value::Number(n)) => Ok( n.to_string()),
            other => Err( schema_error( format!("request has no usable identifier: {other:?}")))
        }
    }

    pub fn sensor (&self) -> Result<&str> {
        self.str_value("sensor")
    }

    pub fn crs (&self) -> Result<&str> {
        self.str_value("crs")
    }

    pub fn start_date (&self) -> Result<DateTime<Utc>> {
        self.date_value("start_date")
    }

    pub fn end_date (&self) -> Result<DateTime<Utc>> {
        self.date_value("end_date")
    }

    /// ground distance per pixel in target CRS units
    pub fn spatial_resolution (&self) -> Result<f64> {
        let res = self.f64_value("spatial_resolution")?;
        if res > 0.0 { Ok(res) } else { Err( schema_error( format!("spatial_resolution not positive: {res}"))) }
    }

    /// catalog lookback from "now", in hours
    pub fn time_window_hours (&self) -> Result<f64> {
        let tw = self.f64_value("time_window")?;
        if tw > 0.0 { Ok(tw) } else { Err( schema_error( format!("time_window not positive: {tw}"))) }
    }

    /// the closed ROI ring as (lon,lat) pairs
    pub fn roi (&self) -> Result<Vec<(f64,f64)>> {
        let ring = match self.doc.get("roi") {
            Some(Value::Array(vs)) => {
                let mut ring: Vec<(f64,f64)> = Vec::with_capacity(vs.len());
                for v in vs {
                    match v {
                        Value::Array(p) if p.len() == 2 => {
                            let lon = p[0].as_f64().ok_or_else( || schema_error("roi vertex is not numeric"))?;
                            let lat = p[1].as_f64().ok_or_else( || schema_error("roi vertex is not numeric"))?;
                            ring.push( (lon,lat));
                        }
                        other => return Err( schema_error( format!("roi vertex is not a lon/lat pair: {other}")))
                    }
                }
                ring
            }
            other => return Err( schema_error( format!("roi is not a coordinate array: {other:?}")))
        };

        if ring.len() < 4 || ring.first() != ring.last() {
            return Err( schema_error( "roi is not a closed ring"))
        }
        Ok(ring)
    }

    pub fn send_to (&self) -> Result<Vec<String>> {
        match self.doc.get("send_to") {
            Some(Value::Array(vs)) => {
                vs.iter().map( |v| match v {
                    Value::String(s) => Ok( s.clone()),
                    other => Err( schema_error( format!("recipient is not a string: {other}")))
                }).collect()
            }
            other => Err( schema_error( format!("send_to is not an address list: {other:?}")))
        }
    }

    /// the dedup ledger. Tolerant of null/absent values - a request without prior acquisitions
    /// simply has an empty ledger
    pub fn obtained (&self) -> HashSet<String> {
        self.id_set("obtained")
    }

    pub fn processed (&self) -> HashSet<String> {
        self.id_set("processed")
    }

    /// a request is active up to and including its end_date - only strictly passed end dates are dormant
    pub fn is_active (&self, now: DateTime<Utc>) -> Result<bool> {
        Ok( self.end_date()? >= now )
    }

    /// fold a successful run into a new snapshot: extend the obtained/processed ledgers and
    /// append one history line. This is the only mutation path for request documents
    pub fn with_run_results (&self, scene_ids: &[String], artifact_name: &str, now: DateTime<Utc>) -> TaskingRequest {
        let mut doc = self.doc.clone();

        for key in ["obtained", "processed"] {
            let ids = match doc.get_mut(key) {
                Some(Value::Array(ids)) => ids,
                _ => { // null or wrong type - start a fresh ledger
                    doc.insert( key.to_string(), json!([]));
                    match doc.get_mut(key) { Some(Value::Array(ids)) => ids, _ => unreachable!() }
                }
            };
            for id in scene_ids {
                if !ids.iter().any( |v| v.as_str() == Some(id)) {
                    ids.push( Value::String( id.clone()));
                }
            }
        }

        let line = format!("{}: acquired [{}] -> {}", now.to_rfc3339(), scene_ids.join(","), artifact_name);
        match doc.get_mut("history") {
            Some(Value::Array(lines)) => lines.push( Value::String(line)),
            _ => { doc.insert( "history".to_string(), json!([line])); }
        }

        TaskingRequest{ doc }
    }

    //--- internal value extraction

    fn str_value (&self, key: &str) -> Result<&str> {
        match self.doc.get(key) {
            Some(Value::String(s)) => Ok( s.as_str()),
            other => Err( schema_error( format!("request value '{key}' is not a string: {other:?}")))
        }
    }

    fn f64_value (&self, key: &str) -> Result<f64> {
        self.doc.get(key).and_then( |v| v.as_f64())
            .ok_or_else( || schema_error( format!("request value '{key}' is not a number")))
    }

    /// dates are stored as epoch millis after normalization but we also accept marker strings
    /// for documents that were inserted into the store by hand
    fn date_value (&self, key: &str) -> Result<DateTime<Utc>> {
        match self.doc.get(key) {
            Some(Value::Number(n)) => {
                let millis = n.as_i64().ok_or_else( || schema_error( format!("request date '{key}' out of range")))?;
                DateTime::from_timestamp_millis(millis).ok_or_else( || schema_error( format!("request date '{key}' out of range")))
            }
            Some(Value::String(s)) => {
                match parse_utc_marker(s) {
                    Some(res) => res,
                    None => Err( schema_error( format!("request date '{key}' has no UTC marker: {s}")))
                }
            }
            other => Err( schema_error( format!("request value '{key}' is not a date: {other:?}")))
        }
    }

    fn id_set (&self, key: &str) -> HashSet<String> {
        match self.doc.get(key) {
            Some(Value::Array(vs)) => vs.iter().filter_map( |v| v.as_str().map(|s| s.to_string())).collect(),
            _ => HashSet::new()
        }
    }
}

/// read a raw request document without key validation, normalizing date-like strings. This is
/// the load path for documents that do not have a store identifier yet
pub fn read_request_document (path: impl AsRef<Path>) -> Result<Value> {
    let contents = fs::read_to_string( path.as_ref())?;
    let mut v: Value = serde_json::from_str( &contents)?;
    normalize_date_values( &mut v)?;
    Ok(v)
}

/// recursively replace string values matching the UTC marker pattern with epoch millis numbers.
/// A marker match that does not parse is a load-time failure
fn normalize_date_values (v: &mut Value) -> Result<()> {
    match v {
        Value::String(s) => {
            if let Some(res) = parse_utc_marker(s) {
                *v = json!( res?.timestamp_millis());
            }
        }
        Value::Array(vs) => {
            for e in vs { normalize_date_values(e)?; }
        }
        Value::Object(map) => {
            for (_,e) in map.iter_mut() { normalize_date_values(e)?; }
        }
        _ => {}
    }
    Ok(())
}

/* #endregion tasking request */

/* #region catalog entries ****************************************************************************/

/// a remote scene description returned by the catalog collaborator. Only lives for the duration
/// of one pipeline run - just the identifier is persisted (into the `obtained` ledger)
#[derive(Debug,Clone,Serialize,Deserialize,PartialEq)]
pub struct CatalogEntry {
    pub id: String,

    /// scene footprint as GeoJSON-like geometry, intersecting the ROI by query construction
    #[serde(default)]
    pub footprint: Option<Value>,

    pub acquired: DateTime<Utc>,

    /// provider specific raw payload needed for fetch (e.g. the product download URL)
    #[serde(default)]
    pub payload: Value,
}

/* #endregion catalog entries */

/* #region misc helpers *******************************************************************************/

pub fn ensure_writable_dir (path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.is_dir() {
        fs::create_dir_all(path)?;
    }
    let md = fs::metadata(path)?;
    if md.permissions().readonly() {
        Err( SatmapsError::IOError( std::io::Error::new( std::io::ErrorKind::PermissionDenied, format!("dir not writable: {path:?}"))))
    } else {
        Ok(())
    }
}

/// load a RON config of the given type
pub fn load_config<C: DeserializeOwned> (path: impl AsRef<Path>) -> Result<C> {
    let contents = fs::read_to_string( path.as_ref())?;
    Ok( ron::de::from_str( &contents)? )
}

/* #endregion misc helpers */
