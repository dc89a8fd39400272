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

//! catalog collaborator seam: query scenes intersecting the ROI within a time interval, and
//! fetch the raw data product of one scene. The concrete HTTP implementation posts a JSON
//! search request; tests substitute their own [`CatalogService`] impls.

use std::{collections::HashSet, fs::File, io::Write, path::Path};
use async_trait::async_trait;
use chrono::{DateTime,Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize,Serialize};
use serde_json::Value;
use tracing::debug;

use crate::CatalogEntry;
use crate::errors::{Result, SatmapsError, empty_result, service_error};

#[derive(Serialize,Deserialize,Debug,Clone)]
pub struct CatalogConfig {
    /// search endpoint URL, e.g. "https://catalog.example.org/api/search"
    pub url: String,

    /// optional bearer token for query and fetch calls
    pub api_key: Option<String>,
}

/// the narrow contract of the remote catalog/download collaborator
#[async_trait]
pub trait CatalogService {
    /// all scenes of the given sensor intersecting the ROI ring within [start,end].
    /// Iteration order of the returned Vec is the catalog's and defines composite order
    async fn query_scenes (&self, roi: &[(f64,f64)], sensor: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CatalogEntry>>;

    /// fetch one scene's raw data product (a compressed archive) into the given file
    async fn fetch_scene (&self, entry: &CatalogEntry, archive: &Path) -> Result<u64>;
}

/// a scene is eligible iff its identifier is not in the obtained ledger. This is the system's
/// only idempotence guarantee and it is identifier based, not content based - catalog order
/// of the remaining entries is preserved
pub fn eligible_scenes (entries: Vec<CatalogEntry>, obtained: &HashSet<String>) -> Vec<CatalogEntry> {
    entries.into_iter().filter( |e| !obtained.contains( &e.id)).collect()
}

/* #region http implementation ************************************************************************/

#[derive(Serialize,Debug)]
struct SearchQuery<'a> {
    sensor: &'a str,
    roi: geojson::Geometry,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize,Debug)]
struct SearchResponse {
    scenes: Vec<CatalogEntry>
}

pub struct HttpCatalogService {
    config: CatalogConfig,
    client: Client,
}

impl HttpCatalogService {
    pub fn new (config: CatalogConfig) -> Self {
        HttpCatalogService{ config, client: Client::new() }
    }

    fn authorized (&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.config.api_key { req.bearer_auth(key) } else { req }
    }
}

#[async_trait]
impl CatalogService for HttpCatalogService {
    async fn query_scenes (&self, roi: &[(f64,f64)], sensor: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CatalogEntry>> {
        let query = SearchQuery { sensor, roi: roi_to_geojson(roi), start, end };
        debug!("catalog query {:?}", query);

        let req = self.authorized( self.client.post( &self.config.url)).json( &query);
        let response = req.send().await?;

        match response.status() {
            StatusCode::OK => {
                let sr: SearchResponse = response.json().await?;
                Ok( sr.scenes )
            }
            other => Err( service_error( format!("catalog query failed with status {other}")))
        }
    }

    async fn fetch_scene (&self, entry: &CatalogEntry, archive: &Path) -> Result<u64> {
        let url = entry.payload.get("download_url").and_then( |v| v.as_str())
            .ok_or_else( || service_error( format!("scene {} has no download_url payload", entry.id)))?;

        let mut file = File::create(archive)?;
        let mut len: u64 = 0;

        let mut response = self.authorized( self.client.get(url)).send().await?;
        match response.status() {
            StatusCode::OK => {
                while let Some(chunk) = response.chunk().await? {
                    len += chunk.len() as u64;
                    file.write_all(&chunk)?;
                }
                file.flush()?;
                Ok(len)
            }
            other => Err( service_error( format!("scene fetch {url} failed with status {other}")))
        }
    }
}

/// encode the ROI ring the way the catalog expects it (a GeoJSON polygon geometry)
pub fn roi_to_geojson (ring: &[(f64,f64)]) -> geojson::Geometry {
    let positions: Vec<Vec<f64>> = ring.iter().map( |(lon,lat)| vec![*lon,*lat]).collect();
    geojson::Geometry::new( geojson::Value::Polygon( vec![positions]))
}

/* #endregion http implementation */

#[cfg(test)]
mod tests {
    use super::*;

    fn entry (id: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            footprint: None,
            acquired: Utc::now(),
            payload: Value::Null,
        }
    }

    #[test]
    fn test_eligibility_is_identifier_based () {
        let obtained: HashSet<String> = ["S_A".to_string()].into();
        let entries = vec![ entry("S_A"), entry("S_B") ];

        let eligible = eligible_scenes( entries, &obtained);
        assert_eq!( eligible.len(), 1);
        assert_eq!( eligible[0].id, "S_B");
    }

    #[test]
    fn test_eligibility_preserves_catalog_order () {
        let obtained: HashSet<String> = ["S_C".to_string()].into();
        let entries = vec![ entry("S_D"), entry("S_B"), entry("S_C"), entry("S_A") ];

        let ids: Vec<String> = eligible_scenes( entries, &obtained).into_iter().map( |e| e.id).collect();
        assert_eq!( ids, vec!["S_D","S_B","S_A"]);
    }

    #[test]
    fn test_same_identifier_is_same_scene () {
        // eligibility is keyed on the identifier alone - a reissued product with a different
        // payload does not resurrect an already obtained scene
        let obtained: HashSet<String> = ["S_A".to_string()].into();

        let mut a1 = entry("S_A");
        a1.payload = serde_json::json!({"download_url": "https://catalog.example.org/products/1"});
        let mut a2 = entry("S_A");
        a2.payload = serde_json::json!({"download_url": "https://catalog.example.org/products/2"});

        let eligible = eligible_scenes( vec![a1, a2, entry("S_B")], &obtained);
        assert_eq!( eligible.len(), 1);
        assert_eq!( eligible[0].id, "S_B");
    }

    #[test]
    fn test_no_obtained_means_all_eligible () {
        let eligible = eligible_scenes( vec![ entry("S_A"), entry("S_B") ], &HashSet::new());
        assert_eq!( eligible.len(), 2);
    }
}
