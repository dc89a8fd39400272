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

//! directory backed request document store.
//!
//! One JSON document per file, named after the store assigned identifier. Identifiers are
//! compact UTC timestamps so lexicographic filename order is creation order, which makes
//! "latest request" a max over filenames. Write-back is plain last-write-wins - there is no
//! optimistic concurrency check, so concurrent runs against the same request can silently
//! lose ledger updates (known gap, see DESIGN.md).

use std::{fs, path::{Path,PathBuf}};
use chrono::{DateTime,Utc};
use serde_json::Value;

use crate::{ensure_writable_dir, TaskingRequest};
use crate::errors::{Result, SatmapsError, empty_result, schema_error};

/// identifier format - sorts lexicographically in creation order
const ID_FMT: &str = "%Y%m%dT%H%M%S%3fZ";

pub struct RequestStore {
    dir: PathBuf
}

impl RequestStore {
    pub fn new (dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        ensure_writable_dir( &dir)?;
        Ok( RequestStore{ dir } )
    }

    pub fn new_identifier (now: DateTime<Utc>) -> String {
        now.format(ID_FMT).to_string()
    }

    /// insert a new document, assigning it a store identifier. Returns the validated request
    pub fn insert (&self, mut doc: Value, now: DateTime<Utc>) -> Result<TaskingRequest> {
        let id = Self::new_identifier(now);
        match &mut doc {
            Value::Object(map) => { map.insert( "identifier".to_string(), Value::String(id.clone())); }
            other => return Err( schema_error( format!("request document is not an object: {other}")))
        }

        let request = TaskingRequest::from_value(doc)?;
        self.write_doc( &id, &request)?;
        Ok(request)
    }

    /// the document with the most recent identifier among all documents in the store.
    /// An empty store is a fatal error - there is no request to act on
    pub fn latest (&self) -> Result<TaskingRequest> {
        let mut latest: Option<PathBuf> = None;

        for entry in fs::read_dir( &self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if latest.as_ref().map_or( true, |p| path.file_stem() > p.file_stem()) {
                    latest = Some(path);
                }
            }
        }

        match latest {
            Some(path) => TaskingRequest::from_file(path),
            None => Err( empty_result( format!("no request documents in store {:?}", self.dir)))
        }
    }

    /// write back an updated snapshot under its identifier (last-write-wins)
    pub fn update (&self, request: &TaskingRequest) -> Result<()> {
        let id = request.identifier()?;
        self.write_doc( &id, request)
    }

    fn write_doc (&self, id: &str, request: &TaskingRequest) -> Result<()> {
        let path = self.dir.join( format!("{id}.json"));
        fs::write( path, request.to_json_pretty()?)?;
        Ok(())
    }
}
