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

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use satmaps::{RequestStore, SatmapsError, TaskingRequest};

fn full_doc () -> Value {
    json!({
        "identifier": "20240101T000000000Z",
        "sensor": "S2_MSI",
        "start_date": "2024-01-01 UTC",
        "end_date": "2034-01-01 UTC",
        "roi": [[-2.21,82.84],[14.14,83.13],[13.26,73.37],[-3.9,74.25],[-2.21,82.84]],
        "send_to": ["ops@example.org"],
        "spatial_resolution": 1500.0,
        "time_window": 24.0,
        "crs": "EPSG:3035",
        "obtained": [],
        "processed": [],
        "history": []
    })
}

#[test]
fn test_all_keys_present_validates () {
    assert!( TaskingRequest::from_value( full_doc()).is_ok());
}

#[test]
fn test_null_values_still_validate () {
    // key presence is the whole validation contract - a null value passes and only fails
    // at point of use
    let mut doc = full_doc();
    doc["obtained"] = Value::Null;
    doc["spatial_resolution"] = Value::Null;

    let request = TaskingRequest::from_value(doc).unwrap();
    assert!( request.obtained().is_empty());
    assert!( matches!( request.spatial_resolution(), Err(SatmapsError::SchemaError(_))));
}

#[test]
fn test_missing_key_names_the_key () {
    let mut doc = full_doc();
    doc.as_object_mut().unwrap().remove("roi");

    match TaskingRequest::from_value(doc) {
        Err(SatmapsError::SchemaError(msg)) => assert!( msg.contains("roi")),
        other => panic!("expected schema error, got {other:?}")
    }
}

#[test]
fn test_date_normalization_on_file_load () {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("request.json");

    let mut doc = full_doc();
    doc["start_date"] = json!("2017-01-01 12:00:00 UTC");
    std::fs::write( &path, serde_json::to_string(&doc).unwrap()).unwrap();

    let request = TaskingRequest::from_file( &path).unwrap();
    let expected = Utc.with_ymd_and_hms( 2017, 1, 1, 12, 0, 0).unwrap();
    assert_eq!( request.start_date().unwrap(), expected);

    // normalized documents store dates as epoch millis
    assert!( request.get("start_date").unwrap().is_number());
}

#[test]
fn test_invalid_marker_date_is_load_failure () {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("request.json");

    // matches the marker pattern but is not a calendar date - must fail, not pass through as text
    let mut doc = full_doc();
    doc["end_date"] = json!("2024-13-40 UTC");
    std::fs::write( &path, serde_json::to_string(&doc).unwrap()).unwrap();

    assert!( matches!( TaskingRequest::from_file( &path), Err(SatmapsError::SchemaError(_))));
}

#[test]
fn test_activity_boundary () {
    let end = Utc.with_ymd_and_hms( 2024, 6, 1, 12, 0, 0).unwrap();
    let mut doc = full_doc();
    doc["end_date"] = json!( end.timestamp_millis());
    let request = TaskingRequest::from_value(doc).unwrap();

    // active up to and including end_date
    assert!( request.is_active( end - chrono::Duration::seconds(1)).unwrap());
    assert!( request.is_active( end).unwrap());
    assert!( !request.is_active( end + chrono::Duration::seconds(1)).unwrap());
}

#[test]
fn test_run_results_fold () {
    let mut doc = full_doc();
    doc["obtained"] = json!(["S_A"]);
    doc["processed"] = json!(["S_A"]);
    let request = TaskingRequest::from_value(doc).unwrap();

    let now = Utc.with_ymd_and_hms( 2024, 6, 1, 0, 0, 0).unwrap();
    let ids = vec!["S_A".to_string(), "S_B".to_string()];
    let updated = request.with_run_results( &ids, "satmap_20240601T000000Z.zip", now);

    // input snapshot untouched, ledgers extended without duplicates
    assert_eq!( request.obtained().len(), 1);
    let expected: std::collections::HashSet<String> = ["S_A","S_B"].iter().map( |s| s.to_string()).collect();
    assert_eq!( updated.obtained(), expected);
    assert_eq!( updated.processed(), expected);

    match updated.get("history") {
        Some(Value::Array(lines)) => {
            assert_eq!( lines.len(), 1);
            let line = lines[0].as_str().unwrap();
            assert!( line.contains("S_A,S_B") && line.contains("satmap_20240601T000000Z.zip"));
        }
        other => panic!("unexpected history value {other:?}")
    }
}

#[test]
fn test_store_insert_and_latest () {
    let dir = tempfile::tempdir().unwrap();
    let store = RequestStore::new( dir.path()).unwrap();

    let t0 = Utc.with_ymd_and_hms( 2024, 1, 1, 0, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms( 2024, 1, 2, 0, 0, 0).unwrap();

    store.insert( full_doc(), t0).unwrap();
    let second = store.insert( full_doc(), t1).unwrap();

    let latest = store.latest().unwrap();
    assert_eq!( latest.identifier().unwrap(), second.identifier().unwrap());
}

#[test]
fn test_empty_store_is_fatal () {
    let dir = tempfile::tempdir().unwrap();
    let store = RequestStore::new( dir.path()).unwrap();

    assert!( matches!( store.latest(), Err(SatmapsError::EmptyResult(_))));
}
