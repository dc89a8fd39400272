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

//! end-to-end pipeline runs against in-process catalog and delivery mocks. Scene products are
//! tiny single band GeoTIFFs zipped on the fly by the mock catalog.

use std::{collections::HashMap, fs, fs::File, io::Write, path::{Path,PathBuf}, sync::Mutex};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use zip::{write::SimpleFileOptions, ZipWriter};

use satmaps::{
    pipeline, service_error, ArtifactSender, CatalogEntry, CatalogService, Result, RunConfig,
    RunOutcome, SatmapsError, SkipReason, TaskingRequest,
};
use satmaps_gdal::{
    create_dataset, new_geotransform, srs_epsg_4326, Buffer, Dataset, DriverManager, GdalDataType,
};

/* #region mocks and fixtures *************************************************************************/

struct MockCatalog {
    entries: Vec<CatalogEntry>,
    band_files: HashMap<String,PathBuf>,
    seen_window: Mutex<Option<(DateTime<Utc>,DateTime<Utc>)>>,
}

#[async_trait]
impl CatalogService for MockCatalog {
    async fn query_scenes (&self, _roi: &[(f64,f64)], _sensor: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CatalogEntry>> {
        *self.seen_window.lock().unwrap() = Some( (start, end));
        Ok( self.entries.clone() )
    }

    async fn fetch_scene (&self, entry: &CatalogEntry, archive: &Path) -> Result<u64> {
        let band = self.band_files.get( &entry.id)
            .ok_or_else( || service_error( format!("unknown scene {}", entry.id)))?;

        let mut zw = ZipWriter::new( File::create(archive)?);
        zw.start_file( format!("{}_B04.tif", entry.id), SimpleFileOptions::default())?;
        zw.write_all( &fs::read(band)?)?;
        zw.finish()?;

        Ok( fs::metadata(archive)?.len() )
    }
}

#[derive(Default)]
struct MockSender {
    sent: Mutex<Vec<(usize,String)>>, // (recipient count, attachment name)
    fail: bool,
}

#[async_trait]
impl ArtifactSender for MockSender {
    async fn send_artifact (&self, recipients: &[String], _subject: &str, _body: &str, attachment: &Path) -> Result<()> {
        if self.fail {
            return Err( SatmapsError::SmtpError( "mock delivery failure".to_string()))
        }
        let name = attachment.file_name().unwrap().to_string_lossy().to_string();
        self.sent.lock().unwrap().push( (recipients.len(), name));
        Ok(())
    }
}

fn entry (id: &str) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        footprint: None,
        acquired: Utc.with_ymd_and_hms( 2024, 6, 1, 6, 0, 0).unwrap(),
        payload: Value::Null,
    }
}

/// a 10x10 uint16 GeoTIFF over lon 0..1, lat 0..1 with a value gradient starting at `base`
fn make_band_file (path: &Path, base: u16) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut ds = create_dataset( &driver, path, 10, 10, 1, GdalDataType::UInt16, None).unwrap();
    ds.set_spatial_ref( &srs_epsg_4326()).unwrap();
    ds.set_geo_transform( &new_geotransform( 0.0, 0.1, 0.0, 1.0, 0.0, -0.1)).unwrap();

    let mut data = vec![0u16; 100];
    for j in 0..10 {
        for i in 0..10 {
            data[j*10 + i] = base + (i + j) as u16;
        }
    }
    let mut buf = Buffer::new( (10,10), data);
    ds.rasterband(1).unwrap().write( (0,0), (10,10), &mut buf).unwrap();
}

/// request with a unit degree ROI matching the fixture rasters (0.1 deg pixels -> 10x10 grid)
fn request_doc (obtained: Value, end_date: DateTime<Utc>) -> TaskingRequest {
    TaskingRequest::from_value( json!({
        "identifier": "r1",
        "sensor": "S2_MSI",
        "start_date": Utc.with_ymd_and_hms(2024,1,1,0,0,0).unwrap().timestamp_millis(),
        "end_date": end_date.timestamp_millis(),
        "roi": [[0.0,0.0],[0.0,1.0],[1.0,1.0],[1.0,0.0],[0.0,0.0]],
        "send_to": ["ops@example.org"],
        "spatial_resolution": 0.1,
        "time_window": 24.0,
        "crs": "EPSG:4326",
        "obtained": obtained.clone(),
        "processed": obtained,
        "history": []
    })).unwrap()
}

struct Fixture {
    _tmp: tempfile::TempDir,
    catalog: MockCatalog,
    config: RunConfig,
}

fn fixture (scene_ids: &[&str], keep_files: bool) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let products = tmp.path().join("products");
    fs::create_dir( &products).unwrap();

    let mut entries = Vec::new();
    let mut band_files = HashMap::new();
    for (n,id) in scene_ids.iter().enumerate() {
        let band = products.join( format!("{id}.tif"));
        make_band_file( &band, 100 + 400 * n as u16); // later scenes have higher values
        entries.push( entry(id));
        band_files.insert( id.to_string(), band);
    }

    let config = RunConfig {
        work_dir: tmp.path().join("work"),
        out_dir: tmp.path().join("out"),
        pool_size: 2,
        keep_files,
    };

    Fixture{ _tmp: tmp, catalog: MockCatalog{ entries, band_files, seen_window: Mutex::new(None) }, config }
}

fn far_future () -> DateTime<Utc> {
    Utc.with_ymd_and_hms( 2100, 1, 1, 0, 0, 0).unwrap()
}

/* #endregion mocks and fixtures */

#[tokio::test]
async fn test_full_run () {
    let fx = fixture( &["S_A","S_B"], true);
    let request = request_doc( json!([]), far_future());
    let sender = MockSender::default();
    let now = Utc::now();

    let outcome = pipeline::run( &request, &fx.catalog, Some(&sender), &fx.config, now).await.unwrap();

    match outcome {
        RunOutcome::Completed{ scene_ids, artifact, notify_error } => {
            assert_eq!( scene_ids, vec!["S_A","S_B"]); // catalog order
            assert!( artifact.path.is_file());
            assert!( notify_error.is_none());

            // both scenes cover the full grid - the later one wins the overlap
            let mosaic = Dataset::open( fx.config.work_dir.join("r1_mosaic.tif")).unwrap();
            let center: Buffer<u16> = mosaic.rasterband(1).unwrap().read_as( (5,5), (1,1), (1,1), None).unwrap();
            assert_eq!( center.data()[0], 500 + 10);

            // one notification to the request's recipient list
            let sent = sender.sent.lock().unwrap();
            assert_eq!( sent.len(), 1);
            assert_eq!( sent[0].0, 1);
            assert_eq!( sent[0].1, artifact.name);

            // folding the delta extends the ledgers
            let updated = request.with_run_results( &scene_ids, &artifact.name, now);
            assert!( updated.obtained().contains("S_A") && updated.obtained().contains("S_B"));
        }
        other => panic!("expected completed run, got {other:?}")
    }
}

#[tokio::test]
async fn test_query_window_trails_now () {
    // the query interval is [now - time_window, now] even for a request younger than its
    // time window - start_date does not narrow the lookback
    let fx = fixture( &["S_A"], false);
    let now = Utc::now();

    let mut doc = request_doc( json!([]), far_future()).to_value();
    doc["start_date"] = json!( (now - chrono::Duration::hours(1)).timestamp_millis());
    let request = TaskingRequest::from_value(doc).unwrap();

    pipeline::run( &request, &fx.catalog, None::<&MockSender>, &fx.config, now).await.unwrap();

    let seen = fx.catalog.seen_window.lock().unwrap().unwrap();
    assert_eq!( seen.0, now - chrono::Duration::hours(24));
    assert_eq!( seen.1, now);
}

#[tokio::test]
async fn test_all_obtained_is_noop () {
    let fx = fixture( &["S_A","S_B"], true);
    let request = request_doc( json!(["S_A","S_B"]), far_future());
    let sender = MockSender::default();

    let outcome = pipeline::run( &request, &fx.catalog, Some(&sender), &fx.config, Utc::now()).await.unwrap();

    assert!( matches!( outcome, RunOutcome::Skipped( SkipReason::NoEligibleScenes)));
    assert!( !fx.config.work_dir.exists()); // nothing fetched, no raster allocated
    assert!( sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_catalog_is_fatal () {
    let fx = fixture( &[], true);
    let request = request_doc( json!([]), far_future());

    let res = pipeline::run( &request, &fx.catalog, None::<&MockSender>, &fx.config, Utc::now()).await;

    assert!( matches!( res, Err(SatmapsError::EmptyResult(_))));
    assert!( !fx.config.work_dir.exists()); // failed before raster allocation
}

#[tokio::test]
async fn test_expired_request_is_noop () {
    // an empty catalog would be fatal - the expiry check has to come first
    let fx = fixture( &[], true);
    let past = Utc.with_ymd_and_hms( 2024, 1, 2, 0, 0, 0).unwrap();
    let request = request_doc( json!([]), past);

    let outcome = pipeline::run( &request, &fx.catalog, None::<&MockSender>, &fx.config, Utc::now()).await.unwrap();
    assert!( matches!( outcome, RunOutcome::Skipped( SkipReason::Expired)));
}

#[tokio::test]
async fn test_delivery_failure_keeps_acquisition () {
    let fx = fixture( &["S_A"], false);
    let request = request_doc( json!([]), far_future());
    let sender = MockSender{ fail: true, ..Default::default() };

    let outcome = pipeline::run( &request, &fx.catalog, Some(&sender), &fx.config, Utc::now()).await.unwrap();

    match outcome {
        RunOutcome::Completed{ scene_ids, artifact, notify_error } => {
            // the artifact and the ledger delta survive a failed notification
            assert_eq!( scene_ids, vec!["S_A"]);
            assert!( artifact.path.is_file());
            assert!( notify_error.is_some());
        }
        other => panic!("expected completed run, got {other:?}")
    }
}

#[tokio::test]
async fn test_scratch_cleanup () {
    let fx = fixture( &["S_A"], false);
    let request = request_doc( json!([]), far_future());

    let outcome = pipeline::run( &request, &fx.catalog, None::<&MockSender>, &fx.config, Utc::now()).await.unwrap();
    assert!( matches!( outcome, RunOutcome::Completed{..}));

    // scratch files are gone, the packaged artifact remains
    assert!( !fx.config.work_dir.join("S_A.zip").exists());
    assert!( !fx.config.work_dir.join("S_A").exists());
    assert!( !fx.config.work_dir.join("r1_mosaic.tif").exists());
    assert!( fs::read_dir( &fx.config.out_dir).unwrap().count() > 0);
}
