//! Integration tests: the full viewport pipeline against a local HTTP server.
//!
//! Each test builds a photo library pointing at the test server, drives the
//! pipeline the way a UI would (motion events, reconcile, drain), and asserts
//! on record states, registry contents, and refresh notifications.

mod common;

use common::image_server::{self, Served};

use photoflow_core::config::PhotoflowConfig;
use photoflow_core::record::{Artifact, PhotoLibrary, PhotoRecord, RecordState};
use photoflow_core::scheduler::PhotoPipeline;
use photoflow_core::stage::TaskKey;

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use url::Url;

fn library_for(base: &str, paths: &[&str]) -> PhotoLibrary {
    let records = paths
        .iter()
        .map(|p| {
            let url = Url::parse(&format!("{}{}", base, p)).unwrap();
            PhotoRecord::new(p.trim_start_matches('/'), url)
        })
        .collect();
    PhotoLibrary::new(records)
}

fn visible(indices: &[usize]) -> BTreeSet<usize> {
    indices.iter().copied().collect()
}

/// Drain and re-reconcile until every visible record is terminal. Collects
/// all refresh notifications seen along the way. Panics after 10 seconds.
fn settle(
    pipeline: &mut PhotoPipeline,
    library: &mut PhotoLibrary,
    vis: &BTreeSet<usize>,
) -> Vec<usize> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut changed_all = Vec::new();
    loop {
        changed_all.extend(pipeline.drain_completions(library));
        pipeline.reconcile(library, vis);
        let done = vis
            .iter()
            .all(|&i| library.get(i).map_or(true, |r| r.state.is_terminal()));
        if done {
            return changed_all;
        }
        assert!(Instant::now() < deadline, "pipeline did not settle in time");
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn visible_items_reach_filtered_while_offscreen_stays_new() {
    let png = image_server::tiny_png();
    let mut routes = HashMap::new();
    for p in ["/0.png", "/1.png", "/2.png"] {
        routes.insert(p.to_string(), Served::Png(png.clone()));
    }
    let base = image_server::start(routes);
    let mut library = library_for(&base, &["/0.png", "/1.png", "/2.png"]);
    let mut pipeline = PhotoPipeline::new(&PhotoflowConfig::default()).unwrap();

    let vis = visible(&[0, 1]);
    pipeline.reconcile(&library, &vis);
    assert_eq!(
        pipeline.outstanding().into_iter().collect::<Vec<_>>(),
        vec![TaskKey::download(0), TaskKey::download(1)],
        "downloads submitted for visible items only"
    );

    let changed = settle(&mut pipeline, &mut library, &vis);
    assert_eq!(library.get(0).unwrap().state, RecordState::Filtered);
    assert_eq!(library.get(1).unwrap().state, RecordState::Filtered);
    assert!(changed.contains(&0) && changed.contains(&1));

    let offscreen = library.get(2).unwrap();
    assert_eq!(offscreen.state, RecordState::New, "item 2 never scheduled");
    assert!(matches!(offscreen.artifact, Artifact::Placeholder));
    assert!(pipeline.is_idle());
}

#[test]
fn failed_download_marks_record_failed() {
    let mut routes = HashMap::new();
    routes.insert("/missing.png".to_string(), Served::NotFound);
    let base = image_server::start(routes);
    let mut library = library_for(&base, &["/missing.png"]);
    let mut pipeline = PhotoPipeline::new(&PhotoflowConfig::default()).unwrap();

    let vis = visible(&[0]);
    pipeline.reconcile(&library, &vis);
    let changed = settle(&mut pipeline, &mut library, &vis);

    let record = library.get(0).unwrap();
    assert_eq!(record.state, RecordState::Failed);
    assert!(matches!(record.artifact, Artifact::FailedPlaceholder));
    assert!(changed.contains(&0), "failure still refreshes the row");
}

#[test]
fn undecodable_body_marks_record_failed() {
    let mut routes = HashMap::new();
    routes.insert("/junk.png".to_string(), Served::Garbage);
    let base = image_server::start(routes);
    let mut library = library_for(&base, &["/junk.png"]);
    let mut pipeline = PhotoPipeline::new(&PhotoflowConfig::default()).unwrap();

    let vis = visible(&[0]);
    pipeline.reconcile(&library, &vis);
    settle(&mut pipeline, &mut library, &vis);
    assert_eq!(library.get(0).unwrap().state, RecordState::Failed);
}

#[test]
fn scrolling_away_cancels_inflight_download_silently() {
    let png = image_server::tiny_png();
    let mut routes = HashMap::new();
    routes.insert(
        "/slow.png".to_string(),
        Served::Slow { body: png.clone(), delay: Duration::from_millis(600) },
    );
    routes.insert("/1.png".to_string(), Served::Png(png.clone()));
    routes.insert("/2.png".to_string(), Served::Png(png));
    let base = image_server::start(routes);
    let mut library = library_for(&base, &["/slow.png", "/1.png", "/2.png"]);
    let mut pipeline = PhotoPipeline::new(&PhotoflowConfig::default()).unwrap();

    pipeline.reconcile(&library, &visible(&[0, 1]));
    // Let the worker pick up item 0's slow download.
    std::thread::sleep(Duration::from_millis(100));

    let vis = visible(&[1, 2]);
    pipeline.reconcile(&library, &vis);
    let outstanding = pipeline.outstanding();
    assert!(!outstanding.contains(&TaskKey::download(0)), "item 0 cancelled");
    assert!(outstanding.contains(&TaskKey::download(2)), "item 2 submitted");

    let changed = settle(&mut pipeline, &mut library, &vis);
    assert_eq!(library.get(1).unwrap().state, RecordState::Filtered);
    assert_eq!(library.get(2).unwrap().state, RecordState::Filtered);
    assert!(!changed.contains(&0), "cancelled task must not notify");

    // Give the cancelled task time to finish and report; its stale event
    // must leave the record untouched.
    std::thread::sleep(Duration::from_millis(700));
    pipeline.drain_completions(&mut library);
    let record = library.get(0).unwrap();
    assert_eq!(record.state, RecordState::New);
    assert!(matches!(record.artifact, Artifact::Placeholder));
}

#[test]
fn no_task_runs_between_motion_started_and_settled() {
    let png = image_server::tiny_png();
    let mut routes = HashMap::new();
    routes.insert("/0.png".to_string(), Served::Png(png));
    let base = image_server::start(routes);
    let mut library = library_for(&base, &["/0.png"]);
    let mut pipeline = PhotoPipeline::new(&PhotoflowConfig::default()).unwrap();

    pipeline.motion_started();
    let vis = visible(&[0]);
    pipeline.reconcile(&library, &vis);
    std::thread::sleep(Duration::from_millis(300));

    assert!(pipeline.drain_completions(&mut library).is_empty());
    assert_eq!(library.get(0).unwrap().state, RecordState::New);
    assert_eq!(pipeline.queued_jobs(), 1, "job queued but not dequeued");

    pipeline.motion_settled(&mut library, &vis);
    settle(&mut pipeline, &mut library, &vis);
    assert_eq!(library.get(0).unwrap().state, RecordState::Filtered);
}

#[test]
fn reconcile_twice_submits_nothing_extra() {
    let png = image_server::tiny_png();
    let mut routes = HashMap::new();
    routes.insert("/0.png".to_string(), Served::Png(png.clone()));
    routes.insert("/1.png".to_string(), Served::Png(png));
    let base = image_server::start(routes);
    let library = library_for(&base, &["/0.png", "/1.png"]);
    let mut pipeline = PhotoPipeline::new(&PhotoflowConfig::default()).unwrap();

    // Suspended, so queue contents stay observable.
    pipeline.motion_started();
    let vis = visible(&[0, 1]);
    pipeline.reconcile(&library, &vis);
    let first = pipeline.outstanding();
    assert_eq!(pipeline.queued_jobs(), 2);

    pipeline.reconcile(&library, &vis);
    assert_eq!(pipeline.outstanding(), first, "same visible set: no new tasks");
    assert_eq!(pipeline.queued_jobs(), 2, "nothing re-enqueued");
}

#[test]
fn skipped_filter_stays_downloaded_and_is_retried() {
    let png = image_server::tiny_png();
    let mut routes = HashMap::new();
    routes.insert("/0.png".to_string(), Served::Png(png));
    let base = image_server::start(routes);
    let mut library = library_for(&base, &["/0.png"]);

    // Out-of-range intensity makes the tone filter report Unavailable.
    let mut cfg = PhotoflowConfig::default();
    cfg.filter_intensity = 2.0;
    let mut pipeline = PhotoPipeline::new(&cfg).unwrap();

    let vis = visible(&[0]);
    pipeline.reconcile(&library, &vis);

    // Wait for the download to commit.
    let deadline = Instant::now() + Duration::from_secs(10);
    while library.get(0).unwrap().state != RecordState::Downloaded {
        pipeline.drain_completions(&mut library);
        assert!(Instant::now() < deadline, "download did not finish in time");
        std::thread::sleep(Duration::from_millis(20));
    }

    // Next pass submits the filter; wait for the skipped attempt to clear.
    pipeline.reconcile(&library, &vis);
    assert!(pipeline.outstanding().contains(&TaskKey::filter(0)));
    while !pipeline.is_idle() {
        pipeline.drain_completions(&mut library);
        assert!(Instant::now() < deadline, "filter attempt did not clear in time");
        std::thread::sleep(Duration::from_millis(20));
    }

    let record = library.get(0).unwrap();
    assert_eq!(record.state, RecordState::Downloaded, "skip is not a failure");
    assert!(record.artifact.image().is_some(), "unfiltered image kept");

    // The item is still Downloaded, so the next pass submits the filter again.
    pipeline.reconcile(&library, &vis);
    assert!(pipeline.outstanding().contains(&TaskKey::filter(0)));
}
