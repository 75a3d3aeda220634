// tests/walker_fan_in.rs

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use treetask::fs::mock::{Fault, MockFileSystem};
use treetask::fs::RealFileSystem;
use treetask::walk::{FanIn, Visit, Walker};
use treetask_test_utils::{init_tracing, with_timeout};

fn sample_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("lib/sammy.js", "Sammy.VERSION = '0.7.6';");
    fs.add_file("lib/plugins/sammy.haml.js", "haml");
    fs.add_file("lib/plugins/sammy.json.js", "json");
    fs.add_file("lib/plugins/deep/nested/x.js", "x");
    fs.add_file("lib/min/sammy-latest.min.js", "min");
    fs
}

/// Callback recording every successfully visited file.
fn collect_paths() -> (Arc<Mutex<Vec<PathBuf>>>, impl Fn(Visit) + Send + Sync + 'static) {
    let seen: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
    let sink = Arc::clone(&seen);
    (seen, move |visit: Visit| {
        if visit.entry.is_ok() {
            sink.lock().unwrap().push(visit.path);
        }
    })
}

#[tokio::test]
async fn empty_directory_completes_with_no_files() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("empty");
    let walker = Walker::new(Arc::new(fs));
    let (seen, on_file) = collect_paths();

    let summary = with_timeout(walker.walk("empty", on_file)).await;

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(summary.files, 0);
    assert_eq!(summary.directories, 1);
    assert!(summary.errors.is_empty());
}

#[tokio::test]
async fn every_file_is_visited_exactly_once() {
    init_tracing();
    let walker = Walker::new(Arc::new(sample_tree()));
    let (seen, on_file) = collect_paths();

    let summary = with_timeout(walker.walk("lib", on_file)).await;

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            PathBuf::from("lib/min/sammy-latest.min.js"),
            PathBuf::from("lib/plugins/deep/nested/x.js"),
            PathBuf::from("lib/plugins/sammy.haml.js"),
            PathBuf::from("lib/plugins/sammy.json.js"),
            PathBuf::from("lib/sammy.js"),
        ]
    );
    assert_eq!(summary.files, 5);
    // lib, lib/plugins, lib/plugins/deep, lib/plugins/deep/nested, lib/min
    assert_eq!(summary.directories, 5);
    assert_eq!(summary.retired, summary.entries());
}

#[tokio::test]
async fn walk_waits_for_work_holding_the_release() {
    init_tracing();
    let walker = Walker::new(Arc::new(sample_tree()));
    let finished: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
    let sink = Arc::clone(&finished);

    let summary = with_timeout(walker.walk("lib", move |visit: Visit| {
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sink.lock().unwrap().push(visit.path);
            drop(visit.release);
        });
    }))
    .await;

    // Every spawned job finished before the walk resolved.
    assert_eq!(finished.lock().unwrap().len(), summary.files);
}

#[tokio::test]
async fn stat_fault_is_reported_and_walk_still_finishes() {
    init_tracing();
    let fs = sample_tree();
    fs.inject_fault(Fault::Stat, "lib/plugins/sammy.json.js");
    let walker = Walker::new(Arc::new(fs));

    let failures: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
    let sink = Arc::clone(&failures);
    let summary = with_timeout(walker.walk("lib", move |visit: Visit| {
        if let Err(err) = &visit.entry {
            sink.lock().unwrap().push(err.path.clone());
        }
    }))
    .await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.files, 4);
    assert_eq!(
        *failures.lock().unwrap(),
        vec![PathBuf::from("lib/plugins/sammy.json.js")]
    );
    let err = summary.into_result().unwrap_err();
    assert_eq!(err.path, PathBuf::from("lib/plugins/sammy.json.js"));
}

#[tokio::test]
async fn read_dir_fault_skips_the_subtree() {
    init_tracing();
    let fs = sample_tree();
    fs.inject_fault(Fault::ReadDir, "lib/plugins");
    let walker = Walker::new(Arc::new(fs));
    let (seen, on_file) = collect_paths();

    let summary = with_timeout(walker.walk("lib", on_file)).await;

    assert_eq!(summary.errors.len(), 1);
    assert!(seen
        .lock()
        .unwrap()
        .iter()
        .all(|p| !p.starts_with("lib/plugins")));
}

#[tokio::test]
async fn directory_removed_before_listing_counts_as_vanished() {
    init_tracing();
    let fs = sample_tree();
    fs.inject_fault_kind(Fault::ReadDir, "lib/plugins", io::ErrorKind::NotFound);
    let walker = Walker::new(Arc::new(fs));
    let (seen, on_file) = collect_paths();

    let summary = with_timeout(walker.walk("lib", on_file)).await;

    assert!(summary.errors.is_empty());
    assert_eq!(summary.vanished, 1);
    // lib and lib/min
    assert_eq!(summary.directories, 2);
    assert_eq!(summary.files, 2);
    assert_eq!(summary.retired, summary.entries());
    assert!(seen
        .lock()
        .unwrap()
        .iter()
        .all(|p| !p.starts_with("lib/plugins")));
    assert!(summary.into_result().is_ok());
}

#[tokio::test]
async fn root_that_cannot_be_listed_is_still_an_error() {
    init_tracing();
    let fs = sample_tree();
    fs.inject_fault_kind(Fault::ReadDir, "lib", io::ErrorKind::NotFound);
    let walker = Walker::new(Arc::new(fs));

    let summary = with_timeout(walker.walk("lib", |_visit: Visit| {})).await;

    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.retired, 1);
}

#[tokio::test]
async fn missing_root_is_an_error() {
    init_tracing();
    let walker = Walker::new(Arc::new(MockFileSystem::new()));

    let summary = with_timeout(walker.walk("nope", |_visit: Visit| {})).await;

    assert_eq!(summary.failed, 1);
    assert!(summary.into_result().is_err());
}

#[tokio::test]
async fn non_regular_entries_are_counted_but_not_visited() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("tree/a.js", "a");
    fs.add_other("tree/socket");
    let walker = Walker::new(Arc::new(fs));
    let (seen, on_file) = collect_paths();

    let summary = with_timeout(walker.walk("tree", on_file)).await;

    assert_eq!(summary.others, 1);
    assert_eq!(*seen.lock().unwrap(), vec![PathBuf::from("tree/a.js")]);
}

#[tokio::test]
async fn spawn_walk_calls_on_done_once() {
    init_tracing();
    let walker = Walker::new(Arc::new(sample_tree()));
    let (tx, rx) = oneshot::channel();

    let handle = walker.spawn_walk("lib", |_visit: Visit| {}, move |summary| {
        // A second call would panic on the moved sender.
        tx.send(summary.files).unwrap();
    });

    let files = with_timeout(rx).await.unwrap();
    with_timeout(handle).await.unwrap();
    assert_eq!(files, 5);
}

#[tokio::test]
async fn fan_in_resolves_when_last_release_drops() {
    let fan_in = FanIn::new();
    let first = fan_in.enter();
    let second = fan_in.enter();
    assert_eq!(fan_in.outstanding(), 2);

    drop(first);
    assert!(!fan_in.is_finished());

    let waiter = {
        let fan_in = fan_in.clone();
        tokio::spawn(async move { fan_in.wait().await })
    };
    second.release();

    with_timeout(waiter).await.unwrap();
    assert!(fan_in.is_finished());
    assert_eq!(fan_in.retired(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn real_tree_follows_directory_links_and_skips_dangling_ones() {
    use std::os::unix::fs::symlink;

    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let tree = tmp.path().join("tree");
    let outside = tmp.path().join("outside");
    std::fs::create_dir_all(tree.join("nested")).unwrap();
    std::fs::create_dir_all(&outside).unwrap();
    std::fs::write(tree.join("nested/deep.js"), "deep").unwrap();
    std::fs::write(outside.join("shared.js"), "shared").unwrap();
    symlink(&outside, tree.join("linked")).unwrap();
    symlink(tmp.path().join("missing"), tree.join("dangling")).unwrap();

    let walker = Walker::new(Arc::new(RealFileSystem));
    let (seen, on_file) = collect_paths();

    let summary = with_timeout(walker.walk(tree.clone(), on_file)).await;

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(
        seen,
        vec![tree.join("linked/shared.js"), tree.join("nested/deep.js")]
    );
    // tree, tree/nested, tree/linked
    assert_eq!(summary.directories, 3);
    assert_eq!(summary.files, 2);
    assert_eq!(summary.others, 1);
    assert_eq!(summary.retired, summary.entries());
    assert_eq!(summary.retired, 6);
    assert!(summary.errors.is_empty());
}
