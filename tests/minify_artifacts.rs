// tests/minify_artifacts.rs

use std::path::PathBuf;
use std::sync::Arc;

use treetask::errors::TreetaskError;
use treetask::fs::mock::{Fault, MockFileSystem};
use treetask::pipeline::{
    artifact_names, Banner, Classifier, CommandMinifier, MinifyStage, VersionToken,
};
use treetask::walk::Walker;
use treetask_test_utils::builders::fixed_build_time;
use treetask_test_utils::fake_runner::FakeRunner;
use treetask_test_utils::{init_tracing, with_timeout};

const MINIFIER: &str = "uglifyjs";

fn banner() -> Banner {
    Banner {
        project: "Sammy.js".to_string(),
        url: "http://sammyjs.org".to_string(),
        version: VersionToken::new("Sammy", "0.7.6"),
        built: fixed_build_time(),
    }
}

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("lib/sammy.js", "Sammy.VERSION = '0.7.6';\nvar x = 1;");
    fs.add_file("lib/plugins/sammy.haml.js", "haml plugin");
    fs.add_file("lib/README", "not a module");
    fs
}

fn stage(fs: &MockFileSystem, runner: &FakeRunner) -> MinifyStage {
    let minifier = CommandMinifier::new(Arc::new(runner.clone()), MINIFIER, vec!["-c".to_string()]);
    MinifyStage::new(
        Walker::new(Arc::new(fs.clone())),
        Classifier::new("js").unwrap(),
        Arc::new(minifier),
        "lib",
        "lib/min",
    )
}

fn shrinking_runner() -> FakeRunner {
    let runner = FakeRunner::new();
    runner.transform_stdin(MINIFIER, |src| format!("min({})", src.len()));
    runner
}

fn text(fs: &MockFileSystem, path: &str) -> String {
    String::from_utf8(fs.contents(path).unwrap_or_else(|| panic!("missing {path}"))).unwrap()
}

#[test]
fn banner_has_project_module_url_version_and_build_time() {
    assert_eq!(
        banner().render("plugins/sammy.haml", "js"),
        "// -- Sammy.js -- plugins/sammy.haml.js\n\
         // http://sammyjs.org\n\
         // Version: 0.7.6\n\
         // Built: 2024-01-01T00:00:00Z\n"
    );
}

#[test]
fn artifact_names_carry_version_and_latest_marker() {
    let (versioned, latest) = artifact_names("sammy", &VersionToken::new("Sammy", "0.7.6"), "js");
    assert_eq!(versioned, "sammy-0.7.6.min.js");
    assert_eq!(latest, "sammy-latest.min.js");
}

#[tokio::test]
async fn every_module_gets_versioned_and_latest_artifacts() {
    init_tracing();
    let fs = project();
    let runner = shrinking_runner();

    let report = with_timeout(stage(&fs, &runner).run(&banner())).await.unwrap();

    assert!(report.deleted.is_empty());
    assert_eq!(
        report.generated,
        vec![
            PathBuf::from("lib/min/plugins/sammy.haml-0.7.6.min.js"),
            PathBuf::from("lib/min/plugins/sammy.haml-latest.min.js"),
            PathBuf::from("lib/min/sammy-0.7.6.min.js"),
            PathBuf::from("lib/min/sammy-latest.min.js"),
        ]
    );

    let versioned = text(&fs, "lib/min/sammy-0.7.6.min.js");
    assert!(versioned.starts_with("// -- Sammy.js -- sammy.js\n"));
    assert!(versioned.ends_with("min(35)"));
    assert_eq!(versioned, text(&fs, "lib/min/sammy-latest.min.js"));

    // Source handed to the minifier on stdin, one call per module.
    let calls = runner.calls_to(MINIFIER);
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.capture_stdout && c.args == vec!["-c"]));
}

#[tokio::test]
async fn stale_artifacts_are_removed_before_generation() {
    init_tracing();
    let fs = project();
    fs.add_file("lib/min/sammy-0.7.5.min.js", "old");
    fs.add_file("lib/plugins/stray.min.js", "old");
    let runner = shrinking_runner();

    let report = with_timeout(stage(&fs, &runner).run(&banner())).await.unwrap();

    assert_eq!(
        report.deleted,
        vec![
            PathBuf::from("lib/min/sammy-0.7.5.min.js"),
            PathBuf::from("lib/plugins/stray.min.js"),
        ]
    );
    assert!(fs.contents("lib/min/sammy-0.7.5.min.js").is_none());
    assert!(fs.contents("lib/plugins/stray.min.js").is_none());
    // Removed artifacts are never mistaken for modules.
    assert_eq!(runner.calls_to(MINIFIER).len(), 2);
}

#[tokio::test]
async fn rerunning_produces_identical_bytes() {
    init_tracing();
    let fs = project();
    let runner = shrinking_runner();

    with_timeout(stage(&fs, &runner).run(&banner())).await.unwrap();
    let first = text(&fs, "lib/min/sammy-0.7.6.min.js");

    let report = with_timeout(stage(&fs, &runner).run(&banner())).await.unwrap();
    let second = text(&fs, "lib/min/sammy-0.7.6.min.js");

    assert_eq!(first, second);
    assert_eq!(report.deleted.len(), 4);
    assert_eq!(report.generated.len(), 4);
}

#[tokio::test]
async fn write_failure_fails_the_stage() {
    init_tracing();
    let fs = project();
    fs.inject_fault(Fault::Write, "lib/min/sammy-0.7.6.min.js");
    let runner = shrinking_runner();

    let err = with_timeout(stage(&fs, &runner).run(&banner())).await.unwrap_err();

    match err {
        TreetaskError::Walk(walk) => assert_eq!(walk.path, PathBuf::from("lib/sammy.js")),
        other => panic!("unexpected error: {other:?}"),
    }
    // Versioned write failed, so latest was never attempted.
    assert!(fs.contents("lib/min/sammy-latest.min.js").is_none());
}

#[tokio::test]
async fn minifier_exit_code_fails_the_stage() {
    init_tracing();
    let fs = project();
    let runner = shrinking_runner();
    runner.always_exit(MINIFIER, 2);

    let err = with_timeout(stage(&fs, &runner).run(&banner())).await.unwrap_err();

    assert!(err.to_string().contains("exited with status 2"), "{err}");
}

#[tokio::test]
async fn missing_library_directory_is_an_error() {
    init_tracing();
    let fs = MockFileSystem::new();
    let runner = shrinking_runner();

    let err = with_timeout(stage(&fs, &runner).run(&banner())).await.unwrap_err();

    assert!(matches!(err, TreetaskError::Walk(_)));
    assert!(runner.calls().is_empty());
}
