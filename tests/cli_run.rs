// tests/cli_run.rs

use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::Parser;
use tempfile::TempDir;

use treetask::cli::CliArgs;
use treetask::config::loader::DEFAULT_CONFIG_FILE;
use treetask::errors::TreetaskError;
use treetask::run_with_output;
use treetask_test_utils::{init_tracing, with_timeout};

/// Empty config in a scratch directory so runs never pick up the cwd.
fn scratch_config() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    std::fs::write(&path, "").unwrap();
    (dir, path)
}

fn args(config: &Path, rest: &[&str]) -> CliArgs {
    let config = config.to_string_lossy().into_owned();
    let argv = ["treetask", "--config", config.as_str()]
        .into_iter()
        .chain(rest.iter().copied());
    CliArgs::try_parse_from(argv).unwrap()
}

async fn run_captured(args: CliArgs) -> (anyhow::Result<()>, String) {
    let mut out = Vec::new();
    let res = with_timeout(run_with_output(args, &mut out)).await;
    (res, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn no_targets_prints_help() {
    init_tracing();
    let (_dir, config) = scratch_config();

    let (res, out) = run_captured(args(&config, &[])).await;

    res.unwrap();
    assert!(out.contains("Usage: treetask"));
    assert!(out.contains("--dry-run"));
}

#[test]
fn version_flag_short_circuits_with_success() {
    let err = CliArgs::try_parse_from(["treetask", "--version"]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    assert_eq!(err.exit_code(), 0);
    assert!(err.to_string().contains(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn list_prints_every_task_with_its_description() {
    init_tracing();
    let (_dir, config) = scratch_config();

    let (res, out) = run_captured(args(&config, &["-T"])).await;

    res.unwrap();
    let names: Vec<&str> = out
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    assert_eq!(
        names,
        vec!["version", "minify", "lint", "test", "autotest", "tag", "release", "docs"]
    );
    assert!(out.lines().all(|line| line.contains("  # ")));
    assert!(out.contains("(after: minify, tag)"));
}

#[tokio::test]
async fn dry_run_prints_the_depth_first_plan() {
    init_tracing();
    let (_dir, config) = scratch_config();

    let (res, out) = run_captured(args(&config, &["--dry-run", "release"])).await;

    res.unwrap();
    assert_eq!(
        out,
        "treetask dry-run\n  1. version\n  2. minify\n  3. tag\n  4. release\n"
    );
}

#[tokio::test]
async fn unknown_task_is_an_error() {
    init_tracing();
    let (_dir, config) = scratch_config();

    let (res, out) = run_captured(args(&config, &["nope"])).await;

    let err = res.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TreetaskError>(),
        Some(TreetaskError::TaskNotFound(name)) if name.contains("nope")
    ));
    assert!(out.is_empty());
}

#[tokio::test]
async fn missing_explicit_config_is_an_error() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("absent.toml");

    let (res, _out) = run_captured(args(&config, &["--dry-run", "version"])).await;

    assert!(res.is_err());
}
