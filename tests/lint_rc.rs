// tests/lint_rc.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use treetask::errors::TreetaskError;
use treetask::fs::mock::MockFileSystem;
use treetask::lintrc::{
    load_ignore, merge_rc, parse_rc, strip_comments, IgnoreSet, LintRc, Reporter, ResolvedLintRc,
};

fn rc(value: Value) -> LintRc {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn project_overrides_home_and_predef_concatenates() {
    let home = rc(json!({ "predef": ["a"], "maxlen": 80, "curly": true }));
    let project = rc(json!({ "predef": ["b"], "maxlen": 120 }));

    let merged = merge_rc(home, project);

    assert_eq!(
        Value::Object(merged),
        json!({ "predef": ["a", "b"], "maxlen": 120, "curly": true })
    );
}

#[test]
fn predef_only_on_one_side_is_kept() {
    let merged = merge_rc(LintRc::new(), rc(json!({ "predef": ["jQuery"] })));
    assert_eq!(Value::Object(merged), json!({ "predef": ["jQuery"] }));
}

#[test]
fn comments_are_stripped_but_strings_survive() {
    let text = r#"{
        // line comment
        "url": "http://sammyjs.org", /* block
        comment */ "glob": "lib/**/*.js"
    }"#;

    let parsed = parse_rc(Path::new(".jshintrc"), text).unwrap();

    assert_eq!(parsed["url"], json!("http://sammyjs.org"));
    assert_eq!(parsed["glob"], json!("lib/**/*.js"));
    assert!(!strip_comments(text).contains("line comment"));
}

#[test]
fn malformed_rc_names_the_file() {
    let err = parse_rc(Path::new("/home/me/.jshintrc"), "{ nope }").unwrap_err();
    match &err {
        TreetaskError::LintConfig { path, .. } => {
            assert_eq!(path, &PathBuf::from("/home/me/.jshintrc"))
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().starts_with("Error opening config file"));
}

#[test]
fn non_object_rc_is_rejected() {
    assert!(matches!(
        parse_rc(Path::new(".jshintrc"), "[1, 2]"),
        Err(TreetaskError::LintConfig { .. })
    ));
}

#[test]
fn resolve_merges_home_and_project_files() {
    let fs = MockFileSystem::new();
    fs.add_file("home/.jshintrc", r#"{ "predef": ["a"], "maxlen": 80 }"#);
    fs.add_file("proj/.jshintrc", r#"{ "predef": ["b"], "maxlen": 120 }"#);

    let resolved = ResolvedLintRc::resolve(
        Arc::new(fs),
        None,
        Some(Path::new("home")),
        Path::new("proj"),
        ".jshintrc",
    )
    .unwrap();

    assert_eq!(
        Value::Object(resolved.config),
        json!({ "predef": ["a", "b"], "maxlen": 120 })
    );
    assert_eq!(
        resolved.sources,
        vec![PathBuf::from("home/.jshintrc"), PathBuf::from("proj/.jshintrc")]
    );
}

#[test]
fn missing_rc_files_give_an_empty_config() {
    let resolved = ResolvedLintRc::resolve(
        Arc::new(MockFileSystem::new()),
        None,
        Some(Path::new("home")),
        Path::new("proj"),
        ".jshintrc",
    )
    .unwrap();

    assert!(resolved.config.is_empty());
    assert!(resolved.sources.is_empty());
}

#[test]
fn custom_config_replaces_the_merge() {
    let fs = MockFileSystem::new();
    fs.add_file("home/.jshintrc", r#"{ "maxlen": 80 }"#);
    fs.add_file("custom.json", r#"{ "undef": true }"#);

    let resolved = ResolvedLintRc::resolve(
        Arc::new(fs),
        Some(Path::new("custom.json")),
        Some(Path::new("home")),
        Path::new("."),
        ".jshintrc",
    )
    .unwrap();

    assert_eq!(Value::Object(resolved.config), json!({ "undef": true }));
}

#[test]
fn missing_custom_config_is_an_error() {
    let err = ResolvedLintRc::resolve(
        Arc::new(MockFileSystem::new()),
        Some(Path::new("nope.json")),
        None,
        Path::new("."),
        ".jshintrc",
    )
    .unwrap_err();

    assert!(matches!(err, TreetaskError::LintConfig { .. }));
}

#[test]
fn ignore_file_drops_blank_lines() {
    let fs = MockFileSystem::new();
    fs.add_file(".jshintignore", "lib/vendor\n\n  \nlib/min\r\n");

    let patterns = load_ignore(&fs, Path::new(".jshintignore")).unwrap();
    assert_eq!(patterns, vec!["lib/vendor", "lib/min"]);

    assert!(load_ignore(&fs, Path::new("missing")).unwrap().is_empty());
}

#[test]
fn ignore_set_matches_relative_to_root() {
    let set = IgnoreSet::new("proj", &["lib/vendor".to_string(), "*.min.js".to_string()]).unwrap();

    assert!(set.is_ignored(Path::new("proj/lib/vendor")));
    assert!(set.is_ignored(Path::new("proj/lib/vendor/jquery.js")));
    assert!(set.is_ignored(Path::new("proj/app.min.js")));
    assert!(!set.is_ignored(Path::new("proj/lib/sammy.js")));
    assert!(!set.is_ignored(Path::new("elsewhere/lib/vendor/x.js")));
}

#[test]
fn reporter_switches_follow_precedence() {
    let custom = Some(PathBuf::from("reporter.js"));
    assert_eq!(Reporter::select(custom.clone(), true, true), Reporter::NonErrors);
    assert_eq!(Reporter::select(custom.clone(), true, false), Reporter::JslintXml);
    assert_eq!(
        Reporter::select(custom.clone(), false, false),
        Reporter::Custom(PathBuf::from("reporter.js"))
    );
    assert_eq!(Reporter::select(None, false, false), Reporter::Default);

    assert_eq!(
        Reporter::Custom(PathBuf::from("reporter.js")).checker_args(),
        vec!["--reporter", "reporter.js"]
    );
}

#[test]
fn custom_reporter_must_exist() {
    let fs = MockFileSystem::new();
    fs.add_file("reporter.js", "module.exports = {}");

    assert!(Reporter::Custom(PathBuf::from("reporter.js")).check(&fs).is_ok());
    assert!(matches!(
        Reporter::Custom(PathBuf::from("missing.js")).check(&fs),
        Err(TreetaskError::LintConfig { .. })
    ));
}
