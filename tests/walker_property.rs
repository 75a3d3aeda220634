// tests/walker_property.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use treetask::fs::mock::{Fault, MockFileSystem};
use treetask::walk::{Visit, WalkSummary, Walker};

const ROOT: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    File,
    Other,
}

/// In-memory description of a generated tree plus its injected faults.
#[derive(Debug, Clone, Default)]
struct TreeModel {
    dirs: BTreeSet<String>,
    leaves: BTreeMap<String, Leaf>,
    faults: BTreeSet<(String, bool)>, // (path, is_read_dir)
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Expected {
    entries: usize,
    files: usize,
    errors: usize,
}

fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(p, _)| p)
}

impl TreeModel {
    fn build(raw: Vec<(Vec<u8>, bool, u8)>) -> Self {
        let mut model = TreeModel::default();
        model.dirs.insert(ROOT.to_string());

        for (i, (segments, other, fault)) in raw.into_iter().enumerate() {
            let mut dir = ROOT.to_string();
            for seg in segments {
                dir = format!("{dir}/d{seg}");
                model.dirs.insert(dir.clone());
            }
            let leaf = format!("{dir}/e{i}.js");
            let kind = if other { Leaf::Other } else { Leaf::File };
            match fault {
                0 => {
                    model.faults.insert((leaf.clone(), false));
                }
                1 => {
                    model.faults.insert((dir.clone(), false));
                }
                2 => {
                    model.faults.insert((dir.clone(), true));
                }
                _ => {}
            }
            model.leaves.insert(leaf, kind);
        }
        model
    }

    fn install(&self) -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_dir(ROOT);
        for (path, kind) in &self.leaves {
            match kind {
                Leaf::File => fs.add_file(path, "x"),
                Leaf::Other => fs.add_other(path),
            }
        }
        for (path, read_dir) in &self.faults {
            let op = if *read_dir { Fault::ReadDir } else { Fault::Stat };
            fs.inject_fault(op, path);
        }
        fs
    }

    fn expected(&self) -> Expected {
        let mut out = Expected::default();
        self.visit(ROOT, &mut out);
        out
    }

    fn visit(&self, path: &str, out: &mut Expected) {
        out.entries += 1;
        if self.faults.contains(&(path.to_string(), false)) {
            out.errors += 1;
            return;
        }
        match self.leaves.get(path) {
            Some(Leaf::File) => out.files += 1,
            Some(Leaf::Other) => {}
            None => {
                if self.faults.contains(&(path.to_string(), true)) {
                    out.errors += 1;
                    return;
                }
                let children = self
                    .dirs
                    .iter()
                    .chain(self.leaves.keys())
                    .filter(|child| parent(child) == Some(path));
                for child in children {
                    self.visit(child, out);
                }
            }
        }
    }
}

fn tree_strategy() -> impl Strategy<Value = TreeModel> {
    proptest::collection::vec(
        (
            proptest::collection::vec(0u8..3, 0..4),
            any::<bool>(),
            0u8..12,
        ),
        0..30,
    )
    .prop_map(TreeModel::build)
}

/// Walk `fs` from the model root with `spawn_walk`, returning the number of
/// callback visits, the number of `on_done` calls and the summary.
fn run_walk(fs: MockFileSystem) -> (usize, usize, WalkSummary) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let visits = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let summary: Arc<Mutex<Option<WalkSummary>>> = Arc::default();

        let walker = Walker::new(Arc::new(fs));
        let handle = {
            let visits = Arc::clone(&visits);
            let done = Arc::clone(&done);
            let summary = Arc::clone(&summary);
            walker.spawn_walk(
                ROOT,
                move |visit: Visit| {
                    visits.fetch_add(1, Ordering::SeqCst);
                    // Retire from a separate task to exercise held releases.
                    tokio::spawn(async move {
                        tokio::task::yield_now().await;
                        drop(visit.release);
                    });
                },
                move |s| {
                    done.fetch_add(1, Ordering::SeqCst);
                    *summary.lock().unwrap() = Some(s);
                },
            )
        };
        handle.await.unwrap();

        let summary = summary.lock().unwrap().take().unwrap();
        (
            visits.load(Ordering::SeqCst),
            done.load(Ordering::SeqCst),
            summary,
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// For any tree, with or without injected failures, the walk finishes
    /// exactly once, every reachable entry is retired exactly once, and the
    /// callback sees each file and each failure once.
    #[test]
    fn walk_retires_every_reachable_entry_once(model in tree_strategy()) {
        let expected = model.expected();

        let (visits, done, summary) = run_walk(model.install());

        prop_assert_eq!(done, 1);
        prop_assert_eq!(summary.files, expected.files);
        prop_assert_eq!(summary.errors.len(), expected.errors);
        prop_assert_eq!(visits, expected.files + expected.errors);
        prop_assert_eq!(summary.entries(), expected.entries);
        prop_assert_eq!(summary.retired, expected.entries);
    }
}
