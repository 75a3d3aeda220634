// src/fs/mock.rs

use super::{EntryStat, FileSystem};
use crate::types::EntryKind;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, modified: SystemTime },
    Dir(Vec<String>), // List of child names
    /// Neither file nor directory (socket, fifo, dangling link).
    Other,
}

/// Which operation an injected fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Stat,
    ReadDir,
    Read,
    Write,
    Remove,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, MockEntry>,
    faults: HashMap<(Fault, PathBuf), io::ErrorKind>,
}

/// In-memory filesystem for tests.
///
/// Modification times come from a logical clock that advances by one second
/// on every write, so two writes to the same file always differ.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
    clock: Arc<AtomicU64>,
}

/// Strip `.` components so `./lib/a.js` and `lib/a.js` name the same entry.
fn key(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

fn parent_key(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?;
    Some(key(parent))
}

fn not_found(path: &Path) -> anyhow::Error {
    anyhow!(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {:?}", path)
    ))
}

fn injected(op: Fault, path: &Path, kind: io::ErrorKind) -> anyhow::Error {
    anyhow!(io::Error::new(
        kind,
        format!("injected {:?} failure: {:?}", op, path)
    ))
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        // Ensure root exists
        fs.lock()
            .files
            .insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));
        fs
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not wedge every other test using the mock.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tick(&self) -> SystemTime {
        let n = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + n)
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = key(path.as_ref());
        let modified = self.tick();
        let mut state = self.lock();
        state.files.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                modified,
            },
        );
        Self::link_into_parent(&mut state.files, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = key(path.as_ref());
        let mut state = self.lock();
        Self::ensure_dir_entry(&mut state.files, &path);
    }

    /// Add an entry that is neither a file nor a directory.
    pub fn add_other(&self, path: impl AsRef<Path>) {
        let path = key(path.as_ref());
        let mut state = self.lock();
        state.files.insert(path.clone(), MockEntry::Other);
        Self::link_into_parent(&mut state.files, &path);
    }

    /// Bump the modification time of an existing file without changing it.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let path = key(path.as_ref());
        let now = self.tick();
        let mut state = self.lock();
        if let Some(MockEntry::File { modified, .. }) = state.files.get_mut(&path) {
            *modified = now;
        }
    }

    /// Make the given operation fail for `path` until [`clear_faults`] is called.
    ///
    /// [`clear_faults`]: MockFileSystem::clear_faults
    pub fn inject_fault(&self, op: Fault, path: impl AsRef<Path>) {
        self.inject_fault_kind(op, path, io::ErrorKind::PermissionDenied);
    }

    /// Like [`inject_fault`], failing with a specific error kind
    /// (`NotFound` simulates an entry removed mid-walk).
    ///
    /// [`inject_fault`]: MockFileSystem::inject_fault
    pub fn inject_fault_kind(&self, op: Fault, path: impl AsRef<Path>, kind: io::ErrorKind) {
        let path = key(path.as_ref());
        self.lock().faults.insert((op, path), kind);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Raw contents of a file, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().files.get(&key(path.as_ref())) {
            Some(MockEntry::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }

    /// All file paths currently stored, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .lock()
            .files
            .iter()
            .filter(|(_, entry)| matches!(entry, MockEntry::File { .. }))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    fn link_into_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        // Ensure parent directories exist implicitly for simplicity in this mock
        if let Some(parent) = parent_key(path) {
            if parent != path {
                Self::ensure_dir_entry(files, &parent);
                // Add this entry to parent's children
                if let Some(MockEntry::Dir(children)) = files.get_mut(&parent) {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        if !children.iter().any(|c| c == name) {
                            children.push(name.to_string());
                        }
                    }
                }
            }
        }
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if !files.contains_key(path) {
            files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
            Self::link_into_parent(files, path);
        }
    }

    fn check_fault(state: &MockState, op: Fault, path: &Path) -> Result<()> {
        if let Some(kind) = state.faults.get(&(op, path.to_path_buf())) {
            return Err(injected(op, path, *kind));
        }
        Ok(())
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let k = key(path);
        let state = self.lock();
        Self::check_fault(&state, Fault::Read, &k)?;
        match state.files.get(&k) {
            Some(MockEntry::File { content, .. }) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(_) => Err(anyhow!("Not a regular file: {:?}", path)),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        {
            let state = self.lock();
            Self::check_fault(&state, Fault::Write, &key(path))?;
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let k = key(path);
        let mut state = self.lock();
        Self::check_fault(&state, Fault::Remove, &k)?;
        match state.files.get(&k) {
            Some(MockEntry::File { .. }) | Some(MockEntry::Other) => {
                state.files.remove(&k);
            }
            Some(MockEntry::Dir(_)) => return Err(anyhow!("Is a directory: {:?}", path)),
            None => return Err(not_found(path)),
        }
        if let Some(parent) = parent_key(&k) {
            if let Some(MockEntry::Dir(children)) = state.files.get_mut(&parent) {
                if let Some(name) = k.file_name().and_then(|n| n.to_str()) {
                    children.retain(|c| c != name);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(&key(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().files.get(&key(path)), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().files.get(&key(path)), Some(MockEntry::Dir(_)))
    }

    fn stat(&self, path: &Path) -> Result<EntryStat> {
        let k = key(path);
        let state = self.lock();
        Self::check_fault(&state, Fault::Stat, &k)?;
        match state.files.get(&k) {
            Some(MockEntry::File { modified, .. }) => Ok(EntryStat {
                kind: EntryKind::File,
                modified: Some(*modified),
            }),
            Some(MockEntry::Dir(_)) => Ok(EntryStat {
                kind: EntryKind::Directory,
                modified: None,
            }),
            Some(MockEntry::Other) => Ok(EntryStat {
                kind: EntryKind::Other,
                modified: None,
            }),
            None => Err(not_found(path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let k = key(path);
        let state = self.lock();
        Self::check_fault(&state, Fault::ReadDir, &k)?;
        match state.files.get(&k) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            Some(_) => Err(anyhow!("Not a directory: {:?}", path)),
            None => Err(not_found(path)),
        }
    }
}
