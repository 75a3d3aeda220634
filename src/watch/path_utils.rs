// src/watch/path_utils.rs

use std::path::Path;

/// `path` relative to `root` as a forward-slash string.
///
/// Tries a plain `strip_prefix` first, then canonicalizes both sides for
/// roots reached through symlinks. `None` if `path` is not under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let (root_canon, path_canon) = (root.canonicalize().ok()?, path.canonicalize().ok()?);
    path_canon.strip_prefix(&root_canon).ok().map(to_slash)
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
