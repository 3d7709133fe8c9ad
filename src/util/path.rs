use std::path::Path;

/// Version-control metadata directories removed before itemizing a checkout
pub const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

pub fn is_vcs_dir(name: &str) -> bool {
    VCS_DIRS.contains(&name)
}

/// Path of `path` relative to `root`, `/`-separated for storage.
///
/// Returns `None` when `path` is not under `root` or is `root` itself.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
