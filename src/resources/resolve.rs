//! Expansion of a request path into a filesystem path.
//!
//! The path is walked one component at a time from `/`. Every literal
//! component is looked up by scanning its parent directory, and symbolic
//! links are replaced by their targets as they are met, so the result names
//! the file the OS would open. Nothing here decides whether that file may be
//! served; see [`super::ResourcePolicy`].

use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::VirtualPathPolicy;

/// Symbolic links followed during one expansion before giving up.
pub const MAX_SYMLINKS: usize = 40;

/// Expands `path` into the canonical, symlink-free path it refers to.
///
/// `aliases` is consulted before each component of `path` is taken
/// literally. Returns `None` when a component does not exist, a link cannot
/// be read, or too many links were followed.
pub fn expand_path(path: &str, aliases: Option<&dyn VirtualPathPolicy>) -> Option<PathBuf> {
    let mut walker = Walker {
        current: PathBuf::from("/"),
        aliases,
        links: 0,
    };

    for component in path.split('/') {
        walker.request_component(component)?;
    }

    Some(walker.current)
}

struct Walker<'a> {
    current: PathBuf,
    aliases: Option<&'a dyn VirtualPathPolicy>,
    links: usize,
}

impl Walker<'_> {
    fn request_component(&mut self, component: &str) -> Option<()> {
        if let Some(policy) = self.aliases {
            if let Some(alias) = policy.aliases(&self.current).remove(component) {
                tracing::trace!(
                    alias = component,
                    target = %alias.target.display(),
                    "virtual path substituted"
                );
                return self.follow(&alias.target, alias.absolute);
            }
        }

        self.component(OsStr::new(component))
    }

    fn component(&mut self, component: &OsStr) -> Option<()> {
        if component.is_empty() || component == "." {
            return Some(());
        }
        if component == ".." {
            // `pop` on `/` is a no-op, so the walk never leaves the root
            self.current.pop();
            return Some(());
        }

        let entry = find_entry(&self.current, component)?;
        let candidate = self.current.join(component);

        if entry.file_type().ok()?.is_symlink() {
            self.links += 1;
            if self.links > MAX_SYMLINKS {
                tracing::debug!(path = %candidate.display(), "too many symbolic links");
                return None;
            }

            let target = fs::read_link(&candidate).ok()?;
            let absolute = target.is_absolute();
            return self.follow(&target, absolute);
        }

        self.current = candidate;
        Some(())
    }

    /// Walks `target` from `/` when absolute, else from the current path.
    fn follow(&mut self, target: &Path, absolute: bool) -> Option<()> {
        if absolute {
            self.current = PathBuf::from("/");
        }

        for part in target.components() {
            match part {
                Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
                Component::ParentDir => {
                    self.current.pop();
                }
                Component::Normal(name) => self.component(name)?,
            }
        }

        Some(())
    }
}

/// Finds `name` by scanning `dir`, rather than assuming it exists.
fn find_entry(dir: &Path, name: &OsStr) -> Option<fs::DirEntry> {
    fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .find(|entry| entry.file_name().as_os_str() == name)
}

/// Canonical form of a configured directory, used for prefix checks.
///
/// Falls back to the path as given when it cannot be resolved.
pub(crate) fn canonical_dir(path: &Path) -> PathBuf {
    let path = absolute(path);
    path.to_str()
        .and_then(|text| expand_path(text, None))
        .unwrap_or_else(|| path.to_path_buf())
}

/// `path` joined onto the working directory when it is relative.
///
/// Expansion always starts at `/`, so relative roots and alias targets go
/// through here first.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
