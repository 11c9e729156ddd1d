//! Static resource lookup and access policy.
//!
//! A request path is joined onto the configured root, expanded into a
//! canonical filesystem path ([`resolve::expand_path`]), and only then
//! checked against the policy. Trust is decided on the expanded path, so
//! `..`, aliases and symbolic links cannot move a request outside the root
//! and trusted directories without being seen.
//!
//! Outcomes are values, not errors: see [`Resource`].

pub mod listing;
pub mod resolve;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use crate::config::ResourceConfig;
use resolve::{absolute, canonical_dir, expand_path};

pub use listing::HtmlDirectoryListing;

/// The outcome of looking up a resource. Each variant may carry a
/// representation to send as the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Available(Option<Bytes>),
    Restricted(Option<Bytes>),
    NotFound(Option<Bytes>),
    /// The path is allowed but its content could not be loaded.
    Unavailable(Option<Bytes>),
}

/// Where a request path led, before any content is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NotFound { requested: String },
    Restricted { path: PathBuf, is_dir: bool },
    Allowed { path: PathBuf, is_dir: bool },
}

/// An alias target produced by a [`VirtualPathPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPath {
    pub target: PathBuf,
    /// Replace the current path instead of descending into `target`.
    pub absolute: bool,
}

impl VirtualPath {
    pub fn absolute(target: impl Into<PathBuf>) -> Self {
        Self { target: target.into(), absolute: true }
    }

    pub fn relative(target: impl Into<PathBuf>) -> Self {
        Self { target: target.into(), absolute: false }
    }
}

/// Maps path components to alias targets, given the path resolved so far.
pub trait VirtualPathPolicy: Send + Sync {
    fn aliases(&self, prefix: &Path) -> HashMap<String, VirtualPath>;
}

impl<F> VirtualPathPolicy for F
where
    F: Fn(&Path) -> HashMap<String, VirtualPath> + Send + Sync,
{
    fn aliases(&self, prefix: &Path) -> HashMap<String, VirtualPath> {
        self(prefix)
    }
}

/// Aliases that apply directly below one directory.
#[derive(Debug, Clone)]
pub struct AliasTable {
    prefix: PathBuf,
    aliases: HashMap<String, VirtualPath>,
}

impl AliasTable {
    pub fn new(prefix: impl AsRef<Path>, aliases: HashMap<String, VirtualPath>) -> Self {
        Self {
            prefix: canonical_dir(prefix.as_ref()),
            aliases,
        }
    }
}

impl VirtualPathPolicy for AliasTable {
    fn aliases(&self, prefix: &Path) -> HashMap<String, VirtualPath> {
        if prefix == self.prefix {
            self.aliases.clone()
        } else {
            HashMap::new()
        }
    }
}

/// Extra restriction rule, evaluated on the expanded path.
pub trait RestrictionPolicy: Send + Sync {
    fn is_restricted(&self, path: &Path, is_dir: bool) -> bool;
}

impl<F> RestrictionPolicy for F
where
    F: Fn(&Path, bool) -> bool + Send + Sync,
{
    fn is_restricted(&self, path: &Path, is_dir: bool) -> bool {
        self(path, is_dir)
    }
}

/// Produces a body for a path (a custom 404 page, a directory index, ...).
pub trait Representation: Send + Sync {
    fn render(&self, path: &Path) -> Option<Bytes>;
}

impl<F> Representation for F
where
    F: Fn(&Path) -> Option<Bytes> + Send + Sync,
{
    fn render(&self, path: &Path) -> Option<Bytes> {
        self(path)
    }
}

/// The same body for every path.
#[derive(Debug, Clone)]
pub struct StaticBody(pub Bytes);

impl Representation for StaticBody {
    fn render(&self, _path: &Path) -> Option<Bytes> {
        Some(self.0.clone())
    }
}

/// Reads the content of an allowed, non-directory path.
pub trait ContentLoader {
    fn load(&self, path: &Path) -> std::io::Result<Bytes>;
}

/// Loads content straight from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl ContentLoader for FsLoader {
    fn load(&self, path: &Path) -> std::io::Result<Bytes> {
        fs::read(path).map(Bytes::from)
    }
}

/// Access policy for static resources. Read-only once built.
#[derive(Clone)]
pub struct ResourcePolicy {
    pub root: PathBuf,
    pub trusted_directories: Vec<PathBuf>,
    pub restricted_paths: Vec<PathBuf>,
    pub allow_directory_listing: bool,
    pub virtual_paths: Option<Arc<dyn VirtualPathPolicy>>,
    pub restriction: Option<Arc<dyn RestrictionPolicy>>,
    pub not_found_body: Option<Arc<dyn Representation>>,
    pub restricted_body: Option<Arc<dyn Representation>>,
    pub directory_body: Option<Arc<dyn Representation>>,
}

impl std::fmt::Debug for ResourcePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePolicy")
            .field("root", &self.root)
            .field("trusted_directories", &self.trusted_directories)
            .field("restricted_paths", &self.restricted_paths)
            .field("allow_directory_listing", &self.allow_directory_listing)
            .field("virtual_paths", &self.virtual_paths.is_some())
            .field("restriction", &self.restriction.is_some())
            .finish_non_exhaustive()
    }
}

impl ResourcePolicy {
    /// A policy serving `root`; a relative root is taken against the
    /// working directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: absolute(&root.into()),
            trusted_directories: Vec::new(),
            restricted_paths: Vec::new(),
            allow_directory_listing: false,
            virtual_paths: None,
            restriction: None,
            not_found_body: None,
            restricted_body: None,
            directory_body: None,
        }
    }

    /// Builds a policy from configuration.
    ///
    /// Configured aliases apply directly below the root. Configured error
    /// pages are read once here; a page that cannot be read is logged and
    /// skipped.
    pub fn from_config(config: &ResourceConfig) -> Self {
        let mut policy = Self::new(&config.root);
        policy.trusted_directories = config.trusted_directories.clone();
        policy.restricted_paths = config.restricted_paths.clone();
        policy.allow_directory_listing = config.allow_directory_listing;

        if !config.aliases.is_empty() {
            let aliases = config
                .aliases
                .iter()
                .map(|(name, target)| (name.clone(), VirtualPath::absolute(absolute(target))))
                .collect();
            policy.virtual_paths = Some(Arc::new(AliasTable::new(&config.root, aliases)));
        }

        if config.allow_directory_listing {
            policy.directory_body = Some(Arc::new(HtmlDirectoryListing));
        }

        policy.not_found_body = config.not_found_page.as_deref().and_then(load_page);
        policy.restricted_body = config.restricted_page.as_deref().and_then(load_page);

        policy
    }

    pub fn trust(mut self, directory: impl Into<PathBuf>) -> Self {
        self.trusted_directories.push(directory.into());
        self
    }

    pub fn restrict(mut self, path: impl Into<PathBuf>) -> Self {
        self.restricted_paths.push(path.into());
        self
    }

    pub fn allow_directory_listing(mut self, allow: bool) -> Self {
        self.allow_directory_listing = allow;
        self
    }

    pub fn with_virtual_paths(mut self, policy: impl VirtualPathPolicy + 'static) -> Self {
        self.virtual_paths = Some(Arc::new(policy));
        self
    }

    pub fn with_restriction_policy(mut self, policy: impl RestrictionPolicy + 'static) -> Self {
        self.restriction = Some(Arc::new(policy));
        self
    }

    pub fn with_not_found_body(mut self, body: impl Representation + 'static) -> Self {
        self.not_found_body = Some(Arc::new(body));
        self
    }

    pub fn with_restricted_body(mut self, body: impl Representation + 'static) -> Self {
        self.restricted_body = Some(Arc::new(body));
        self
    }

    pub fn with_directory_body(mut self, body: impl Representation + 'static) -> Self {
        self.directory_body = Some(Arc::new(body));
        self
    }

    /// Expands `raw_path` below the root and applies the access rules.
    pub fn resolve(&self, raw_path: &str) -> Resolution {
        let joined = format!("{}{}", self.root.to_string_lossy(), raw_path);
        let not_found = || Resolution::NotFound { requested: raw_path.to_string() };

        let Some(path) = expand_path(&joined, self.virtual_paths.as_deref()) else {
            return not_found();
        };

        let Ok(metadata) = fs::metadata(&path) else {
            return not_found();
        };
        let is_dir = metadata.is_dir();

        if self.is_restricted(&path, is_dir) {
            Resolution::Restricted { path, is_dir }
        } else {
            Resolution::Allowed { path, is_dir }
        }
    }

    /// Whether an expanded path may not be served.
    ///
    /// Checked in order: directory listing, the restriction policy, the
    /// restricted paths, then trust (under the root or a trusted directory).
    pub fn is_restricted(&self, path: &Path, is_dir: bool) -> bool {
        if is_dir && !self.allow_directory_listing {
            return true;
        }

        if let Some(policy) = &self.restriction {
            if policy.is_restricted(path, is_dir) {
                return true;
            }
        }

        if self
            .restricted_paths
            .iter()
            .any(|restricted| path.starts_with(canonical_dir(restricted)))
        {
            return true;
        }

        !self.is_trusted(path)
    }

    fn is_trusted(&self, path: &Path) -> bool {
        path.starts_with(canonical_dir(&self.root))
            || self
                .trusted_directories
                .iter()
                .any(|dir| path.starts_with(canonical_dir(dir)))
    }

    /// Looks up `raw_path`, reading file content from disk.
    pub fn resource(&self, raw_path: &str) -> Resource {
        self.resource_with(raw_path, &FsLoader)
    }

    /// Looks up `raw_path`, reading file content through `loader`.
    pub fn resource_with(&self, raw_path: &str, loader: &dyn ContentLoader) -> Resource {
        let resolution = self.resolve(raw_path);
        match resolution {
            Resolution::Allowed { path, is_dir: false } => match loader.load(&path) {
                Ok(content) => Resource::Available(Some(content)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "resource content unavailable");
                    Resource::Unavailable(None)
                }
            },
            other => self.outcome(other),
        }
    }

    /// The outcome for a resolution whose file content, if any, is loaded
    /// by the caller. Allowed files map to `Available(None)`.
    pub fn outcome(&self, resolution: Resolution) -> Resource {
        match resolution {
            Resolution::NotFound { requested } => {
                Resource::NotFound(render(&self.not_found_body, Path::new(&requested)))
            }
            Resolution::Restricted { path, .. } => {
                Resource::Restricted(render(&self.restricted_body, &path))
            }
            Resolution::Allowed { path, is_dir: true } => {
                Resource::Available(render(&self.directory_body, &path))
            }
            Resolution::Allowed { is_dir: false, .. } => Resource::Available(None),
        }
    }
}

fn render(representation: &Option<Arc<dyn Representation>>, path: &Path) -> Option<Bytes> {
    representation.as_ref().and_then(|r| r.render(path))
}

fn load_page(path: &Path) -> Option<Arc<dyn Representation>> {
    match fs::read(path) {
        Ok(page) => Some(Arc::new(StaticBody(Bytes::from(page)))),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read error page");
            None
        }
    }
}
