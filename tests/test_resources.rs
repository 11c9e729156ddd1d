use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use porter::resources::resolve::expand_path;
use porter::resources::{
    AliasTable, ContentLoader, HtmlDirectoryListing, Resolution, Resource, ResourcePolicy, StaticBody, VirtualPath,
};
use tempfile::TempDir;

/// root/
///   a/file.txt     "content"
///   a/b/
///   index.html
/// outside/
///   secret.txt
struct Tree {
    _dir: TempDir,
    base: PathBuf,
}

impl Tree {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();

        fs::create_dir_all(base.join("root/a/b")).unwrap();
        fs::create_dir_all(base.join("outside")).unwrap();
        fs::write(base.join("root/a/file.txt"), "content").unwrap();
        fs::write(base.join("root/index.html"), "<h1>hi</h1>").unwrap();
        fs::write(base.join("outside/secret.txt"), "secret").unwrap();

        Self { _dir: dir, base }
    }

    fn root(&self) -> PathBuf {
        self.base.join("root")
    }

    fn policy(&self) -> ResourcePolicy {
        ResourcePolicy::new(self.root())
    }
}

fn available(body: &str) -> Resource {
    Resource::Available(Some(Bytes::copy_from_slice(body.as_bytes())))
}

#[test]
fn test_available_file() {
    let tree = Tree::new();
    assert_eq!(tree.policy().resource("/a/file.txt"), available("content"));
}

#[test]
fn test_resolve_reports_canonical_path() {
    let tree = Tree::new();
    let resolution = tree.policy().resolve("/a/./file.txt");

    assert_eq!(
        resolution,
        Resolution::Allowed { path: tree.root().join("a/file.txt"), is_dir: false }
    );
}

#[test]
fn test_dot_dot_within_root_is_the_same_resource() {
    let tree = Tree::new();
    let policy = tree.policy();

    assert_eq!(policy.resource("/a/../a/file.txt"), policy.resource("/a/file.txt"));
    assert_eq!(policy.resource("/a/b/../file.txt"), available("content"));
}

#[test]
fn test_missing_file_is_not_found() {
    let tree = Tree::new();
    assert_eq!(tree.policy().resource("/nope.txt"), Resource::NotFound(None));
    assert_eq!(tree.policy().resource("/a/nope/file.txt"), Resource::NotFound(None));
}

#[test]
fn test_escape_with_dot_dot_is_restricted() {
    let tree = Tree::new();
    assert!(matches!(
        tree.policy().resource("/../outside/secret.txt"),
        Resource::Restricted(_)
    ));
}

#[test]
fn test_directory_without_listing_is_restricted() {
    let tree = Tree::new();
    assert!(matches!(tree.policy().resource("/a"), Resource::Restricted(None)));
}

#[test]
fn test_directory_listing() {
    let tree = Tree::new();
    let policy = tree
        .policy()
        .allow_directory_listing(true)
        .with_directory_body(HtmlDirectoryListing);

    let Resource::Available(Some(html)) = policy.resource("/a") else {
        panic!("expected a listing");
    };
    let html = String::from_utf8(html.to_vec()).unwrap();
    assert!(html.contains("file.txt"));
    assert!(html.contains("b/"));
}

#[cfg(unix)]
#[test]
fn test_symlink_out_of_root_is_restricted() {
    let tree = Tree::new();
    std::os::unix::fs::symlink(tree.base.join("outside"), tree.root().join("escape")).unwrap();

    assert!(matches!(
        tree.policy().resource("/escape/secret.txt"),
        Resource::Restricted(_)
    ));
}

#[cfg(unix)]
#[test]
fn test_relative_symlink_out_of_root_is_restricted() {
    let tree = Tree::new();
    std::os::unix::fs::symlink("../../outside/secret.txt", tree.root().join("a/sneaky")).unwrap();

    assert!(matches!(tree.policy().resource("/a/sneaky"), Resource::Restricted(_)));
}

#[cfg(unix)]
#[test]
fn test_symlink_into_trusted_directory() {
    let tree = Tree::new();
    std::os::unix::fs::symlink(tree.base.join("outside"), tree.root().join("shared")).unwrap();

    let policy = tree.policy().trust(tree.base.join("outside"));
    assert_eq!(policy.resource("/shared/secret.txt"), available("secret"));
}

#[cfg(unix)]
#[test]
fn test_relative_symlink_inside_root() {
    let tree = Tree::new();
    std::os::unix::fs::symlink("a/file.txt", tree.root().join("link.txt")).unwrap();

    assert_eq!(tree.policy().resource("/link.txt"), available("content"));
    assert_eq!(
        tree.policy().resolve("/link.txt"),
        Resolution::Allowed { path: tree.root().join("a/file.txt"), is_dir: false }
    );
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_is_not_found() {
    let tree = Tree::new();
    std::os::unix::fs::symlink("loop2", tree.root().join("loop1")).unwrap();
    std::os::unix::fs::symlink("loop1", tree.root().join("loop2")).unwrap();

    assert_eq!(tree.policy().resource("/loop1"), Resource::NotFound(None));
}

#[test]
fn test_restriction_policy() {
    let tree = Tree::new();
    let policy = tree
        .policy()
        .with_restriction_policy(|path: &Path, _is_dir: bool| path.extension().is_some_and(|e| e == "html"));

    assert!(matches!(policy.resource("/index.html"), Resource::Restricted(_)));
    assert_eq!(policy.resource("/a/file.txt"), available("content"));
}

#[test]
fn test_restricted_paths() {
    let tree = Tree::new();
    let policy = tree.policy().restrict(tree.root().join("a"));

    assert!(matches!(policy.resource("/a/file.txt"), Resource::Restricted(_)));
    assert!(matches!(policy.resource("/index.html"), Resource::Available(_)));
}

#[test]
fn test_not_found_representation_gets_requested_path() {
    let tree = Tree::new();
    let policy = tree
        .policy()
        .with_not_found_body(|path: &Path| Some(Bytes::from(format!("missing {}", path.display()))));

    assert_eq!(
        policy.resource("/gone.txt"),
        Resource::NotFound(Some(Bytes::from("missing /gone.txt")))
    );
}

#[test]
fn test_restricted_representation() {
    let tree = Tree::new();
    let policy = tree.policy().with_restricted_body(StaticBody(Bytes::from("nope")));

    assert_eq!(policy.resource("/a"), Resource::Restricted(Some(Bytes::from("nope"))));
}

#[test]
fn test_virtual_path_alias() {
    let tree = Tree::new();
    let aliases = HashMap::from([("docs".to_string(), VirtualPath::absolute(tree.base.join("outside")))]);
    let policy = tree
        .policy()
        .with_virtual_paths(AliasTable::new(tree.root(), aliases))
        .trust(tree.base.join("outside"));

    assert_eq!(policy.resource("/docs/secret.txt"), available("secret"));
    // only applies directly below the root
    assert_eq!(policy.resource("/a/docs/secret.txt"), Resource::NotFound(None));
}

#[test]
fn test_relative_virtual_path_is_normalized() {
    let tree = Tree::new();
    let policy = tree.policy().with_virtual_paths(|prefix: &Path| {
        let mut map = HashMap::new();
        if prefix.ends_with("root") {
            map.insert("up".to_string(), VirtualPath::relative("../outside"));
        }
        map
    });

    assert!(matches!(policy.resource("/up/secret.txt"), Resource::Restricted(_)));
}

struct FailingLoader;

impl ContentLoader for FailingLoader {
    fn load(&self, _path: &Path) -> io::Result<Bytes> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }
}

#[test]
fn test_unreadable_content_is_unavailable() {
    let tree = Tree::new();
    assert_eq!(
        tree.policy().resource_with("/a/file.txt", &FailingLoader),
        Resource::Unavailable(None)
    );
}

#[test]
fn test_expand_path_pops_at_root() {
    assert_eq!(expand_path("/../..", None), Some(PathBuf::from("/")));
}

#[test]
fn test_relative_root_is_taken_from_working_directory() {
    // a scratch tree inside the working directory, named relative to it
    let dir = tempfile::tempdir_in(".").unwrap();
    let name = dir.path().file_name().unwrap().to_str().unwrap().to_string();
    fs::create_dir(dir.path().join("public")).unwrap();
    fs::write(dir.path().join("public/index.html"), "<h1>hi</h1>").unwrap();

    let policy = ResourcePolicy::new(format!("./{name}/public"));

    assert!(policy.root.is_absolute());
    assert_eq!(
        policy.resource("/index.html"),
        Resource::Available(Some(Bytes::from("<h1>hi</h1>")))
    );
    assert!(matches!(policy.resource("/../../Cargo.toml"), Resource::Restricted(_)));
}
