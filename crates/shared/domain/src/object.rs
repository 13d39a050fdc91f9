//! Object shapes and inventory path helpers.

use crate::value::Value;
use std::collections::BTreeMap;

/// Property name to value, ordered by name.
pub type PropertyMap = BTreeMap<String, Value>;

/// Interface name to its properties for one path, ordered by interface name.
pub type Object = BTreeMap<String, PropertyMap>;

/// Object path to [`Object`], ordered by path.
pub type ObjectMap = BTreeMap<String, Object>;

pub const DEFAULT_INVENTORY_ROOT: &str = "/xyz/openbmc_project/inventory";

fn trimmed_root(root: &str) -> &str {
    root.trim_end_matches('/')
}

/// Returns `true` if `path` is `root` itself or lies below it.
#[must_use]
pub fn is_under(root: &str, path: &str) -> bool {
    let root = trimmed_root(root);
    if root.is_empty() {
        return path.starts_with('/');
    }
    path.strip_prefix(root).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Anchors an externally supplied path below the inventory root.
///
/// The root is always prepended: `foo` and `/foo` both land at `<root>/foo`,
/// and a path that already spells out the root is nested below it again.
/// Trailing and duplicate leading slashes are dropped.
#[must_use]
pub fn absolize(root: &str, path: &str) -> String {
    let root = trimmed_root(root);
    let rel = path.trim_end_matches('/').trim_start_matches('/');
    match (root.is_empty(), rel.is_empty()) {
        (true, true) => "/".to_owned(),
        (false, true) => root.to_owned(),
        (true, false) => format!("/{rel}"),
        (false, false) => format!("{root}/{rel}"),
    }
}

/// Strips the inventory root from an absolute path, keeping the leading slash.
#[must_use]
pub fn relativize<'a>(root: &str, path: &'a str) -> Option<&'a str> {
    let root = trimmed_root(root);
    if !is_under(root, path) {
        return None;
    }
    let rest = &path[root.len()..];
    Some(if rest.is_empty() { "/" } else { rest })
}

/// Rejects empty objects; an object must carry at least one interface.
#[must_use]
pub fn is_valid_object(object: &Object) -> bool {
    !object.is_empty()
}
