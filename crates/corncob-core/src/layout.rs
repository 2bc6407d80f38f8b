//! Remote layout: the mapping from protocol objects to adapter paths and
//! conditional-write rules (`SPEC_FULL.md` §4.2).
//!
//! The protocol places exactly three object kinds on a remote: bundles,
//! links, and the single mutable latest pointer. This module is the one
//! place that knows their path scheme so the link-chain engine never
//! constructs a path by hand.

use crate::domain::ids::{BundleId, LinkId};

/// The single mutable object naming the most recently published link.
pub const LATEST_POINTER_PATH: &str = "latest-link.yaml";

/// Create-only path for a bundle object. Conditional-write rule: `upload_fresh`.
pub fn bundle_path(id: &BundleId) -> String {
    format!("B-{id}.bundle")
}

/// Create-only path for a link object. Conditional-write rule: `upload_fresh`.
pub fn link_path(id: &LinkId) -> String {
    format!("L-{id}.yaml")
}

/// Content type used for bundle uploads.
pub const BUNDLE_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type used for link and latest-pointer uploads.
pub const YAML_CONTENT_TYPE: &str = "application/yaml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_path_matches_scheme() {
        let id = BundleId::new("deadbeefdeadbeef").unwrap();
        assert_eq!(bundle_path(&id), "B-deadbeefdeadbeef.bundle");
    }

    #[test]
    fn link_path_matches_scheme() {
        let id = LinkId::new("deadbeefdeadbeef").unwrap();
        assert_eq!(link_path(&id), "L-deadbeefdeadbeef.yaml");
    }
}
