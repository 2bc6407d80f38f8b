//! The immutable `Link` record published on every push.
//!
//! See `SPEC_FULL.md` §3 and §4.2. The wire form is a deterministic four
//! element sequence; this module keeps the ergonomic struct form for the rest
//! of the crate and converts to/from the wire tuple only at the serialization
//! boundary, so callers never have to think about positional indices.

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::ids::{BranchName, BundleId, CommitId, LinkId};

/// One `(bundle_id, prereqs)` entry in a link's `bundles` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub bundle_id: BundleId,
    /// Per-branch commit each ref in the bundle is built on top of; may be
    /// `CommitId::initial_snapshot()` for a branch with no prior history.
    pub prereqs: Vec<(BranchName, CommitId)>,
}

impl BundleEntry {
    pub fn new(bundle_id: BundleId, prereqs: Vec<(BranchName, CommitId)>) -> Self {
        Self { bundle_id, prereqs }
    }

    pub fn prereq_for(&self, branch: &BranchName) -> Option<&CommitId> {
        self.prereqs.iter().find(|(b, _)| b == branch).map(|(_, c)| c)
    }
}

/// The immutable protocol record describing one published state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    id: LinkId,
    prev_id: LinkId,
    branches: Vec<(BranchName, CommitId)>,
    bundles: Vec<BundleEntry>,
    supplement: serde_yaml::Mapping,
}

impl Link {
    /// Builds the chain's first link. Its `prev_id` is the sentinel.
    pub fn initial(
        id: LinkId,
        branches: Vec<(BranchName, CommitId)>,
        bundles: Vec<BundleEntry>,
    ) -> Self {
        Self {
            id,
            prev_id: LinkId::initial_snapshot(),
            branches,
            bundles,
            supplement: serde_yaml::Mapping::new(),
        }
    }

    /// Builds a link chained after `prev_id`.
    pub fn chained(
        id: LinkId,
        prev_id: LinkId,
        branches: Vec<(BranchName, CommitId)>,
        bundles: Vec<BundleEntry>,
    ) -> Self {
        Self {
            id,
            prev_id,
            branches,
            bundles,
            supplement: serde_yaml::Mapping::new(),
        }
    }

    pub fn id(&self) -> &LinkId {
        &self.id
    }

    pub fn prev_id(&self) -> &LinkId {
        &self.prev_id
    }

    pub fn is_chain_start(&self) -> bool {
        self.prev_id.is_initial_snapshot()
    }

    pub fn branches(&self) -> &[(BranchName, CommitId)] {
        &self.branches
    }

    pub fn bundles(&self) -> &[BundleEntry] {
        &self.bundles
    }

    pub fn supplement(&self) -> &serde_yaml::Mapping {
        &self.supplement
    }

    pub fn head_of(&self, branch: &BranchName) -> Option<&CommitId> {
        self.branches.iter().find(|(b, _)| b == branch).map(|(_, c)| c)
    }

    /// Serializes this link to the deterministic wire YAML described in
    /// `SPEC_FULL.md` §4.2: `[[id, prev_id], [[branch,head]...], [[bundle_id,
    /// [[branch,prereq]...]]...], supplement]`.
    pub fn to_wire_yaml(&self) -> Result<String, DomainError> {
        let wire = LinkWire::from(self);
        serde_yaml::to_string(&wire)
            .map_err(|e| DomainError::InvalidLink(format!("serialize: {e}")))
    }

    pub fn from_wire_yaml(text: &str) -> Result<Self, DomainError> {
        let wire: LinkWire = serde_yaml::from_str(text)
            .map_err(|e| DomainError::InvalidLink(format!("parse: {e}")))?;
        Link::try_from(wire)
    }
}

/// The literal positional wire tuple. Kept private: nothing outside this
/// module should ever index into a link by position.
#[derive(Debug, Serialize, Deserialize)]
struct LinkWire(
    (String, String),
    Vec<(String, String)>,
    Vec<(String, Vec<(String, String)>)>,
    #[serde(default)] serde_yaml::Mapping,
);

impl From<&Link> for LinkWire {
    fn from(link: &Link) -> Self {
        let ids = (link.id.to_string(), link.prev_id.to_string());
        let branches = link
            .branches
            .iter()
            .map(|(b, c)| (b.as_str().to_string(), c.as_str().to_string()))
            .collect();
        let bundles = link
            .bundles
            .iter()
            .map(|entry| {
                let prereqs = entry
                    .prereqs
                    .iter()
                    .map(|(b, c)| (b.as_str().to_string(), c.as_str().to_string()))
                    .collect();
                (entry.bundle_id.to_string(), prereqs)
            })
            .collect();
        LinkWire(ids, branches, bundles, link.supplement.clone())
    }
}

impl TryFrom<LinkWire> for Link {
    type Error = DomainError;

    fn try_from(wire: LinkWire) -> Result<Self, Self::Error> {
        let LinkWire((id, prev_id), branches, bundles, supplement) = wire;
        let id = LinkId::new(id)?;
        let prev_id = LinkId::new(prev_id)?;
        let branches = branches
            .into_iter()
            .map(|(b, c)| Ok((BranchName::new(b)?, CommitId::new(c)?)))
            .collect::<Result<Vec<_>, DomainError>>()?;
        let bundles = bundles
            .into_iter()
            .map(|(bundle_id, prereqs)| {
                let bundle_id = BundleId::new(bundle_id)?;
                let prereqs = prereqs
                    .into_iter()
                    .map(|(b, c)| Ok((BranchName::new(b)?, CommitId::new(c)?)))
                    .collect::<Result<Vec<_>, DomainError>>()?;
                Ok(BundleEntry::new(bundle_id, prereqs))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        Ok(Link {
            id,
            prev_id,
            branches,
            bundles,
            supplement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_initial() -> Link {
        Link::initial(
            LinkId::generate(),
            vec![(BranchName::main(), CommitId::new("abc123").unwrap())],
            vec![BundleEntry::new(
                BundleId::generate(),
                vec![(BranchName::main(), CommitId::initial_snapshot())],
            )],
        )
    }

    #[test]
    fn round_trips_through_wire_yaml() {
        let link = sample_initial();
        let yaml = link.to_wire_yaml().unwrap();
        let back = Link::from_wire_yaml(&yaml).unwrap();
        assert_eq!(link, back);
    }

    #[test]
    fn initial_link_prev_id_is_sentinel() {
        let link = sample_initial();
        assert!(link.is_chain_start());
        assert!(link.prev_id().is_initial_snapshot());
    }

    #[test]
    fn unknown_supplement_keys_round_trip_opaquely() {
        let yaml = "- - deadbeefdeadbeef\n  - initial-snapshot\n- - - main\n    - abc123\n- - - deadbeefdeadbeef\n    - - - main\n      - initial-snapshot\n- future_signature: aGVsbG8=\n";
        let link = Link::from_wire_yaml(yaml).expect("parses despite unknown supplement key");
        assert!(link.supplement().contains_key("future_signature"));
        let back = link.to_wire_yaml().unwrap();
        assert!(back.contains("future_signature"));
    }

    #[test]
    fn tolerates_a_missing_supplement_element() {
        let yaml = "- - deadbeefdeadbeef\n  - initial-snapshot\n- - - main\n    - abc123\n- - - deadbeefdeadbeef\n    - - - main\n      - initial-snapshot\n";
        let link = Link::from_wire_yaml(yaml).expect("parses a 3-element sequence with no supplement");
        assert!(link.supplement().is_empty());
    }

    #[test]
    fn bundle_entry_prereq_lookup() {
        let entry = BundleEntry::new(
            BundleId::generate(),
            vec![(BranchName::main(), CommitId::new("c1").unwrap())],
        );
        assert_eq!(entry.prereq_for(&BranchName::main()).unwrap().as_str(), "c1");
    }
}
