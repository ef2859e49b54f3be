//! Protocol parameters the codec depends on.

use serde::{Deserialize, Serialize};

/// Era of operation tag assignments.
///
/// - `V0`: before Babylon, manager operations use tags 7..=10
/// - `V1`: Babylon through Nairobi, manager operations use tags 107..=110
/// - `V2`: Oxford onwards, reveal carries a trailing proof presence byte
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TagsVersion {
    V0,
    V1,
    #[default]
    V2,
}

const V0_PROTOCOLS: &[&str] = &["PtCJ7pwo", "PsYLVpVv", "PsddFKi3", "Pt24m4xi"];

const V1_PROTOCOLS: &[&str] = &[
    "PsBabyM1", "PsCARTHA", "PsDELPH1", "PtEdo2Zk", "PsFLoren", "PtGRANAD", "PtHangz2",
    "Psithaca", "PtJakart", "PtKathma", "PtLimaPt", "PtMumbai", "PtNairob",
];

impl TagsVersion {
    pub const LATEST: TagsVersion = TagsVersion::V2;

    /// Map a protocol hash to its tag era. Unknown protocols are assumed to be
    /// newer than anything listed here.
    pub fn for_protocol(protocol_hash: &str) -> Self {
        let matches = |known: &[&str]| known.iter().any(|p| protocol_hash.starts_with(p));
        if matches(V0_PROTOCOLS) {
            Self::V0
        } else if matches(V1_PROTOCOLS) {
            Self::V1
        } else {
            Self::LATEST
        }
    }
}

/// Everything about the active protocol the encoder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtocolParams {
    pub tags_version: TagsVersion,
}

impl ProtocolParams {
    pub fn new(tags_version: TagsVersion) -> Self {
        Self { tags_version }
    }

    pub fn for_protocol(protocol_hash: &str) -> Self {
        Self::new(TagsVersion::for_protocol(protocol_hash))
    }
}
