use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Content package ids mapped to one catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMapping {
    pub ci_id: i64,
    pub content_ids: Vec<String>,
}

/// Sorted, deduplicated union of all mapped content ids.
///
/// Ids are opaque; comparison is exact after trimming. Blank ids are dropped.
pub fn merge_content_ids<'a, I>(mappings: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ContentMapping>,
{
    mappings
        .into_iter()
        .flat_map(|m| m.content_ids.iter())
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// A content package that was downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPackage {
    pub content_id: String,
    /// Directory holding the package files.
    pub path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
}
