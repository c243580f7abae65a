//! Type filtering, free-text search and grouping by community.
//!
//! Pure functions of the current record set and control values; nothing here
//! is persisted.

use crate::models::{AccessCodeRecord, TypeFilter};
use crate::utils::{contains_ignore_case, locale_cmp};

/// Records sharing one community name, in dataset order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityGroup<'a> {
    pub community: &'a str,
    pub items: Vec<&'a AccessCodeRecord>,
}

impl CommunityGroup<'_> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Filtered, grouped view over a record set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterResult<'a> {
    /// Groups sorted by community name
    pub groups: Vec<CommunityGroup<'a>>,
    /// Number of records retained across all groups
    pub total: usize,
}

impl FilterResult<'_> {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Summary line for the counts display
    pub fn summary(&self) -> String {
        format!("{} locations", self.total)
    }
}

/// Check whether a record matches the search query.
/// Query should already be trimmed and lowercased.
pub fn matches_query(record: &AccessCodeRecord, query: &str) -> bool {
    query.is_empty()
        || contains_ignore_case(&record.community, query)
        || contains_ignore_case(&record.address, query)
        || contains_ignore_case(&record.gate, query)
}

/// Filter by type and query, then group by community.
pub fn apply<'a>(
    records: &'a [AccessCodeRecord],
    filter: &TypeFilter,
    query: &str,
) -> FilterResult<'a> {
    let query = query.trim().to_lowercase();

    let retained: Vec<&AccessCodeRecord> = records
        .iter()
        .filter(|r| filter.matches(r) && matches_query(r, &query))
        .collect();
    let total = retained.len();

    FilterResult {
        groups: group_by_community(retained),
        total,
    }
}

/// Group records by community, keeping relative order inside each group,
/// and sort the groups by name.
pub fn group_by_community<'a>(records: Vec<&'a AccessCodeRecord>) -> Vec<CommunityGroup<'a>> {
    let mut groups: Vec<CommunityGroup<'a>> = Vec::new();

    for record in records {
        match groups.iter_mut().find(|g| g.community == record.community) {
            Some(group) => group.items.push(record),
            None => groups.push(CommunityGroup {
                community: &record.community,
                items: vec![record],
            }),
        }
    }

    // Stable sort keeps first-seen order for names that collate equal
    groups.sort_by(|a, b| locale_cmp(a.community, b.community));
    groups
}
