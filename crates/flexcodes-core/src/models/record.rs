use serde::{Deserialize, Serialize};

/// Community used when a row leaves the column empty.
pub const DEFAULT_COMMUNITY: &str = "Unspecified";

/// Type used when a row leaves the column empty.
pub const DEFAULT_TYPE: &str = "Apartments";

/// Label shown in place of an empty gate code.
pub const NO_CODE: &str = "No Code";

/// Label of the wildcard filter.
const ALL_LABEL: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCodeRecord {
    pub community: String,
    pub address: String,
    pub gate: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AccessCodeRecord {
    pub fn new(
        community: impl Into<String>,
        address: impl Into<String>,
        gate: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            community: community.into(),
            address: address.into(),
            gate: gate.into(),
            kind: kind.into(),
        }
    }

    /// Gate code for display, "No Code" when empty
    pub fn gate_label(&self) -> &str {
        if self.gate.is_empty() {
            NO_CODE
        } else {
            &self.gate
        }
    }

    pub fn has_gate(&self) -> bool {
        !self.gate.is_empty()
    }
}

/// Type filter applied before search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeFilter {
    /// Wildcard: every type passes
    All,
    /// Only records whose type equals this label exactly
    Only(String),
}

impl TypeFilter {
    /// Parse a filter button label. "All" (any casing) is the wildcard.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case(ALL_LABEL) {
            TypeFilter::All
        } else {
            TypeFilter::Only(label.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TypeFilter::All => ALL_LABEL,
            TypeFilter::Only(kind) => kind,
        }
    }

    pub fn matches(&self, record: &AccessCodeRecord) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(kind) => record.kind == *kind,
        }
    }
}

impl Default for TypeFilter {
    fn default() -> Self {
        TypeFilter::Only(DEFAULT_TYPE.to_string())
    }
}

impl std::fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
