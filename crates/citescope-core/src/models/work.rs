use serde::{Deserialize, Serialize};

pub const NO_TITLE: &str = "No title available";
pub const NO_ABSTRACT: &str = "No abstract available";
pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const UNKNOWN_TOPIC: &str = "Unknown topic";
pub const UNKNOWN_SUBFIELD: &str = "Unknown subfield";
pub const UNKNOWN_FIELD: &str = "Unknown field";
pub const UNKNOWN_DOMAIN: &str = "Unknown domain";

// ─── WorkRecord ─────────────────────────────────────────────

/// Canonical representation of one scholarly work as fetched from the
/// metadata provider. Missing upstream values are replaced by the sentinels
/// above, never by empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: String,

    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Author display names in authorship order. May be empty.
    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,

    #[serde(default)]
    pub cited_by_count: u32,

    #[serde(flatten)]
    pub topics: TopicHierarchy,

    #[serde(default, rename = "referenced_works")]
    pub referenced_work_ids: Vec<String>,
}

impl WorkRecord {
    /// Create a record with every optional attribute at its sentinel default.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: NO_TITLE.to_string(),
            abstract_text: NO_ABSTRACT.to_string(),
            authors: Vec::new(),
            publication_year: None,
            cited_by_count: 0,
            topics: TopicHierarchy::default(),
            referenced_work_ids: Vec::new(),
        }
    }

    pub fn has_abstract(&self) -> bool {
        !self.abstract_text.is_empty() && self.abstract_text != NO_ABSTRACT
    }

    pub fn has_title(&self) -> bool {
        !self.title.is_empty() && self.title != NO_TITLE
    }

    /// Title followed by abstract, leaving out sentinel values so that
    /// placeholder wording never shows up as shared vocabulary.
    pub fn text(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if self.has_title() {
            parts.push(self.title.as_str());
        }
        if self.has_abstract() {
            parts.push(self.abstract_text.as_str());
        }
        parts.join(" ")
    }
}

/// Four-level topic classification. Each level defaults independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicHierarchy {
    #[serde(default = "default_topic")]
    pub primary_topic: String,

    #[serde(default = "default_subfield")]
    pub subfield_topic: String,

    #[serde(default = "default_field")]
    pub field_topic: String,

    #[serde(default = "default_domain")]
    pub domain_topic: String,
}

impl Default for TopicHierarchy {
    fn default() -> Self {
        Self {
            primary_topic: default_topic(),
            subfield_topic: default_subfield(),
            field_topic: default_field(),
            domain_topic: default_domain(),
        }
    }
}

fn default_topic() -> String {
    UNKNOWN_TOPIC.to_string()
}

fn default_subfield() -> String {
    UNKNOWN_SUBFIELD.to_string()
}

fn default_field() -> String {
    UNKNOWN_FIELD.to_string()
}

fn default_domain() -> String {
    UNKNOWN_DOMAIN.to_string()
}

// ─── ErrorResult / FetchOutcome ─────────────────────────────

/// A failed lookup. Replaces a `WorkRecord` wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub identifier: String,

    #[serde(rename = "error")]
    pub error_message: String,
}

impl ErrorResult {
    pub fn new(identifier: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            error_message: error_message.into(),
        }
    }
}

/// Result of fetching one identifier: either a complete record or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FetchOutcome {
    Work(WorkRecord),
    Error(ErrorResult),
}

impl FetchOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Work(_))
    }

    pub fn as_work(&self) -> Option<&WorkRecord> {
        match self {
            Self::Work(work) => Some(work),
            Self::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorResult> {
        match self {
            Self::Work(_) => None,
            Self::Error(err) => Some(err),
        }
    }
}

impl From<WorkRecord> for FetchOutcome {
    fn from(work: WorkRecord) -> Self {
        Self::Work(work)
    }
}

impl From<ErrorResult> for FetchOutcome {
    fn from(err: ErrorResult) -> Self {
        Self::Error(err)
    }
}
