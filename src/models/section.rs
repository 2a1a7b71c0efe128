use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content of a section that has not been generated yet.
pub const PENDING_CONTENT: &str = "Generating...";

/// Content of a section whose generation was abandoned.
pub const FAILED_CONTENT: &str = "Error generating.";

/// One heading of a project outline and its generated body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub project_id: Uuid,
    pub heading: String,
    pub content: String,
    pub order: i64,
    pub feedback: FeedbackTag,
    pub comments: String,
    /// Derived from `content`; not stored.
    pub state: SectionState,
}

/// Lifecycle of a section's content.
///
/// - `Pending`: placeholder written at project creation
/// - `Generated`: holds real (sanitized) text
/// - `Failed`: generation was abandoned; refine is the remedy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionState {
    Pending,
    Generated,
    Failed,
}

impl SectionState {
    pub fn of(content: &str) -> Self {
        match content {
            PENDING_CONTENT => Self::Pending,
            FAILED_CONTENT => Self::Failed,
            _ => Self::Generated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generated => "generated",
            Self::Failed => "failed",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Reviewer verdict on a section. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeedbackTag {
    None,
    Approved,
    Rejected,
    Other(String),
}

impl FeedbackTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Other(tag) => tag,
        }
    }
}

impl Default for FeedbackTag {
    fn default() -> Self {
        Self::None
    }
}

impl From<String> for FeedbackTag {
    fn from(s: String) -> Self {
        match s.as_str() {
            "none" => Self::None,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Other(s),
        }
    }
}

impl From<FeedbackTag> for String {
    fn from(tag: FeedbackTag) -> Self {
        match tag {
            FeedbackTag::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// Request to rewrite one section following an instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineInput {
    pub section_id: Uuid,
    pub instruction: String,
}

/// Content of a section after a refine request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineResponse {
    pub content: String,
}

/// Reviewer feedback on a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackInput {
    pub section_id: Uuid,
    pub feedback_type: FeedbackTag,
    #[serde(default)]
    pub comment: Option<String>,
}
