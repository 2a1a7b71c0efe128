use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::section::Section;

/// A document generation project.
///
/// Projects own an ordered list of [`Section`]s whose `order` values form a
/// contiguous 0-based sequence fixed at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub doc_type: DocType,
    /// Free-text instructions passed to every generation prompt. May be empty.
    pub context: String,
    pub created_at: DateTime<Utc>,
}

/// The kind of artifact a project produces.
///
/// `docx` and `pptx` are accepted on input for older clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    #[serde(alias = "docx")]
    Report,
    #[serde(alias = "pptx")]
    Slides,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Slides => "slides",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "report" | "docx" => Some(Self::Report),
            "slides" | "pptx" => Some(Self::Slides),
            _ => None,
        }
    }

    /// How a single section is described to the generator.
    pub fn section_framing(&self) -> &'static str {
        match self {
            Self::Report => "detailed document section",
            Self::Slides => "presentation slide bullet points",
        }
    }
}

/// Input for creating a project together with its outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub title: String,
    pub doc_type: DocType,
    #[serde(default)]
    pub context: String,
    pub outline: Vec<String>,
}

/// Response to a successful project creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCreated {
    pub id: Uuid,
    pub message: String,
}

/// A project with its sections sorted by `order`, used for detailed responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithSections {
    #[serde(flatten)]
    pub project: Project,
    pub sections: Vec<Section>,
}

/// Query parameters for outline suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineQuery {
    pub topic: String,
    /// Kept as free text: an unknown type still gets an outline.
    pub doc_type: String,
    #[serde(default)]
    pub context: String,
}

/// A suggested outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineResponse {
    pub outline: Vec<String>,
}
