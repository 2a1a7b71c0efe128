//! Rendering of projects into downloadable Office files.
//!
//! Reports become `.docx` documents, slide decks become `.pptx`
//! presentations. Both are Office Open XML packages: a zip archive of XML
//! parts. Export renders whatever the sections currently hold, including
//! placeholder and error sentinels.

mod docx;
mod package;
mod pptx;
mod xml;

use anyhow::Result;

use crate::models::{DocType, ProjectWithSections};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Subtitle of the first slide of every deck.
pub const DECK_SUBTITLE: &str = "Generated by AI Platform";

/// Longest slide body, in characters.
pub const SLIDE_BODY_LIMIT: usize = 1000;

/// A rendered file ready to be sent to the client.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Render a project. Sections are expected in `order`.
pub fn render(project: &ProjectWithSections) -> Result<ExportFile> {
    let title = &project.project.title;
    match project.project.doc_type {
        DocType::Report => Ok(ExportFile {
            filename: format!("{title}.docx"),
            content_type: DOCX_MIME,
            bytes: docx::render(title, &project.sections)?,
        }),
        DocType::Slides => Ok(ExportFile {
            filename: format!("{title}.pptx"),
            content_type: PPTX_MIME,
            bytes: pptx::render(title, &project.sections)?,
        }),
    }
}

/// Cut `text` to at most `limit` characters.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
