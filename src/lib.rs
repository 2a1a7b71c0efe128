//! Backend for AI-assisted report and slide deck authoring.
//!
//! Users register, sketch an outline (optionally suggested by the
//! generator), and create a project. Section content is then generated in
//! the background one section at a time, can be refined or annotated
//! afterwards, and the finished project exports to `.docx` or `.pptx`.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod export;
pub mod generation;
pub mod models;
pub mod pipeline;
pub mod refine;
pub mod state;
