//! Server configuration loaded from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `DOCGEN_DATABASE_PATH` | platform data dir, `docgen.db` |
//! | `DOCGEN_SECRET_KEY` | none (required to serve) |
//! | `DOCGEN_JWT_ALGORITHM` | `HS256` |
//! | `DOCGEN_TOKEN_TTL_MINUTES` | `30` |
//! | `DOCGEN_CORS_ORIGINS` | permissive (comma-separated list) |
//! | `DOCGEN_ACCESS_POLICY` | `owner` |
//! | `DOCGEN_PIPELINE_WORKERS` | `4` |
//! | `DOCGEN_QUEUE_CAPACITY` | `256` waiting jobs |
//! | `GEMINI_API_KEY` | none (generation fails, outlines fall back) |
//! | `GEMINI_MODEL` | `gemini-flash-latest` |
//! | `GEMINI_BASE_URL` | Google's public v1beta endpoint |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use uuid::Uuid;

use crate::generation::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::pipeline::DEFAULT_QUEUE_CAPACITY;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_PIPELINE_WORKERS: usize = 4;

/// Who may refine, annotate, or export a project.
///
/// Listing and reading projects is always restricted to the owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Only the project owner.
    #[default]
    Owner,
    /// Any authenticated user who knows the id.
    Open,
}

impl AccessPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "open" => Some(Self::Open),
            _ => None,
        }
    }

    pub fn permits(&self, owner: Uuid, caller: Uuid) -> bool {
        match self {
            Self::Owner => owner == caller,
            Self::Open => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub secret_key: Option<String>,
    pub jwt_algorithm: Algorithm,
    pub token_ttl: Duration,
    pub cors_origins: Option<Vec<String>>,
    pub access_policy: AccessPolicy,
    pub pipeline_workers: usize,
    pub queue_capacity: usize,
    pub gemini: GeminiConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let jwt_algorithm = env("DOCGEN_JWT_ALGORITHM")
            .and_then(|s| match Algorithm::from_str(s.trim()) {
                Ok(alg) => Some(alg),
                Err(_) => {
                    tracing::warn!("Unknown DOCGEN_JWT_ALGORITHM '{}', using HS256", s);
                    None
                }
            })
            .unwrap_or(Algorithm::HS256);

        let token_ttl = env("DOCGEN_TOKEN_TTL_MINUTES")
            .and_then(|s| s.parse::<u64>().ok())
            .map(ttl_from_minutes)
            .unwrap_or(DEFAULT_TOKEN_TTL);

        let cors_origins = env("DOCGEN_CORS_ORIGINS")
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect());

        let access_policy = env("DOCGEN_ACCESS_POLICY")
            .and_then(|s| AccessPolicy::from_str(&s))
            .unwrap_or_default();

        let pipeline_workers = env("DOCGEN_PIPELINE_WORKERS")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PIPELINE_WORKERS);

        let queue_capacity = env("DOCGEN_QUEUE_CAPACITY")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);

        let api_key = env("GEMINI_API_KEY");
        if api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; content generation will fail");
        }

        Self {
            database_path: env("DOCGEN_DATABASE_PATH").map(PathBuf::from),
            secret_key: env("DOCGEN_SECRET_KEY"),
            jwt_algorithm,
            token_ttl,
            cors_origins,
            access_policy,
            pipeline_workers,
            queue_capacity,
            gemini: GeminiConfig {
                api_key,
                model: env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: env("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            },
        }
    }
}

fn ttl_from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_minutes_convert_to_seconds() {
        assert_eq!(ttl_from_minutes(30), DEFAULT_TOKEN_TTL);
        assert_eq!(ttl_from_minutes(0), Duration::ZERO);
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        assert_eq!(ttl_from_minutes(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn access_policy_parses_case_insensitively() {
        assert_eq!(AccessPolicy::from_str("Owner"), Some(AccessPolicy::Owner));
        assert_eq!(AccessPolicy::from_str(" open "), Some(AccessPolicy::Open));
        assert_eq!(AccessPolicy::from_str("shared"), None);
    }

    #[test]
    fn owner_policy_requires_matching_ids() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(AccessPolicy::Owner.permits(owner, owner));
        assert!(!AccessPolicy::Owner.permits(owner, other));
        assert!(AccessPolicy::Open.permits(owner, other));
    }
}
