//! crates/lingualive_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases,
//! object storage, caches or LLM APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    BadgeDefinition, BadgeGrant, EarnedBadge, LearningPayload, NewPhoto, Photo, PhotoWithContent,
    TranslationRecord, User, UserCredentials, UserProgress, VisionAnalysis,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Methods ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Photo Management ---

    /// Persists a Photo together with all of its derived learning artifacts
    /// (vocabulary items, conversation scenario, quiz) as one atomic unit.
    /// Either the whole graph exists afterwards or none of it does.
    async fn create_photo_with_content(
        &self,
        photo: NewPhoto,
        learning: &LearningPayload,
    ) -> PortResult<Photo>;

    /// Returns one page of the user's photos, newest first, plus the total count.
    async fn list_photos(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> PortResult<(Vec<PhotoWithContent>, i64)>;

    /// Fetches a single photo with its artifacts, scoped to the owning user.
    async fn get_photo_for_user(
        &self,
        photo_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<PhotoWithContent>;

    // --- Reward Ledger ---

    /// Records an XPEvent and applies it to the user's progress row in one
    /// transaction. The progress update is an atomic in-database increment so
    /// concurrent grants never lose updates; the row is created on first grant.
    async fn grant_xp(&self, user_id: Uuid, amount: i64, reason: &str)
        -> PortResult<UserProgress>;

    async fn get_progress(&self, user_id: Uuid) -> PortResult<Option<UserProgress>>;

    // --- Badges ---

    /// Unlocks a badge for a user, lazily creating the badge definition on
    /// the first unlock anywhere. Idempotent per (user, badge); concurrent
    /// first-unlocks are resolved by the store's uniqueness constraints.
    async fn unlock_badge(
        &self,
        user_id: Uuid,
        definition: &BadgeDefinition,
    ) -> PortResult<BadgeGrant>;

    async fn list_badges_for_user(&self, user_id: Uuid) -> PortResult<Vec<EarnedBadge>>;
}

/// Key-value cache for completed translation records, keyed per
/// (user, content fingerprint).
///
/// The contract is infallible: an unreachable or misbehaving cache backend
/// must degrade to "always miss" and must never fail the surrounding request,
/// so `get` returns an `Option` and `put` returns nothing.
#[async_trait]
pub trait TranslationCacheService: Send + Sync {
    async fn get(&self, user_id: Uuid, fingerprint: &str) -> Option<TranslationRecord>;

    async fn put(
        &self,
        user_id: Uuid,
        fingerprint: &str,
        record: &TranslationRecord,
        ttl: Duration,
    );
}

#[async_trait]
pub trait ObjectStorageService: Send + Sync {
    /// Stores raw image bytes and returns the durable public URL.
    async fn store_image(&self, bytes: &[u8], content_type: &str) -> PortResult<String>;
}

#[async_trait]
pub trait VisionAnalysisService: Send + Sync {
    /// Extracts a structured scene analysis from raw image bytes.
    async fn analyze_image(&self, image: &[u8], content_type: &str)
        -> PortResult<VisionAnalysis>;
}

#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    /// Turns a scene analysis into the full learning payload.
    async fn generate_learning_content(
        &self,
        analysis: &VisionAnalysis,
    ) -> PortResult<LearningPayload>;
}
