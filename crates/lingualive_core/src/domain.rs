//! crates/lingualive_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or web framework. Most carry
//! serde derives because translation records are cached and returned to
//! clients as JSON (camelCase, matching the consumed API surface).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Users and Authentication
//=========================================================================================

/// Represents a user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Vision Analysis (output of the vision adapter)
//=========================================================================================

/// A single piece of text the vision model detected in the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedItem {
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Structured scene analysis produced from one submitted image.
/// Stored verbatim on the Photo row and echoed back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionAnalysis {
    pub detected_language: String,
    pub document_type: String,
    pub items: Vec<DetectedItem>,
    pub scene_summary: String,
}

//=========================================================================================
// Learning Payload (output of the content generation adapter)
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationEntry {
    pub original: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A short phrase with its meaning, used both in the useful-phrases list and
/// inside conversation scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phrase {
    pub phrase: String,
    pub meaning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub term: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSpec {
    pub title: String,
    pub prompt: String,
    pub phrases: Vec<Phrase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizQuestionKind {
    Match,
    MultipleChoice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    #[serde(rename = "type")]
    pub kind: QuizQuestionKind,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSpec {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

/// The full bundle of learning content generated from one vision analysis.
/// Created atomically alongside its Photo; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPayload {
    pub translations: Vec<TranslationEntry>,
    pub cultural_notes: Vec<String>,
    pub useful_phrases: Vec<Phrase>,
    pub vocabulary_deck: Vec<VocabularyEntry>,
    pub conversation_scenario: ScenarioSpec,
    pub quiz: QuizSpec,
}

//=========================================================================================
// Photos and Derived Artifacts
//=========================================================================================

/// File-level facts about the submitted image, stored as JSON on the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    pub file_name: String,
    pub size: usize,
    pub content_type: String,
}

/// One user-submitted image. Created once per accepted submission and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_lng: Option<f64>,
    pub metadata: PhotoMetadata,
    pub vision: VisionAnalysis,
    pub created_at: DateTime<Utc>,
}

/// The fields needed to persist a new Photo. The id and creation timestamp
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub user_id: Uuid,
    pub image_url: String,
    pub taken_at: Option<DateTime<Utc>>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub metadata: PhotoMetadata,
    pub vision: VisionAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: Uuid,
    pub photo_id: Uuid,
    pub term: String,
    pub translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationScenario {
    pub id: Uuid,
    pub photo_id: Uuid,
    pub title: String,
    pub prompt: String,
    pub phrases: Vec<Phrase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: Uuid,
    pub photo_id: Uuid,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

/// A Photo together with all of its derived learning artifacts, as served by
/// the photo library endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoWithContent {
    #[serde(flatten)]
    pub photo: Photo,
    pub vocabulary: Vec<VocabularyItem>,
    pub scenario: Option<ConversationScenario>,
    pub quiz: Option<Quiz>,
}

//=========================================================================================
// Progression: XP, Streaks, Badges
//=========================================================================================

/// One row per user: the running totals maintained by the reward ledger.
/// Invariant: `xp` always equals the sum of the user's XPEvent amounts.
/// Level is not stored; it is derived from xp on read.
#[derive(Debug, Clone)]
pub struct UserProgress {
    pub user_id: Uuid,
    pub xp: i64,
    pub streak: i32,
    pub last_active_at: DateTime<Utc>,
}

/// Append-only record of one XP grant; the source of truth for XP.
#[derive(Debug, Clone)]
pub struct XPEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// The client-facing progress view with the level derived from xp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub xp: i64,
    pub level: i64,
    pub streak: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_at: Option<DateTime<Utc>>,
}

/// A named achievement definition, globally unique by key.
#[derive(Debug, Clone)]
pub struct Badge {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub description: String,
}

/// The static definition used to lazily create a Badge row on first unlock.
#[derive(Debug, Clone, Copy)]
pub struct BadgeDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Result of a badge unlock attempt. `newly_earned` is false when the user
/// already held the badge; no write happens in that case.
#[derive(Debug, Clone)]
pub struct BadgeGrant {
    pub newly_earned: bool,
    pub badge: Badge,
}

/// A badge a user has earned, with the time it was earned.
#[derive(Debug, Clone)]
pub struct EarnedBadge {
    pub badge: Badge,
    pub earned_at: DateTime<Utc>,
}

/// The key/name pair echoed to the client when a badge is newly earned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeSummary {
    pub key: String,
    pub name: String,
}

//=========================================================================================
// Translation Records (what the orchestrator produces and the cache stores)
//=========================================================================================

/// The complete result of one successful image translation. This is exactly
/// the payload written to the cache, so a hit can be served verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    pub photo_id: Uuid,
    pub image_url: String,
    pub vision_analysis: VisionAnalysis,
    pub learning: LearningPayload,
    pub xp_awarded: i64,
    pub progress: ProgressSummary,
    pub badge: Option<BadgeSummary>,
}
