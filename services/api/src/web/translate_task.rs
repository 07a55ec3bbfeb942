//! services/api/src/web/translate_task.rs
//!
//! This module contains the per-request "worker" function for one image
//! translation: cache lookup, upload, vision analysis, content generation,
//! persistence, reward, badge and cache write, in that order.
//!
//! A cache hit is a pure read and short-circuits everything else. On a miss
//! the steps before persistence are side-effect-free from the data store's
//! perspective (an uploaded-but-unused image is an accepted orphan), so any
//! failure there aborts cleanly with no Photo and no XP.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use lingualive_core::domain::{
    BadgeSummary, NewPhoto, PhotoMetadata, TranslationRecord, UserProgress,
};
use lingualive_core::fingerprint::fingerprint;
use lingualive_core::ports::PortError;
use lingualive_core::progression::{self, FIRST_TRANSLATION_BADGE};
use serde::Serialize;

use crate::web::state::AppState;

/// Hard cap on accepted image payloads.
pub const MAX_IMAGE_SIZE: usize = 8 * 1024 * 1024;

const XP_REASON_TRANSLATION: &str = "Image translation";

//=========================================================================================
// Inputs, Outputs, Errors
//=========================================================================================

/// One submitted image plus its optional capture metadata, as parsed from the
/// multipart form.
#[derive(Debug, Clone)]
pub struct ImageSubmission {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub taken_at: Option<DateTime<Utc>>,
}

/// Where the response payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationSource {
    Fresh,
    Cache,
}

/// The result of a completed translation request.
#[derive(Debug, Clone)]
pub struct TranslateOutcome {
    pub record: TranslationRecord,
    pub source: TranslationSource,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Invalid image type")]
    InvalidImageType,
    #[error("Image too large")]
    ImageTooLarge,
    #[error(transparent)]
    Port(#[from] PortError),
}

fn validate_submission(submission: &ImageSubmission) -> Result<(), TranslateError> {
    if !submission.content_type.starts_with("image/") {
        return Err(TranslateError::InvalidImageType);
    }
    if submission.bytes.len() > MAX_IMAGE_SIZE {
        return Err(TranslateError::ImageTooLarge);
    }
    Ok(())
}

//=========================================================================================
// The Translation Pipeline
//=========================================================================================

/// Runs one image translation to completion.
pub async fn translate_image(
    app_state: Arc<AppState>,
    user_id: Uuid,
    submission: ImageSubmission,
) -> Result<TranslateOutcome, TranslateError> {
    validate_submission(&submission)?;

    let content_fingerprint = fingerprint(&submission.bytes);

    if let Some(record) = app_state.cache.get(user_id, &content_fingerprint).await {
        info!("Serving translation for user {} from cache", user_id);
        return Ok(TranslateOutcome {
            record,
            source: TranslationSource::Cache,
        });
    }

    let image_url = app_state
        .storage
        .store_image(&submission.bytes, &submission.content_type)
        .await?;

    let vision = app_state
        .vision_adapter
        .analyze_image(&submission.bytes, &submission.content_type)
        .await?;
    let learning = app_state
        .content_adapter
        .generate_learning_content(&vision)
        .await?;

    let photo = app_state
        .db
        .create_photo_with_content(
            NewPhoto {
                user_id,
                image_url,
                taken_at: submission.taken_at,
                location_lat: submission.location_lat,
                location_lng: submission.location_lng,
                metadata: PhotoMetadata {
                    file_name: submission.file_name,
                    size: submission.bytes.len(),
                    content_type: submission.content_type,
                },
                vision: vision.clone(),
            },
            &learning,
        )
        .await?;

    let xp_awarded = app_state.config.xp_per_translation;
    let progress = grant_xp_with_retry(&app_state, user_id, xp_awarded).await?;

    // The translation itself already succeeded; a badge problem is logged
    // and the response simply carries no badge.
    let badge = match app_state
        .db
        .unlock_badge(user_id, &FIRST_TRANSLATION_BADGE)
        .await
    {
        Ok(grant) if grant.newly_earned => Some(BadgeSummary {
            key: grant.badge.key,
            name: grant.badge.name,
        }),
        Ok(_) => None,
        Err(e) => {
            warn!("Badge unlock failed after successful translation: {:?}", e);
            None
        }
    };

    let record = TranslationRecord {
        photo_id: photo.id,
        image_url: photo.image_url.clone(),
        vision_analysis: photo.vision.clone(),
        learning,
        xp_awarded,
        progress: progression::summarize(&progress, app_state.config.level_xp_threshold),
        badge,
    };

    // The cache port degrades internally; a failed write just means the next
    // identical submission recomputes.
    app_state
        .cache
        .put(user_id, &content_fingerprint, &record, app_state.config.cache_ttl)
        .await;

    Ok(TranslateOutcome {
        record,
        source: TranslationSource::Fresh,
    })
}

/// Grants XP, retrying once. At this point the Photo is already persisted, so
/// giving up means a translation the ledger never saw; after the retry the
/// request fails loudly rather than responding with stale progress.
async fn grant_xp_with_retry(
    app_state: &AppState,
    user_id: Uuid,
    amount: i64,
) -> Result<UserProgress, PortError> {
    match app_state
        .db
        .grant_xp(user_id, amount, XP_REASON_TRANSLATION)
        .await
    {
        Ok(progress) => Ok(progress),
        Err(first) => {
            warn!("XP grant failed, retrying once: {:?}", first);
            app_state
                .db
                .grant_xp(user_id, amount, XP_REASON_TRANSLATION)
                .await
        }
    }
}

//=========================================================================================
// Tests (pipeline exercised against in-memory port implementations)
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use lingualive_core::domain::{
        Badge, BadgeDefinition, BadgeGrant, DetectedItem, EarnedBadge, LearningPayload, Phrase,
        Photo, PhotoWithContent, QuizQuestion, QuizQuestionKind, QuizSpec, ScenarioSpec,
        TranslationEntry, User, UserCredentials, VisionAnalysis, VocabularyEntry,
    };
    use lingualive_core::fingerprint::cache_key;
    use lingualive_core::ports::{
        ContentGenerationService, DatabaseService, ObjectStorageService, PortResult,
        TranslationCacheService, VisionAnalysisService,
    };
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration as StdDuration;
    use tracing::Level;

    //-------------------------------------------------------------------------------------
    // In-memory port implementations
    //-------------------------------------------------------------------------------------

    #[derive(Default)]
    struct MemoryDb {
        photos: Mutex<Vec<Photo>>,
        progress: Mutex<HashMap<Uuid, UserProgress>>,
        events: Mutex<Vec<(Uuid, i64)>>,
        user_badges: Mutex<HashSet<(Uuid, String)>>,
        fail_persist: bool,
        fail_badges: bool,
        /// Number of grant_xp calls that fail before calls start succeeding.
        grant_failures: AtomicUsize,
    }

    #[async_trait]
    impl DatabaseService for MemoryDb {
        async fn create_user_with_email(&self, _: &str, _: &str) -> PortResult<User> {
            Err(PortError::Unexpected("not exercised".into()))
        }
        async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
            Err(PortError::NotFound(email.to_string()))
        }
        async fn create_auth_session(
            &self,
            _: &str,
            _: Uuid,
            _: DateTime<Utc>,
        ) -> PortResult<()> {
            Ok(())
        }
        async fn validate_auth_session(&self, _: &str) -> PortResult<Uuid> {
            Err(PortError::Unauthorized)
        }
        async fn delete_auth_session(&self, _: &str) -> PortResult<()> {
            Ok(())
        }

        async fn create_photo_with_content(
            &self,
            photo: NewPhoto,
            _learning: &LearningPayload,
        ) -> PortResult<Photo> {
            if self.fail_persist {
                return Err(PortError::Unexpected("persistence down".into()));
            }
            let stored = Photo {
                id: Uuid::new_v4(),
                user_id: photo.user_id,
                image_url: photo.image_url,
                taken_at: photo.taken_at,
                location_lat: photo.location_lat,
                location_lng: photo.location_lng,
                metadata: photo.metadata,
                vision: photo.vision,
                created_at: Utc::now(),
            };
            self.photos.lock().unwrap().push(stored.clone());
            Ok(stored)
        }

        async fn list_photos(
            &self,
            _: Uuid,
            _: i64,
            _: i64,
        ) -> PortResult<(Vec<PhotoWithContent>, i64)> {
            Ok((Vec::new(), 0))
        }
        async fn get_photo_for_user(&self, photo_id: Uuid, _: Uuid) -> PortResult<PhotoWithContent> {
            Err(PortError::NotFound(photo_id.to_string()))
        }

        async fn grant_xp(
            &self,
            user_id: Uuid,
            amount: i64,
            _reason: &str,
        ) -> PortResult<UserProgress> {
            if self
                .grant_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(PortError::Unexpected("ledger briefly down".into()));
            }
            let now = Utc::now();
            let mut progress = self.progress.lock().unwrap();
            let entry = progress
                .entry(user_id)
                .and_modify(|p| {
                    p.xp += amount;
                    p.streak = progression::next_streak(p.streak, p.last_active_at, now);
                    p.last_active_at = now;
                })
                .or_insert(UserProgress {
                    user_id,
                    xp: amount,
                    streak: 1,
                    last_active_at: now,
                });
            self.events.lock().unwrap().push((user_id, amount));
            Ok(entry.clone())
        }

        async fn get_progress(&self, user_id: Uuid) -> PortResult<Option<UserProgress>> {
            Ok(self.progress.lock().unwrap().get(&user_id).cloned())
        }

        async fn unlock_badge(
            &self,
            user_id: Uuid,
            definition: &BadgeDefinition,
        ) -> PortResult<BadgeGrant> {
            if self.fail_badges {
                return Err(PortError::Unexpected("badges down".into()));
            }
            let newly_earned = self
                .user_badges
                .lock()
                .unwrap()
                .insert((user_id, definition.key.to_string()));
            Ok(BadgeGrant {
                newly_earned,
                badge: Badge {
                    id: Uuid::new_v4(),
                    key: definition.key.to_string(),
                    name: definition.name.to_string(),
                    description: definition.description.to_string(),
                },
            })
        }

        async fn list_badges_for_user(&self, _: Uuid) -> PortResult<Vec<EarnedBadge>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<HashMap<String, TranslationRecord>>,
    }

    #[async_trait]
    impl TranslationCacheService for MemoryCache {
        async fn get(&self, user_id: Uuid, fingerprint: &str) -> Option<TranslationRecord> {
            self.entries
                .lock()
                .unwrap()
                .get(&cache_key(user_id, fingerprint))
                .cloned()
        }
        async fn put(
            &self,
            user_id: Uuid,
            fingerprint: &str,
            record: &TranslationRecord,
            _ttl: StdDuration,
        ) {
            self.entries
                .lock()
                .unwrap()
                .insert(cache_key(user_id, fingerprint), record.clone());
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        uploads: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStorageService for MemoryStorage {
        async fn store_image(&self, _: &[u8], _: &str) -> PortResult<String> {
            let n = self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://storage.test/lingualive/{}", n))
        }
    }

    #[derive(Default)]
    struct StubVision {
        fail: bool,
    }

    #[async_trait]
    impl VisionAnalysisService for StubVision {
        async fn analyze_image(&self, _: &[u8], _: &str) -> PortResult<VisionAnalysis> {
            if self.fail {
                return Err(PortError::Unexpected("vision model unavailable".into()));
            }
            Ok(VisionAnalysis {
                detected_language: "French".into(),
                document_type: "menu".into(),
                items: vec![DetectedItem {
                    raw_text: "Soupe du jour".into(),
                    category: Some("dish".into()),
                }],
                scene_summary: "A chalkboard menu outside a café.".into(),
            })
        }
    }

    #[derive(Default)]
    struct StubContent {
        fail: bool,
    }

    #[async_trait]
    impl ContentGenerationService for StubContent {
        async fn generate_learning_content(
            &self,
            _: &VisionAnalysis,
        ) -> PortResult<LearningPayload> {
            if self.fail {
                return Err(PortError::Unexpected("content model unavailable".into()));
            }
            Ok(LearningPayload {
                translations: vec![TranslationEntry {
                    original: "Soupe du jour".into(),
                    translation: "Soup of the day".into(),
                    pronunciation: Some("soop doo zhoor".into()),
                    notes: None,
                }],
                cultural_notes: vec!["Daily specials are often chalked outside.".into()],
                useful_phrases: vec![Phrase {
                    phrase: "Je voudrais la soupe.".into(),
                    meaning: "I would like the soup.".into(),
                }],
                vocabulary_deck: vec![VocabularyEntry {
                    term: "soupe".into(),
                    translation: "soup".into(),
                    pronunciation: Some("soop".into()),
                    part_of_speech: Some("noun".into()),
                }],
                conversation_scenario: ScenarioSpec {
                    title: "Ordering lunch".into(),
                    prompt: "You are at a café counter.".into(),
                    phrases: vec![],
                },
                quiz: QuizSpec {
                    title: "Menu words".into(),
                    questions: vec![QuizQuestion {
                        kind: QuizQuestionKind::MultipleChoice,
                        prompt: "What does 'soupe' mean?".into(),
                        options: vec!["soup".into(), "salad".into()],
                        answer: "soup".into(),
                    }],
                },
            })
        }
    }

    //-------------------------------------------------------------------------------------
    // Harness
    //-------------------------------------------------------------------------------------

    struct Harness {
        state: Arc<AppState>,
        db: Arc<MemoryDb>,
        cache: Arc<MemoryCache>,
        storage: Arc<MemoryStorage>,
    }

    fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: "postgres://unused".into(),
            log_level: Level::INFO,
            redis_url: None,
            openai_api_key: None,
            vision_model: "test-vision".into(),
            content_model: "test-content".into(),
            storage_base_url: "https://storage.test".into(),
            storage_api_key: None,
            cache_ttl: StdDuration::from_secs(3600),
            xp_per_translation: 50,
            level_xp_threshold: 1000,
        }
    }

    fn harness_with(db: MemoryDb, vision: StubVision, content: StubContent) -> Harness {
        let db = Arc::new(db);
        let cache = Arc::new(MemoryCache::default());
        let storage = Arc::new(MemoryStorage::default());
        let state = Arc::new(AppState {
            db: db.clone(),
            cache: cache.clone(),
            storage: storage.clone(),
            vision_adapter: Arc::new(vision),
            content_adapter: Arc::new(content),
            config: Arc::new(test_config()),
        });
        Harness {
            state,
            db,
            cache,
            storage,
        }
    }

    fn harness() -> Harness {
        harness_with(
            MemoryDb::default(),
            StubVision::default(),
            StubContent::default(),
        )
    }

    fn submission(bytes: &[u8]) -> ImageSubmission {
        ImageSubmission {
            file_name: "menu.jpg".into(),
            content_type: "image/jpeg".into(),
            bytes: Bytes::copy_from_slice(bytes),
            location_lat: None,
            location_lng: None,
            taken_at: None,
        }
    }

    //-------------------------------------------------------------------------------------
    // Tests
    //-------------------------------------------------------------------------------------

    #[tokio::test]
    async fn first_submission_runs_full_pipeline() {
        let h = harness();
        let user = Uuid::new_v4();

        let outcome = translate_image(h.state.clone(), user, submission(b"menu photo"))
            .await
            .unwrap();

        assert_eq!(outcome.source, TranslationSource::Fresh);
        assert_eq!(outcome.record.xp_awarded, 50);
        assert_eq!(outcome.record.progress.xp, 50);
        assert_eq!(outcome.record.progress.level, 1);
        assert_eq!(outcome.record.progress.streak, 1);
        assert_eq!(
            outcome.record.badge.as_ref().map(|b| b.key.as_str()),
            Some("first-translation")
        );
        assert_eq!(h.db.photos.lock().unwrap().len(), 1);
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(h.cache.entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resubmission_hits_cache_with_no_side_effects() {
        let h = harness();
        let user = Uuid::new_v4();

        translate_image(h.state.clone(), user, submission(b"same bytes"))
            .await
            .unwrap();
        let second = translate_image(h.state.clone(), user, submission(b"same bytes"))
            .await
            .unwrap();

        assert_eq!(second.source, TranslationSource::Cache);
        // No new photo, upload or ledger entry for the cached response.
        assert_eq!(h.db.photos.lock().unwrap().len(), 1);
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(h.db.events.lock().unwrap().len(), 1);
        assert_eq!(h.db.progress.lock().unwrap().get(&user).unwrap().xp, 50);
    }

    #[tokio::test]
    async fn identical_bytes_from_two_users_are_independent() {
        let h = harness();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let first = translate_image(h.state.clone(), alice, submission(b"shared scene"))
            .await
            .unwrap();
        let second = translate_image(h.state.clone(), bob, submission(b"shared scene"))
            .await
            .unwrap();

        // Bob must not be served Alice's cached payload.
        assert_eq!(first.source, TranslationSource::Fresh);
        assert_eq!(second.source, TranslationSource::Fresh);
        assert_eq!(h.db.photos.lock().unwrap().len(), 2);
        assert_eq!(h.db.progress.lock().unwrap().get(&bob).unwrap().xp, 50);
    }

    #[tokio::test]
    async fn badge_is_awarded_exactly_once() {
        let h = harness();
        let user = Uuid::new_v4();

        let first = translate_image(h.state.clone(), user, submission(b"photo one"))
            .await
            .unwrap();
        let second = translate_image(h.state.clone(), user, submission(b"photo two"))
            .await
            .unwrap();

        assert!(first.record.badge.is_some());
        assert!(second.record.badge.is_none());
        assert_eq!(h.db.user_badges.lock().unwrap().len(), 1);
        assert_eq!(h.db.progress.lock().unwrap().get(&user).unwrap().xp, 100);
    }

    #[tokio::test]
    async fn concurrent_submissions_lose_no_grants() {
        let h = harness();
        let user = Uuid::new_v4();

        let mut tasks = Vec::new();
        for i in 0..8 {
            let state = h.state.clone();
            tasks.push(tokio::spawn(async move {
                translate_image(state, user, submission(format!("scene {}", i).as_bytes())).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(h.db.progress.lock().unwrap().get(&user).unwrap().xp, 8 * 50);
        assert_eq!(h.db.events.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn non_image_payload_is_rejected_without_side_effects() {
        let h = harness();
        let mut bad = submission(b"plain text");
        bad.content_type = "text/plain".into();

        let err = translate_image(h.state.clone(), Uuid::new_v4(), bad)
            .await
            .unwrap_err();

        assert!(matches!(err, TranslateError::InvalidImageType));
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 0);
        assert!(h.db.photos.lock().unwrap().is_empty());
        assert!(h.db.events.lock().unwrap().is_empty());
        assert!(h.cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_without_side_effects() {
        let h = harness();
        let big = submission(&vec![0u8; MAX_IMAGE_SIZE + 1]);

        let err = translate_image(h.state.clone(), Uuid::new_v4(), big)
            .await
            .unwrap_err();

        assert!(matches!(err, TranslateError::ImageTooLarge));
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 0);
        assert!(h.db.photos.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_aborts_before_any_persistence_or_reward() {
        let h = harness_with(
            MemoryDb::default(),
            StubVision { fail: true },
            StubContent::default(),
        );

        let err = translate_image(h.state.clone(), Uuid::new_v4(), submission(b"scene"))
            .await
            .unwrap_err();

        assert!(matches!(err, TranslateError::Port(_)));
        // The upload may be orphaned, but no Photo, XP or cache entry exists.
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 1);
        assert!(h.db.photos.lock().unwrap().is_empty());
        assert!(h.db.events.lock().unwrap().is_empty());
        assert!(h.cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_grants_no_xp() {
        let h = harness_with(
            MemoryDb {
                fail_persist: true,
                ..MemoryDb::default()
            },
            StubVision::default(),
            StubContent::default(),
        );

        let err = translate_image(h.state.clone(), Uuid::new_v4(), submission(b"scene"))
            .await
            .unwrap_err();

        assert!(matches!(err, TranslateError::Port(_)));
        assert!(h.db.events.lock().unwrap().is_empty());
        assert!(h.cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn badge_failure_is_not_fatal() {
        let h = harness_with(
            MemoryDb {
                fail_badges: true,
                ..MemoryDb::default()
            },
            StubVision::default(),
            StubContent::default(),
        );
        let user = Uuid::new_v4();

        let outcome = translate_image(h.state.clone(), user, submission(b"scene"))
            .await
            .unwrap();

        assert!(outcome.record.badge.is_none());
        assert_eq!(h.db.progress.lock().unwrap().get(&user).unwrap().xp, 50);
    }

    #[tokio::test]
    async fn transient_grant_failure_is_retried_once() {
        let h = harness_with(
            MemoryDb {
                grant_failures: AtomicUsize::new(1),
                ..MemoryDb::default()
            },
            StubVision::default(),
            StubContent::default(),
        );
        let user = Uuid::new_v4();

        let outcome = translate_image(h.state.clone(), user, submission(b"scene"))
            .await
            .unwrap();

        assert_eq!(outcome.record.progress.xp, 50);
        assert_eq!(h.db.events.lock().unwrap().len(), 1);
    }
}
