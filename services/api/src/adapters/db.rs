//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! The progression invariants live in the SQL here: the XP grant is an atomic
//! in-database increment performed in the same transaction as the ledger
//! insert, and badge uniqueness is enforced by the store's constraints rather
//! than check-then-insert logic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use lingualive_core::domain::{
    Badge, BadgeDefinition, BadgeGrant, ConversationScenario, EarnedBadge, LearningPayload,
    NewPhoto, Photo, PhotoMetadata, PhotoWithContent, Phrase, Quiz, QuizQuestion, User,
    UserCredentials, UserProgress, VisionAnalysis, VocabularyItem,
};
use lingualive_core::ports::{DatabaseService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Loads the derived learning artifacts for one photo.
    async fn load_photo_content(&self, photo: Photo) -> PortResult<PhotoWithContent> {
        let vocabulary = sqlx::query_as::<_, VocabularyRecord>(
            "SELECT id, photo_id, term, translation, pronunciation, part_of_speech \
             FROM vocabulary_items WHERE photo_id = $1 ORDER BY term ASC",
        )
        .bind(photo.id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(|r| r.to_domain())
        .collect();

        let scenario = sqlx::query_as::<_, ScenarioRecord>(
            "SELECT id, photo_id, title, prompt, phrases \
             FROM conversation_scenarios WHERE photo_id = $1",
        )
        .bind(photo.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(|r| r.to_domain());

        let quiz = sqlx::query_as::<_, QuizRecord>(
            "SELECT id, photo_id, title, questions FROM quizzes WHERE photo_id = $1",
        )
        .bind(photo.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(|r| r.to_domain());

        Ok(PhotoWithContent {
            photo,
            vocabulary,
            scenario,
            quiz,
        })
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct PhotoRecord {
    id: Uuid,
    user_id: Uuid,
    image_url: String,
    taken_at: Option<DateTime<Utc>>,
    location_lat: Option<f64>,
    location_lng: Option<f64>,
    metadata: Json<PhotoMetadata>,
    analysis: Json<VisionAnalysis>,
    created_at: DateTime<Utc>,
}
impl PhotoRecord {
    fn to_domain(self) -> Photo {
        Photo {
            id: self.id,
            user_id: self.user_id,
            image_url: self.image_url,
            taken_at: self.taken_at,
            location_lat: self.location_lat,
            location_lng: self.location_lng,
            metadata: self.metadata.0,
            vision: self.analysis.0,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct VocabularyRecord {
    id: Uuid,
    photo_id: Uuid,
    term: String,
    translation: String,
    pronunciation: Option<String>,
    part_of_speech: Option<String>,
}
impl VocabularyRecord {
    fn to_domain(self) -> VocabularyItem {
        VocabularyItem {
            id: self.id,
            photo_id: self.photo_id,
            term: self.term,
            translation: self.translation,
            pronunciation: self.pronunciation,
            part_of_speech: self.part_of_speech,
        }
    }
}

#[derive(FromRow)]
struct ScenarioRecord {
    id: Uuid,
    photo_id: Uuid,
    title: String,
    prompt: String,
    phrases: Json<Vec<Phrase>>,
}
impl ScenarioRecord {
    fn to_domain(self) -> ConversationScenario {
        ConversationScenario {
            id: self.id,
            photo_id: self.photo_id,
            title: self.title,
            prompt: self.prompt,
            phrases: self.phrases.0,
        }
    }
}

#[derive(FromRow)]
struct QuizRecord {
    id: Uuid,
    photo_id: Uuid,
    title: String,
    questions: Json<Vec<QuizQuestion>>,
}
impl QuizRecord {
    fn to_domain(self) -> Quiz {
        Quiz {
            id: self.id,
            photo_id: self.photo_id,
            title: self.title,
            questions: self.questions.0,
        }
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    user_id: Uuid,
    xp: i64,
    streak: i32,
    last_active_at: DateTime<Utc>,
}
impl ProgressRecord {
    fn to_domain(self) -> UserProgress {
        UserProgress {
            user_id: self.user_id,
            xp: self.xp,
            streak: self.streak,
            last_active_at: self.last_active_at,
        }
    }
}

#[derive(FromRow)]
struct BadgeRecord {
    id: Uuid,
    key: String,
    name: String,
    description: String,
}
impl BadgeRecord {
    fn to_domain(self) -> Badge {
        Badge {
            id: self.id,
            key: self.key,
            name: self.name,
            description: self.description,
        }
    }
}

#[derive(FromRow)]
struct EarnedBadgeRecord {
    id: Uuid,
    key: String,
    name: String,
    description: String,
    earned_at: DateTime<Utc>,
}
impl EarnedBadgeRecord {
    fn to_domain(self) -> EarnedBadge {
        EarnedBadge {
            badge: Badge {
                id: self.id,
                key: self.key,
                name: self.name,
                description: self.description,
            },
            earned_at: self.earned_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Unexpected(format!("Email {} is already registered", email))
            }
            other => unexpected(other),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_photo_with_content(
        &self,
        photo: NewPhoto,
        learning: &LearningPayload,
    ) -> PortResult<Photo> {
        // The photo and every derived artifact commit together or not at all.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, PhotoRecord>(
            "INSERT INTO photos \
                 (id, user_id, image_url, taken_at, location_lat, location_lng, metadata, analysis) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, user_id, image_url, taken_at, location_lat, location_lng, \
                       metadata, analysis, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(photo.user_id)
        .bind(&photo.image_url)
        .bind(photo.taken_at)
        .bind(photo.location_lat)
        .bind(photo.location_lng)
        .bind(Json(&photo.metadata))
        .bind(Json(&photo.vision))
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        for entry in &learning.vocabulary_deck {
            sqlx::query(
                "INSERT INTO vocabulary_items \
                     (id, photo_id, term, translation, pronunciation, part_of_speech) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(record.id)
            .bind(&entry.term)
            .bind(&entry.translation)
            .bind(&entry.pronunciation)
            .bind(&entry.part_of_speech)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        sqlx::query(
            "INSERT INTO conversation_scenarios (id, photo_id, title, prompt, phrases) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(record.id)
        .bind(&learning.conversation_scenario.title)
        .bind(&learning.conversation_scenario.prompt)
        .bind(Json(&learning.conversation_scenario.phrases))
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query("INSERT INTO quizzes (id, photo_id, title, questions) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(record.id)
            .bind(&learning.quiz.title)
            .bind(Json(&learning.quiz.questions))
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_photos(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> PortResult<(Vec<PhotoWithContent>, i64)> {
        let records = sqlx::query_as::<_, PhotoRecord>(
            "SELECT id, user_id, image_url, taken_at, location_lat, location_lng, \
                    metadata, analysis, created_at \
             FROM photos WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        let mut photos = Vec::with_capacity(records.len());
        for record in records {
            photos.push(self.load_photo_content(record.to_domain()).await?);
        }

        Ok((photos, total))
    }

    async fn get_photo_for_user(
        &self,
        photo_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<PhotoWithContent> {
        let record = sqlx::query_as::<_, PhotoRecord>(
            "SELECT id, user_id, image_url, taken_at, location_lat, location_lng, \
                    metadata, analysis, created_at \
             FROM photos WHERE id = $1 AND user_id = $2",
        )
        .bind(photo_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Photo {} not found", photo_id)))?;

        self.load_photo_content(record.to_domain()).await
    }

    async fn grant_xp(
        &self,
        user_id: Uuid,
        amount: i64,
        reason: &str,
    ) -> PortResult<UserProgress> {
        // The ledger event and the running total move together; the upsert is
        // an in-database increment, so concurrent grants cannot lose updates.
        // The streak CASE mirrors lingualive_core::progression::next_streak.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query("INSERT INTO xp_events (id, user_id, amount, reason) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(amount)
            .bind(reason)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let record = sqlx::query_as::<_, ProgressRecord>(
            "INSERT INTO user_progress (user_id, xp, streak, last_active_at) \
             VALUES ($1, $2, 1, now()) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 xp = user_progress.xp + EXCLUDED.xp, \
                 streak = CASE \
                     WHEN now() - user_progress.last_active_at > interval '48 hours' THEN 1 \
                     WHEN (now() AT TIME ZONE 'utc')::date \
                              > (user_progress.last_active_at AT TIME ZONE 'utc')::date \
                         THEN user_progress.streak + 1 \
                     ELSE user_progress.streak \
                 END, \
                 last_active_at = now() \
             RETURNING user_id, xp, streak, last_active_at",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_progress(&self, user_id: Uuid) -> PortResult<Option<UserProgress>> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "SELECT user_id, xp, streak, last_active_at FROM user_progress WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn unlock_badge(
        &self,
        user_id: Uuid,
        definition: &BadgeDefinition,
    ) -> PortResult<BadgeGrant> {
        // Lazily create the badge definition. The no-op DO UPDATE makes
        // RETURNING yield the existing row when another request created it
        // first; the unique key constraint resolves the race in the store.
        let badge = sqlx::query_as::<_, BadgeRecord>(
            "INSERT INTO badges (id, key, name, description) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (key) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id, key, name, description",
        )
        .bind(Uuid::new_v4())
        .bind(definition.key)
        .bind(definition.name)
        .bind(definition.description)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let inserted = sqlx::query(
            "INSERT INTO user_badges (user_id, badge_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, badge_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(badge.id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(BadgeGrant {
            newly_earned: inserted.rows_affected() == 1,
            badge: badge.to_domain(),
        })
    }

    async fn list_badges_for_user(&self, user_id: Uuid) -> PortResult<Vec<EarnedBadge>> {
        let records = sqlx::query_as::<_, EarnedBadgeRecord>(
            "SELECT b.id, b.key, b.name, b.description, ub.earned_at \
             FROM user_badges ub JOIN badges b ON b.id = ub.badge_id \
             WHERE ub.user_id = $1 ORDER BY ub.earned_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
