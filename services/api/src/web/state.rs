//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use lingualive_core::ports::{
    ContentGenerationService, DatabaseService, ObjectStorageService, TranslationCacheService,
    VisionAnalysisService,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Every external collaborator sits behind a core port so the
/// pipeline can be exercised against in-memory implementations in tests.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub cache: Arc<dyn TranslationCacheService>,
    pub storage: Arc<dyn ObjectStorageService>,
    pub vision_adapter: Arc<dyn VisionAnalysisService>,
    pub content_adapter: Arc<dyn ContentGenerationService>,
    pub config: Arc<Config>,
}
