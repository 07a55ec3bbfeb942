pub mod domain;
pub mod fingerprint;
pub mod ports;
pub mod progression;

pub use domain::{
    Badge, BadgeDefinition, BadgeGrant, BadgeSummary, ConversationScenario, EarnedBadge,
    LearningPayload, NewPhoto, Photo, PhotoMetadata, PhotoWithContent, ProgressSummary, Quiz,
    TranslationRecord, User, UserCredentials, UserProgress, VisionAnalysis, VocabularyItem,
    XPEvent,
};
pub use ports::{
    ContentGenerationService, DatabaseService, ObjectStorageService, PortError, PortResult,
    TranslationCacheService, VisionAnalysisService,
};
