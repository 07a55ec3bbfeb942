pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod translate_task;

// Re-export the handlers the server binary wires into its router.
pub use middleware::require_auth;
pub use rest::{
    get_photo_handler, get_progress_handler, list_badges_handler, list_photos_handler,
    translate_image_handler,
};
