//! SpamShield HTTP surface: shared state and the axum router.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
