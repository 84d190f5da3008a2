//! HTTP surface of the relay

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::AppState;
pub use models::{ApiError, ChatResponse, Mode, RelayRequest, RelayResponse, SummaryResponse};
pub use routes::build_router;
