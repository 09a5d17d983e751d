use axum::Router;

use crate::state::AppState;

mod dto;
pub mod error;
pub(crate) mod extractors;
mod handlers;
pub mod hashing;
pub mod jwt;
pub mod service;
pub mod store;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
