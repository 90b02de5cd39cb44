use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{create_subject, get_subjects};

pub fn init_subjects_router() -> Router<AppState> {
    Router::new().route("/", get(get_subjects).post(create_subject))
}
