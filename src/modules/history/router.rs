use axum::{Router, routing::get};

use crate::modules::history::controller::{delete_history_record, get_history, get_history_record};
use crate::state::AppState;

pub fn init_history_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_history))
        .route("/{id}", get(get_history_record).delete(delete_history_record))
}
