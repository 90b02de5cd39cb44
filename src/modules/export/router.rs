use axum::{Router, routing::get};

use crate::modules::export::controller::{export_history, export_materials, export_schools};
use crate::state::AppState;

pub fn init_export_router() -> Router<AppState> {
    Router::new()
        .route("/history", get(export_history))
        .route("/materials", get(export_materials))
        .route("/schools", get(export_schools))
}
