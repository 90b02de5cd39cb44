use axum::{
    Router,
    routing::{get, post},
};

use crate::modules::issuances::controller::{
    complete_issuance, create_issuance, delete_issuance, get_issuance, get_issuances,
    update_issuance,
};
use crate::state::AppState;

pub fn init_issuances_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_issuance).get(get_issuances))
        .route(
            "/{id}",
            get(get_issuance).put(update_issuance).delete(delete_issuance),
        )
        .route("/{id}/complete", post(complete_issuance))
}
