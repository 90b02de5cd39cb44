//! Role-based authorization middleware.
//!
//! User management is the only admin-gated surface; everything else is open
//! to any authenticated user.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::middleware::auth::AuthUser;
use crate::modules::users::model::UserRole;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Checks that the authenticated user holds one of the allowed roles.
///
/// # Usage with axum::middleware::from_fn_with_state
///
/// ```rust,ignore
/// let admin_routes = Router::new()
///     .route("/users", get(get_users))
///     .layer(middleware::from_fn_with_state(state.clone(), require_admin));
/// ```
pub async fn require_roles(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
    allowed_roles: Vec<UserRole>,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await?;

    let user_role: UserRole = auth_user.0.role.parse().map_err(|_| {
        AppError::internal(anyhow::anyhow!("Invalid role in token: {}", auth_user.0.role))
    })?;

    if !allowed_roles.contains(&user_role) {
        return Err(AppError::forbidden(anyhow::anyhow!(
            "Access denied. Administrator privileges required."
        )));
    }

    req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}

/// Middleware wrapper restricting a route group to ADMIN users.
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match require_roles(State(state), req, next, vec![UserRole::Admin]).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
