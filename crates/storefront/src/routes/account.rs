//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;

use super::PageContext;
use crate::db::Stores;
use crate::error::Result;
use crate::models::User;
use crate::services::AuthService;
use crate::state::AppState;

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: PageContext,
    pub account: User,
    pub member_since: String,
}

/// Display account overview page.
pub async fn index<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    crate::middleware::RequireAuth(current_user): crate::middleware::RequireAuth,
) -> Result<impl IntoResponse> {
    let account = AuthService::new(state.stores().users())
        .get_user(current_user.id)
        .await?;

    Ok(AccountIndexTemplate {
        member_since: account.created_at.format("%B %-d, %Y").to_string(),
        page: PageContext::load(&state, &session, Some(current_user)).await,
        account,
    })
}
