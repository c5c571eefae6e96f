//! Authentication route handlers.
//!
//! Handles login, registration and logout against the local user store.
//! Logging in drops any guest cart held in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::db::Stores;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::{AuthError, AuthService, SessionContainer};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub error: Option<&'static str>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub error: Option<&'static str>,
}

/// Human-readable text for an `?error=` code.
fn error_message(code: Option<&str>) -> Option<&'static str> {
    match code? {
        "credentials" => Some("Invalid email or password."),
        "session" => Some("Could not start your session. Please try again."),
        "exists" => Some("An account with this email already exists."),
        "email" => Some("Please enter a valid email address."),
        "weak_password" => Some("Password must be at least 8 characters."),
        "mismatch" => Some("Passwords do not match."),
        _ => Some("Something went wrong. Please try again."),
    }
}

/// Put `user` in the session, replacing any guest cart. Returns whether the
/// session was updated.
async fn start_session(session: &Session, user: &User) -> bool {
    if let Err(e) = session.clear_guest_cart().await {
        tracing::warn!(error = %e, "Failed to clear guest cart on login");
    }

    let current = CurrentUser::from(user);
    if let Err(e) = set_current_user(session, &current).await {
        tracing::error!(error = %e, "Failed to set session");
        return false;
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));
    true
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        page: PageContext::load(&state, &session, user).await,
        error: error_message(query.error.as_deref()),
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match AuthService::new(state.stores().users())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return Redirect::to("/auth/login?error=credentials").into_response();
        }
    };

    if !start_session(&session, &user).await {
        return Redirect::to("/auth/login?error=session").into_response();
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Redirect::to("/products").into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        page: PageContext::load(&state, &session, user).await,
        error: error_message(query.error.as_deref()),
    }
}

/// Handle registration form submission. A new account is logged in directly.
#[instrument(skip_all)]
pub async fn register<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    if form.password != form.password_confirm {
        return Ok(Redirect::to("/auth/register?error=mismatch").into_response());
    }

    let user = match AuthService::new(state.stores().users())
        .register(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::UserAlreadyExists) => {
            return Ok(Redirect::to("/auth/register?error=exists").into_response());
        }
        Err(AuthError::InvalidEmail(_)) => {
            return Ok(Redirect::to("/auth/register?error=email").into_response());
        }
        Err(AuthError::WeakPassword(_)) => {
            return Ok(Redirect::to("/auth/register?error=weak_password").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    if !start_session(&session, &user).await {
        return Ok(Redirect::to("/auth/login?error=session").into_response());
    }

    Ok(Redirect::to("/products").into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();
    Redirect::to("/products")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_have_messages() {
        assert_eq!(error_message(None), None);
        assert_eq!(
            error_message(Some("credentials")),
            Some("Invalid email or password.")
        );
        assert!(error_message(Some("unexpected")).is_some());
    }
}
