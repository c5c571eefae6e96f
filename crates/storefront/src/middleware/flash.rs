//! One-shot messages carried across a redirect.

use tower_sessions::Session;

use crate::models::session_keys;

/// Store `message` for the next rendered page.
///
/// A failure is logged and otherwise ignored; losing a notice never fails
/// the action that produced it.
pub async fn set_flash(session: &Session, message: &str) {
    if let Err(e) = session.insert(session_keys::FLASH, message).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Take the pending message, if any. It is removed from the session.
pub async fn take_flash(session: &Session) -> Option<String> {
    session
        .remove::<String>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}
