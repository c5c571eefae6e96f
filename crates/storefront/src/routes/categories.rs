//! Category administration handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::CategoryId;

use super::PageContext;
use crate::db::Stores;
use crate::error::Result;
use crate::middleware::{RequireAuth, set_flash};
use crate::models::Category;
use crate::services::{CatalogError, CatalogService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

/// New category form, also listing existing categories with delete buttons.
#[derive(Template, WebTemplate)]
#[template(path = "categories/new.html")]
pub struct CategoryFormTemplate {
    pub page: PageContext,
    pub name: String,
    pub categories: Vec<Category>,
    pub error: Option<String>,
}

async fn render_form<S: Stores>(
    state: &AppState<S>,
    session: &Session,
    RequireAuth(user): RequireAuth,
    name: String,
    error: Option<String>,
) -> Result<Response> {
    let categories = CatalogService::new(state.stores().catalog())
        .list_categories()
        .await?;
    let status = if error.is_some() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };

    let template = CategoryFormTemplate {
        page: PageContext::load(state, session, Some(user)).await,
        name,
        categories,
        error,
    };
    Ok((status, template).into_response())
}

pub async fn new_page<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    user: RequireAuth,
) -> Result<Response> {
    render_form(&state, &session, user, String::new(), None).await
}

/// Create a category. Blank or duplicate names re-render the form.
#[instrument(skip(state, session, user))]
pub async fn create<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    user: RequireAuth,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    match CatalogService::new(state.stores().catalog())
        .create_category(&form.name)
        .await
    {
        Ok(category) => {
            set_flash(&session, &format!("Category \"{}\" created", category.name)).await;
            Ok(Redirect::to("/products").into_response())
        }
        Err(CatalogError::Validation(message) | CatalogError::Conflict(message)) => {
            render_form(&state, &session, user, form.name, Some(message)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a category that no product uses any more.
#[instrument(skip(state, session, _user))]
pub async fn delete<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    _user: RequireAuth,
    Path(id): Path<CategoryId>,
) -> Result<Redirect> {
    match CatalogService::new(state.stores().catalog())
        .delete_category(id)
        .await
    {
        Ok(()) => set_flash(&session, "Category deleted").await,
        Err(CatalogError::Conflict(message)) => set_flash(&session, &message).await,
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to("/products"))
}
