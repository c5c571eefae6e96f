//! Product route handlers: catalog browsing and product administration.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::{CategoryId, ProductId};

use super::PageContext;
use crate::db::Stores;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth, set_flash};
use crate::models::{Category, CategoryGroup, Product, ProductDraft, ProductFilter};
use crate::services::{CatalogError, CatalogService, filter_from_query};
use crate::state::AppState;

/// A category as a filter checkbox or select option.
pub struct CategoryOption {
    pub id: CategoryId,
    pub name: String,
    pub selected: bool,
}

impl CategoryOption {
    fn list(categories: Vec<Category>, is_selected: impl Fn(CategoryId) -> bool) -> Vec<Self> {
        categories
            .into_iter()
            .map(|c| Self {
                selected: is_selected(c.id),
                id: c.id,
                name: c.name,
            })
            .collect()
    }
}

/// Product create/edit form data. Every field arrives as text.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price_ht: String,
    #[serde(default)]
    pub category_id: String,
}

impl ProductForm {
    fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price_ht: product.price_ht.to_string(),
            category_id: product.category.id.to_string(),
        }
    }

    fn to_draft(&self) -> std::result::Result<ProductDraft, String> {
        let price_ht = Decimal::from_str(self.price_ht.trim())
            .map_err(|_| "price must be a number".to_owned())?;
        let category_id = self
            .category_id
            .parse::<CategoryId>()
            .map_err(|_| "choose a category".to_owned())?;

        Ok(ProductDraft {
            name: self.name.trim().to_owned(),
            price_ht,
            category_id,
        })
    }
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub groups: Vec<CategoryGroup>,
    pub categories: Vec<CategoryOption>,
    pub price_min: String,
    pub price_max: String,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: Product,
}

/// Products of one category.
#[derive(Template, WebTemplate)]
#[template(path = "products/by_category.html")]
pub struct ProductsByCategoryTemplate {
    pub page: PageContext,
    pub group: CategoryGroup,
}

/// Product create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub heading: &'static str,
    pub action: String,
    pub form: ProductForm,
    pub categories: Vec<CategoryOption>,
    pub error: Option<String>,
}

// =============================================================================
// Browsing
// =============================================================================

/// Display the catalog grouped by category, filtered by the query string.
#[instrument(skip_all)]
pub async fn index<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let filter = filter_from_query(query.as_deref());
    let catalog = CatalogService::new(state.stores().catalog());

    let groups = catalog.list_grouped_by_category(&filter).await?;
    let categories = CategoryOption::list(catalog.list_categories().await?, |id| {
        filter.category_ids.contains(&id)
    });

    Ok(ProductsIndexTemplate {
        page: PageContext::load(&state, &session, user).await,
        groups,
        categories,
        price_min: bound_text(&filter, |f| f.price_min),
        price_max: bound_text(&filter, |f| f.price_max),
    })
}

fn bound_text(filter: &ProductFilter, bound: impl Fn(&ProductFilter) -> Option<Decimal>) -> String {
    bound(filter).map(|d| d.to_string()).unwrap_or_default()
}

/// Display one product.
#[instrument(skip(state, session, user))]
pub async fn show<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let product = CatalogService::new(state.stores().catalog())
        .get_product(id)
        .await?;

    Ok(ProductShowTemplate {
        page: PageContext::load(&state, &session, user).await,
        product,
    })
}

/// Display every product of a category, regardless of price.
#[instrument(skip(state, session, user))]
pub async fn by_category<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<CategoryId>,
) -> Result<impl IntoResponse> {
    let group = CatalogService::new(state.stores().catalog())
        .list_by_category(id)
        .await?;

    Ok(ProductsByCategoryTemplate {
        page: PageContext::load(&state, &session, user).await,
        group,
    })
}

// =============================================================================
// Administration
// =============================================================================

async fn render_form<S: Stores>(
    state: &AppState<S>,
    session: &Session,
    user: RequireAuth,
    heading: &'static str,
    action: String,
    form: ProductForm,
    error: Option<String>,
) -> Result<Response> {
    let categories = CatalogService::new(state.stores().catalog())
        .list_categories()
        .await?;
    let selected = form.category_id.parse::<CategoryId>().ok();
    let status = if error.is_some() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };

    let template = ProductFormTemplate {
        page: PageContext::load(state, session, Some(user.0)).await,
        heading,
        action,
        form,
        categories: CategoryOption::list(categories, |id| Some(id) == selected),
        error,
    };
    Ok((status, template).into_response())
}

/// Display the new product form.
pub async fn new_page<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    user: RequireAuth,
) -> Result<Response> {
    render_form(
        &state,
        &session,
        user,
        "New product",
        "/products/new".to_owned(),
        ProductForm::default(),
        None,
    )
    .await
}

/// Handle the new product form.
#[instrument(skip(state, session, user))]
pub async fn create<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    user: RequireAuth,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let heading = "New product";
    let action = "/products/new".to_owned();

    let draft = match form.to_draft() {
        Ok(draft) => draft,
        Err(message) => {
            return render_form(&state, &session, user, heading, action, form, Some(message))
                .await;
        }
    };

    match CatalogService::new(state.stores().catalog())
        .create_product(&draft)
        .await
    {
        Ok(product) => {
            set_flash(&session, &format!("Product \"{}\" created", product.name)).await;
            Ok(Redirect::to("/products").into_response())
        }
        Err(CatalogError::Validation(message)) => {
            render_form(&state, &session, user, heading, action, form, Some(message)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Display the edit form for a product.
pub async fn edit_page<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    user: RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let product = CatalogService::new(state.stores().catalog())
        .get_product(id)
        .await?;

    render_form(
        &state,
        &session,
        user,
        "Edit product",
        format!("/products/{id}/edit"),
        ProductForm::from_product(&product),
        None,
    )
    .await
}

/// Handle the edit form.
#[instrument(skip(state, session, user))]
pub async fn update<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    user: RequireAuth,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let heading = "Edit product";
    let action = format!("/products/{id}/edit");

    let draft = match form.to_draft() {
        Ok(draft) => draft,
        Err(message) => {
            return render_form(&state, &session, user, heading, action, form, Some(message))
                .await;
        }
    };

    match CatalogService::new(state.stores().catalog())
        .update_product(id, &draft)
        .await
    {
        Ok(product) => {
            set_flash(&session, &format!("Product \"{}\" updated", product.name)).await;
            Ok(Redirect::to("/products").into_response())
        }
        Err(CatalogError::Validation(message)) => {
            render_form(&state, &session, user, heading, action, form, Some(message)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a product. Missing products are ignored.
#[instrument(skip(state, session, _user))]
pub async fn delete<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    _user: RequireAuth,
    Path(id): Path<ProductId>,
) -> std::result::Result<Redirect, AppError> {
    CatalogService::new(state.stores().catalog())
        .delete_product(id)
        .await?;

    set_flash(&session, "Product deleted").await;
    Ok(Redirect::to("/products"))
}
