//! Public catalog reads.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use otherproteins_core::{Category, Product, ProductFilter};

use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

/// Query string for the product list.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<i64>,
    pub q: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
    pub limit: Option<i64>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        ProductFilter {
            category_id: query.category,
            query: query.q,
            in_stock_only: query.in_stock,
            limit: query.limit,
        }
    }
}

pub async fn categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db().catalog().list_categories().await?))
}

pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state.db().catalog().list_products(&query.into()).await?;
    Ok(Json(products))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Product>> {
    Ok(Json(state.db().catalog().get_product(id).await?))
}
