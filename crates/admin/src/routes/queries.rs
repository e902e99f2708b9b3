//! Customer inquiry inbox route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Serialize;

use super::SearchParams;
use crate::middleware::RequireAuth;
use crate::models::{CustomerQuery, NewQuery};
use crate::services::QueryCounts;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/queries", get(list).post(add))
}

#[derive(Debug, Serialize)]
pub struct Inbox {
    pub queries: Vec<CustomerQuery>,
    pub counts: QueryCounts,
}

/// GET /queries
pub async fn list(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Inbox> {
    let inbox = state.queries().read().await;
    Json(Inbox {
        queries: inbox.search(&params.search),
        counts: inbox.counts(),
    })
}

/// POST /queries
pub async fn add(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Json(query): Json<NewQuery>,
) -> Json<CustomerQuery> {
    Json(state.queries().write().await.add(query))
}
