//! Dashboard route handlers.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use chrono::Local;
use futures::Stream;
use tokio::sync::watch;

use super::{SearchParams, sse_event};
use crate::error::AppError;
use crate::live::DashboardView;
use crate::middleware::RequireAuth;
use crate::services::{DashboardSummary, OrderService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(summary))
        .route("/dashboard/stream", get(stream))
}

/// GET /dashboard
///
/// # Errors
///
/// Returns `AppError::Orders` if the orders cannot be read.
pub async fn summary(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<DashboardSummary>, AppError> {
    let orders = OrderService::new(state.store()).list().await?;
    let total_queries = state.queries().read().await.counts().total;

    Ok(Json(DashboardSummary::compute(
        &user,
        &orders,
        total_queries,
        &params.search,
        Local::now().date_naive(),
        &Local,
    )))
}

/// GET /dashboard/stream
///
/// Pushes a fresh summary after every orders snapshot. The principal is
/// fixed to the session user for the life of the stream.
///
/// # Errors
///
/// Returns `AppError::Live` if the orders subscription cannot be opened.
pub async fn stream(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let total_queries = state.queries().read().await.counts().total;
    let (principal, auth) = watch::channel(Some(user));
    let mut view = DashboardView::open(state.store(), auth, total_queries).await?;
    view.set_search(&params.search);

    let events = async_stream::stream! {
        // Held so the view never sees a sign-out
        let _principal = principal;
        if let Some(summary) = view.summary() {
            yield Ok::<_, Infallible>(sse_event("dashboard", summary));
        }
        while let Some(summary) = view.next().await {
            if let Some(summary) = summary {
                let event = sse_event("dashboard", summary);
                yield Ok(event);
            }
        }
        tracing::debug!("Dashboard stream closed");
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
