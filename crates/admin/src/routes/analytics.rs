//! Store-wide analytics route handlers.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::Stream;

use super::{SearchParams, sse_event};
use crate::aggregation::{self, AnalyticsReport};
use crate::error::AppError;
use crate::live::AnalyticsView;
use crate::middleware::RequireAuth;
use crate::services::{OrderService, ProductService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analytics", get(report))
        .route("/analytics/stream", get(stream))
}

/// GET /analytics
///
/// # Errors
///
/// Returns an error if orders or products cannot be read.
pub async fn report(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<AnalyticsReport>, AppError> {
    let orders = OrderService::new(state.store()).list().await?;
    let products = ProductService::new(state.store()).list().await?;

    let mut report = aggregation::analytics(&orders, &products);
    if !params.search.is_empty() {
        report.top_products = report.top_products.search(&params.search);
    }
    Ok(Json(report))
}

/// GET /analytics/stream
///
/// Sends the current report, then a fresh one after every orders or
/// products snapshot. The subscriptions end when the client disconnects.
///
/// # Errors
///
/// Returns `AppError::Live` if a subscription cannot be opened.
pub async fn stream(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let mut view = AnalyticsView::open(state.store()).await?;
    view.set_search(&params.search);

    let events = async_stream::stream! {
        yield Ok::<_, Infallible>(sse_event("analytics", view.report()));
        while let Some(report) = view.next().await {
            let event = sse_event("analytics", report);
            yield Ok(event);
        }
        tracing::debug!("Analytics stream closed");
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
