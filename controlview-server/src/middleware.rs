//! Request layers: query-string filters, then ControlView.
//!
//! [`query_filters`] must wrap [`control_view`] so the user's filters are
//! already in the chain when ControlView puts its own in front of them.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use controlview_core::{parse_for_filters, FilterChain, CONTROL_VIEW_HEADER};
use tracing::debug;

use crate::error::ApiError;
use crate::server::AppState;

/// Query-string pairs that are not filters (e.g. `q` for search).
#[derive(Debug, Clone, Default)]
pub struct QueryParams(pub Vec<(String, String)>);

impl QueryParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse the query string into the request's [`FilterChain`].
pub async fn query_filters(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let query = req.uri().query().unwrap_or_default();
    let (filters, leftovers) = parse_for_filters(query)?;

    req.extensions_mut().insert(FilterChain::from(filters));
    req.extensions_mut().insert(QueryParams(leftovers));
    Ok(next.run(req).await)
}

/// Restrict `/bags`, `/recipes` and `/search` to the space the host serves.
pub async fn control_view(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();
    let mut chain = parts
        .extensions
        .remove::<FilterChain>()
        .unwrap_or_default();

    let path = parts.uri.path().to_string();
    let override_header = parts
        .headers
        .get(CONTROL_VIEW_HEADER)
        .and_then(|v| v.to_str().ok());

    let result = state.control.handle(
        &parts,
        &path,
        override_header,
        &*state.resolver,
        &*state.store,
        &mut chain,
    );
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            debug!(%path, %err, "controlview rejected request");
            return Err(err.into());
        }
    };
    debug!(%path, ?outcome, filters = chain.len(), "controlview passed request");

    parts.extensions.insert(chain);
    Ok(next.run(Request::from_parts(parts, body)).await)
}
