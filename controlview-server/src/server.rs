use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{request::Parts, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use controlview_core::{ControlView, FilterChain, RecipeStore, SpaceResolver};
use controlview_types::{Bag, Recipe, Tiddler};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    auth::AuthState,
    config::ServerConfig,
    error::ApiError,
    host::HostResolver,
    middleware::{control_view, query_filters, QueryParams},
    store::MemoryStore,
};

#[derive(Clone)]
pub struct AppState {
    pub control: Arc<ControlView>,
    pub store: Arc<MemoryStore>,
    pub resolver: Arc<HostResolver>,
}

impl AppState {
    pub fn new(config: &ServerConfig, store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let resolver = HostResolver::new(
            config.server_host.clone(),
            config.aliases.clone(),
            store.clone(),
            AuthState::new(&config.auth),
        );
        Self {
            control: Arc::new(ControlView::new(config.control.clone())),
            store,
            resolver: Arc::new(resolver),
        }
    }
}

/// All routes, wrapped so query filters are parsed before ControlView runs.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/bags", get(list_bags))
        .route("/bags/{bag}", get(get_bag))
        .route("/bags/{bag}/tiddlers", get(bag_tiddlers))
        .route("/recipes", get(list_recipes))
        .route("/recipes/{recipe}", get(get_recipe))
        .route("/recipes/{recipe}/tiddlers", get(recipe_tiddlers))
        .route("/search", get(search))
        .layer(middleware::from_fn_with_state(state.clone(), control_view))
        .layer(middleware::from_fn(query_filters))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let store = MemoryStore::from_file(&config.store_path)
        .with_context(|| format!("failed to load store {}", config.store_path.display()))?;
    let app = router(AppState::new(&config, store));

    info!(
        addr = %config.listen_addr,
        server_host = %config.server_host,
        admin_bags = ?config.control.admin_bags,
        fail_closed = config.control.fail_closed,
        "controlview listening"
    );
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn list_bags(
    State(state): State<AppState>,
    Extension(chain): Extension<FilterChain>,
) -> Json<Vec<String>> {
    let bags: Vec<Bag> = chain.apply(state.store.bags());
    Json(bags.into_iter().map(|bag| bag.name).collect())
}

async fn get_bag(
    State(state): State<AppState>,
    Path(bag): Path<String>,
) -> Result<Json<Bag>, ApiError> {
    Ok(Json(state.store.get_bag(&bag)?))
}

async fn bag_tiddlers(
    State(state): State<AppState>,
    Path(bag): Path<String>,
    Extension(chain): Extension<FilterChain>,
) -> Result<Json<Vec<Tiddler>>, ApiError> {
    let tiddlers = state.store.bag_tiddlers(&bag)?;
    Ok(Json(chain.apply(tiddlers)))
}

async fn list_recipes(
    State(state): State<AppState>,
    Extension(chain): Extension<FilterChain>,
) -> Json<Vec<String>> {
    let recipes: Vec<Recipe> = chain.apply(state.store.recipes());
    Json(recipes.into_iter().map(|recipe| recipe.name).collect())
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    Ok(Json(state.store.get_recipe(&recipe)?))
}

async fn recipe_tiddlers(
    State(state): State<AppState>,
    Path(recipe): Path<String>,
    Extension(chain): Extension<FilterChain>,
    parts: Parts,
) -> Result<Json<Vec<Tiddler>>, ApiError> {
    let template = state.resolver.recipe_template(&parts);
    let tiddlers = state.store.recipe_tiddlers(&recipe, &template)?;
    Ok(Json(chain.apply(tiddlers)))
}

async fn search(
    State(state): State<AppState>,
    Extension(chain): Extension<FilterChain>,
    Extension(params): Extension<QueryParams>,
) -> Json<Vec<Tiddler>> {
    let query = params.get("q").unwrap_or_default();
    Json(chain.apply(state.store.search(query)))
}
