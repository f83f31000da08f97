//! ControlView: restrict what a space-specific host can see.
//!
//! Content should not be reachable through a space's URI unless it was stored
//! in, or included into, that space. Without this, anyone could build a URI on
//! a space's host (including a custom domain mapped to a space) that points at
//! unrelated content and make it look like the space is publishing it.
//!
//! Requests under `/bags`, `/recipes` and `/search` made against a space host
//! get a filter inserted at the front of their filter chain (collections) or
//! are rejected as not found (single entities outside the space).

use std::fmt;

use controlview_types::Recipe;
use thiserror::Error;
use tracing::{debug, error};

use crate::filter::{parse_for_filters, Filter, FilterChain, FilterError};
use crate::naming::RecipeTier;
use crate::template::Template;
use crate::visibility::VisibilitySet;

/// Header that turns ControlView off for one request when set to `false`.
pub const CONTROL_VIEW_HEADER: &str = "x-controlview";

/// Admin bags visible from every space unless configured otherwise.
pub const DEFAULT_ADMIN_BAGS: &[&str] = &["MAPSPACE", "MAPUSER"];

const FORMAT_EXTENSIONS: &[&str] = &["json", "txt", "html", "wiki", "atom"];

/// True when the override header asks for ControlView to be skipped.
pub fn is_disabled(header: Option<&str>) -> bool {
    header.is_some_and(|value| value.trim().eq_ignore_ascii_case("false"))
}

/// Host the request was made against and the system's primary host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPair {
    pub current: String,
    pub canonical: String,
}

impl HostPair {
    pub fn is_canonical(&self) -> bool {
        self.current == self.canonical
    }
}

/// Request-derived lookups ControlView needs from the surrounding server.
pub trait SpaceResolver<R: ?Sized> {
    fn determine_host(&self, req: &R) -> HostPair;

    /// Space served by `host`, or `None` if the host maps to no space.
    fn determine_space(&self, req: &R, host: &str) -> Option<String>;

    /// Name of the space recipe (private or public) in play for `req`.
    fn determine_space_recipe(&self, req: &R, space: &str) -> String;

    fn recipe_template(&self, req: &R) -> Template;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("recipe {0} not found")]
    NoRecipe(String),
}

pub trait RecipeStore {
    fn get_recipe(&self, name: &str) -> Result<Recipe, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Bag,
    Recipe,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Bag => f.write_str("bag"),
            EntityKind::Recipe => f.write_str("recipe"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlViewError {
    #[error("No recipe for space: {0}")]
    NoRecipe(StoreError),

    #[error("{kind} {name} not found")]
    NotVisible { kind: EntityKind, name: String },

    #[error("no space for host {0}")]
    UnknownSpace(String),

    /// A synthesized filter failed to parse. Always an internal defect.
    #[error("synthesized filter is malformed: {0}")]
    Filter(#[from] FilterError),
}

impl ControlViewError {
    /// True for errors that should surface as "not found".
    pub fn is_not_found(&self) -> bool {
        !matches!(self, ControlViewError::Filter(_))
    }
}

/// Immutable settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct ControlViewConfig {
    pub admin_bags: Vec<String>,
    /// Reject requests whose host maps to no space instead of letting them
    /// through unfiltered.
    pub fail_closed: bool,
}

impl Default for ControlViewConfig {
    fn default() -> Self {
        Self {
            admin_bags: DEFAULT_ADMIN_BAGS.iter().map(|s| s.to_string()).collect(),
            fail_closed: false,
        }
    }
}

/// Listing roots that get a synthesized filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Bags,
    Recipes,
    Search,
}

/// Shape of a request path under one of the filtered roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreRoute {
    Collection(Collection),
    Entity(EntityKind, String),
}

impl CoreRoute {
    /// Classify `path`, returning `None` for paths ControlView ignores.
    pub fn classify(path: &str) -> Option<Self> {
        let rest = path.strip_prefix('/')?;
        let mut segments = rest.split('/');
        let root = strip_format(segments.next()?);

        let route = match (root, segments.next()) {
            ("bags", None) => CoreRoute::Collection(Collection::Bags),
            ("recipes", None) => CoreRoute::Collection(Collection::Recipes),
            ("search", None) => CoreRoute::Collection(Collection::Search),
            ("bags" | "search", Some(name)) => CoreRoute::Entity(EntityKind::Bag, entity_name(name)),
            ("recipes", Some(name)) => CoreRoute::Entity(EntityKind::Recipe, entity_name(name)),
            _ => return None,
        };
        Some(route)
    }
}

fn strip_format(segment: &str) -> &str {
    match segment.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && FORMAT_EXTENSIONS.contains(&ext) => base,
        _ => segment,
    }
}

/// Decoded path segment. Kept otherwise verbatim so the gate checks the same
/// name the route handler will serve.
fn entity_name(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// What ControlView did with a request that was not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Path is outside `/bags`, `/recipes` and `/search`.
    NotCoreRoute,
    /// `X-ControlView: false` was sent.
    Disabled,
    CanonicalHost,
    /// Host maps to no space and the policy is to fail open.
    UnknownSpace,
    /// A filter was inserted at the front of the chain.
    Filtered(String),
    /// A single entity lookup passed the membership check.
    Allowed(EntityKind, String),
}

/// Interceptor plus filter synthesis and lookup gate.
#[derive(Debug, Clone, Default)]
pub struct ControlView {
    config: ControlViewConfig,
}

impl ControlView {
    pub fn new(config: ControlViewConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ControlViewConfig {
        &self.config
    }

    /// Run ControlView for one request.
    ///
    /// On `Ok` the caller delegates to the wrapped handler with `chain`
    /// (possibly extended). On `Err` the request must be answered without
    /// reaching the handler.
    pub fn handle<R, S, T>(
        &self,
        req: &R,
        path: &str,
        override_header: Option<&str>,
        resolver: &S,
        store: &T,
        chain: &mut FilterChain,
    ) -> Result<Outcome, ControlViewError>
    where
        R: ?Sized,
        S: SpaceResolver<R> + ?Sized,
        T: RecipeStore + ?Sized,
    {
        let Some(route) = CoreRoute::classify(path) else {
            return Ok(Outcome::NotCoreRoute);
        };

        let hosts = resolver.determine_host(req);
        if is_disabled(override_header) {
            debug!(%path, "controlview disabled by header");
            return Ok(Outcome::Disabled);
        }
        if hosts.is_canonical() {
            return Ok(Outcome::CanonicalHost);
        }

        let Some(space) = resolver.determine_space(req, &hosts.current) else {
            if self.config.fail_closed {
                return Err(ControlViewError::UnknownSpace(hosts.current));
            }
            debug!(host = %hosts.current, %path, "no space for host, not filtering");
            return Ok(Outcome::UnknownSpace);
        };

        let recipe_name = resolver.determine_space_recipe(req, &space);
        let recipe = store
            .get_recipe(&recipe_name)
            .map_err(ControlViewError::NoRecipe)?;
        let template = resolver.recipe_template(req);
        let visible = VisibilitySet::build(&space, &recipe, &template, &self.config.admin_bags);
        let tier = RecipeTier::of(&recipe_name);

        let outcome = apply_route(route, &visible, tier, chain)?;
        debug!(%space, recipe = %recipe_name, %path, ?outcome, "controlview applied");
        Ok(outcome)
    }
}

/// Filter text restricting a listing to what `visible` allows.
///
/// Names are percent-encoded, so a bag called `c++` or `a,b` parses back to
/// exactly one value.
pub fn synthesize_filter(collection: Collection, visible: &VisibilitySet, tier: RecipeTier) -> String {
    let filter = match collection {
        Collection::Recipes => Filter::one_of_many("name", visible.recipes(tier)),
        Collection::Bags => Filter::one_of_many("name", visible.bags()),
        Collection::Search => Filter::one_of_many("bag", visible.bags()),
    };
    filter.to_string()
}

/// Membership check for a single bag or recipe lookup.
pub fn gate(
    kind: EntityKind,
    name: &str,
    visible: &VisibilitySet,
    tier: RecipeTier,
) -> Result<(), ControlViewError> {
    let allowed = match kind {
        EntityKind::Bag => visible.contains_bag(name),
        EntityKind::Recipe => visible.recipes(tier).iter().any(|recipe| recipe == name),
    };
    if allowed {
        Ok(())
    } else {
        Err(ControlViewError::NotVisible {
            kind,
            name: name.to_string(),
        })
    }
}

fn apply_route(
    route: CoreRoute,
    visible: &VisibilitySet,
    tier: RecipeTier,
    chain: &mut FilterChain,
) -> Result<Outcome, ControlViewError> {
    match route {
        CoreRoute::Collection(collection) => {
            let text = synthesize_filter(collection, visible, tier);
            chain.insert_front(parse_synthesized(&text)?);
            Ok(Outcome::Filtered(text))
        }
        CoreRoute::Entity(kind, name) => {
            gate(kind, &name, visible, tier)?;
            Ok(Outcome::Allowed(kind, name))
        }
    }
}

fn parse_synthesized(text: &str) -> Result<Vec<Filter>, ControlViewError> {
    parse_for_filters(text)
        .map(|(filters, _)| filters)
        .map_err(|err| {
            error!(filter = %text, %err, "controlview built a filter it cannot parse");
            ControlViewError::Filter(err)
        })
}
