//! # controlview-core
//!
//! Core library for space-scoped visibility in a multi-space wiki store.
//!
//! This crate computes which bags and recipes belong to a space, turns that
//! into filters for listing and search requests, and rejects direct lookups
//! of entities outside the space.

pub mod control;
pub mod filter;
pub mod naming;
pub mod template;
pub mod visibility;

pub use control::{
    is_disabled, Collection, ControlView, ControlViewConfig, ControlViewError, CoreRoute,
    EntityKind, HostPair, Outcome, RecipeStore, SpaceResolver, StoreError, CONTROL_VIEW_HEADER,
    DEFAULT_ADMIN_BAGS,
};
pub use filter::{parse_for_filters, Filter, FilterChain, FilterError, Filterable};
pub use naming::RecipeTier;
pub use template::{expand_recipe, Template};
pub use visibility::VisibilitySet;
