//! YAML-backed, read-only entity store.

use std::collections::BTreeMap;
use std::path::Path;

use controlview_core::{naming, FilterChain, FilterError, RecipeStore, StoreError, Template};
use controlview_types::{Bag, Recipe, Tiddler};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreLoadError {
    #[error("Failed to read store file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Tiddler {title:?} is in unknown bag {bag:?}")]
    UnknownBag { title: String, bag: String },

    #[error("Bag filter in recipe {recipe:?} is malformed: {source}")]
    BadRecipeFilter { recipe: String, source: FilterError },
}

/// Errors from reading entities out of a loaded store.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LookupError {
    #[error("bag {0} not found")]
    NoBag(String),

    #[error(transparent)]
    Recipe(#[from] StoreError),

    /// A recipe line's filter stopped parsing once the template was filled in.
    #[error("filter {filter:?} for bag {bag:?} in recipe {recipe:?} is malformed: {source}")]
    BadLineFilter {
        recipe: String,
        bag: String,
        filter: String,
        source: FilterError,
    },
}

/// On-disk layout of the store file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub bags: Vec<Bag>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub tiddlers: Vec<Tiddler>,
}

/// Entities held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bags: BTreeMap<String, Bag>,
    recipes: BTreeMap<String, Recipe>,
    /// Tiddlers per bag, keyed by title.
    tiddlers: BTreeMap<String, BTreeMap<String, Tiddler>>,
}

impl MemoryStore {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreLoadError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let data: StoreData = serde_yaml::from_str(&raw)?;
        Self::from_data(data)
    }

    pub fn from_data(data: StoreData) -> Result<Self, StoreLoadError> {
        let mut store = MemoryStore::default();

        for bag in data.bags {
            store.tiddlers.entry(bag.name.clone()).or_default();
            store.bags.insert(bag.name.clone(), bag);
        }

        for recipe in data.recipes {
            for line in &recipe.recipe {
                if let Err(source) = controlview_core::parse_for_filters(&line.filter) {
                    return Err(StoreLoadError::BadRecipeFilter {
                        recipe: recipe.name.clone(),
                        source,
                    });
                }
            }
            store.recipes.insert(recipe.name.clone(), recipe);
        }

        for tiddler in data.tiddlers {
            let Some(bag) = store.tiddlers.get_mut(&tiddler.bag) else {
                return Err(StoreLoadError::UnknownBag {
                    title: tiddler.title,
                    bag: tiddler.bag,
                });
            };
            bag.insert(tiddler.title.clone(), tiddler);
        }

        debug!(
            bags = store.bags.len(),
            recipes = store.recipes.len(),
            "store loaded"
        );
        Ok(store)
    }

    pub fn bags(&self) -> Vec<Bag> {
        self.bags.values().cloned().collect()
    }

    pub fn recipes(&self) -> Vec<Recipe> {
        self.recipes.values().cloned().collect()
    }

    pub fn get_bag(&self, name: &str) -> Result<Bag, LookupError> {
        self.bags
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::NoBag(name.to_string()))
    }

    pub fn has_recipe(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    pub fn bag_tiddlers(&self, name: &str) -> Result<Vec<Tiddler>, LookupError> {
        self.tiddlers
            .get(name)
            .map(|tiddlers| tiddlers.values().cloned().collect())
            .ok_or_else(|| LookupError::NoBag(name.to_string()))
    }

    /// Tiddlers a recipe resolves to. Each line contributes the tiddlers of
    /// its bag that pass the line's filter; a later bag wins a title clash.
    ///
    /// A line filter that no longer parses after template expansion fails the
    /// whole lookup rather than letting the line through unfiltered.
    pub fn recipe_tiddlers(&self, name: &str, template: &Template) -> Result<Vec<Tiddler>, LookupError> {
        let recipe = self.get_recipe(name)?;
        let mut by_title: BTreeMap<String, Tiddler> = BTreeMap::new();

        for (bag, filter) in controlview_core::expand_recipe(&recipe, template) {
            let tiddlers = self.bag_tiddlers(&bag)?;
            let chain = match controlview_core::parse_for_filters(&filter) {
                Ok((filters, _)) => FilterChain::from(filters),
                Err(source) => {
                    return Err(LookupError::BadLineFilter {
                        recipe: recipe.name,
                        bag,
                        filter,
                        source,
                    })
                }
            };
            for tiddler in chain.apply(tiddlers) {
                by_title.insert(tiddler.title.clone(), tiddler);
            }
        }

        Ok(by_title.into_values().collect())
    }

    /// Every tiddler whose title, text or tags contain `query`,
    /// case-insensitively. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<Tiddler> {
        let needle = query.trim().to_lowercase();
        self.tiddlers
            .values()
            .flat_map(|tiddlers| tiddlers.values())
            .filter(|t| {
                needle.is_empty()
                    || t.title.to_lowercase().contains(&needle)
                    || t.text.to_lowercase().contains(&needle)
                    || t.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// Members of a space are the managers of its private bag.
    pub fn is_member(&self, space: &str, user: &str) -> bool {
        self.bags
            .get(&naming::private_bag(space))
            .is_some_and(|bag| bag.policy.manage.iter().any(|m| m == user))
    }
}

impl RecipeStore for MemoryStore {
    fn get_recipe(&self, name: &str) -> Result<Recipe, StoreError> {
        self.recipes
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NoRecipe(name.to_string()))
    }
}
