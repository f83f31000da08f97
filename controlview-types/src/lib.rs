//! Shared types for controlview
//!
//! This crate provides the stored entities that the visibility layer reads:
//! bags, recipes and the tiddlers that live in bags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access lists attached to a bag. Entries are user names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub write: Vec<String>,
    /// Users allowed to manage the bag. For a space's private bag these
    /// are the space members.
    #[serde(default)]
    pub manage: Vec<String>,
}

/// A named content collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bag {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub policy: Policy,
}

impl Bag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            policy: Policy::default(),
        }
    }
}

/// One line of a recipe: a bag and the filter selecting from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub bag: String,
    #[serde(default)]
    pub filter: String,
}

impl RecipeLine {
    pub fn new(bag: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            bag: bag.into(),
            filter: filter.into(),
        }
    }
}

/// An ordered composition of bags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recipe: Vec<RecipeLine>,
}

impl Recipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            recipe: Vec::new(),
        }
    }

    /// Builder-style helper used when assembling recipes in code.
    pub fn with_bags<I, S>(mut self, bags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipe
            .extend(bags.into_iter().map(|bag| RecipeLine::new(bag, "")));
        self
    }
}

/// A single piece of content stored in a bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tiddler {
    pub title: String,
    pub bag: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub modifier: Option<String>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl Tiddler {
    pub fn new(title: impl Into<String>, bag: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bag: bag.into(),
            text: String::new(),
            tags: Vec::new(),
            modifier: None,
            modified: None,
        }
    }
}
