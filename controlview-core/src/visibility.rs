//! Visibility sets: which bags belong to a space.

use controlview_types::Recipe;

use crate::naming::{self, RecipeTier};
use crate::template::{expand_recipe, Template};

/// Bags observable through one space, computed fresh for each request.
///
/// `bags` holds the archive bag, every bag the space recipe expands to and
/// the admin bags, in that order with later duplicates dropped.
/// `subscriptions` names the other spaces whose public bag the recipe
/// includes, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilitySet {
    space: String,
    bags: Vec<String>,
    subscriptions: Vec<String>,
}

impl VisibilitySet {
    pub fn build(space: &str, recipe: &Recipe, template: &Template, admin_bags: &[String]) -> Self {
        let mut bags = Vec::new();
        let mut subscriptions = Vec::new();

        push_unique(&mut bags, naming::archive_bag(space));

        for (bag, _filter) in expand_recipe(recipe, template) {
            if let Some(owner) = naming::subscription_of(space, &bag) {
                push_unique(&mut subscriptions, owner.to_string());
            }
            push_unique(&mut bags, bag);
        }

        for bag in admin_bags {
            push_unique(&mut bags, bag.clone());
        }

        Self {
            space: space.to_string(),
            bags,
            subscriptions,
        }
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    pub fn bags(&self) -> &[String] {
        &self.bags
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn contains_bag(&self, name: &str) -> bool {
        self.bags.iter().any(|bag| bag == name)
    }

    /// Recipe names visible at `tier`: the space's own recipes for that
    /// tier followed by the public recipe of every subscription.
    pub fn recipes(&self, tier: RecipeTier) -> Vec<String> {
        let mut recipes = tier.own_recipes(&self.space);
        for subscription in &self.subscriptions {
            push_unique(&mut recipes, naming::public_bag(subscription));
        }
        recipes
    }
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}
