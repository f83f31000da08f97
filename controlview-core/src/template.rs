//! Recipe templates.
//!
//! Recipe lines may contain `{{ key }}` placeholders (for example a bag named
//! `{{ user }}_notes`). Expanding a recipe substitutes them from a
//! request-derived [`Template`].

use std::collections::BTreeMap;

use controlview_types::Recipe;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid placeholder regex"));

/// Values available to recipe placeholders for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template(BTreeMap<String, String>);

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Substitute placeholders in `text`. Unknown keys become empty.
    pub fn render(&self, text: &str) -> String {
        if !text.contains("{{") {
            return text.to_string();
        }
        PLACEHOLDER_RE
            .replace_all(text, |caps: &Captures<'_>| {
                self.get(&caps[1]).unwrap_or_default().to_string()
            })
            .into_owned()
    }
}

/// Expand `recipe` into concrete `(bag, filter)` pairs, in recipe order.
pub fn expand_recipe(recipe: &Recipe, template: &Template) -> Vec<(String, String)> {
    recipe
        .recipe
        .iter()
        .map(|line| (template.render(&line.bag), template.render(&line.filter)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use controlview_types::RecipeLine;

    #[test]
    fn placeholders_are_substituted() {
        let template = Template::new().with("user", "alice").with("space", "acme");
        assert_eq!(template.render("{{ user }}_notes"), "alice_notes");
        assert_eq!(template.render("{{space}}_public"), "acme_public");
        assert_eq!(template.render("plain"), "plain");
    }

    #[test]
    fn unknown_placeholder_is_empty() {
        assert_eq!(Template::new().render("{{ nobody }}_public"), "_public");
    }

    #[test]
    fn expansion_keeps_order_and_duplicates() {
        let mut recipe = Recipe::new("acme_private").with_bags(["system", "acme_public"]);
        recipe
            .recipe
            .push(RecipeLine::new("{{ user }}_notes", "select=tag:{{ space }}"));
        recipe.recipe.push(RecipeLine::new("system", ""));

        let template = Template::new().with("user", "alice").with("space", "acme");
        let expanded = expand_recipe(&recipe, &template);

        let bags: Vec<&str> = expanded.iter().map(|(bag, _)| bag.as_str()).collect();
        assert_eq!(bags, ["system", "acme_public", "alice_notes", "system"]);
        assert_eq!(expanded[2].1, "select=tag:acme");
    }
}
