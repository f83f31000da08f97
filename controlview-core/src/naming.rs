//! Space naming convention.
//!
//! Ownership and access tier are encoded in entity names: a space `acme`
//! owns `acme_public`, `acme_private` and `acme_archive`, and has one recipe
//! per tier with the same names as its public and private bags. A
//! `_public` bag owned by some other space that shows up in a recipe is a
//! subscription to that space.

pub const PUBLIC_SUFFIX: &str = "_public";
pub const PRIVATE_SUFFIX: &str = "_private";
pub const ARCHIVE_SUFFIX: &str = "_archive";

pub fn archive_bag(space: &str) -> String {
    format!("{space}{ARCHIVE_SUFFIX}")
}

pub fn public_bag(space: &str) -> String {
    format!("{space}{PUBLIC_SUFFIX}")
}

pub fn private_bag(space: &str) -> String {
    format!("{space}{PRIVATE_SUFFIX}")
}

pub fn is_public(name: &str) -> bool {
    name.ends_with(PUBLIC_SUFFIX)
}

/// Space that owns a `_public` bag or recipe, if the name follows the
/// convention.
pub fn owner_of(name: &str) -> Option<&str> {
    name.strip_suffix(PUBLIC_SUFFIX)
        .filter(|owner| !owner.is_empty())
}

/// True for names in the space's own tier namespace (`<space>_p...`).
///
/// This is a prefix match, so `acme_pets_public` counts as belonging to
/// `acme` and is never treated as a subscription.
pub fn is_own_tier_bag(space: &str, name: &str) -> bool {
    name.strip_prefix(space)
        .is_some_and(|rest| rest.starts_with("_p"))
}

/// Subscribed space named by `bag`, as seen from `space`'s recipe.
pub fn subscription_of<'a>(space: &str, bag: &'a str) -> Option<&'a str> {
    if is_own_tier_bag(space, bag) {
        return None;
    }
    owner_of(bag)
}

/// Which of a space's two recipes is serving the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeTier {
    Private,
    Public,
}

impl RecipeTier {
    pub fn of(recipe_name: &str) -> Self {
        if recipe_name.ends_with(PRIVATE_SUFFIX) {
            RecipeTier::Private
        } else {
            RecipeTier::Public
        }
    }

    /// The space's own recipes reachable at this tier, most private first.
    pub fn own_recipes(self, space: &str) -> Vec<String> {
        match self {
            RecipeTier::Private => vec![private_bag(space), public_bag(space)],
            RecipeTier::Public => vec![public_bag(space)],
        }
    }
}
