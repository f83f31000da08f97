//! Filter mini-language.
//!
//! Filters are written as query-string pairs separated by `&` or `;`:
//!
//! - `oom=field:a,b,c` keeps entities whose `field` is one of the values
//! - `select=field:value` keeps equal values, `select=field:!value` drops them
//! - `sort=field` / `sort=-field` orders ascending / descending
//! - `limit=n` or `limit=offset,n` truncates
//!
//! Pairs with any other key are not filters and are handed back to the caller
//! untouched. A request carries its filters in a [`FilterChain`] which is
//! applied front to back, so filters near the front constrain what later
//! ones can see.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use controlview_types::{Bag, Recipe, Tiddler};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("malformed {kind} filter: {value:?}")]
    Malformed { kind: &'static str, value: String },

    #[error("invalid limit: {0:?}")]
    InvalidLimit(String),

    #[error("filter string is not valid utf-8 once decoded: {0:?}")]
    Encoding(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    OneOfMany { field: String, values: Vec<String> },
    Select { field: String, value: String, negate: bool },
    Sort { field: String, descending: bool },
    Limit { offset: usize, count: usize },
}

/// Entities that filters can inspect.
pub trait Filterable {
    /// String value of a named attribute, if the entity has one.
    fn attribute(&self, field: &str) -> Option<Cow<'_, str>>;

    fn has_tag(&self, _tag: &str) -> bool {
        false
    }
}

impl Filter {
    pub fn one_of_many<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::OneOfMany {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn matches<T: Filterable>(item: &T, field: &str, value: &str) -> bool {
        if field == "tag" {
            return item.has_tag(value);
        }
        item.attribute(field).is_some_and(|attr| attr == value)
    }

    pub fn apply<T: Filterable>(&self, items: Vec<T>) -> Vec<T> {
        match self {
            Filter::OneOfMany { field, values } => items
                .into_iter()
                .filter(|item| values.iter().any(|v| Self::matches(item, field, v)))
                .collect(),
            Filter::Select {
                field,
                value,
                negate,
            } => items
                .into_iter()
                .filter(|item| Self::matches(item, field, value) != *negate)
                .collect(),
            Filter::Sort { field, descending } => {
                let mut items = items;
                items.sort_by(|a, b| {
                    let ord = compare_attr(a.attribute(field), b.attribute(field));
                    if *descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
                items
            }
            Filter::Limit { offset, count } => {
                items.into_iter().skip(*offset).take(*count).collect()
            }
        }
    }
}

fn compare_attr(a: Option<Cow<'_, str>>, b: Option<Cow<'_, str>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::OneOfMany { field, values } => {
                let values: Vec<_> = values.iter().map(|v| urlencoding::encode(v)).collect();
                write!(f, "oom={}:{}", field, values.join(","))
            }
            Filter::Select {
                field,
                value,
                negate,
            } => write!(f, "select={}:{}{}", field, if *negate { "!" } else { "" }, value),
            Filter::Sort { field, descending } => {
                write!(f, "sort={}{}", if *descending { "-" } else { "" }, field)
            }
            Filter::Limit { offset: 0, count } => write!(f, "limit={count}"),
            Filter::Limit { offset, count } => write!(f, "limit={offset},{count}"),
        }
    }
}

/// Keys that are not filters, in the order they appeared.
pub type Leftovers = Vec<(String, String)>;

/// Parse a filter string into filters plus the non-filter pairs.
pub fn parse_for_filters(text: &str) -> Result<(Vec<Filter>, Leftovers), FilterError> {
    let mut filters = Vec::new();
    let mut leftovers = Vec::new();

    for pair in text.split(['&', ';']).filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode(key)?;

        // Values are split before decoding so `%2C` stays inside one value.
        if key == "oom" {
            let (field, values) = split_field("oom", value)?;
            let values = values.split(',').map(decode).collect::<Result<Vec<_>, _>>()?;
            filters.push(Filter::one_of_many(decode(field)?, values));
            continue;
        }

        let value = decode(value)?;
        match key.as_str() {
            "select" => {
                let (field, rest) = split_field("select", &value)?;
                let (value, negate) = match rest.strip_prefix('!') {
                    Some(v) => (v, true),
                    None => (rest, false),
                };
                filters.push(Filter::Select {
                    field: field.to_string(),
                    value: value.to_string(),
                    negate,
                });
            }
            "sort" => {
                let (field, descending) = match value.strip_prefix('-') {
                    Some(f) => (f, true),
                    None => (value.as_str(), false),
                };
                if field.is_empty() {
                    return Err(FilterError::Malformed {
                        kind: "sort",
                        value: value.clone(),
                    });
                }
                filters.push(Filter::Sort {
                    field: field.to_string(),
                    descending,
                });
            }
            "limit" => filters.push(parse_limit(&value)?),
            _ => leftovers.push((key, value)),
        }
    }

    Ok((filters, leftovers))
}

fn decode(raw: &str) -> Result<String, FilterError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(Cow::into_owned)
        .map_err(|_| FilterError::Encoding(raw.to_string()))
}

fn split_field<'a>(kind: &'static str, value: &'a str) -> Result<(&'a str, &'a str), FilterError> {
    match value.split_once(':') {
        Some((field, rest)) if !field.is_empty() => Ok((field, rest)),
        _ => Err(FilterError::Malformed {
            kind,
            value: value.to_string(),
        }),
    }
}

fn parse_limit(value: &str) -> Result<Filter, FilterError> {
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| FilterError::InvalidLimit(value.to_string()))
    };
    match value.split_once(',') {
        Some((offset, count)) => Ok(Filter::Limit {
            offset: parse(offset)?,
            count: parse(count)?,
        }),
        None => Ok(Filter::Limit {
            offset: 0,
            count: parse(value)?,
        }),
    }
}

/// Request-scoped, ordered list of filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain(Vec<Filter>);

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Filter) {
        self.0.push(filter);
    }

    /// Put `filters` ahead of everything already in the chain, keeping
    /// their relative order.
    pub fn insert_front(&mut self, filters: Vec<Filter>) {
        self.0.splice(0..0, filters);
    }

    pub fn filters(&self) -> &[Filter] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn apply<T: Filterable>(&self, items: Vec<T>) -> Vec<T> {
        self.0.iter().fold(items, |items, filter| filter.apply(items))
    }
}

impl From<Vec<Filter>> for FilterChain {
    fn from(filters: Vec<Filter>) -> Self {
        Self(filters)
    }
}

impl Filterable for Bag {
    fn attribute(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "name" => Some(Cow::Borrowed(&self.name)),
            "description" => Some(Cow::Borrowed(&self.description)),
            _ => None,
        }
    }
}

impl Filterable for Recipe {
    fn attribute(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "name" => Some(Cow::Borrowed(&self.name)),
            "description" => Some(Cow::Borrowed(&self.description)),
            _ => None,
        }
    }
}

impl Filterable for Tiddler {
    fn attribute(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "title" => Some(Cow::Borrowed(&self.title)),
            "bag" => Some(Cow::Borrowed(&self.bag)),
            "text" => Some(Cow::Borrowed(&self.text)),
            "modifier" => self.modifier.as_deref().map(Cow::Borrowed),
            "modified" => self.modified.map(|m| Cow::Owned(m.to_rfc3339())),
            _ => None,
        }
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiddler(title: &str, bag: &str, tags: &[&str]) -> Tiddler {
        let mut t = Tiddler::new(title, bag);
        t.tags = tags.iter().map(|s| s.to_string()).collect();
        t
    }

    fn titles(items: &[Tiddler]) -> Vec<&str> {
        items.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn parses_one_of_many() {
        let (filters, leftovers) = parse_for_filters("oom=name:acme_public,tools_public").unwrap();
        assert_eq!(
            filters,
            vec![Filter::one_of_many("name", ["acme_public", "tools_public"])]
        );
        assert!(leftovers.is_empty());
    }

    #[test]
    fn parses_mixed_filters_and_leftovers() {
        let (filters, leftovers) =
            parse_for_filters("select=tag:!draft;sort=-modified&limit=5,10&q=hello+world").unwrap();

        assert_eq!(
            filters,
            vec![
                Filter::Select {
                    field: "tag".into(),
                    value: "draft".into(),
                    negate: true,
                },
                Filter::Sort {
                    field: "modified".into(),
                    descending: true,
                },
                Filter::Limit {
                    offset: 5,
                    count: 10,
                },
            ]
        );
        assert_eq!(leftovers, vec![("q".to_string(), "hello world".to_string())]);
    }

    #[test]
    fn percent_decodes_values() {
        let (filters, _) = parse_for_filters("select=title:Getting%20Started").unwrap();
        assert_eq!(filters[0].to_string(), "select=title:Getting Started");
    }

    #[test]
    fn one_of_many_values_decode_one_by_one() {
        let (filters, _) = parse_for_filters("oom=name:c%2B%2B,x%2Cother_private,my+bag").unwrap();
        assert_eq!(
            filters,
            vec![Filter::one_of_many("name", ["c++", "x,other_private", "my bag"])]
        );
        assert_eq!(
            filters[0].to_string(),
            "oom=name:c%2B%2B,x%2Cother_private,my%20bag"
        );
    }

    #[test]
    fn rejects_malformed_filters() {
        assert!(matches!(
            parse_for_filters("oom=acme_public"),
            Err(FilterError::Malformed { kind: "oom", .. })
        ));
        assert!(matches!(
            parse_for_filters("select=:x"),
            Err(FilterError::Malformed { kind: "select", .. })
        ));
        assert_eq!(
            parse_for_filters("limit=ten"),
            Err(FilterError::InvalidLimit("ten".into()))
        );
        assert!(parse_for_filters("sort=-").is_err());
    }

    #[test]
    fn display_matches_parse_input() {
        for text in ["oom=bag:a,b", "select=tag:!x", "sort=-title", "limit=3", "limit=1,2"] {
            let (filters, _) = parse_for_filters(text).unwrap();
            assert_eq!(filters[0].to_string(), text);
        }
    }

    #[test]
    fn one_of_many_selects_by_field() {
        let items = vec![
            tiddler("a", "acme_public", &[]),
            tiddler("b", "secret_private", &[]),
            tiddler("c", "tools_public", &[]),
        ];
        let kept = Filter::one_of_many("bag", ["acme_public", "tools_public"]).apply(items);
        assert_eq!(titles(&kept), ["a", "c"]);
    }

    #[test]
    fn tag_select_and_negation() {
        let items = vec![
            tiddler("a", "x", &["draft"]),
            tiddler("b", "x", &["published"]),
        ];
        let (filters, _) = parse_for_filters("select=tag:!draft").unwrap();
        let kept = FilterChain::from(filters).apply(items);
        assert_eq!(titles(&kept), ["b"]);
    }

    #[test]
    fn chain_runs_front_to_back() {
        let items = vec![
            tiddler("c", "acme_public", &[]),
            tiddler("a", "other_private", &[]),
            tiddler("b", "acme_public", &[]),
        ];

        let (user, _) = parse_for_filters("sort=title&limit=1").unwrap();
        let mut chain = FilterChain::from(user);
        chain.insert_front(vec![Filter::one_of_many("bag", ["acme_public"])]);

        assert_eq!(chain.filters()[0].to_string(), "oom=bag:acme_public");
        // The hidden "a" must not win the limit.
        assert_eq!(titles(&chain.apply(items)), ["b"]);
    }

    #[test]
    fn insert_front_keeps_relative_order() {
        let mut chain = FilterChain::new();
        chain.push(Filter::Limit { offset: 0, count: 1 });
        chain.insert_front(vec![
            Filter::one_of_many("name", ["a"]),
            Filter::one_of_many("name", ["b"]),
        ]);
        let rendered: Vec<String> = chain.filters().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["oom=name:a", "oom=name:b", "limit=1"]);
    }

    #[test]
    fn sort_puts_missing_attributes_first() {
        let mut with_modifier = tiddler("b", "x", &[]);
        with_modifier.modifier = Some("alice".into());
        let items = vec![with_modifier, tiddler("a", "x", &[])];
        let sorted = Filter::Sort {
            field: "modifier".into(),
            descending: false,
        }
        .apply(items);
        assert_eq!(titles(&sorted), ["a", "b"]);
    }
}
