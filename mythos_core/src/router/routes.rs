//! Route table and fragment matching

use crate::error::{InternalError, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Named views the router can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteName {
    Home,
    Mythology,
    Category,
    Entity,
    Search,
}

impl RouteName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteName::Home => "home",
            RouteName::Mythology => "mythology",
            RouteName::Category => "category",
            RouteName::Entity => "entity",
            RouteName::Search => "search",
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Route {
    name: RouteName,
    pattern: Regex,
    params: &'static [&'static str],
}

/// Result of matching a fragment against the route table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMatch {
    pub name: RouteName,
    /// Captured path parameters in pattern order
    pub params: Vec<(String, String)>,
    /// Decoded query parameters (`/search?q=..`)
    pub query: BTreeMap<String, String>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Captured parameter values in pattern order
    pub fn values(&self) -> Vec<&str> {
        self.params.iter().map(|(_, value)| value.as_str()).collect()
    }
}

/// Ordered route table; the first matching pattern wins
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Result<Self> {
        let table: [(RouteName, &str, &'static [&'static str]); 5] = [
            (RouteName::Home, r"^/?$", &[]),
            (RouteName::Mythology, r"^/mythology/([^/]+)/?$", &["id"]),
            (
                RouteName::Category,
                r"^/mythology/([^/]+)/([^/]+)/?$",
                &["id", "type"],
            ),
            (
                RouteName::Entity,
                r"^/mythology/([^/]+)/([^/]+)/([^/]+)/?$",
                &["id", "type", "entityId"],
            ),
            (RouteName::Search, r"^/search/?$", &[]),
        ];

        let routes = table
            .into_iter()
            .map(|(name, pattern, params)| {
                let pattern = Regex::new(pattern).map_err(|e| {
                    InternalError::assertion(format!("invalid pattern for route {name}: {e}"))
                })?;
                Ok(Route {
                    name,
                    pattern,
                    params,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { routes })
    }

    /// Match a location fragment (with or without the leading `#`)
    pub fn resolve(&self, fragment: &str) -> Option<RouteMatch> {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let (path, query) = match fragment.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (fragment, BTreeMap::new()),
        };

        self.routes.iter().find_map(|route| {
            let captures = route.pattern.captures(path)?;
            let params = route
                .params
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = captures.get(i + 1).map_or("", |m| m.as_str());
                    (name.to_string(), decode_component(value))
                })
                .collect();

            Some(RouteMatch {
                name: route.name,
                params,
                query: query.clone(),
            })
        })
    }
}

/// Give `path` the fragment marker: `"/search"` becomes `"#/search"`
pub fn normalize(path: &str) -> String {
    if path.starts_with('#') {
        path.to_string()
    } else {
        format!("#{path}")
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// Decode a form-encoded component: `+` is a space, and `%XX` escapes
/// that are malformed or not UTF-8 are kept or replaced rather than rejected
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new().unwrap()
    }

    #[test]
    fn test_home_variants() {
        let table = table();
        for fragment in ["", "/", "#", "#/"] {
            let matched = table.resolve(fragment).unwrap();
            assert_eq!(matched.name, RouteName::Home, "fragment {fragment:?}");
        }
    }

    #[test]
    fn test_entity_params_in_order() {
        let matched = table().resolve("/mythology/greek/deities/zeus").unwrap();
        assert_eq!(matched.name, RouteName::Entity);
        assert_eq!(matched.values(), vec!["greek", "deities", "zeus"]);
        assert_eq!(matched.param("entityId"), Some("zeus"));
    }

    #[test]
    fn test_mythology_and_category() {
        let table = table();
        let mythology = table.resolve("#/mythology/norse").unwrap();
        assert_eq!(mythology.name, RouteName::Mythology);
        assert_eq!(mythology.param("id"), Some("norse"));

        let category = table.resolve("#/mythology/norse/creatures/").unwrap();
        assert_eq!(category.name, RouteName::Category);
        assert_eq!(category.param("type"), Some("creatures"));
    }

    #[test]
    fn test_search_query_is_decoded() {
        let matched = table()
            .resolve("#/search?q=thunder+god&collection=deities&mythology=norse%20old")
            .unwrap();
        assert_eq!(matched.name, RouteName::Search);
        assert_eq!(matched.query["q"], "thunder god");
        assert_eq!(matched.query["collection"], "deities");
        assert_eq!(matched.query["mythology"], "norse old");
    }

    #[test]
    fn test_unknown_paths_do_not_match() {
        let table = table();
        assert!(table.resolve("#/pantheon/greek").is_none());
        assert!(table.resolve("#/mythology/a/b/c/d").is_none());
        assert!(table.resolve("#/mythology/").is_none());
    }

    #[test]
    fn test_normalize_adds_marker_once() {
        assert_eq!(normalize("/search"), "#/search");
        assert_eq!(normalize("#/search"), "#/search");
        assert_eq!(normalize(""), "#");
    }

    #[test]
    fn test_malformed_escape_kept() {
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%zz"), "%zz");
    }

    #[test]
    fn test_components_decoded() {
        assert_eq!(decode_component("%C3%81sgar%C3%B0r"), "Ásgarðr");
        assert_eq!(decode_component("war+god"), "war god");
        assert_eq!(decode_component("a%2Bb"), "a+b");

        let matched = table()
            .resolve("#/search?q=storm+god&realm=%C3%81sgar%C3%B0r")
            .unwrap();
        assert_eq!(matched.query["q"], "storm god");
        assert_eq!(matched.query["realm"], "Ásgarðr");
    }
}
