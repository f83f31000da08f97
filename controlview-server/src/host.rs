//! Mapping requests to hosts, spaces and space recipes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, request::Parts, HeaderMap};
use controlview_core::{naming, HostPair, SpaceResolver, Template};

use crate::auth::AuthState;
use crate::store::MemoryStore;

/// Lowercase a host and drop the default HTTP port.
pub fn normalize_host(raw: &str) -> String {
    let host = raw.trim().to_ascii_lowercase();
    match host.strip_suffix(":80") {
        Some(bare) => bare.to_string(),
        None => host,
    }
}

/// Resolves hosts to spaces against the configured canonical host, aliases
/// and the store contents.
#[derive(Clone)]
pub struct HostResolver {
    server_host: String,
    aliases: Arc<HashMap<String, String>>,
    store: Arc<MemoryStore>,
    auth: AuthState,
}

impl HostResolver {
    pub fn new(
        server_host: impl Into<String>,
        aliases: HashMap<String, String>,
        store: Arc<MemoryStore>,
        auth: AuthState,
    ) -> Self {
        Self {
            server_host: normalize_host(&server_host.into()),
            aliases: Arc::new(aliases),
            store,
            auth,
        }
    }

    /// Host named by the request, preferring a proxy's forwarded host.
    pub fn request_host(&self, parts: &Parts) -> String {
        let forwarded = header_str(&parts.headers, "x-forwarded-host")
            .and_then(|value| value.split(',').next());
        let raw = forwarded
            .or_else(|| header_str(&parts.headers, header::HOST.as_str()))
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or(self.server_host.as_str());
        normalize_host(raw)
    }

    /// Space for `host`, before checking that it exists.
    fn space_name_for(&self, host: &str) -> Option<String> {
        if let Some(space) = self.aliases.get(host) {
            return Some(space.clone());
        }
        let sub = host.strip_suffix(&self.server_host)?.strip_suffix('.')?;
        if sub.is_empty() || sub.contains('.') {
            return None;
        }
        Some(sub.to_string())
    }

    pub fn user(&self, parts: &Parts) -> String {
        self.auth.user_for(&parts.headers)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl SpaceResolver<Parts> for HostResolver {
    fn determine_host(&self, req: &Parts) -> HostPair {
        HostPair {
            current: self.request_host(req),
            canonical: self.server_host.clone(),
        }
    }

    fn determine_space(&self, _req: &Parts, host: &str) -> Option<String> {
        let space = self.space_name_for(host)?;
        // A space exists once its public recipe does.
        self.store
            .has_recipe(&naming::public_bag(&space))
            .then_some(space)
    }

    fn determine_space_recipe(&self, req: &Parts, space: &str) -> String {
        if self.store.is_member(space, &self.user(req)) {
            naming::private_bag(space)
        } else {
            naming::public_bag(space)
        }
    }

    fn recipe_template(&self, req: &Parts) -> Template {
        let host = self.request_host(req);
        let mut template = Template::new().with("user", self.user(req));
        if let Some(space) = self.space_name_for(&host) {
            template.insert("space", space);
        }
        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use controlview_types::{Bag, Policy, Recipe};

    use crate::store::StoreData;

    fn resolver() -> HostResolver {
        let mut private = Bag::new("acme_private");
        private.policy = Policy {
            manage: vec!["GUEST".into()],
            ..Policy::default()
        };
        let store = MemoryStore::from_data(StoreData {
            bags: vec![Bag::new("acme_public"), private],
            recipes: vec![Recipe::new("acme_public"), Recipe::new("acme_private")],
            tiddlers: Vec::new(),
        })
        .unwrap();

        HostResolver::new(
            "Example.com",
            HashMap::from([("mysite.org".to_string(), "acme".to_string())]),
            Arc::new(store),
            AuthState::default(),
        )
    }

    fn parts(host: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .uri("/bags")
            .header("host", host)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn normalizes_hosts() {
        assert_eq!(normalize_host(" ACME.Example.com:80 "), "acme.example.com");
        assert_eq!(normalize_host("example.com:8080"), "example.com:8080");
    }

    #[test]
    fn subdomain_and_alias_resolve() {
        let r = resolver();
        let p = parts("acme.example.com");
        assert_eq!(r.determine_space(&p, "acme.example.com"), Some("acme".into()));
        assert_eq!(r.determine_space(&p, "mysite.org"), Some("acme".into()));
        assert_eq!(r.determine_space(&p, "ghost.example.com"), None);
        assert_eq!(r.determine_space(&p, "a.b.example.com"), None);
        assert_eq!(r.determine_space(&p, "example.com"), None);
        assert_eq!(r.determine_space(&p, "notexample.com"), None);
    }

    #[test]
    fn forwarded_host_wins() {
        let r = resolver();
        let mut p = parts("internal:3000");
        p.headers.insert("x-forwarded-host", "Acme.Example.com, proxy".parse().unwrap());
        let hosts = r.determine_host(&p);
        assert_eq!(hosts.current, "acme.example.com");
        assert_eq!(hosts.canonical, "example.com");
    }

    #[test]
    fn members_get_private_recipe() {
        let r = resolver();
        let p = parts("acme.example.com");
        // The guest user is listed as a manager of acme_private above.
        assert_eq!(r.determine_space_recipe(&p, "acme"), "acme_private");
        assert_eq!(r.determine_space_recipe(&p, "tools"), "tools_public");
    }

    #[test]
    fn template_has_user_and_space() {
        let r = resolver();
        let template = r.recipe_template(&parts("acme.example.com"));
        assert_eq!(template.get("user"), Some("GUEST"));
        assert_eq!(template.get("space"), Some("acme"));
    }
}
