use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use controlview_core::ControlViewConfig;

use crate::auth::AuthConfig;
use crate::cli::Cli;
use crate::host::normalize_host;

/// Runtime configuration derived from CLI/env.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub store_path: PathBuf,
    pub listen_addr: String,
    pub server_host: String,
    /// Custom domain -> space name.
    pub aliases: HashMap<String, String>,
    pub control: ControlViewConfig,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let store_path = if cli.store.is_relative() {
            std::env::current_dir()?.join(&cli.store)
        } else {
            cli.store.clone()
        };

        let aliases = parse_aliases(&cli.aliases)?;

        let control = ControlViewConfig {
            admin_bags: cli
                .admin_bags
                .iter()
                .map(|bag| bag.trim().to_string())
                .filter(|bag| !bag.is_empty())
                .collect(),
            fail_closed: cli.fail_closed,
        };

        let auth = AuthConfig {
            secret: cli.auth_secret.clone(),
            expected_aud: cli.auth_audience.clone(),
        };

        Ok(Self {
            store_path,
            listen_addr: cli.listen_addr.clone(),
            server_host: normalize_host(&cli.server_host),
            aliases,
            control,
            auth,
        })
    }
}

fn parse_aliases(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut aliases = HashMap::new();
    for entry in raw.iter().filter(|e| !e.trim().is_empty()) {
        let Some((host, space)) = entry.split_once('=') else {
            bail!("alias {entry:?} is not of the form host=space");
        };
        let (host, space) = (normalize_host(host), space.trim());
        if host.is_empty() || space.is_empty() {
            bail!("alias {entry:?} has an empty host or space");
        }
        aliases.insert(host, space.to_string());
    }
    Ok(aliases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_cli_into_config() {
        let cli = Cli::parse_from([
            "controlview",
            "--store",
            "/srv/store.yml",
            "--server-host",
            "Example.com:80",
            "--alias",
            "mysite.org=acme,Other.Net=tools",
            "--admin-bag",
            "system, help",
        ]);
        let cfg = ServerConfig::from_cli(&cli).unwrap();

        assert_eq!(cfg.store_path, PathBuf::from("/srv/store.yml"));
        assert_eq!(cfg.server_host, "example.com");
        assert_eq!(cfg.aliases.get("mysite.org").map(String::as_str), Some("acme"));
        assert_eq!(cfg.aliases.get("other.net").map(String::as_str), Some("tools"));
        assert_eq!(cfg.control.admin_bags, ["system", "help"]);
        assert!(!cfg.control.fail_closed);
        assert!(cfg.auth.secret.is_none());
    }

    #[test]
    fn default_admin_bags() {
        let cli = Cli::parse_from(["controlview"]);
        let cfg = ServerConfig::from_cli(&cli).unwrap();
        assert_eq!(cfg.control.admin_bags, ["MAPSPACE", "MAPUSER"]);
    }

    #[test]
    fn rejects_bad_alias() {
        assert!(parse_aliases(&["mysite.org".to_string()]).is_err());
        assert!(parse_aliases(&["=acme".to_string()]).is_err());
    }
}
