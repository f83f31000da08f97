use std::path::PathBuf;

use clap::Parser;

/// CLI for the controlview server.
#[derive(Debug, Clone, Parser)]
#[command(name = "controlview", about = "Space-scoped read server for a multi-space wiki store")]
pub struct Cli {
    /// YAML file holding bags, recipes and tiddlers
    #[arg(long, env = "CONTROLVIEW_STORE", default_value = "store.yml")]
    pub store: PathBuf,

    /// Listen address for HTTP endpoints
    #[arg(long, env = "CONTROLVIEW_ADDR", default_value = "127.0.0.1:8080")]
    pub listen_addr: String,

    /// Canonical host of the system. Spaces are served from subdomains of it.
    #[arg(long, env = "CONTROLVIEW_SERVER_HOST", default_value = "localhost:8080")]
    pub server_host: String,

    /// Custom domain mapped to a space, as `host=space`. Repeatable.
    #[arg(long = "alias", env = "CONTROLVIEW_ALIASES", value_delimiter = ',')]
    pub aliases: Vec<String>,

    /// Bags visible from every space
    #[arg(
        long = "admin-bag",
        env = "CONTROLVIEW_ADMIN_BAGS",
        value_delimiter = ',',
        default_value = "MAPSPACE,MAPUSER"
    )]
    pub admin_bags: Vec<String>,

    /// Answer 404 when a non-canonical host maps to no space, instead of
    /// serving the request unfiltered.
    #[arg(long, env = "CONTROLVIEW_FAIL_CLOSED", default_value = "false")]
    pub fail_closed: bool,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Auth options
    // ─────────────────────────────────────────────────────────────────────────

    /// Secret for verifying user JWT tokens (HS256).
    /// If not set, every request is served as the guest user.
    #[arg(long, env = "CONTROLVIEW_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: Option<String>,

    /// Expected JWT audience claim (optional).
    #[arg(long, env = "CONTROLVIEW_AUTH_AUDIENCE")]
    pub auth_audience: Option<String>,
}
