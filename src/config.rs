use clap::Parser;
use std::path::PathBuf;

/// Student results sidecar. Reads one JSON request per line on stdin and
/// answers one JSON response per line on stdout. Logs go to stderr.
#[derive(Debug, Clone, Parser)]
#[command(name = "srmsd", version)]
pub struct Args {
    /// Workspace directory to open on start.
    #[arg(long, env = "SRMSD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Admin username written to a workspace that has no admin account yet.
    #[arg(long, env = "SRMSD_ADMIN_USER", default_value = "admin")]
    pub admin_user: String,

    /// Admin password written to a workspace that has no admin account yet.
    #[arg(long, env = "SRMSD_ADMIN_PASSWORD", default_value = "admin123", hide_env_values = true)]
    pub admin_password: String,

    /// Log level (error, warn, info, debug, trace) or a full filter directive.
    #[arg(long, env = "SRMSD_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

/// Credentials used to seed a fresh workspace.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

impl Args {
    pub fn admin_seed(&self) -> AdminSeed {
        AdminSeed {
            username: self.admin_user.clone(),
            password: self.admin_password.clone(),
        }
    }
}

impl Default for AdminSeed {
    fn default() -> Self {
        AdminSeed {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_admin() {
        let args = Args::try_parse_from(["srmsd"]).expect("parse");
        assert!(args.workspace.is_none());
        assert_eq!(args.log_level, "warn");
        let seed = args.admin_seed();
        assert_eq!(seed.username, AdminSeed::default().username);
        assert_eq!(seed.password, AdminSeed::default().password);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "srmsd",
            "--workspace",
            "/tmp/ws",
            "--admin-user",
            "root",
            "--log-json",
        ])
        .expect("parse");
        assert_eq!(args.workspace, Some(PathBuf::from("/tmp/ws")));
        assert_eq!(args.admin_seed().username, "root");
        assert!(args.log_json);
    }
}
