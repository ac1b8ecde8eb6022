//! Directory configuration.
//!
//! Loaded once at startup and shared read-only (`Arc<DirectoryConfig>`)
//! with the engine and the script source. The original key names
//! (`Server`, `WindowsDomain`, `XMLConfigurationFile`, ...) are accepted as
//! aliases so existing configuration files keep working.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;
use crate::model::UserAccount;

pub const DEFAULT_POWERSHELL: &str = "C:/Windows/System32/WindowsPowerShell/v1.0/powershell.exe";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Primary Windows host; also the fallback execution server.
    #[serde(alias = "Server")]
    pub server: String,
    /// Service account used for the reserved connections and the exec script.
    #[serde(alias = "User")]
    pub user: String,
    #[serde(alias = "Password")]
    pub password: String,
    #[serde(alias = "SSHPort")]
    pub ssh_port: String,
    #[serde(alias = "RDPPort")]
    pub rdp_port: String,
    #[serde(alias = "WindowsDomain")]
    pub windows_domain: String,
    /// Candidate hosts for application sessions.
    #[serde(alias = "ExecutionServers")]
    pub execution_servers: Vec<String>,
    /// Gateway connection document.
    #[serde(alias = "XMLConfigurationFile")]
    pub xml_configuration_file: PathBuf,
    /// Script that runs a command on the Windows host.
    pub exec_script: PathBuf,
    /// Shell fragment the exec script sources for its connection settings.
    pub script_config_file: PathBuf,
    pub powershell_path: String,
    /// RDS collection applications are unpublished from.
    pub apps_collection: String,
    pub command_timeout_secs: u64,
    /// Accounts entitled to remote applications.
    pub users: Vec<UserAccount>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            user: String::new(),
            password: String::new(),
            ssh_port: "22".into(),
            rdp_port: "3389".into(),
            windows_domain: String::new(),
            execution_servers: Vec::new(),
            xml_configuration_file: PathBuf::from("noauth-logins.xml"),
            exec_script: PathBuf::from("scripts/exec.sh"),
            script_config_file: PathBuf::from("scripts/configuration.sh"),
            powershell_path: DEFAULT_POWERSHELL.into(),
            apps_collection: "appscollection".into(),
            command_timeout_secs: 60,
            users: Vec::new(),
        }
    }
}

impl DirectoryConfig {
    /// Load a JSON configuration file and validate it.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DirectoryError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            DirectoryError::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.server.trim().is_empty() {
            return Err(DirectoryError::InvalidConfig("server must be set".into()));
        }
        if self.windows_domain.trim().is_empty() {
            return Err(DirectoryError::InvalidConfig("windows_domain must be set".into()));
        }
        if self.xml_configuration_file.as_os_str().is_empty() {
            return Err(DirectoryError::InvalidConfig(
                "xml_configuration_file must be set".into(),
            ));
        }
        if self.command_timeout_secs == 0 {
            return Err(DirectoryError::InvalidConfig(
                "command_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// `<logon>@<domain>`, the join key between users and connections.
    pub fn domain_user(&self, logon: &str) -> String {
        format!("{logon}@{}", self.windows_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> DirectoryConfig {
        DirectoryConfig {
            server: "10.0.0.1".into(),
            windows_domain: "CORP".into(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults() {
        let c = DirectoryConfig::default();
        assert_eq!(c.rdp_port, "3389");
        assert_eq!(c.ssh_port, "22");
        assert_eq!(c.apps_collection, "appscollection");
        assert_eq!(c.command_timeout(), Duration::from_secs(60));
        assert!(c.execution_servers.is_empty());
    }

    #[test]
    fn accepts_original_key_names() {
        let c: DirectoryConfig = serde_json::from_value(json!({
            "Server": "10.0.0.1",
            "User": "Administrator",
            "Password": "secret",
            "SSHPort": "2222",
            "RDPPort": "3390",
            "WindowsDomain": "CORP",
            "ExecutionServers": ["10.0.0.2", "10.0.0.3"],
            "XMLConfigurationFile": "/etc/guacamole/noauth-config.xml",
        }))
        .unwrap();
        assert_eq!(c.server, "10.0.0.1");
        assert_eq!(c.ssh_port, "2222");
        assert_eq!(c.execution_servers.len(), 2);
        assert_eq!(
            c.xml_configuration_file,
            PathBuf::from("/etc/guacamole/noauth-config.xml")
        );
        // Unset keys keep their defaults
        assert_eq!(c.apps_collection, "appscollection");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_server() {
        let c = DirectoryConfig {
            server: " ".into(),
            ..valid()
        };
        assert!(matches!(c.validate(), Err(DirectoryError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_missing_domain() {
        let c = DirectoryConfig {
            windows_domain: String::new(),
            ..valid()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let c = DirectoryConfig {
            command_timeout_secs: 0,
            ..valid()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn domain_user_joins_with_at() {
        assert_eq!(valid().domain_user("alice"), "alice@CORP");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        std::fs::write(
            &path,
            r#"{"server": "win1", "windows_domain": "CORP", "users": [{"Email": "a@x.com", "Sam": "a", "Password": "p"}]}"#,
        )
        .unwrap();
        let c = DirectoryConfig::load(&path).unwrap();
        assert_eq!(c.server, "win1");
        assert_eq!(c.users.len(), 1);
        assert_eq!(c.users[0].sam, "a");
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = DirectoryConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("cannot parse"));
    }

    #[test]
    fn load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        std::fs::write(&path, r#"{"server": "win1", "command_timeout_secs": 0}"#).unwrap();
        assert!(matches!(
            DirectoryConfig::load(&path),
            Err(DirectoryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = DirectoryConfig::load(Path::new("/nonexistent/apps.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
