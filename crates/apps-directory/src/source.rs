//! Application source — enumerates and unpublishes RemoteApp programs.
//!
//! The concrete source shells out to the exec script, which runs a
//! PowerShell command on the Windows host over SSH and prints its stdout.

use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::DirectoryConfig;
use crate::error::DirectoryError;
use crate::model::ApplicationDescriptor;

/// Capability the engine uses to reach the published applications.
pub trait ApplicationSource: Send + Sync {
    /// Current published applications.
    fn discover_applications(
        &self,
    ) -> impl Future<Output = Result<Vec<ApplicationDescriptor>, DirectoryError>> + Send;

    /// Remove `alias` from `collection`.
    fn unpublish(
        &self,
        alias: &str,
        collection: &str,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}

/// Parse the JSON printed by `Get-RDRemoteApp | ConvertTo-Json`.
///
/// Empty output means no applications. A single published application is
/// printed as a bare object, which is accepted as a one-element list.
pub fn parse_applications(output: &str) -> Result<Vec<ApplicationDescriptor>, DirectoryError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let parsed = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
    } else {
        serde_json::from_str(trimmed).map(|app: ApplicationDescriptor| vec![app])
    };

    parsed.map_err(|e| DirectoryError::SourceUnavailable(format!("malformed application list: {e}")))
}

/// Whether `value` can be embedded in a PowerShell command line as is.
fn is_safe_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Single-quote `value` for a shell assignment; `'` becomes `'\''`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Source backed by the exec script.
pub struct ScriptApplicationSource {
    config: Arc<DirectoryConfig>,
}

impl ScriptApplicationSource {
    pub fn new(config: Arc<DirectoryConfig>) -> Self {
        Self { config }
    }

    fn powershell(&self, command: &str) -> String {
        format!(
            "{} -Command \"Import-Module RemoteDesktop; {command}\"",
            self.config.powershell_path
        )
    }

    pub fn list_command(&self) -> String {
        self.powershell("Get-RDRemoteApp | ConvertTo-Json -Compress")
    }

    pub fn unpublish_command(&self, alias: &str, collection: &str) -> String {
        self.powershell(&format!(
            "Remove-RDRemoteApp -Alias {alias} -CollectionName {collection} -Force"
        ))
    }

    /// Settings sourced by the exec script. Regenerated before each discovery.
    pub fn script_config(&self) -> String {
        let c = &self.config;
        format!(
            "#!/bin/bash\n\n# DO NOT EDIT THIS FILE\n# automatically generated\n\n\
             USER={}\nSERVER={}\nPORT={}\nPASSWORD={}\n",
            shell_quote(&c.user),
            shell_quote(&c.server),
            shell_quote(&c.ssh_port),
            shell_quote(&c.password)
        )
    }

    async fn write_script_config(&self) -> Result<(), DirectoryError> {
        let path = &self.config.script_config_file;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    DirectoryError::SourceUnavailable(format!(
                        "Failed to configure bash scripts: {e}"
                    ))
                })?;
            }
        }
        tokio::fs::write(path, self.script_config())
            .await
            .map_err(|e| {
                DirectoryError::SourceUnavailable(format!("Failed to configure bash scripts: {e}"))
            })
    }

    /// Run one command through the exec script and return stdout.
    ///
    /// The child is killed if the returned future is dropped, so callers can
    /// bound it with `tokio::time::timeout`.
    async fn exec(&self, command: &str) -> Result<String, DirectoryError> {
        let script = &self.config.exec_script;
        debug!("{} {command}", script.display());

        let output = tokio::process::Command::new(script)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                DirectoryError::CommandFailed(format!("Failed to run {}: {e}", script.display()))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DirectoryError::CommandFailed(format!(
                "{} exited with {}: {} {}",
                script.display(),
                output.status,
                stderr.trim(),
                stdout.trim()
            )));
        }

        Ok(stdout)
    }
}

impl ApplicationSource for ScriptApplicationSource {
    async fn discover_applications(&self) -> Result<Vec<ApplicationDescriptor>, DirectoryError> {
        self.write_script_config().await?;
        let output = self.exec(&self.list_command()).await?;
        let apps = parse_applications(&output)?;
        debug!("Discovered {} remote applications", apps.len());
        Ok(apps)
    }

    async fn unpublish(&self, alias: &str, collection: &str) -> Result<(), DirectoryError> {
        if !is_safe_token(alias) || !is_safe_token(collection) {
            return Err(DirectoryError::InvalidArgument(format!(
                "refusing to unpublish {alias:?} from {collection:?}"
            )));
        }
        let output = self.exec(&self.unpublish_command(alias, collection)).await?;
        if !output.trim().is_empty() {
            warn!("Remove-RDRemoteApp printed: {}", output.trim());
        }
        Ok(())
    }
}
