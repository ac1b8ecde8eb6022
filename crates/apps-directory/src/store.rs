//! Connection store — the gateway's XML connection document.
//!
//! ```xml
//! <configs>
//!     <config name="calc_a@x.com" protocol="rdp">
//!         <param name="hostname" value="10.0.0.5"/>
//!         <param name="remote-app" value="||calc"/>
//!     </config>
//! </configs>
//! ```
//!
//! The document is the only durable state of the directory. It is rebuilt
//! wholesale and replaced with a temp-file + rename so readers never see a
//! partial write.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::DirectoryError;
use crate::model::Connection;

pub const PROTOCOL_RDP: &str = "rdp";

/// Recognized parameter names.
pub mod param {
    pub const HOSTNAME: &str = "hostname";
    pub const PORT: &str = "port";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const REMOTE_APP: &str = "remote-app";
}

/// Root of the connection document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "configs")]
pub struct Configs {
    #[serde(rename = "config", default)]
    pub configs: Vec<ConnectionConfig>,
}

/// One named connection entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@protocol")]
    pub protocol: String,
    #[serde(rename = "param", default)]
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@value")]
    pub value: String,
}

impl Configs {
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionConfig> {
        self.configs.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.configs.iter().map(|c| c.name.as_str()).collect()
    }
}

impl ConnectionConfig {
    /// Start an RDP connection entry.
    pub fn rdp(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol: PROTOCOL_RDP.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter, keeping insertion order.
    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Flatten the parameters into a [`Connection`]. Unknown names are ignored.
    pub fn to_connection(&self) -> Connection {
        let mut conn = Connection {
            connection_name: self.name.clone(),
            ..Default::default()
        };
        for p in &self.params {
            let slot = match p.name.as_str() {
                param::HOSTNAME => &mut conn.hostname,
                param::PORT => &mut conn.port,
                param::USERNAME => &mut conn.username,
                param::PASSWORD => &mut conn.password,
                param::REMOTE_APP => &mut conn.remote_app,
                _ => continue,
            };
            *slot = p.value.clone();
        }
        conn
    }
}

/// Serialize the document with four-space indentation.
pub fn encode(configs: &Configs) -> Result<String, DirectoryError> {
    let mut xml = String::new();
    let mut ser = quick_xml::se::Serializer::with_root(&mut xml, Some("configs"))?;
    ser.indent(' ', 4);
    configs.serialize(ser)?;
    xml.push('\n');
    Ok(xml)
}

pub fn decode(xml: &str) -> Result<Configs, DirectoryError> {
    Ok(quick_xml::de::from_str(xml)?)
}

/// File holding the connection document.
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the document. The temp file is removed if any step fails.
    pub async fn write(&self, configs: &Configs) -> Result<(), DirectoryError> {
        let xml = encode(configs)?;
        let tmp = self.temp_path();

        if let Err(source) = self.write_via(&tmp, xml.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            warn!("Failed to save connections in {}: {source}", self.path.display());
            return Err(DirectoryError::PersistenceWrite {
                path: self.path.clone(),
                source,
            });
        }

        debug!("Wrote {} connections to {}", configs.len(), self.path.display());
        Ok(())
    }

    async fn write_via(&self, tmp: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::File::create(tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(tmp, &self.path).await
    }

    pub async fn read(&self) -> Result<Configs, DirectoryError> {
        let xml = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| DirectoryError::PersistenceRead {
                path: self.path.clone(),
                source,
            })?;
        decode(&xml)
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "connections.xml".into());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }
}
