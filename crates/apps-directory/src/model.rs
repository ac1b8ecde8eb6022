//! Directory data model: applications, accounts, and flat connection records.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Full-desktop session bound to the primary server.
pub const DESKTOP_CONNECTION: &str = "hapticDesktop";
/// Management/bootstrap session; also the alias skipped during discovery.
pub const MANAGEMENT_CONNECTION: &str = "hapticPowershell";
/// `remote-app` value of the management session.
pub const MANAGEMENT_REMOTE_APP: &str = "||hapticPowershell";

/// Whether `name` is one of the two always-present connections.
pub fn is_reserved(name: &str) -> bool {
    name == DESKTOP_CONNECTION || name == MANAGEMENT_CONNECTION
}

/// `remote-app` parameter value for an application alias.
pub fn remote_app_for(alias: &str) -> String {
    format!("||{alias}")
}

/// A published remote application, as reported by the application source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApplicationDescriptor {
    #[serde(deserialize_with = "string_or_null")]
    pub alias: String,
    #[serde(deserialize_with = "string_or_null")]
    pub display_name: String,
    #[serde(deserialize_with = "string_or_null")]
    pub collection_name: String,
    #[serde(deserialize_with = "icon_from_json", serialize_with = "icon_to_base64")]
    pub icon_contents: Vec<u8>,
    #[serde(deserialize_with = "string_or_null")]
    pub file_path: String,
}

impl ApplicationDescriptor {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            ..Default::default()
        }
    }

    pub fn icon_base64(&self) -> String {
        STANDARD.encode(&self.icon_contents)
    }
}

/// `ConvertTo-Json` writes unset properties as `null`.
fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Icons arrive either as a byte array (`ConvertTo-Json` of a `byte[]`) or
/// as a base64 string.
fn icon_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Icon {
        Bytes(Vec<u8>),
        Encoded(String),
    }

    match Option::<Icon>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(Icon::Bytes(bytes)) => Ok(bytes),
        Some(Icon::Encoded(s)) => STANDARD.decode(s.trim()).map_err(serde::de::Error::custom),
    }
}

fn icon_to_base64<S: Serializer>(icon: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(icon))
}

/// A user entitled to remote applications. Read-only to the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAccount {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(alias = "Activated")]
    pub activated: bool,
    #[serde(alias = "Email")]
    pub email: String,
    #[serde(alias = "FirstName")]
    pub first_name: String,
    #[serde(alias = "LastName")]
    pub last_name: String,
    #[serde(alias = "IsAdmin")]
    pub is_admin: bool,
    /// Windows logon (SAM account) name.
    #[serde(alias = "Sam")]
    pub sam: String,
    #[serde(alias = "Password")]
    pub password: String,
}

impl UserAccount {
    pub fn new(email: impl Into<String>, sam: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            sam: sam.into(),
            password: password.into(),
            activated: true,
            ..Default::default()
        }
    }
}

/// Flat view of one stored connection, as returned by directory queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Connection {
    pub hostname: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub remote_app: String,
    pub connection_name: String,
}

impl Connection {
    /// Application connections carry a remote-app other than the management one.
    pub fn is_application(&self) -> bool {
        !self.remote_app.is_empty() && self.remote_app != MANAGEMENT_REMOTE_APP
    }
}
