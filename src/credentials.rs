//! Access key acquisition.
//!
//! The scanner only needs a [`CredentialSource`]. The default source reads a
//! small TOML settings file:
//!
//! ```toml
//! [aws]
//! access_key_id = "AKIA..."
//! secret_access_key = "..."
//! ```
//!
//! When that file is missing but the CSV export downloaded from the AWS
//! console is present, the first usable row of the export is copied into a
//! freshly written settings file and used from then on.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CredentialError;

const EXPORT_ACCESS_KEY_HEADER: &str = "Access key ID";
const EXPORT_SECRET_KEY_HEADER: &str = "Secret access key";

/// An AWS access key id and its secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKeyPair {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl AccessKeyPair {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for AccessKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKeyPair")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Anything that can hand out an access key pair or explain why it cannot.
pub trait CredentialSource: Send + Sync {
    fn get(&self) -> Result<AccessKeyPair, CredentialError>;
}

/// A fixed key pair.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub AccessKeyPair);

impl CredentialSource for StaticCredentials {
    fn get(&self) -> Result<AccessKeyPair, CredentialError> {
        Ok(self.0.clone())
    }
}

/// Reads `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self) -> Result<AccessKeyPair, CredentialError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CredentialError::Invalid(format!("{name} is not set")))
        };
        Ok(AccessKeyPair::new(
            read("AWS_ACCESS_KEY_ID")?,
            read("AWS_SECRET_ACCESS_KEY")?,
        ))
    }
}

/// Settings file with a one-time bootstrap from the console CSV export.
#[derive(Debug, Clone)]
pub struct SettingsFileSource {
    pub settings_path: PathBuf,
    pub export_csv_path: PathBuf,
}

impl SettingsFileSource {
    pub fn new(settings_path: impl Into<PathBuf>, export_csv_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
            export_csv_path: export_csv_path.into(),
        }
    }
}

impl CredentialSource for SettingsFileSource {
    fn get(&self) -> Result<AccessKeyPair, CredentialError> {
        if self.settings_path.exists() {
            debug!(path = %self.settings_path.display(), "reading credential settings");
            let content = read_file(&self.settings_path)?;
            return parse_settings_str(&content, &self.settings_path);
        }

        if self.export_csv_path.exists() {
            let content = read_file(&self.export_csv_path)?;
            let pair = parse_export_csv_str(&content, &self.export_csv_path)?;
            write_settings(&self.settings_path, &pair)?;
            info!(
                from = %self.export_csv_path.display(),
                to = %self.settings_path.display(),
                "initialized credential settings from export"
            );
            return Ok(pair);
        }

        Err(CredentialError::NotFound {
            settings: self.settings_path.clone(),
            export: self.export_csv_path.clone(),
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    aws: Option<AwsSection>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AwsSection {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
}

/// Parse settings TOML into a key pair. `path` is only used in error messages.
pub fn parse_settings_str(s: &str, path: &Path) -> Result<AccessKeyPair, CredentialError> {
    let file: SettingsFile = toml::from_str(s)
        .map_err(|e| CredentialError::Invalid(format!("{}: {e}", path.display())))?;
    let section = file
        .aws
        .ok_or_else(|| CredentialError::MissingSection(path.to_path_buf()))?;

    let field = |v: Option<String>, name: &str| {
        v.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CredentialError::Invalid(format!("{}: [aws] {name} is empty", path.display())))
    };
    Ok(AccessKeyPair::new(
        field(section.access_key_id, "access_key_id")?,
        field(section.secret_access_key, "secret_access_key")?,
    ))
}

/// Extract the first usable key pair from an AWS console credential export.
///
/// Header names are matched exactly after trimming; a leading UTF-8 BOM is ignored.
pub fn parse_export_csv_str(s: &str, path: &Path) -> Result<AccessKeyPair, CredentialError> {
    let s = s.strip_prefix('\u{feff}').unwrap_or(s);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(s.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (Some(access_col), Some(secret_col)) = (
        column(EXPORT_ACCESS_KEY_HEADER),
        column(EXPORT_SECRET_KEY_HEADER),
    ) else {
        return Err(CredentialError::NoUsableRow(path.to_path_buf()));
    };

    for row in reader.records() {
        let row = row?;
        let access = row.get(access_col).map(str::trim).unwrap_or("");
        let secret = row.get(secret_col).map(str::trim).unwrap_or("");
        if !access.is_empty() && !secret.is_empty() {
            return Ok(AccessKeyPair::new(access, secret));
        }
    }
    Err(CredentialError::NoUsableRow(path.to_path_buf()))
}

fn write_settings(path: &Path, pair: &AccessKeyPair) -> Result<(), CredentialError> {
    let file = SettingsFile {
        aws: Some(AwsSection {
            access_key_id: Some(pair.access_key_id.clone()),
            secret_access_key: Some(pair.secret_access_key.clone()),
        }),
    };
    let content = toml::to_string(&file).map_err(|e| CredentialError::Invalid(e.to_string()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CredentialError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_file(path: &Path) -> Result<String, CredentialError> {
    fs::read_to_string(path).map_err(|source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    })
}
