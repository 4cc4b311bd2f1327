use std::path::PathBuf;

use thiserror::Error;

/// Failures while obtaining an access key pair.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Neither the settings file nor the raw credential export exists.
    #[error(
        "neither {} nor {} found; place the AWS credentials CSV export there",
        settings.display(),
        export.display()
    )]
    NotFound { settings: PathBuf, export: PathBuf },

    /// The settings file has no `[aws]` section.
    #[error("AWS credentials not found in configuration: {0}")]
    MissingSection(PathBuf),

    /// The settings file or environment holds an unusable value.
    #[error("invalid credentials: {0}")]
    Invalid(String),

    /// The credential export CSV has no row with both keys filled in.
    #[error("no row with both 'Access key ID' and 'Secret access key' in {0}")]
    NoUsableRow(PathBuf),

    #[error("error reading CSV file: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures returned by a [`CloudApi`](crate::cloud::CloudApi) call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CloudError {
    /// The credentials are not allowed to perform the call in this region.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The provider answered with an error code.
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    /// The request never got a provider answer (DNS, TLS, connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not complete within the configured timeout.
    #[error("timed out after {0}ms")]
    Timeout(u64),
}

impl CloudError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CloudError::Unauthorized(_))
    }
}

/// Failures while producing the CSV report.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No data available. Please run a scan first.")]
    NoData,

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV buffer: {0}")]
    Flush(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_message_matches_api_contract() {
        assert_eq!(
            ExportError::NoData.to_string(),
            "No data available. Please run a scan first."
        );
    }

    #[test]
    fn unauthorized_is_detected() {
        assert!(CloudError::Unauthorized("x".into()).is_unauthorized());
        assert!(!CloudError::Timeout(5).is_unauthorized());
    }
}
