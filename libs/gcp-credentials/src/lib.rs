/// Shared Google Cloud credential loading for Phototeca services
///
/// Resolves a `gcp_auth::TokenProvider` from either a service account key
/// file or Application Default Credentials, so every service interprets
/// the credential environment the same way.
use std::path::PathBuf;
use std::sync::Arc;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use thiserror::Error;
use tracing::info;

/// Credential loading error types
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("failed to load service account file {path}: {source}")]
    ServiceAccountFile {
        path: PathBuf,
        #[source]
        source: gcp_auth::Error,
    },

    #[error("failed to initialize Application Default Credentials: {0}")]
    Adc(#[source] gcp_auth::Error),

    #[error("no credentials configured: set GOOGLE_APPLICATION_CREDENTIALS or USE_ADC=true")]
    Missing,

    #[error("failed to resolve project id from credentials: {0}")]
    ProjectId(#[source] gcp_auth::Error),
}

/// Where credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// A service account key file on disk
    ServiceAccountFile(PathBuf),
    /// Application Default Credentials (Workload Identity, metadata server)
    Adc,
}

impl CredentialSource {
    /// Select a credential source from the configured parts.
    ///
    /// An explicit key file wins over ADC; with neither configured the
    /// caller gets a hard configuration error rather than a lazy failure
    /// at the first remote call.
    pub fn resolve(
        service_account_file: Option<PathBuf>,
        use_adc: bool,
    ) -> Result<Self, CredentialsError> {
        match service_account_file {
            Some(path) => Ok(CredentialSource::ServiceAccountFile(path)),
            None if use_adc => Ok(CredentialSource::Adc),
            None => Err(CredentialsError::Missing),
        }
    }

    /// Build a token provider for this source
    pub async fn token_provider(&self) -> Result<Arc<dyn TokenProvider>, CredentialsError> {
        match self {
            CredentialSource::ServiceAccountFile(path) => {
                let account = CustomServiceAccount::from_file(path).map_err(|source| {
                    CredentialsError::ServiceAccountFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                info!(path = %path.display(), "Loaded service account credentials");
                Ok(Arc::new(account))
            }
            CredentialSource::Adc => {
                let provider = gcp_auth::provider().await.map_err(CredentialsError::Adc)?;
                info!("Using Application Default Credentials");
                Ok(provider)
            }
        }
    }
}

/// Resolve the project id the credentials belong to
pub async fn project_id(provider: &Arc<dyn TokenProvider>) -> Result<String, CredentialsError> {
    let project = provider
        .project_id()
        .await
        .map_err(CredentialsError::ProjectId)?;
    Ok(project.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_key_file() {
        let source =
            CredentialSource::resolve(Some(PathBuf::from("/etc/creds/key.json")), true).unwrap();
        assert_eq!(
            source,
            CredentialSource::ServiceAccountFile(PathBuf::from("/etc/creds/key.json"))
        );
    }

    #[test]
    fn test_resolve_falls_back_to_adc() {
        let source = CredentialSource::resolve(None, true).unwrap();
        assert_eq!(source, CredentialSource::Adc);
    }

    #[test]
    fn test_resolve_rejects_missing_credentials() {
        let err = CredentialSource::resolve(None, false).unwrap_err();
        assert!(matches!(err, CredentialsError::Missing));
    }

    #[tokio::test]
    async fn test_token_provider_missing_file() {
        let source =
            CredentialSource::ServiceAccountFile(PathBuf::from("/nonexistent/key.json"));
        let err = match source.token_provider().await {
            Ok(_) => panic!("expected token_provider to fail for a missing file"),
            Err(err) => err,
        };
        assert!(matches!(err, CredentialsError::ServiceAccountFile { .. }));
    }
}
