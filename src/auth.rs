//! OAuth2 authentication management for Gmail API

use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use yup_oauth2::ApplicationSecret;

use crate::error::{GfmError, Result};

/// Gmail API scopes needed to read labels and manage filters
///
/// - gmail.modify: profile and label listing
/// - gmail.settings.basic: filter listing, creation and deletion
pub const REQUIRED_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.settings.basic",
];

pub const CLIENT_ID_ENV: &str = "GMAIL_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "GMAIL_CLIENT_SECRET";
pub const REDIRECT_URI_ENV: &str = "GMAIL_REDIRECT_URI";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub =
    Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Where the token lives and which OAuth client to authorize with
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub auth_file: PathBuf,
    pub client_id: String,
    pub client_secret: String,
}

impl AuthSettings {
    /// Resolves client credentials from explicit values, then the environment
    ///
    /// `client_id` and `client_secret` are the flag-or-config values; an unset
    /// pair falls back to `GMAIL_CLIENT_ID`/`GMAIL_CLIENT_SECRET`.
    pub fn resolve(
        auth_file: PathBuf,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Result<Self> {
        let (client_id, client_secret) = match (client_id, client_secret) {
            (Some(id), Some(secret)) => (id, secret),
            (None, None) => {
                let secret = load_credentials_from_env()?;
                (secret.client_id, secret.client_secret)
            }
            _ => {
                return Err(GfmError::AuthError(
                    "client_id and client_secret must be given together".to_string(),
                ))
            }
        };

        Ok(Self {
            auth_file,
            client_id,
            client_secret,
        })
    }

    pub fn application_secret(&self) -> ApplicationSecret {
        installed_secret(
            self.client_id.clone(),
            self.client_secret.clone(),
            env::var(REDIRECT_URI_ENV).ok(),
        )
    }
}

fn installed_secret(
    client_id: String,
    client_secret: String,
    redirect_uri: Option<String>,
) -> ApplicationSecret {
    ApplicationSecret {
        client_id,
        client_secret,
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        redirect_uris: vec![redirect_uri.unwrap_or_else(|| "http://localhost:8080".to_string())],
        ..Default::default()
    }
}

/// Initialize Gmail API hub with OAuth2 authentication
///
/// Tokens are persisted to `settings.auth_file`; when it holds no usable
/// token the installed-app browser flow runs. With `force` the existing
/// token is discarded first.
pub async fn initialize_gmail_hub(settings: &AuthSettings, force: bool) -> Result<GmailHub> {
    let auth_file = settings.auth_file.as_path();
    if let Some(parent) = auth_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| GfmError::io_at(parent, e))?;
    }

    if force && auth_file.exists() {
        tokio::fs::remove_file(auth_file)
            .await
            .map_err(|e| GfmError::io_at(auth_file, e))?;
        info!("Removed existing token at {:?}", auth_file);
    }

    // HTTPRedirect opens a browser for user authorization
    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        settings.application_secret(),
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(auth_file)
    .build()
    .await
    .map_err(|e| GfmError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Obtain the token up front so it is cached with every scope the commands use
    let _token = auth
        .token(REQUIRED_SCOPES)
        .await
        .map_err(|e| GfmError::AuthError(format!("Failed to obtain token: {}", e)))?;

    if auth_file.exists() {
        secure_token_file(auth_file).await?;
    }
    debug!("Token available at {:?}", auth_file);

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| GfmError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Load OAuth2 client credentials from environment variables
///
/// # Environment Variables
/// - `GMAIL_CLIENT_ID`: OAuth2 client ID
/// - `GMAIL_CLIENT_SECRET`: OAuth2 client secret
/// - `GMAIL_REDIRECT_URI`: Redirect URI (optional, defaults to http://localhost:8080)
pub fn load_credentials_from_env() -> Result<ApplicationSecret> {
    let client_id = env::var(CLIENT_ID_ENV).map_err(|_| {
        GfmError::AuthError(format!(
            "No OAuth client configured: pass --client_id/--client_secret, set them in the config file, or export {}",
            CLIENT_ID_ENV
        ))
    })?;
    let client_secret = env::var(CLIENT_SECRET_ENV)
        .map_err(|_| GfmError::AuthError(format!("{} not set", CLIENT_SECRET_ENV)))?;

    Ok(installed_secret(
        client_id,
        client_secret,
        env::var(REDIRECT_URI_ENV).ok(),
    ))
}

/// Secure token file permissions on Unix systems
///
/// Sets file permissions to 0600 (read/write for owner only)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Windows uses ACLs; the token keeps the permissions of its directory
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    fn clear_env() {
        env::remove_var(CLIENT_ID_ENV);
        env::remove_var(CLIENT_SECRET_ENV);
        env::remove_var(REDIRECT_URI_ENV);
    }

    #[tokio::test]
    async fn test_secure_token_file() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "test content")
            .await
            .unwrap();

        secure_token_file(temp_file.path()).await.unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = tokio::fs::metadata(temp_file.path()).await.unwrap();
            let perms = metadata.permissions();
            assert_eq!(perms.mode() & 0o777, 0o600);
        }
    }

    #[test]
    #[serial]
    fn test_load_credentials_from_env() {
        env::set_var(CLIENT_ID_ENV, "test-id");
        env::set_var(CLIENT_SECRET_ENV, "test-secret");
        env::set_var(REDIRECT_URI_ENV, "http://localhost:9999");

        let secret = load_credentials_from_env().unwrap();
        assert_eq!(secret.client_id, "test-id");
        assert_eq!(secret.client_secret, "test-secret");
        assert_eq!(secret.redirect_uris[0], "http://localhost:9999");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_credentials_from_env_missing() {
        clear_env();
        let result = load_credentials_from_env();
        assert!(matches!(result, Err(GfmError::AuthError(_))));
    }

    #[test]
    #[serial]
    fn test_explicit_credentials_win_over_env() {
        env::set_var(CLIENT_ID_ENV, "env-id");
        env::set_var(CLIENT_SECRET_ENV, "env-secret");

        let settings = AuthSettings::resolve(
            PathBuf::from("auth"),
            Some("flag-id".to_string()),
            Some("flag-secret".to_string()),
        )
        .unwrap();
        assert_eq!(settings.client_id, "flag-id");
        assert_eq!(settings.application_secret().client_secret, "flag-secret");

        let settings = AuthSettings::resolve(PathBuf::from("auth"), None, None).unwrap();
        assert_eq!(settings.client_id, "env-id");
        assert_eq!(settings.client_secret, "env-secret");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_half_configured_credentials_rejected() {
        clear_env();
        let result = AuthSettings::resolve(PathBuf::from("auth"), Some("id".to_string()), None);
        assert!(matches!(result, Err(GfmError::AuthError(_))));
    }

    #[test]
    #[serial]
    fn test_default_redirect_uri() {
        clear_env();
        let secret = installed_secret("id".to_string(), "secret".to_string(), None);
        assert_eq!(secret.redirect_uris, vec!["http://localhost:8080".to_string()]);
        assert_eq!(secret.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_scopes_constants() {
        assert_eq!(REQUIRED_SCOPES.len(), 2);
        assert!(REQUIRED_SCOPES.contains(&"https://www.googleapis.com/auth/gmail.modify"));
        assert!(REQUIRED_SCOPES
            .contains(&"https://www.googleapis.com/auth/gmail.settings.basic"));
    }
}
