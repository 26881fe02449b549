//! Server settings loaded via OrthoConfig.
//!
//! Every value can come from the command line, a configuration file or a
//! `BOOKSHELF_`-prefixed environment variable. Unset values fall back to the
//! defaults documented on each accessor.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use zeroize::Zeroizing;

/// Listen address used when none is configured.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
/// Upload folder used when none is configured.
pub const DEFAULT_MEDIA_FOLDER: &str = "bookshelf";
const DEFAULT_MEDIA_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Settings errors detected after loading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// Some but not all media credentials were supplied.
    #[error("media settings are incomplete: missing {missing}")]
    IncompleteMedia {
        /// Comma-separated names of the missing values.
        missing: String,
    },
    /// The bind address could not be parsed.
    #[error("invalid bind address {value}: {message}")]
    InvalidBindAddr {
        /// Offending value.
        value: String,
        /// Parser message.
        message: String,
    },
}

/// Top-level configuration of the HTTP server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BOOKSHELF")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL. Without it the in-memory store is used.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    #[ortho_config(default = 10)]
    pub db_max_connections: u32,
    /// Cloudinary cloud name.
    pub media_cloud_name: Option<String>,
    /// Cloudinary API key.
    pub media_api_key: Option<String>,
    /// Cloudinary API secret.
    pub media_api_secret: Option<String>,
    /// Folder prefixed to uploaded asset ids.
    pub media_folder: Option<String>,
    /// Timeout applied to each media host request, in seconds.
    pub media_timeout_secs: Option<u64>,
    /// Override of the Cloudinary API root.
    pub media_api_base: Option<String>,
}

/// Credentials for the remote media host.
#[derive(Clone)]
pub struct MediaCredentials {
    /// Cloud name.
    pub cloud_name: String,
    /// Public API key.
    pub api_key: String,
    /// Signing secret.
    pub api_secret: Zeroizing<String>,
}

impl std::fmt::Debug for MediaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl ServerSettings {
    /// Configured listen address, defaulting to [`DEFAULT_BIND_ADDR`].
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBindAddr`] when the value does not
    /// parse as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = non_blank(self.bind_addr.as_ref()).unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse()
            .map_err(|err: std::net::AddrParseError| SettingsError::InvalidBindAddr {
                value: raw.to_owned(),
                message: err.to_string(),
            })
    }

    /// Database URL, if configured.
    #[must_use]
    pub fn database_url(&self) -> Option<&str> {
        non_blank(self.database_url.as_ref())
    }

    /// Pool size, defaulting to ten connections.
    #[must_use]
    pub fn db_max_connections(&self) -> u32 {
        match self.db_max_connections {
            0 => DEFAULT_DB_MAX_CONNECTIONS,
            size => size,
        }
    }

    /// Upload folder, defaulting to [`DEFAULT_MEDIA_FOLDER`].
    #[must_use]
    pub fn media_folder(&self) -> &str {
        non_blank(self.media_folder.as_ref()).unwrap_or(DEFAULT_MEDIA_FOLDER)
    }

    /// Per-request media timeout, defaulting to 30 seconds.
    #[must_use]
    pub fn media_timeout(&self) -> Duration {
        Duration::from_secs(
            self.media_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_MEDIA_TIMEOUT_SECS),
        )
    }

    /// Media host credentials. `None` when none of them are set.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::IncompleteMedia`] when only some are set.
    pub fn media_credentials(&self) -> Result<Option<MediaCredentials>, SettingsError> {
        let values = [
            ("media_cloud_name", non_blank(self.media_cloud_name.as_ref())),
            ("media_api_key", non_blank(self.media_api_key.as_ref())),
            ("media_api_secret", non_blank(self.media_api_secret.as_ref())),
        ];
        match values {
            [(_, Some(cloud_name)), (_, Some(api_key)), (_, Some(api_secret))] => {
                Ok(Some(MediaCredentials {
                    cloud_name: cloud_name.to_owned(),
                    api_key: api_key.to_owned(),
                    api_secret: Zeroizing::new(api_secret.to_owned()),
                }))
            }
            [(_, None), (_, None), (_, None)] => Ok(None),
            partial => {
                let missing = partial
                    .iter()
                    .filter(|(_, value)| value.is_none())
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(SettingsError::IncompleteMedia { missing })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for server settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 9] = [
        "BOOKSHELF_BIND_ADDR",
        "BOOKSHELF_DATABASE_URL",
        "BOOKSHELF_DB_MAX_CONNECTIONS",
        "BOOKSHELF_MEDIA_CLOUD_NAME",
        "BOOKSHELF_MEDIA_API_KEY",
        "BOOKSHELF_MEDIA_API_SECRET",
        "BOOKSHELF_MEDIA_FOLDER",
        "BOOKSHELF_MEDIA_TIMEOUT_SECS",
        "BOOKSHELF_MEDIA_API_BASE",
    ];

    fn env_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    fn load_from_empty_args() -> ServerSettings {
        ServerSettings::load_from_iter([OsString::from("bookshelf")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(env_with(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default bind"),
            "0.0.0.0:5000".parse::<SocketAddr>().expect("addr")
        );
        assert!(settings.database_url().is_none());
        assert_eq!(settings.db_max_connections(), 10);
        assert_eq!(settings.media_folder(), DEFAULT_MEDIA_FOLDER);
        assert_eq!(settings.media_timeout(), Duration::from_secs(30));
        assert!(settings.media_credentials().expect("no media").is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("BOOKSHELF_BIND_ADDR", "127.0.0.1:8080"),
            ("BOOKSHELF_DATABASE_URL", "postgres://bookshelf@localhost/bookshelf"),
            ("BOOKSHELF_DB_MAX_CONNECTIONS", "4"),
            ("BOOKSHELF_MEDIA_CLOUD_NAME", "demo"),
            ("BOOKSHELF_MEDIA_API_KEY", "key"),
            ("BOOKSHELF_MEDIA_API_SECRET", "secret"),
            ("BOOKSHELF_MEDIA_FOLDER", "covers"),
            ("BOOKSHELF_MEDIA_TIMEOUT_SECS", "5"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("bind"),
            "127.0.0.1:8080".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(
            settings.database_url(),
            Some("postgres://bookshelf@localhost/bookshelf")
        );
        assert_eq!(settings.db_max_connections(), 4);
        assert_eq!(settings.media_folder(), "covers");
        assert_eq!(settings.media_timeout(), Duration::from_secs(5));
        let media = settings
            .media_credentials()
            .expect("complete media")
            .expect("media configured");
        assert_eq!(media.cloud_name, "demo");
        assert_eq!(media.api_secret.as_str(), "secret");
    }

    #[rstest]
    fn zero_pool_size_falls_back_to_the_default() {
        let _guard = lock_env(env_with(&[("BOOKSHELF_DB_MAX_CONNECTIONS", "0")]));

        let settings = load_from_empty_args();
        assert_eq!(settings.db_max_connections(), DEFAULT_DB_MAX_CONNECTIONS);
    }

    #[rstest]
    fn partial_media_credentials_are_rejected() {
        let _guard = lock_env(env_with(&[("BOOKSHELF_MEDIA_CLOUD_NAME", "demo")]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.media_credentials().expect_err("incomplete"),
            SettingsError::IncompleteMedia {
                missing: "media_api_key, media_api_secret".to_owned()
            }
        );
    }

    #[rstest]
    fn malformed_bind_addresses_are_reported() {
        let _guard = lock_env(env_with(&[("BOOKSHELF_BIND_ADDR", "localhost")]));

        let settings = load_from_empty_args();
        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::InvalidBindAddr { .. })
        ));
    }

    #[rstest]
    fn media_credentials_debug_hides_the_secret() {
        let credentials = MediaCredentials {
            cloud_name: "demo".to_owned(),
            api_key: "key".to_owned(),
            api_secret: Zeroizing::new("hunter2".to_owned()),
        };
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }
}
