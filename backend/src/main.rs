//! Backend entry-point: loads settings, prepares the database and serves the
//! REST API.

mod server;

use std::io;

use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use bookshelf::inbound::http::state::CookieSettings;
use bookshelf::inbound::http::token_config::{BuildMode, token_settings_from_env};
use bookshelf::outbound::media::{CloudinaryConfig, DEFAULT_API_BASE};
use bookshelf::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use bookshelf::settings::ServerSettings;
use server::{ServerConfig, create_server};

fn config_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::other(format!("{context}: {err}"))
}

async fn attach_database(
    config: ServerConfig,
    settings: &ServerSettings,
    mode: BuildMode,
) -> io::Result<ServerConfig> {
    let Some(url) = settings.database_url() else {
        if mode == BuildMode::Release {
            return Err(io::Error::other(
                "BOOKSHELF_DATABASE_URL is required in release builds",
            ));
        }
        return Ok(config);
    };
    run_pending_migrations(url)
        .await
        .map_err(|err| config_error("database migrations failed", err))?;
    let pool = DbPool::new(PoolConfig::new(url).with_max_size(settings.db_max_connections()))
        .await
        .map_err(|err| config_error("database pool", err))?;
    info!("connected to PostgreSQL");
    Ok(config.with_db_pool(pool))
}

fn attach_media(config: ServerConfig, settings: &ServerSettings) -> io::Result<ServerConfig> {
    let Some(credentials) = settings
        .media_credentials()
        .map_err(|err| config_error("media settings", err))?
    else {
        return Ok(config);
    };
    let api_base = settings
        .media_api_base
        .as_deref()
        .unwrap_or(DEFAULT_API_BASE)
        .parse()
        .map_err(|err| config_error("media api base", err))?;
    Ok(config.with_media(CloudinaryConfig {
        api_base,
        cloud_name: credentials.cloud_name,
        api_key: credentials.api_key,
        api_secret: credentials.api_secret,
        folder: settings.media_folder().to_owned(),
        timeout: settings.media_timeout(),
    }))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load().map_err(|err| config_error("settings", err))?;
    let mode = BuildMode::from_debug_assertions();
    let token = token_settings_from_env(&DefaultEnv::new(), mode)
        .map_err(|err| config_error("token settings", err))?;

    let bind_addr = settings
        .bind_addr()
        .map_err(|err| config_error("bind address", err))?;
    let config = ServerConfig::new(
        bind_addr,
        CookieSettings {
            secure: token.cookie_secure,
        },
        token.secret,
        settings.media_folder(),
    );
    let config = attach_database(config, &settings, mode).await?;
    let config = attach_media(config, &settings)?;

    info!(%bind_addr, "starting bookshelf");
    create_server(config).await?.await
}
