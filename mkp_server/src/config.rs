//! Server configuration
//!
//! Everything is read from environment variables (`MKP_*`). Invalid values are logged and replaced with the defaults,
//! so a misconfigured server still starts, but loudly.
use std::{env, io::Write};

use chrono::Duration;
use log::*;
use mkp_common::{helpers::parse_boolean_flag, Secret};
use mkp_engine::{helpers::DEFAULT_RESERVATION_TTL, sqlite::db::db_url};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_MKP_HOST: &str = "127.0.0.1";
const DEFAULT_MKP_PORT: u16 = 8460;
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EXPIRY_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);
const RANDOM_SECRET_LENGTH: usize = 48;
/// Ten years
const MAX_RESERVATION_TTL_HOURS: i64 = 87_600;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub auth: AuthConfig,
    /// How long a reservation (and a new order) holds stock before it lapses.
    pub reservation_ttl: Duration,
    /// The period of the background job that releases lapsed reservations and expires stale orders.
    pub expiry_sweep_interval: std::time::Duration,
    /// Run the embedded database migrations when the server starts.
    pub auto_migrate: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MKP_HOST.to_string(),
            port: DEFAULT_MKP_PORT,
            database_url: db_url(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            auth: AuthConfig::default(),
            reservation_ttl: DEFAULT_RESERVATION_TTL,
            expiry_sweep_interval: DEFAULT_EXPIRY_SWEEP_INTERVAL,
            auto_migrate: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MKP_HOST").ok().unwrap_or_else(|| DEFAULT_MKP_HOST.into());
        let port = env::var("MKP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MKP_PORT. {e} Using the default, {DEFAULT_MKP_PORT}, instead."
                    );
                    DEFAULT_MKP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MKP_PORT);
        let database_url = env::var("MKP_DATABASE_URL").ok().unwrap_or_else(|| {
            let url = db_url();
            warn!("🪛️ MKP_DATABASE_URL is not set. Using {url}.");
            url
        });
        let max_connections = env::var("MKP_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for MKP_DB_MAX_CONNECTIONS. {e}"))
                    .ok()
            })
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let reservation_ttl = configure_reservation_ttl();
        let expiry_sweep_interval = configure_sweep_interval();
        let auto_migrate = parse_boolean_flag(env::var("MKP_AUTO_MIGRATE").ok(), true);
        Self {
            host,
            port,
            database_url,
            max_connections,
            auth,
            reservation_ttl,
            expiry_sweep_interval,
            auto_migrate,
        }
    }
}

fn configure_reservation_ttl() -> Duration {
    env::var("MKP_RESERVATION_TTL_HOURS")
        .map_err(|_| {
            info!(
                "🪛️ MKP_RESERVATION_TTL_HOURS is not set. Using the default value of {} hrs.",
                DEFAULT_RESERVATION_TTL.num_hours()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for MKP_RESERVATION_TTL_HOURS. {e}"))
                .and_then(|h| {
                    reservation_ttl_from_hours(h).ok_or_else(|| {
                        warn!("🪛️ MKP_RESERVATION_TTL_HOURS must be in 1..={MAX_RESERVATION_TTL_HOURS}, but was {h}")
                    })
                })
        })
        .ok()
        .unwrap_or(DEFAULT_RESERVATION_TTL)
}

fn reservation_ttl_from_hours(hours: i64) -> Option<Duration> {
    if (1..=MAX_RESERVATION_TTL_HOURS).contains(&hours) {
        Duration::try_hours(hours)
    } else {
        None
    }
}

fn configure_sweep_interval() -> std::time::Duration {
    env::var("MKP_EXPIRY_SWEEP_INTERVAL")
        .ok()
        .and_then(|s| {
            s.parse::<u64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for MKP_EXPIRY_SWEEP_INTERVAL. {e}"))
                .ok()
        })
        .filter(|secs| *secs > 0)
        .map(std::time::Duration::from_secs)
        .unwrap_or(DEFAULT_EXPIRY_SWEEP_INTERVAL)
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret used to sign and verify access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since every issued token becomes invalid on restart. 🚨️🚨️🚨️"
        );
        let secret =
            thread_rng().sample_iter(&Alphanumeric).take(RANDOM_SECRET_LENGTH).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => match writeln!(f, "MKP_JWT_SECRET={secret}") {
                Ok(()) => warn!(
                    "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, you \
                     are doing it wrong! Set the MKP_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                    p.to_str().unwrap_or("???")
                ),
                Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret. ");
            },
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("MKP_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [MKP_JWT_SECRET]")))?;
        if secret.trim().is_empty() {
            return Err(ServerError::ConfigurationError("MKP_JWT_SECRET is empty".to_string()));
        }
        Ok(Self::new(secret))
    }
}
