use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_USERNAME_VAR: &str = "CENTAVO_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "CENTAVO_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "CENTAVO_DB_HOSTNAME";
const DB_PORT_VAR: &str = "CENTAVO_DB_PORT";
const DB_NAME_VAR: &str = "CENTAVO_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "CENTAVO_DB_MAX_CONNECTIONS";

const HASHING_KEY_VAR: &str = "CENTAVO_HASHING_KEY_B64";

const HASH_LENGTH_VAR: &str = "CENTAVO_HASH_LENGTH";
const HASH_ITERATIONS_VAR: &str = "CENTAVO_HASH_ITERATIONS";
const HASH_MEM_COST_KIB_VAR: &str = "CENTAVO_HASH_MEM_COST_KIB";
const HASH_THREADS_VAR: &str = "CENTAVO_HASH_THREADS";
const HASH_SALT_LENGTH_VAR: &str = "CENTAVO_HASH_SALT_LENGTH";

const LOCKOUT_MAX_ATTEMPTS_VAR: &str = "CENTAVO_LOCKOUT_MAX_ATTEMPTS";
const LOCKOUT_DURATION_SECS_VAR: &str = "CENTAVO_LOCKOUT_DURATION_SECS";
const SESSION_LIFETIME_DAYS_VAR: &str = "CENTAVO_SESSION_LIFETIME_DAYS";

const EPHEMERAL_STORAGE_MODE_VAR: &str = "CENTAVO_EPHEMERAL_STORAGE_MODE";

const ACTIX_WORKER_COUNT_VAR: &str = "CENTAVO_ACTIX_WORKER_COUNT";
const LOG_LEVEL_VAR: &str = "CENTAVO_LOG_LEVEL";

const HASHING_KEY_SIZE: usize = 32;

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    #[zeroize(skip)]
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,

    pub hashing_key: [u8; HASHING_KEY_SIZE],

    #[zeroize(skip)]
    pub hash_length: u32,
    #[zeroize(skip)]
    pub hash_iterations: u32,
    #[zeroize(skip)]
    pub hash_mem_cost_kib: u32,
    #[zeroize(skip)]
    pub hash_threads: u32,
    #[zeroize(skip)]
    pub hash_salt_length: u32,

    #[zeroize(skip)]
    pub lockout_max_attempts: i16,
    #[zeroize(skip)]
    pub lockout_duration: Duration,
    #[zeroize(skip)]
    pub session_lifetime: Duration,

    #[zeroize(skip)]
    pub ephemeral_storage_mode: bool,

    #[zeroize(skip)]
    pub actix_worker_count: usize,
    #[zeroize(skip)]
    pub log_level: String,
}

impl ConfigInner {
    pub fn database_uri(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_username, self.db_password, self.db_hostname, self.db_port, self.db_name,
        )
    }
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let hashing_key = match std::env::var(HASHING_KEY_VAR) {
            Ok(key_b64) => {
                let key = Zeroizing::new(
                    b64.decode(key_b64.as_bytes())
                        .map_err(|_| ConfigError::InvalidVar(HASHING_KEY_VAR))?,
                );

                key[..]
                    .try_into()
                    .map_err(|_| ConfigError::InvalidVar(HASHING_KEY_VAR))?
            }
            Err(_) if cfg!(test) => [0; HASHING_KEY_SIZE],
            Err(_) => return Err(ConfigError::MissingVar(HASHING_KEY_VAR)),
        };

        let inner = ConfigInner {
            db_username: env_var_or(DB_USERNAME_VAR, String::from("postgres")),
            db_password: env_var_or(DB_PASSWORD_VAR, String::from("password")),
            db_hostname: env_var_or(DB_HOSTNAME_VAR, String::from("127.0.0.1")),
            db_port: env_var_or(DB_PORT_VAR, 5432),
            db_name: env_var_or(DB_NAME_VAR, String::from("centavo")),
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),

            hashing_key,

            hash_length: env_var_or(HASH_LENGTH_VAR, 32),
            hash_iterations: env_var_or(HASH_ITERATIONS_VAR, 16),
            hash_mem_cost_kib: env_var_or(HASH_MEM_COST_KIB_VAR, 65536),
            hash_threads: env_var_or(HASH_THREADS_VAR, 2),
            hash_salt_length: env_var_or(HASH_SALT_LENGTH_VAR, 16),

            lockout_max_attempts: env_var_or(LOCKOUT_MAX_ATTEMPTS_VAR, 3),
            lockout_duration: Duration::from_secs(env_var_or(LOCKOUT_DURATION_SECS_VAR, 300)),
            session_lifetime: Duration::from_secs(
                env_var_or(SESSION_LIFETIME_DAYS_VAR, 14) * 86400,
            ),

            ephemeral_storage_mode: env_var_or(EPHEMERAL_STORAGE_MODE_VAR, false),

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}
