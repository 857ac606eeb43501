use crate::audit::AuditOptions;
use crate::inventory::MAX_FILES_PER_RUN;
use crate::rate_limit::{Exhaustion, RateLimitPolicy, DEFAULT_MAX_CALLS, DEFAULT_WINDOW};
use clap::Args;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const SPREADSHEET_ID_KEY: &str = "SPREADSHEET_ID";
pub const CREDENTIAL_PATH_KEY: &str = "GOOGLE_CREDENTIAL_PATH";
pub const SERVICE_ACCOUNT_KEY_KEY: &str = "GOOGLE_SERVICE_ACCOUNT_KEY";
pub const FOLDER_ID_KEY: &str = "GOOGLE_DRIVE_FOLDER_ID";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("failed to read secret file {path}: {source}")]
    SecretFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

/// Command line / environment settings, before the secret file is merged in.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Spreadsheet that holds the inventory
    #[arg(long, env = SPREADSHEET_ID_KEY)]
    pub spreadsheet_id: Option<String>,

    /// Path to the service account JSON key
    #[arg(long, env = CREDENTIAL_PATH_KEY)]
    pub credential_path: Option<PathBuf>,

    /// URL-safe base64 encoded service account JSON key, used when no path is given
    #[arg(long, env = SERVICE_ACCOUNT_KEY_KEY, hide_env_values = true)]
    pub service_account_key: Option<String>,

    /// KEY=VALUE file supplying any setting not given on the command line or environment
    #[arg(long, env = "DRIVEAUDIT_SECRET_FILE")]
    pub secret_file: Option<PathBuf>,

    /// Only audit this folder and its sub-folders
    #[arg(long, env = FOLDER_ID_KEY)]
    pub folder_id: Option<String>,

    /// Files audited per run (first listing page only)
    #[arg(long, default_value_t = MAX_FILES_PER_RUN)]
    pub max_files: usize,

    /// Permission fetches allowed per window
    #[arg(long, default_value_t = DEFAULT_MAX_CALLS)]
    pub rate_limit_calls: usize,

    /// Length of the rate limit window in seconds
    #[arg(long, default_value_t = DEFAULT_WINDOW.as_secs())]
    pub rate_limit_window_secs: u64,

    /// Fail instead of waiting when the rate limit is reached
    #[arg(long)]
    pub fail_when_throttled: bool,

    /// Build the report without writing to the spreadsheet
    #[arg(long)]
    pub dry_run: bool,
}

/// Where the service account key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    Base64(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub spreadsheet_id: String,
    pub credentials: CredentialSource,
    pub folder_id: Option<String>,
    pub max_files: usize,
    pub rate_limit: RateLimitPolicy,
    pub dry_run: bool,
}

impl AuditConfig {
    pub fn resolve(args: ConfigArgs) -> Result<Self, ConfigError> {
        let secrets = match &args.secret_file {
            Some(path) => read_secret_file(path)?,
            None => HashMap::new(),
        };
        let setting = |given: Option<String>, key: &str| {
            given
                .or_else(|| secrets.get(key).cloned())
                .filter(|value| !value.trim().is_empty())
        };

        let spreadsheet_id = setting(args.spreadsheet_id, SPREADSHEET_ID_KEY)
            .ok_or(ConfigError::Missing(SPREADSHEET_ID_KEY))?;

        let credential_path = setting(
            args.credential_path.map(|p| p.to_string_lossy().into_owned()),
            CREDENTIAL_PATH_KEY,
        );
        let credentials = match credential_path {
            Some(path) => CredentialSource::File(PathBuf::from(path)),
            None => setting(args.service_account_key, SERVICE_ACCOUNT_KEY_KEY)
                .map(CredentialSource::Base64)
                .ok_or(ConfigError::Missing(CREDENTIAL_PATH_KEY))?,
        };

        if args.max_files == 0 {
            return Err(ConfigError::NotPositive("max-files"));
        }
        if args.rate_limit_calls == 0 {
            return Err(ConfigError::NotPositive("rate-limit-calls"));
        }
        if args.rate_limit_window_secs == 0 {
            return Err(ConfigError::NotPositive("rate-limit-window-secs"));
        }

        Ok(Self {
            spreadsheet_id,
            credentials,
            folder_id: setting(args.folder_id, FOLDER_ID_KEY),
            max_files: args.max_files,
            rate_limit: RateLimitPolicy {
                max_calls: args.rate_limit_calls,
                window: Duration::from_secs(args.rate_limit_window_secs),
                on_exhausted: if args.fail_when_throttled {
                    Exhaustion::Fail
                } else {
                    Exhaustion::Wait
                },
            },
            dry_run: args.dry_run,
        })
    }

    pub fn audit_options(&self) -> AuditOptions {
        AuditOptions {
            max_files: self.max_files,
            dry_run: self.dry_run,
        }
    }
}

fn read_secret_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let to_error = |source| ConfigError::SecretFile {
        path: path.to_path_buf(),
        source,
    };
    dotenvy::from_path_iter(path)
        .map_err(to_error)?
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(to_error)
}
