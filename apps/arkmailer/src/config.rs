use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use arkmailer_core::config::{
    DEFAULT_COHORT_PREFIXES, DEFAULT_EXCEPTION_COHORT, DEFAULT_GROUP_SUFFIX,
};
use arkmailer_core::{SyncConfig, SyncResult};
use arkmailer_google::ClientSecrets;
use secrecy::SecretString;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

/// Settings for mailing the run report.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Client registration for the Gmail account, if the token file lacks it.
    pub credentials: Option<ClientSecrets>,
    pub scopes: Vec<String>,
    pub token_file: PathBuf,
    pub sender: String,
    pub receiver: String,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// WISA web service base URL.
    pub wisa_url: String,
    pub wisa_username: String,
    pub wisa_password: SecretString,
    pub institution_numbers: String,

    /// Mail domain of the managed groups.
    pub domain: String,

    /// Client registration for the directory account.
    pub directory_credentials: ClientSecrets,
    pub directory_scopes: Vec<String>,
    pub directory_token_file: PathBuf,

    /// Report delivery; `None` when no envelope is configured.
    pub report: Option<ReportConfig>,

    pub cohort_prefixes: Vec<String>,
    pub group_suffix: String,
    /// Cohort synced regardless of record type; empty disables.
    pub exception_cohort: Option<String>,
    /// Restricts the run to one cohort code.
    pub test_cohort: Option<String>,
    /// Pause after each group.
    pub pacing_delay: Duration,

    /// Copy of the last roster; `None` disables.
    pub roster_snapshot_path: Option<PathBuf>,
    /// Guards against overlapping runs.
    pub lock_file: PathBuf,

    pub log_file: Option<PathBuf>,
    pub log_format: LogFormat,
    pub log_filter: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// Empty values are treated as absent.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let optional = |key: &str| reader(key).ok().filter(|v| !v.trim().is_empty());
        let required =
            |key: &str| optional(key).ok_or_else(|| ConfigError::MissingVar(key.into()));

        let wisa_url = required("WISA_URL")?;
        let wisa_username = required("USERNAME_ENV")?;
        let wisa_password = SecretString::from(required("PASSWORD_ENV")?);
        let institution_numbers = required("INSTELLINGSNUMMERS")?;
        let domain = required("DOMAIN")?.trim().to_lowercase();

        let directory_credentials = parse_credentials("CREDENTIALS", &required("CREDENTIALS")?)?;
        let directory_scopes = parse_scopes("SCOPES", &required("SCOPES")?)?;
        if directory_scopes.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SCOPES".into(),
                "at least one scope is required".into(),
            ));
        }
        let directory_token_file =
            PathBuf::from(optional("DIRECTORY_TOKEN_FILE").unwrap_or_else(|| "tokendir.json".into()));

        let report = match (optional("SENDER_EMAIL_LOGIN"), optional("RECEIVER_EMAIL")) {
            (Some(sender), Some(receiver)) => Some(ReportConfig {
                credentials: optional("CREDENTIALS_MAIL")
                    .map(|raw| parse_credentials("CREDENTIALS_MAIL", &raw))
                    .transpose()?,
                scopes: optional("SCOPES_MAIL")
                    .map(|raw| parse_scopes("SCOPES_MAIL", &raw))
                    .transpose()?
                    .unwrap_or_default(),
                token_file: PathBuf::from(
                    optional("MAIL_TOKEN_FILE").unwrap_or_else(|| "tokenmail.json".into()),
                ),
                sender,
                receiver,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingVar("RECEIVER_EMAIL".into())),
            (None, Some(_)) => return Err(ConfigError::MissingVar("SENDER_EMAIL_LOGIN".into())),
        };

        let cohort_prefixes = match optional("COHORT_PREFIXES") {
            Some(raw) => raw
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            None => DEFAULT_COHORT_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
        };

        let group_suffix =
            optional("GROUP_SUFFIX").unwrap_or_else(|| DEFAULT_GROUP_SUFFIX.to_string());

        // Present but empty disables the exception cohort.
        let exception_cohort = match reader("EXCEPTION_COHORT") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value),
            Err(_) => Some(DEFAULT_EXCEPTION_COHORT.to_string()),
        };

        let test_cohort = optional("TEST_COHORT");

        let pacing_delay = optional("PACING_DELAY_MS")
            .unwrap_or_else(|| "1000".to_string())
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue("PACING_DELAY_MS".into(), e.to_string()))?;

        let roster_snapshot_path = match reader("ROSTER_SNAPSHOT_PATH") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(PathBuf::from(value)),
            Err(_) => Some(PathBuf::from("output/data.json")),
        };

        let lock_file = PathBuf::from(optional("LOCK_FILE").unwrap_or_else(|| "arkmailer.lock".into()));
        let log_file = optional("LOG_FILE").map(PathBuf::from);

        let log_format = optional("LOG_FORMAT")
            .unwrap_or_else(|| "text".to_string())
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::InvalidValue("LOG_FORMAT".into(), e))?;

        let log_filter = optional("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            wisa_url,
            wisa_username,
            wisa_password,
            institution_numbers,
            domain,
            directory_credentials,
            directory_scopes,
            directory_token_file,
            report,
            cohort_prefixes,
            group_suffix,
            exception_cohort,
            test_cohort,
            pacing_delay,
            roster_snapshot_path,
            lock_file,
            log_file,
            log_format,
            log_filter,
        })
    }

    /// Builds the pipeline configuration.
    ///
    /// `cohort` overrides `TEST_COHORT`.
    pub fn sync_config(&self, dry_run: bool, cohort: Option<String>) -> SyncResult<SyncConfig> {
        SyncConfig::builder()
            .domain(&self.domain)
            .group_suffix(&self.group_suffix)
            .cohort_prefixes(self.cohort_prefixes.clone())
            .exception_cohort(self.exception_cohort.clone())
            .test_filter(cohort.or_else(|| self.test_cohort.clone()))
            .pacing_delay(self.pacing_delay)
            .dry_run(dry_run)
            .build()
    }
}

fn parse_credentials(key: &str, raw: &str) -> Result<ClientSecrets, ConfigError> {
    ClientSecrets::from_json(raw).map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string()))
}

fn parse_scopes(key: &str, raw: &str) -> Result<Vec<String>, ConfigError> {
    serde_json::from_str::<Vec<String>>(raw)
        .map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::env::VarError;

    const CREDENTIALS: &str =
        r#"{"installed": {"client_id": "cid", "client_secret": "cs", "token_uri": "https://oauth2.googleapis.com/token"}}"#;

    /// Create a reader closure from a HashMap (no global env mutation).
    fn make_reader(vars: HashMap<&str, &str>) -> impl Fn(&str) -> Result<String, VarError> {
        let owned: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| owned.get(key).cloned().ok_or(VarError::NotPresent)
    }

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("WISA_URL", "https://wisa.example.be/SUWS"),
            ("USERNAME_ENV", "sync"),
            ("PASSWORD_ENV", "secret"),
            ("INSTELLINGSNUMMERS", "123456"),
            ("DOMAIN", "DeArk.be"),
            ("CREDENTIALS", CREDENTIALS),
            (
                "SCOPES",
                r#"["https://www.googleapis.com/auth/admin.directory.group"]"#,
            ),
        ])
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_reader(make_reader(base_vars())).unwrap();

        assert_eq!(config.domain, "deark.be");
        assert_eq!(config.wisa_password.expose_secret(), "secret");
        assert_eq!(config.directory_credentials.client_id, "cid");
        assert_eq!(config.directory_scopes.len(), 1);
        assert_eq!(config.directory_token_file, PathBuf::from("tokendir.json"));
        assert!(config.report.is_none());
        assert_eq!(config.cohort_prefixes, vec!["arkls-", "arkks-"]);
        assert_eq!(config.group_suffix, "ouders");
        assert_eq!(config.exception_cohort.as_deref(), Some("ArkKS-K1 Kikker"));
        assert!(config.test_cohort.is_none());
        assert_eq!(config.pacing_delay, Duration::from_secs(1));
        assert_eq!(
            config.roster_snapshot_path,
            Some(PathBuf::from("output/data.json"))
        );
        assert_eq!(config.lock_file, PathBuf::from("arkmailer.lock"));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_missing_required_var() {
        let mut vars = base_vars();
        vars.remove("DOMAIN");

        let err = AppConfig::from_reader(make_reader(vars)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
        assert!(err.to_string().contains("DOMAIN"));
    }

    #[test]
    fn test_invalid_credentials() {
        let mut vars = base_vars();
        vars.insert("CREDENTIALS", "{not json");

        let err = AppConfig::from_reader(make_reader(vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "CREDENTIALS"));
    }

    #[test]
    fn test_empty_scopes_rejected() {
        let mut vars = base_vars();
        vars.insert("SCOPES", "[]");

        let err = AppConfig::from_reader(make_reader(vars)).unwrap_err();
        assert!(err.to_string().contains("SCOPES"));
    }

    #[test]
    fn test_report_config() {
        let mut vars = base_vars();
        vars.insert("SENDER_EMAIL_LOGIN", "ict@deark.be");
        vars.insert("RECEIVER_EMAIL", "admin@deark.be");
        vars.insert("CREDENTIALS_MAIL", CREDENTIALS);
        vars.insert(
            "SCOPES_MAIL",
            r#"["https://www.googleapis.com/auth/gmail.send"]"#,
        );

        let config = AppConfig::from_reader(make_reader(vars)).unwrap();
        let report = config.report.unwrap();
        assert_eq!(report.sender, "ict@deark.be");
        assert_eq!(report.receiver, "admin@deark.be");
        assert_eq!(report.token_file, PathBuf::from("tokenmail.json"));
        assert!(report.credentials.is_some());
        assert_eq!(report.scopes.len(), 1);
    }

    #[test]
    fn test_half_configured_report_rejected() {
        let mut vars = base_vars();
        vars.insert("SENDER_EMAIL_LOGIN", "ict@deark.be");

        let err = AppConfig::from_reader(make_reader(vars)).unwrap_err();
        assert!(err.to_string().contains("RECEIVER_EMAIL"));
    }

    #[test]
    fn test_custom_values() {
        let mut vars = base_vars();
        vars.extend([
            ("COHORT_PREFIXES", "ArkLS-, arkks-, arkms-"),
            ("EXCEPTION_COHORT", ""),
            ("TEST_COHORT", "ArkLS-1 blauw"),
            ("PACING_DELAY_MS", "250"),
            ("ROSTER_SNAPSHOT_PATH", ""),
            ("LOG_FORMAT", "JSON"),
            ("LOG_FILE", "/var/log/arkmailer.log"),
            ("RUST_LOG", "debug"),
        ]);

        let config = AppConfig::from_reader(make_reader(vars)).unwrap();
        assert_eq!(config.cohort_prefixes, vec!["arkls-", "arkks-", "arkms-"]);
        assert!(config.exception_cohort.is_none());
        assert_eq!(config.test_cohort.as_deref(), Some("ArkLS-1 blauw"));
        assert_eq!(config.pacing_delay, Duration::from_millis(250));
        assert!(config.roster_snapshot_path.is_none());
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/arkmailer.log")));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_invalid_pacing_delay() {
        let mut vars = base_vars();
        vars.insert("PACING_DELAY_MS", "soon");

        let err = AppConfig::from_reader(make_reader(vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
        assert!(err.to_string().contains("PACING_DELAY_MS"));
    }

    #[test]
    fn test_sync_config_cli_cohort_wins() {
        let mut vars = base_vars();
        vars.insert("TEST_COHORT", "ArkLS-1 blauw");
        let config = AppConfig::from_reader(make_reader(vars)).unwrap();

        let sync = config
            .sync_config(true, Some("ArkLS-2 groen".to_string()))
            .unwrap();
        assert_eq!(sync.test_filter.as_deref(), Some("ArkLS-2 groen"));
        assert!(sync.dry_run);
        assert_eq!(sync.domain, "deark.be");
    }
}
