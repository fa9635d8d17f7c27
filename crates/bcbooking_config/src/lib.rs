use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::Path;
use tracing::debug;

pub mod env_vars;
pub mod models;
pub use models::*;

use env_vars::{get_config_prefix, inject_env_vars, non_empty_env};

/// Loads the layered configuration from `CONFIG_DIR` (default `./config`).
///
/// Sources, lowest precedence first: `default.*`, `{RUN_ENV}.*`, then
/// `BCBOOKING__SECTION__KEY` environment variables. Secret markers and the
/// legacy credential variables are resolved afterwards.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();
    let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    load_config_from(Path::new(&config_dir))
}

/// Same as [`load_config`] but reads the config files from `config_dir`.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, ConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let prefix = get_config_prefix();

    let default_path = config_dir.join("default");
    let env_path = config_dir.join(&run_env);
    debug!(
        "Loading config from {} and {}",
        default_path.display(),
        env_path.display()
    );

    let builder = Config::builder()
        .add_source(File::with_name(&path_str(&default_path)).required(false))
        .add_source(File::with_name(&path_str(&env_path)).required(false))
        .add_source(Environment::with_prefix(&prefix).separator("__"));

    let raw_config: AppConfig = builder.build()?.try_deserialize()?;
    let config = apply_env_overrides_from_marker(raw_config)?;
    Ok(apply_legacy_erp_env(config))
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Replaces all "secret_from_env" markers with environment variable values.
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigError> {
    let mut json = serde_json::to_value(&config)
        .map_err(|err| ConfigError::Message(format!("failed to serialize config: {err}")))?;
    inject_env_vars(&mut json);
    serde_json::from_value(json)
        .map_err(|err| ConfigError::Message(format!("failed to rebuild config: {err}")))
}

/// Fills unset ERP credentials from TENANT_ID, CLIENT_ID, CLIENT_SECRET and SCOPE.
pub fn apply_legacy_erp_env(mut config: AppConfig) -> AppConfig {
    if let Some(erp) = config.erp.as_mut() {
        fill_from_env(&mut erp.tenant_id, "TENANT_ID");
        fill_from_env(&mut erp.client_id, "CLIENT_ID");
        fill_from_env(&mut erp.client_secret, "CLIENT_SECRET");
        fill_from_env(&mut erp.scope, "SCOPE");
    }
    config
}

fn fill_from_env(slot: &mut Option<String>, name: &str) {
    let unset = slot.as_deref().map_or(true, |v| v.trim().is_empty());
    if unset {
        *slot = non_empty_env(name);
    }
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the dotenv file once per process.
///
/// `DOTENV_OVERRIDE` names the file; otherwise a first CLI argument starting
/// with `.env` is used, falling back to `.env`. Returns the path that was tried.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path_override = env::var("DOTENV_OVERRIDE").ok();
    let dotenv_path_arg = env::args().nth(1).filter(|s| s.starts_with(".env"));

    let dotenv_path = dotenv_path_override
        .or(dotenv_path_arg)
        .unwrap_or_else(|| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}
