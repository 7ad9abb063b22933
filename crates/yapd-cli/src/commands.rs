//! Subcommand implementations.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use yapd_core::auth::dashboard::GateMode;
use yapd_core::models::validate_url;
use yapd_core::{App, Config, ConfigStore, EndpointConfig, MasterSecret, SetupConfig};

use crate::output;

/// Maximum length accepted for any prompted secret.
const MAX_SECRET_LENGTH: usize = 128;

fn open_app() -> Result<App> {
    let config = Config::load()?;
    let passphrase = MasterSecret::resolve()?;
    App::open(config, &passphrase)
}

fn require_unlocked(app: &App) -> Result<()> {
    if !app.gate.is_unlocked() {
        bail!("Dashboard is locked - run `yapd unlock` first");
    }
    Ok(())
}

fn prompt_secret(prompt: &str) -> Result<String> {
    let secret = rpassword::prompt_password(prompt).context("Failed to read password")?;
    if secret.is_empty() {
        bail!("Password must not be empty");
    }
    if secret.len() > MAX_SECRET_LENGTH {
        bail!("Password longer than {} characters", MAX_SECRET_LENGTH);
    }
    Ok(secret)
}

fn prompt_new_secret(what: &str) -> Result<String> {
    let first = prompt_secret(&format!("New {}: ", what))?;
    let second = prompt_secret(&format!("Repeat {}: ", what))?;
    if first != second {
        bail!("Entries do not match");
    }
    Ok(first)
}

/// Current store contents for a read-modify-write. A missing store starts
/// empty; an unreadable existing one is never overwritten.
fn load_for_update(store: &dyn ConfigStore) -> Result<SetupConfig> {
    match store.load() {
        Ok(config) => Ok(config),
        Err(_) if !store.exists() => Ok(SetupConfig::default()),
        Err(e) => Err(e).context("Refusing to overwrite an unreadable credential store (wrong passphrase?)"),
    }
}

pub fn init() -> Result<()> {
    // Re-seal an existing store under the new passphrase.
    let existing = match MasterSecret::resolve() {
        Ok(old) => {
            let app = App::open(Config::load()?, &old)?;
            if app.credentials.exists() {
                Some(app.credentials.load().context("Existing store cannot be read with the current passphrase")?)
            } else {
                None
            }
        }
        Err(_) => None,
    };

    if MasterSecret::is_stored() {
        println!("Replacing the passphrase stored in the OS keychain.");
    }
    let passphrase = prompt_new_secret("passphrase")?;
    MasterSecret::store(&passphrase)?;

    if let Some(config) = existing {
        let app = App::open(Config::load()?, &passphrase)?;
        app.credentials.save(&config)?;
        info!(endpoints = config.endpoints.len(), "Credential store re-encrypted");
    }
    println!("Passphrase stored in the OS keychain.");
    Ok(())
}

pub fn endpoint_add(url: &str) -> Result<()> {
    let url = validate_url(url)?;
    let app = open_app()?;
    let mut config = load_for_update(app.credentials.as_ref())?;

    let secret = prompt_secret(&format!("Password for {}: ", url))?;
    let endpoint = EndpointConfig::new(&url, &secret);
    let normalized = endpoint.url.clone();
    config.upsert_endpoint(endpoint);
    app.credentials.save(&config)?;
    // The old session belongs to the old secret.
    app.sessions.invalidate(&normalized);

    println!("Saved {}", normalized);
    Ok(())
}

pub fn endpoint_remove(url: &str) -> Result<()> {
    let app = open_app()?;
    let mut config = load_for_update(app.credentials.as_ref())?;
    if !config.remove_endpoint(url) {
        bail!("Endpoint {} is not configured", url);
    }
    app.credentials.save(&config)?;
    app.sessions.invalidate(url);
    println!("Removed {}", url);
    Ok(())
}

pub fn endpoint_list() -> Result<()> {
    let app = open_app()?;
    let config = app.credentials.load_or_empty();
    if config.endpoints.is_empty() {
        println!("No endpoints configured. Add one with `yapd endpoint add <url>`.");
        return Ok(());
    }
    for endpoint in &config.endpoints {
        match app.sessions.cached(&endpoint.url) {
            Some(session) => println!(
                "{}  (session from {})",
                endpoint.url,
                session.obtained_at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => println!("{}", endpoint.url),
        }
    }
    Ok(())
}

pub fn settings(main_url: Option<String>, use_pihole_auth: Option<bool>, set_password: bool) -> Result<()> {
    let app = open_app()?;
    let mut config = load_for_update(app.credentials.as_ref())?;

    if let Some(url) = main_url {
        config.settings.main_url = Some(validate_url(&url)?);
    }
    if let Some(enabled) = use_pihole_auth {
        config.settings.use_pihole_auth = Some(enabled);
    }
    if set_password {
        config.settings.yapd_password = Some(prompt_new_secret("dashboard password")?);
    }

    app.credentials.save(&config)?;
    println!("Settings saved.");
    Ok(())
}

pub async fn unlock() -> Result<()> {
    let app = open_app()?;
    let prompt = match app.gate.mode()? {
        GateMode::Open => {
            println!("Dashboard has no password configured.");
            return Ok(());
        }
        GateMode::PiholeAuth(url) => format!("Pi-hole password for {}: ", url),
        GateMode::Password(_) => "Dashboard password: ".to_string(),
    };

    let password = prompt_secret(&prompt)?;
    app.gate.unlock(&password).await?;
    println!("Dashboard unlocked for {} hours.", app.config.dashboard_unlock_hours);
    Ok(())
}

pub fn logout(forget_passphrase: bool) -> Result<()> {
    let app = open_app()?;
    app.sessions.invalidate_all();
    if let Err(e) = app.gate.lock() {
        warn!(error = %e, "Failed to remove unlock stamp");
    }
    if forget_passphrase {
        MasterSecret::delete()?;
        println!("Passphrase removed from the OS keychain.");
    }
    println!("Logged out.");
    Ok(())
}

/// Show or change runtime settings in `config.json`.
pub fn config(
    request_timeout_secs: Option<u64>,
    accept_invalid_certs: Option<bool>,
    dashboard_unlock_hours: Option<i64>,
) -> Result<()> {
    // Stored values only; environment overrides are not persisted.
    let mut config = Config::load_from(&Config::config_dir()?)?;
    let changed = request_timeout_secs.is_some()
        || accept_invalid_certs.is_some()
        || dashboard_unlock_hours.is_some();

    if let Some(secs) = request_timeout_secs {
        if secs == 0 {
            bail!("Request timeout must be at least one second");
        }
        config.request_timeout_secs = secs;
    }
    if let Some(accept) = accept_invalid_certs {
        config.accept_invalid_certs = accept;
    }
    if let Some(hours) = dashboard_unlock_hours {
        if hours <= 0 {
            bail!("Unlock duration must be positive");
        }
        config.dashboard_unlock_hours = hours;
    }

    if changed {
        config.save()?;
        info!("Configuration saved");
    }
    print!("{}", output::render_config(&config));
    Ok(())
}

pub async fn connect() -> Result<()> {
    let app = open_app()?;
    require_unlocked(&app)?;
    let sessions = app.sessions.connect_all().await?;
    if sessions.is_empty() {
        println!("No endpoints configured.");
    } else {
        print!("{}", output::render_sessions(&sessions));
    }
    Ok(())
}

pub async fn summary(json: bool) -> Result<()> {
    let app = open_app()?;
    require_unlocked(&app)?;
    let summary = app.aggregator.get_summary().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", output::render_summary(&summary));
    }
    Ok(())
}

pub async fn history(json: bool) -> Result<()> {
    let app = open_app()?;
    require_unlocked(&app)?;
    let history = app.aggregator.get_history().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
    } else {
        print!("{}", output::render_history(&history));
    }
    Ok(())
}

pub async fn report(json: bool) -> Result<()> {
    let app = open_app()?;
    require_unlocked(&app)?;
    let report = app.aggregator.get_report().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output::render_summary(&report.summary));
        println!();
        print!("{}", output::render_history(&report.history));
    }
    Ok(())
}

pub async fn get(url: &str, path: &str) -> Result<()> {
    let app = open_app()?;
    require_unlocked(&app)?;
    let body = app.gateway.forward(url, path).await?;
    println!("{}", body);
    Ok(())
}
