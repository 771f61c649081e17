use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub loader: LoaderSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoaderSettings {
    /// Dashboard restored at startup, as a URL or a file path
    pub initial_dashboard: Option<String>,
    pub request_timeout_secs: u64,
}

fn builder() -> anyhow::Result<config::builder::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind_address", "0.0.0.0:8080")?
        .set_default("loader.request_timeout_secs", 30)?)
}

/// Defaults, then `config/dashboard.*` if present, then `DASHBOARD__*`
/// environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
