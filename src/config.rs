use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub sendgrid_api_key: String,
    pub sendgrid_sender_id: u64,
    pub sendgrid_base_url: String,
    pub default_from_address: Option<String>,
    pub templates_path: Option<String>,
    pub rate_limit_retries: u32,
    pub rate_limit_initial_delay_ms: u64,
    pub rate_limit_max_delay_ms: u64,
    pub ensure_settle_delay_ms: u64,
    pub list_verify_max_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which returns a variable's value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

        let config = Self {
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            sendgrid_api_key: lookup("SENDGRID_API_KEY")
                .ok_or_else(|| anyhow::anyhow!("SENDGRID_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("SENDGRID_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            sendgrid_sender_id: lookup("SENDGRID_SENDER_ID")
                .ok_or_else(|| anyhow::anyhow!("SENDGRID_SENDER_ID environment variable required"))
                .and_then(|id| {
                    id.trim().parse::<u64>().map_err(|_| {
                        anyhow::anyhow!("SENDGRID_SENDER_ID must be a numeric sender id")
                    })
                })?,
            sendgrid_base_url: non_empty("SENDGRID_BASE_URL")
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("SENDGRID_BASE_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })
                .transpose()?
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_from_address: non_empty("MAIL_FROM_ADDRESS"),
            templates_path: non_empty("EMAIL_TEMPLATES_PATH"),
            rate_limit_retries: number_or(&lookup, "RATE_LIMIT_RETRIES", 3)?,
            rate_limit_initial_delay_ms: number_or(&lookup, "RATE_LIMIT_INITIAL_DELAY_MS", 1_000)?,
            rate_limit_max_delay_ms: number_or(&lookup, "RATE_LIMIT_MAX_DELAY_MS", 10_000)?,
            ensure_settle_delay_ms: number_or(&lookup, "ENSURE_SETTLE_DELAY_MS", 2_000)?,
            list_verify_max_delay_ms: number_or(&lookup, "LIST_VERIFY_MAX_DELAY_MS", 8_000)?,
        };

        // Never log the API key
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("SendGrid Base URL: {}", config.sendgrid_base_url);
        tracing::debug!("SendGrid Sender ID: {}", config.sendgrid_sender_id);
        if let Some(ref path) = config.templates_path {
            tracing::info!("Email templates loaded from: {}", path);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Name of the list that collects every recipient of the configured sender.
    pub fn sender_list_name(&self) -> String {
        format!("sender_{}_list", self.sendgrid_sender_id)
    }
}

fn number_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> anyhow::Result<T> {
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        _ => Ok(default),
    }
}
