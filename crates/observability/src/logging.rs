//! Structured Logging Setup via tracing-subscriber
//!
//! Umgebungsvariablen haben Vorrang vor der Konfigurationsdatei:
//! - `TRIQUI_LOG_LEVEL`: Filter-Direktive (z.B. `info` oder `triqui_gateway=debug`)
//! - `TRIQUI_LOG_FORMAT`: `text` oder `json`

use std::str::FromStr;

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "TRIQUI_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "TRIQUI_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anders => Err(anyhow!("Unbekanntes Log-Format '{anders}' (erlaubt: text, json)")),
        }
    }
}

/// Initialisiert das Logging-System
///
/// `level` und `format` stammen aus der Konfiguration und werden von den
/// Umgebungsvariablen ueberschrieben. Ein ungueltiges Format faellt auf
/// `text` zurueck, ein ungueltiger Filter auf `info`.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = format_bestimmen(std::env::var(ENV_LOG_FORMAT).ok().as_deref(), format);

    match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    }
    .map_err(|e| anyhow!("Logging konnte nicht initialisiert werden: {e}"))
}

/// Waehlt das Format: Umgebung vor Konfiguration, Fallback Text
pub fn format_bestimmen(aus_env: Option<&str>, aus_config: &str) -> LogFormat {
    aus_env
        .and_then(|f| f.parse().ok())
        .or_else(|| aus_config.parse().ok())
        .unwrap_or_default()
}
