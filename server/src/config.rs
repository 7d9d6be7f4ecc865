//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist. Die Umgebungsvariable `PORT` ueberschreibt den Port.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use triqui_db::DatabaseConfig;
use triqui_gateway::GatewayConfig;

/// Umgebungsvariable fuer den Pfad der Konfigurationsdatei
pub const ENV_CONFIG: &str = "TRIQUI_CONFIG";

/// Umgebungsvariable, die `netzwerk.port` ueberschreibt
pub const ENV_PORT: &str = "PORT";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Datenbank-Einstellungen
    pub datenbank: DatenbankEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger WebSocket-Verbindungen
    pub max_verbindungen: usize,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Triqui Server".into(),
            max_verbindungen: 1024,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    /// Port fuer WebSocket, Health und Metriken
    pub port: u16,
    /// Erlaubte CORS-Origins (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 5000,
            cors_origins: vec!["http://localhost:3000".into()],
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Verbindungs-URL
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    /// Raeume ohne Aktivitaet laenger als diese Zeit gelten als abgelaufen
    pub raum_ttl_stunden: u64,
    /// Intervall, in dem abgelaufene Raeume geloescht werden
    pub ablauf_intervall_sek: u64,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        Self {
            url: "sqlite://triqui.db".into(),
            max_verbindungen: 5,
            raum_ttl_stunden: 24,
            ablauf_intervall_sek: 300,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level oder Filter-Direktive
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Stellt `/metrics` bereit und zaehlt Ereignisse
    pub metriken_aktiviert: bool,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            metriken_aktiviert: true,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei und wendet `PORT` an.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        config.port_ueberschreiben(std::env::var(ENV_PORT).ok().as_deref())?;
        Ok(config)
    }

    /// Uebernimmt einen Port aus der Umgebung, falls gesetzt
    pub fn port_ueberschreiben(&mut self, wert: Option<&str>) -> anyhow::Result<()> {
        let Some(wert) = wert.map(str::trim).filter(|w| !w.is_empty()) else {
            return Ok(());
        };
        self.netzwerk.port = wert
            .parse()
            .map_err(|e| anyhow::anyhow!("{ENV_PORT}='{wert}' ist kein gueltiger Port: {e}"))?;
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    pub fn raum_ttl(&self) -> Duration {
        Duration::from_secs(self.datenbank.raum_ttl_stunden * 60 * 60)
    }

    pub fn ablauf_intervall(&self) -> Duration {
        Duration::from_secs(self.datenbank.ablauf_intervall_sek.max(1))
    }

    /// Datenbank-Konfiguration fuer `SqliteDb::oeffnen`
    pub fn datenbank_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.datenbank.url.clone(),
            max_verbindungen: self.datenbank.max_verbindungen,
            sqlite_wal: true,
            raum_ttl: self.raum_ttl(),
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            max_verbindungen: self.server.max_verbindungen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.netzwerk.port, 5000);
        assert_eq!(cfg.netzwerk.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(cfg.datenbank.url, "sqlite://triqui.db");
        assert_eq!(cfg.raum_ttl(), Duration::from_secs(24 * 3600));
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.observability.metriken_aktiviert);
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_adresse(), "0.0.0.0:5000");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            max_verbindungen = 10

            [netzwerk]
            port = 8080
            cors_origins = []

            [datenbank]
            raum_ttl_stunden = 2
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.gateway_config().max_verbindungen, 10);
        assert_eq!(cfg.netzwerk.port, 8080);
        assert!(cfg.netzwerk.cors_origins.is_empty());
        assert_eq!(cfg.datenbank_config().raum_ttl, Duration::from_secs(2 * 3600));
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");
        assert_eq!(cfg.datenbank.ablauf_intervall_sek, 300);
    }

    #[test]
    fn port_aus_umgebung() {
        let mut cfg = ServerConfig::default();
        cfg.port_ueberschreiben(Some("7000")).unwrap();
        assert_eq!(cfg.netzwerk.port, 7000);

        cfg.port_ueberschreiben(None).unwrap();
        cfg.port_ueberschreiben(Some("  ")).unwrap();
        assert_eq!(cfg.netzwerk.port, 7000);

        assert!(cfg.port_ueberschreiben(Some("abc")).is_err());
        assert!(cfg.port_ueberschreiben(Some("70000")).is_err());
    }

    #[test]
    fn fehlende_datei_ergibt_standardwerte() {
        let cfg = ServerConfig::laden("/nicht/vorhanden/triqui.toml").unwrap();
        assert_eq!(cfg.datenbank.url, "sqlite://triqui.db");
    }

    #[test]
    fn kaputte_datei_ist_ein_fehler() {
        let pfad = std::env::temp_dir().join(format!("triqui-config-{}.toml", std::process::id()));
        std::fs::write(&pfad, "[netzwerk]\nport = \"kein port\"\n").unwrap();
        let ergebnis = ServerConfig::laden(pfad.to_str().unwrap());
        std::fs::remove_file(&pfad).ok();
        assert!(ergebnis.is_err());
    }
}
