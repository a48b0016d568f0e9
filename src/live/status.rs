//! Connection status of a live session

/// Structured connection state
///
/// `Errored` behaves like `Disconnected` for the caller (a new connect is
/// allowed) but records that the last attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Active,
    Errored { reason: String },
}

impl ConnectionStatus {
    /// True while a transport session is being opened or is open
    pub fn is_busy(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Active)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ConnectionStatus::Errored { .. })
    }

    /// Display text for the given locale
    pub fn label(&self, locale: &str) -> String {
        let (disconnected, connecting, active, failed) = match locale {
            "es" => ("Desconectado", "Conectando...", "En vivo", "Error de conexión"),
            "fr" => ("Déconnecté", "Connexion...", "En direct", "Échec de la connexion"),
            "de" => ("Getrennt", "Verbinden...", "Live", "Verbindung fehlgeschlagen"),
            "pt" => ("Desconectado", "Conectando...", "Ao vivo", "Falha na conexão"),
            _ => ("Disconnected", "Connecting...", "Live", "Connection failed"),
        };
        match self {
            ConnectionStatus::Disconnected => disconnected.to_string(),
            ConnectionStatus::Connecting => connecting.to_string(),
            ConnectionStatus::Active => active.to_string(),
            ConnectionStatus::Errored { reason } => format!("{}: {}", failed, reason),
        }
    }
}
