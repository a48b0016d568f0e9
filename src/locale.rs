//! Locale codes used for prompts and user-facing text

/// Locale used when nothing else is configured
pub const DEFAULT_LOCALE: &str = "en";

/// Reduce a locale tag such as "en-US" or "pt_BR" to its lowercase language code
pub fn normalize(code: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        return DEFAULT_LOCALE.to_string();
    }
    code.split(['-', '_'])
        .next()
        .unwrap_or(DEFAULT_LOCALE)
        .to_ascii_lowercase()
}

/// Convert a language code to its full name for use in prompts
pub fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "pt" => "Portuguese",
        _ => code, // Return code itself for unknown languages
    }
}

/// Placeholder shown in place of an analysis list that could not be produced
pub fn analysis_unavailable(code: &str) -> &'static str {
    match code {
        "es" => "Análisis no disponible",
        "fr" => "Analyse indisponible",
        "de" => "Analyse nicht verfügbar",
        "pt" => "Análise indisponível",
        _ => "Analysis unavailable",
    }
}
