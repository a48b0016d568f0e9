//! Post-session analysis
//!
//! Turns a finished transcript into a short structured critique: what the
//! user did well and what to improve. The request is schema-constrained so a
//! successful result always carries both lists.

mod client;

pub use client::AnalysisClient;

use crate::error::AnalysisError;
use crate::live::Turn;
use crate::locale;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Upper bound for the whole analysis call, retries included
pub const ANALYSIS_TIMEOUT_SECS: u64 = 120;

/// Structured feedback for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalysis {
    pub strong_points: Vec<String>,
    pub improvements: Vec<String>,
}

impl SessionAnalysis {
    /// Placeholder stored when the analysis request fails
    pub fn unavailable(locale: &str) -> Self {
        let note = locale::analysis_unavailable(locale).to_string();
        Self {
            strong_points: vec![note.clone()],
            improvements: vec![note],
        }
    }
}

/// Produces an analysis for a transcript
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        transcript: &[Turn],
        locale: &str,
    ) -> Result<SessionAnalysis, AnalysisError>;
}

/// Run the analysis with the overall timeout, falling back to the placeholder
pub async fn analyze_or_placeholder(
    analyzer: &dyn Analyzer,
    transcript: &[Turn],
    locale: &str,
) -> SessionAnalysis {
    analyze_with_timeout(
        analyzer,
        transcript,
        locale,
        Duration::from_secs(ANALYSIS_TIMEOUT_SECS),
    )
    .await
}

async fn analyze_with_timeout(
    analyzer: &dyn Analyzer,
    transcript: &[Turn],
    locale: &str,
    limit: Duration,
) -> SessionAnalysis {
    let result = match tokio::time::timeout(limit, analyzer.analyze(transcript, locale)).await {
        Ok(result) => result,
        Err(_) => Err(AnalysisError::Timeout(limit.as_secs())),
    };

    match result {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(error = %e, "Session analysis failed, storing placeholder");
            SessionAnalysis::unavailable(locale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::Role;

    struct FixedAnalyzer(Result<SessionAnalysis, ()>);

    #[async_trait]
    impl Analyzer for FixedAnalyzer {
        async fn analyze(
            &self,
            _transcript: &[Turn],
            _locale: &str,
        ) -> Result<SessionAnalysis, AnalysisError> {
            self.0
                .clone()
                .map_err(|_| AnalysisError::InvalidResponse("bad".into()))
        }
    }

    struct StalledAnalyzer;

    #[async_trait]
    impl Analyzer for StalledAnalyzer {
        async fn analyze(
            &self,
            _transcript: &[Turn],
            _locale: &str,
        ) -> Result<SessionAnalysis, AnalysisError> {
            std::future::pending().await
        }
    }

    fn transcript() -> Vec<Turn> {
        vec![Turn::new(Role::User, "I was fired without notice")]
    }

    #[test]
    fn test_analysis_uses_camel_case_fields() {
        let analysis = SessionAnalysis {
            strong_points: vec!["Clear timeline".into()],
            improvements: vec![],
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"strongPoints": ["Clear timeline"], "improvements": []})
        );
    }

    #[test]
    fn test_partial_analysis_is_rejected() {
        let result: Result<SessionAnalysis, _> =
            serde_json::from_str(r#"{"strongPoints": ["a"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unavailable_is_localized() {
        let analysis = SessionAnalysis::unavailable("es");
        assert_eq!(analysis.strong_points.len(), 1);
        assert_eq!(analysis.improvements.len(), 1);
        assert_eq!(analysis.strong_points[0], locale::analysis_unavailable("es"));
    }

    #[tokio::test]
    async fn test_success_is_passed_through() {
        let expected = SessionAnalysis {
            strong_points: vec!["Stayed calm".into()],
            improvements: vec!["Bring documents".into()],
        };
        let analyzer = FixedAnalyzer(Ok(expected.clone()));
        let result = analyze_or_placeholder(&analyzer, &transcript(), "en").await;
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn test_failure_yields_placeholder() {
        let analyzer = FixedAnalyzer(Err(()));
        let result = analyze_or_placeholder(&analyzer, &transcript(), "fr").await;
        assert_eq!(result, SessionAnalysis::unavailable("fr"));
    }

    #[tokio::test]
    async fn test_timeout_yields_placeholder() {
        let result = analyze_with_timeout(
            &StalledAnalyzer,
            &transcript(),
            "en",
            Duration::from_millis(20),
        )
        .await;
        assert_eq!(result, SessionAnalysis::unavailable("en"));
    }
}
