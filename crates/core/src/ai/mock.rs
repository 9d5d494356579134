use super::{AiServiceError, SummaryClient};
use async_trait::async_trait;

/// Offline provider (`AI_PROVIDER=mock`) for local development without an LLM.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockSummaryClient;

#[async_trait]
impl SummaryClient for MockSummaryClient {
    async fn generate_summary(&self, symptoms: &str, diagnosis: &str) -> Result<String, AiServiceError> {
        let assessment = match diagnosis.trim() {
            "" => "No diagnosis recorded.",
            d => d,
        };
        Ok(format!(
            "**Chief Complaints:** {}\n\n**Assessment:** {}\n\n**Summary:** Mock summary generated without an AI provider.",
            symptoms.trim(),
            assessment
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_summary_mentions_inputs() {
        let summary = MockSummaryClient
            .generate_summary("Persistent headache", "Migraine with aura")
            .await
            .unwrap();
        assert!(summary.contains("Persistent headache"));
        assert!(summary.contains("Migraine with aura"));
    }
}
