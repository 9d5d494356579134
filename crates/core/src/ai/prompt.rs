//! Prompt construction for clinical summaries.

use serde::Serialize;

pub const SYSTEM_PROMPT: &str = "You are a clinical documentation assistant. \
Write a concise, professional summary of the consultation for a physician's record. \
Use three short sections: Chief Complaints, Assessment, Summary. \
Do not invent findings that are not in the notes and do not give treatment advice.";

/// One chat-completions message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// System instruction plus a user message embedding the consultation notes.
pub fn build_messages(symptoms: &str, diagnosis: &str) -> Vec<ChatMessage> {
    let diagnosis = match diagnosis.trim() {
        "" => "Not provided",
        d => d,
    };

    vec![
        ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user",
            content: format!(
                "Summarise the following consultation.\n\nSymptoms:\n{}\n\nDiagnosis:\n{}",
                symptoms.trim(),
                diagnosis
            ),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_embeds_notes() {
        let messages = build_messages("Cough and fever", "Common cold");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert!(messages[1].content.contains("Symptoms:\nCough and fever"));
        assert!(messages[1].content.contains("Diagnosis:\nCommon cold"));
    }

    #[test]
    fn empty_diagnosis_is_marked_not_provided() {
        let messages = build_messages("Headache", "  ");
        assert!(messages[1].content.ends_with("Diagnosis:\nNot provided"));
    }
}
