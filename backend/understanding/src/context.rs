//! Deterministic assembly of the augmented context text.

use mnemo_core::SessionSummary;

/// Sentinel transcript text used when a session has no recent messages.
pub const NO_RECENT_MESSAGES: &str = "No recent messages.";

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

/// Digest of the summary shown to the analysis model.
pub fn summary_digest(summary: &SessionSummary) -> String {
    format!(
        "Session Summary:\n\
         - User preferences: {}\n\
         - Constraints: {}\n\
         - Key facts: {}\n\
         - Open questions: {}",
        join_or_none(&summary.user_profile.preferences),
        join_or_none(&summary.user_profile.constraints),
        join_or_none(&summary.key_facts),
        join_or_none(&summary.open_questions),
    )
}

/// Assemble the final augmented context.
///
/// Sections appear double-newline-separated in a fixed order: recent
/// conversation (when any recent messages exist), selected memory fields
/// (when resolved to non-empty text), then the effective query.
pub fn build_final_context(
    recent_transcript: Option<&str>,
    memory_context: Option<&str>,
    effective_query: &str,
) -> String {
    let mut parts = Vec::new();
    if let Some(recent) = recent_transcript {
        parts.push(format!("Recent conversation:\n{recent}"));
    }
    if let Some(memory) = memory_context {
        parts.push(format!("From session memory:\n{memory}"));
    }
    parts.push(format!("User query: {effective_query}"));
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::UserProfile;

    #[test]
    fn test_digest_with_values_and_placeholders() {
        let summary = SessionSummary {
            user_profile: UserProfile {
                preferences: vec!["Linux".into(), "quiet keyboard".into()],
                constraints: vec![],
            },
            key_facts: vec!["budget $1500".into()],
            ..Default::default()
        };
        let digest = summary_digest(&summary);
        assert!(digest.contains("- User preferences: Linux, quiet keyboard"));
        assert!(digest.contains("- Constraints: None"));
        assert!(digest.contains("- Key facts: budget $1500"));
        assert!(digest.contains("- Open questions: None"));
    }

    #[test]
    fn test_full_context_ordering() {
        let context = build_final_context(
            Some("user: hi\nassistant: hello"),
            Some("key_facts: budget $1500"),
            "What about the battery?",
        );
        assert_eq!(
            context,
            "Recent conversation:\nuser: hi\nassistant: hello\n\n\
             From session memory:\nkey_facts: budget $1500\n\n\
             User query: What about the battery?"
        );
    }

    #[test]
    fn test_context_without_optional_sections() {
        let context = build_final_context(None, None, "hello");
        assert_eq!(context, "User query: hello");
    }

    #[test]
    fn test_context_recent_only() {
        let context = build_final_context(Some("user: hi"), None, "hello");
        assert_eq!(context, "Recent conversation:\nuser: hi\n\nUser query: hello");
    }
}
