//! Turning model text into structured payloads

use research_core::{AgentError, AgentPayload};

/// Parse a model reply into a payload
///
/// Tries the whole reply as JSON first, then the outermost `{...}` span
/// (models like to wrap JSON in prose or code fences). Plain prose is kept
/// as a summary-only payload. An empty reply is an invalid response.
pub fn parse_payload(text: &str) -> Result<AgentPayload, AgentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AgentError::InvalidResponse(
            "model returned an empty response".to_string(),
        ));
    }

    if let Ok(payload) = serde_json::from_str::<AgentPayload>(trimmed) {
        return Ok(payload);
    }

    if let Some(span) = json_span(trimmed) {
        if let Ok(payload) = serde_json::from_str::<AgentPayload>(span) {
            return Ok(payload);
        }
        // Looked like JSON but was not usable; worth another attempt
        return Err(AgentError::InvalidResponse(format!(
            "malformed JSON payload: {}",
            truncate(span, 120)
        )));
    }

    Ok(AgentPayload::summary(trimmed))
}

fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_core::{Confidence, Stance};

    #[test]
    fn test_plain_json() {
        let payload = parse_payload(
            r#"{"summary": "Datacenter revenue doubled", "key_drivers": ["H100 demand"]}"#,
        )
        .unwrap();
        assert_eq!(payload.summary, "Datacenter revenue doubled");
        assert_eq!(payload.key_drivers, vec!["H100 demand".to_string()]);
    }

    #[test]
    fn test_fenced_json() {
        let text = "Here you go:\n```json\n{\"summary\": \"ok\", \"stance\": \"buy\", \"confidence\": \"high\"}\n```";
        let payload = parse_payload(text).unwrap();
        assert_eq!(payload.stance, Some(Stance::Buy));
        assert_eq!(payload.confidence, Some(Confidence::High));
    }

    #[test]
    fn test_prose_becomes_summary() {
        let payload = parse_payload("  Shares drifted lower on light volume.  ").unwrap();
        assert_eq!(payload.summary, "Shares drifted lower on light volume.");
        assert!(payload.risks.is_empty());
    }

    #[test]
    fn test_empty_is_invalid() {
        assert!(matches!(
            parse_payload("   "),
            Err(AgentError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_broken_json_is_invalid() {
        // No closing brace means no span: treated as prose
        let payload = parse_payload(r#"{"summary": "cut off"#).unwrap();
        assert_eq!(payload.summary, r#"{"summary": "cut off"#);

        let err = parse_payload(r#"{"summary": 42}"#).unwrap_err();
        assert!(matches!(err, AgentError::InvalidResponse(_)));
        assert!(err.is_retryable());
    }
}
