//! Internal serde types for the engine's line protocol.

use serde::Serialize;

/// Outbound envelope: `{"version": <engine version>, "request": <body>}`.
///
/// `version` is omitted entirely (not null) when the engine version has not
/// been negotiated yet.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
    pub request: &'a serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_with_version() {
        let request = serde_json::json!({"Autocomplete": {"before": "x"}});
        let envelope = Envelope {
            version: Some("3.2.28"),
            request: &request,
        };
        let line = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            line,
            r#"{"version":"3.2.28","request":{"Autocomplete":{"before":"x"}}}"#
        );
    }

    #[test]
    fn test_envelope_omits_unknown_version() {
        let request = serde_json::json!({});
        let envelope = Envelope {
            version: None,
            request: &request,
        };
        let line = serde_json::to_string(&envelope).unwrap();
        assert_eq!(line, r#"{"request":{}}"#);
    }
}
