//! Vision model selection.

/// Model used when neither the call nor the process configuration names one.
pub const FALLBACK_MODEL: &str = "gpt-4o-mini";

/// Models known to accept inline image input.
pub const KNOWN_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
    "gpt-4-turbo",
    "o4-mini",
];

/// Resolve the model for a call: explicit argument, then process default,
/// then [`FALLBACK_MODEL`]. Blank values are skipped.
pub fn resolve_model(explicit: Option<&str>, configured: Option<&str>) -> String {
    [explicit, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|m| !m.is_empty())
        .unwrap_or(FALLBACK_MODEL)
        .to_string()
}

pub fn is_known_model(model: &str) -> bool {
    KNOWN_MODELS.contains(&model)
}

/// Resolve the model and warn (never fail) when it is not on the known list.
pub fn select_model(explicit: Option<&str>, configured: Option<&str>) -> String {
    let model = resolve_model(explicit, configured);
    if !is_known_model(&model) {
        tracing::warn!(
            "Model '{model}' is not in the known vision model list; sending the request anyway"
        );
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(resolve_model(Some("gpt-4o"), Some("gpt-4.1")), "gpt-4o");
        assert_eq!(resolve_model(None, Some("gpt-4.1")), "gpt-4.1");
        assert_eq!(resolve_model(None, None), FALLBACK_MODEL);
    }

    #[test]
    fn test_blank_values_fall_through() {
        assert_eq!(resolve_model(Some("  "), Some("gpt-4.1")), "gpt-4.1");
        assert_eq!(resolve_model(Some(""), Some("")), FALLBACK_MODEL);
    }

    #[test]
    fn test_unknown_model_is_still_selected() {
        assert!(!is_known_model("gpt-9-vision"));
        assert_eq!(select_model(Some("gpt-9-vision"), None), "gpt-9-vision");
        assert!(is_known_model(FALLBACK_MODEL));
    }
}
