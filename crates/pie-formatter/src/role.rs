//! Role alias normalization.

/// Normalize a caller-supplied role name to the canonical set the profile
/// advertises. `None` defaults to `"user"`. Unrecognised roles pass through
/// lower-cased; the template renderer ignores any role absent from the
/// profile.
pub fn normalize_role(role: Option<&str>, _known_roles: &[&str]) -> String {
    let role = match role {
        Some(r) if !r.is_empty() => r,
        _ => return "user".to_owned(),
    };
    match role.to_ascii_lowercase().as_str() {
        "assistant" | "model" => "agent".to_owned(),
        "developer" => "system".to_owned(),
        other => other.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&str] = &["system", "user", "agent"];

    #[test]
    fn maps_assistant_and_model_to_agent() {
        assert_eq!(normalize_role(Some("assistant"), KNOWN), "agent");
        assert_eq!(normalize_role(Some("model"), KNOWN), "agent");
    }

    #[test]
    fn lower_cases_unrecognised_casing() {
        assert_eq!(normalize_role(Some("USER"), KNOWN), "user");
    }

    #[test]
    fn missing_role_defaults_to_user() {
        assert_eq!(normalize_role(None, KNOWN), "user");
    }

    #[test]
    fn developer_maps_to_system() {
        assert_eq!(normalize_role(Some("developer"), KNOWN), "system");
    }
}
