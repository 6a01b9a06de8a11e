//! Secret masking for display surfaces (status output, HTTP state view).

/// Number of trailing characters left visible.
const VISIBLE_SUFFIX: usize = 6;

/// Mask a secret as `****` followed by its last six characters.
///
/// Blank input yields an empty string; keys of six characters or fewer are
/// fully masked.
pub fn mask(secret: &str) -> String {
    let secret = secret.trim();
    if secret.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= VISIBLE_SUFFIX {
        return "****".into();
    }
    let tail: String = chars[chars.len() - VISIBLE_SUFFIX..].iter().collect();
    format!("****{tail}")
}

/// Check whether an output string contains any of the known secrets.
pub fn scan_for_leakage(output: &str, secrets: &[&str]) -> bool {
    secrets
        .iter()
        .any(|s| !s.trim().is_empty() && output.contains(s))
}
