//! Deterministic name sanitizers.
//!
//! Branch names arrive as arbitrary strings (`feature/login`, `jbk/px-454`)
//! and have to become a valid database identifier and a valid DNS label.
//! Both sanitizers are idempotent: applying them twice changes nothing.

/// Sanitize a string into a database identifier.
///
/// Runs of anything outside `[a-z0-9]` (underscores included) collapse to a
/// single `_`, the result is truncated to 64 characters, stripped of
/// leading/trailing underscores, and lowercased.
pub fn normalize_database_name(input: &str) -> String {
    let collapsed = collapse_runs(input, '_', |c| c.is_ascii_alphanumeric());
    let truncated: String = collapsed.chars().take(64).collect();
    truncated.trim_matches('_').to_ascii_lowercase()
}

/// Sanitize a string into a DNS label.
///
/// Runs of anything outside `[a-z0-9_]` collapse to a single `-`, the result
/// is truncated to 63 characters (the DNS label limit), stripped of
/// leading/trailing hyphens, and lowercased. Underscores pass through.
pub fn normalize_domain_name(input: &str) -> String {
    let collapsed = collapse_runs(input, '-', |c| c.is_ascii_alphanumeric() || c == '_');
    let truncated: String = collapsed.chars().take(63).collect();
    truncated.trim_matches('-').to_ascii_lowercase()
}

/// Replace every maximal run of non-`keep` characters with one `separator`.
fn collapse_runs(input: &str, separator: char, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for ch in input.chars() {
        if keep(ch) {
            out.push(ch);
            in_run = false;
        } else {
            if !in_run {
                out.push(separator);
            }
            in_run = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn database_names() {
        for (input, expected) in [
            ("foo_bar", "foo_bar"),
            ("foo-bar", "foo_bar"),
            ("foo--bar", "foo_bar"),
            ("--foo--bar--", "foo_bar"),
            ("foo%-bar", "foo_bar"),
            ("one! two? three 0x995", "one_two_three_0x995"),
            ("jbk/px-454", "jbk_px_454"),
            ("please+don't %20 do / this", "please_don_t_20_do_this"),
        ] {
            assert_eq!(normalize_database_name(input), expected, "input: {input}");
        }
    }

    #[test]
    fn domain_names() {
        for (input, expected) in [
            ("foo-bar", "foo-bar"),
            ("-foo--bar--", "foo-bar"),
            ("foo__bar", "foo__bar"),
            ("foo%-bar", "foo-bar"),
            ("one! two? three 0x995", "one-two-three-0x995"),
            ("jbk/px-454", "jbk-px-454"),
            ("please+don't %20 do / this", "please-don-t-20-do-this"),
        ] {
            assert_eq!(normalize_domain_name(input), expected, "input: {input}");
        }
    }

    #[test]
    fn database_name_is_idempotent() {
        for input in ["feature/login", "--a--b--", "UPPER case", "x", ""] {
            let once = normalize_database_name(input);
            assert_eq!(normalize_database_name(&once), once, "input: {input}");
        }
    }

    #[test]
    fn domain_name_is_idempotent() {
        for input in ["feature/login", "-a-_-b-", "UPPER case", "x", ""] {
            let once = normalize_domain_name(input);
            assert_eq!(normalize_domain_name(&once), once, "input: {input}");
        }
    }

    #[test]
    fn database_name_truncates_to_64() {
        let long = "a".repeat(100);
        assert_eq!(normalize_database_name(&long).len(), 64);
    }

    #[test]
    fn domain_name_truncates_to_63() {
        let long = "a".repeat(100);
        assert_eq!(normalize_domain_name(&long).len(), 63);
    }

    #[test]
    fn shape_invariants() {
        for input in ["feature/login", "!!weird?? input__", "-x-", "a b c"] {
            let db = normalize_database_name(input);
            assert!(db.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
            assert!(!db.starts_with('_') && !db.ends_with('_'));

            let domain = normalize_domain_name(input);
            assert!(!domain.starts_with('-') && !domain.ends_with('-'));
        }
    }

    #[test]
    fn uppercase_is_lowered() {
        assert_eq!(normalize_database_name("Feature/Login"), "feature_login");
        assert_eq!(normalize_domain_name("Feature/Login"), "feature-login");
    }
}
