use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

// Compile-once regex via OnceLock.
fn re_email() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\w.-]+@[\w.-]+").unwrap())
}

/// Extract the bare `local@domain` token from a free-form address header.
///
/// Example: `"Sarah Chen <sarah.chen@school.edu>"` → `"sarah.chen@school.edu"`.
/// Falls back to the raw input when nothing matches (original behavior:
/// a header without an address still keys a report row).
pub fn extract_email(address: &str) -> &str {
    re_email()
        .find(address)
        .map(|m| m.as_str())
        .unwrap_or(address)
}

/// Hard truncation to `limit` characters (not bytes). Shorter input is
/// returned unchanged.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        text.chars().take(limit).collect()
    }
}

/// Write a file atomically: write to a sibling temp file, then rename.
pub fn atomic_write_str(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_email_display_name() {
        assert_eq!(
            extract_email("Sarah Chen <sarah.chen@school.edu>"),
            "sarah.chen@school.edu"
        );
    }

    #[test]
    fn test_extract_email_bare_address() {
        assert_eq!(extract_email("joe@example.com"), "joe@example.com");
    }

    #[test]
    fn test_extract_email_no_match_falls_back() {
        assert_eq!(extract_email("Undisclosed recipients"), "Undisclosed recipients");
    }

    #[test]
    fn test_extract_email_preserves_case() {
        assert_eq!(extract_email("Joe <Joe.Smith@School.EDU>"), "Joe.Smith@School.EDU");
    }

    #[test]
    fn test_truncate_chars_exact_limit() {
        let text = "x".repeat(300);
        assert_eq!(truncate_chars(&text, 200).chars().count(), 200);
    }

    #[test]
    fn test_truncate_chars_short_unchanged() {
        assert_eq!(truncate_chars("hello", 200), "hello");
    }

    #[test]
    fn test_truncate_chars_counts_chars_not_bytes() {
        // 3 chars, 9 bytes
        assert_eq!(truncate_chars("日本語", 2), "日本");
    }

    #[test]
    fn test_atomic_write_str() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        atomic_write_str(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
