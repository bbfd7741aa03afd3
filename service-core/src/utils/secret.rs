use subtle::ConstantTimeEq;

/// Compare a presented secret with the expected one in constant time.
///
/// Only the length comparison short-circuits.
pub fn secrets_match(expected: &str, presented: &str) -> bool {
    let expected_bytes = expected.as_bytes();
    let presented_bytes = presented.as_bytes();

    if expected.is_empty() || expected_bytes.len() != presented_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(presented_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secret() {
        assert!(secrets_match("praify-cron", "praify-cron"));
    }

    #[test]
    fn test_mismatched_secret() {
        assert!(!secrets_match("praify-cron", "praify-crom"));
        assert!(!secrets_match("praify-cron", "praify"));
        assert!(!secrets_match("praify-cron", ""));
    }

    #[test]
    fn test_empty_expected_never_matches() {
        assert!(!secrets_match("", ""));
    }
}
