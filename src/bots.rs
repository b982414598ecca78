//! Bot account detection
//!
//! Automated accounts (CI systems, dependency updaters) are excluded from
//! every join point of the pipeline: PR authors, deployment actors,
//! incident assignees and reviewers.

/// Lowercase substrings that mark an account as automated.
///
/// The `[bot]` forms are covered by the plain `bot` pattern but are listed
/// so the GitHub app naming scheme is explicit.
pub const BOT_PATTERNS: &[&str] = &[
    "bot",
    "jenkins",
    "travis",
    "circleci",
    "github-actions",
    "dependabot",
    "renovate",
    "snyk",
    "[bot]",
    "github-actions[bot]",
    "dependabot[bot]",
    "renovate[bot]",
    "snyk[bot]",
];

/// Returns true when `username` belongs to an automated account.
///
/// Blank usernames are not bots; they are handled as malformed input by
/// the caller.
pub fn is_bot(username: &str) -> bool {
    let username = username.trim();
    if username.is_empty() {
        return false;
    }

    let lowered = username.to_lowercase();
    BOT_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_bots() {
        for name in [
            "dependabot[bot]",
            "github-actions[bot]",
            "renovate-bot",
            "Jenkins",
            "travis-ci",
            "CircleCI-runner",
            "snyk-security",
            "release-bot",
        ] {
            assert!(is_bot(name), "{name} should be a bot");
        }
    }

    #[test]
    fn test_humans() {
        for name in ["alice", "bob-smith", "carol_dev", "Dan"] {
            assert!(!is_bot(name), "{name} should be human");
        }
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_bot("DEPENDABOT"));
        assert!(is_bot("GitHub-Actions"));
    }

    #[test]
    fn test_blank_is_not_bot() {
        assert!(!is_bot(""));
        assert!(!is_bot("   "));
    }

    #[test]
    fn test_substring_match_is_coarse() {
        // Substring matching also catches humans whose login contains "bot"
        assert!(is_bot("abbott"));
    }
}
