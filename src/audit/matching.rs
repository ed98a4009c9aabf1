//! Cross-referencing commit messages against issue keys.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Commit, Issue, MatchResult};

/// Tracker key pattern: an uppercase letter, more uppercase letters or
/// digits, a hyphen, then digits.
fn issue_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z][A-Z0-9]+-\d+").expect("valid regex"))
}

/// Returns the distinct issue keys named in `text`, in first-seen order.
#[must_use]
pub fn extract_keys(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    issue_key_re()
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|key| seen.insert(*key))
        .map(String::from)
        .collect()
}

/// Links commits to issues by the keys their messages mention.
///
/// `links` holds every key found in any message, including keys that are not
/// in `issues`. `missing` and `unlinked` only consider keys of the supplied
/// issues.
#[must_use]
pub fn match_commits(issues: &[Issue], commits: &[Commit]) -> MatchResult {
    let issue_keys: BTreeSet<&str> = issues.iter().map(|issue| issue.key.as_str()).collect();
    let mut found: HashSet<String> = HashSet::new();
    let mut links: BTreeMap<String, Vec<Commit>> = BTreeMap::new();
    let mut unlinked = Vec::new();

    for commit in commits {
        let keys = extract_keys(&commit.message);
        let mut references_issue = false;
        for key in keys {
            if issue_keys.contains(key.as_str()) {
                references_issue = true;
                found.insert(key.clone());
            }
            links.entry(key).or_default().push(commit.clone());
        }
        if !references_issue {
            unlinked.push(commit.clone());
        }
    }

    // BTreeSet iteration keeps `missing` sorted.
    let missing: Vec<String> = issue_keys
        .iter()
        .filter(|key| !found.contains(**key))
        .map(|key| (*key).to_string())
        .collect();

    MatchResult { coverage: coverage(issue_keys.len(), missing.len()), missing, unlinked, links }
}

#[allow(clippy::cast_precision_loss)]
fn coverage(total: usize, missing: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (1.0 - missing as f64 / total as f64) * 100.0
}
