//! Domain records shared by the fetchers, the matcher, and the pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AuditError;

/// Textual timestamp format used for windows and reports.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A tracked work item as returned by the issue tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Tracker key, e.g. `ABC-123`.
    pub key: String,
    /// One-line summary.
    pub summary: String,
    /// Long-form description.
    pub description: String,
    /// Component names.
    pub components: Vec<String>,
    /// Fix-version labels.
    pub fix_versions: Vec<String>,
    /// Last time the issue was updated.
    pub updated: DateTime<Utc>,
}

/// A commit as seen on one branch of one repository.
///
/// The same hash fetched under two branches is two distinct records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Content hash.
    pub sha: String,
    /// Author name, absent when the upstream record has none.
    pub author: Option<String>,
    /// Author timestamp.
    pub date: DateTime<Utc>,
    /// Full commit message.
    pub message: String,
    /// Owning repository, `PROJECT/slug`.
    pub repo: String,
    /// Branch the commit was fetched under.
    pub branch: String,
}

/// A repository/branch pair to audit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoBranch {
    /// Repository identifier, `PROJECT/slug`.
    pub repo: String,
    /// Branch name.
    pub branch: String,
}

impl RepoBranch {
    /// Creates a pair.
    pub fn new(repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self { repo: repo.into(), branch: branch.into() }
    }

    /// Builds every repository/branch combination, prefixing bare slugs
    /// with `project_key`.
    #[must_use]
    pub fn product(project_key: &str, repos: &[String], branches: &[String]) -> Vec<Self> {
        repos
            .iter()
            .flat_map(|repo| {
                let repo = if repo.contains('/') {
                    repo.clone()
                } else {
                    format!("{project_key}/{repo}")
                };
                branches.iter().map(move |branch| Self::new(repo.clone(), branch.clone()))
            })
            .collect()
    }
}

impl fmt::Display for RepoBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repo, self.branch)
    }
}

/// Inclusive time range used to bound commit retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Earliest commit time included.
    #[serde(with = "timestamp_text")]
    pub start: DateTime<Utc>,
    /// Latest commit time included.
    #[serde(with = "timestamp_text")]
    pub end: DateTime<Utc>,
}

impl Window {
    /// Parses caller-supplied bounds.
    ///
    /// Each bound is either a bare `YYYY-MM-DD` date or a full
    /// `YYYY-MM-DDTHH:MM:SS` timestamp (an RFC 3339 offset is also accepted).
    /// A bare start date means the start of that day, a bare end date the
    /// last second of that day.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidInput`] if a bound does not parse or the
    /// start is after the end.
    pub fn parse(start: &str, end: &str) -> Result<Self, AuditError> {
        let start = parse_bound(start, NaiveTime::MIN)?;
        let end = parse_bound(end, end_of_day())?;
        if start > end {
            return Err(AuditError::InvalidInput(format!(
                "window start {} is after end {}",
                start.format(TIMESTAMP_FORMAT),
                end.format(TIMESTAMP_FORMAT)
            )));
        }
        Self::covering(start, end)
    }

    /// Smallest whole-second window containing `start..=end`.
    ///
    /// The textual form carries no sub-second digits, so widening here keeps
    /// a window equal to itself after a serialization round trip.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidInput`] if rounding `end` up leaves the
    /// representable range.
    pub fn covering(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AuditError> {
        let floor = end.trunc_subsecs(0);
        let end = if floor < end {
            floor
                .checked_add_signed(TimeDelta::seconds(1))
                .ok_or_else(|| AuditError::InvalidInput("window end is out of range".into()))?
        } else {
            floor
        };
        Ok(Self { start: start.trunc_subsecs(0), end })
    }

    /// Returns `true` if `at` falls inside the window, bounds included.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Start bound in the textual timestamp format.
    #[must_use]
    pub fn start_text(&self) -> String {
        self.start.format(TIMESTAMP_FORMAT).to_string()
    }

    /// End bound in the textual timestamp format.
    #[must_use]
    pub fn end_text(&self) -> String {
        self.end.format(TIMESTAMP_FORMAT).to_string()
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn parse_bound(text: &str, day_time: NaiveTime) -> Result<DateTime<Utc>, AuditError> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.and_time(day_time).and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AuditError::InvalidInput(format!("unrecognised date or timestamp: {text:?}")))
}

/// Result of cross-referencing issues and commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Issue keys with no linked commit, sorted.
    pub missing: Vec<String>,
    /// Commits that reference no issue in the audited set.
    pub unlinked: Vec<Commit>,
    /// Percentage of issues with at least one linked commit.
    pub coverage: f64,
    /// Every extracted key mapped to the commits naming it, in supply order.
    pub links: BTreeMap<String, Vec<Commit>>,
}

/// Complete output of one audit run; also the cached payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    /// Issues returned by the query.
    pub issues: Vec<Issue>,
    /// Commits fetched across every pair.
    pub commits: Vec<Commit>,
    /// Cross-reference of the two.
    pub matching: MatchResult,
    /// Window the commits were fetched over.
    pub window: Window,
}

mod timestamp_text {
    use super::{DateTime, Deserialize, Deserializer, NaiveDateTime, Serializer, Utc};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&at.format(super::TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, super::TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn product_prefixes_bare_slugs() {
        let repos = vec!["policycenter".to_string(), "OTHER/billing".to_string()];
        let branches = vec!["develop".to_string(), "release/r-1".to_string()];
        let pairs = RepoBranch::product("STAR", &repos, &branches);

        assert_eq!(
            pairs,
            vec![
                RepoBranch::new("STAR/policycenter", "develop"),
                RepoBranch::new("STAR/policycenter", "release/r-1"),
                RepoBranch::new("OTHER/billing", "develop"),
                RepoBranch::new("OTHER/billing", "release/r-1"),
            ]
        );
    }

    #[test]
    fn window_parse_expands_bare_dates_to_whole_days() {
        let window = Window::parse("2024-01-08", "2024-01-27").unwrap();
        assert_eq!(window.start_text(), "2024-01-08T00:00:00");
        assert_eq!(window.end_text(), "2024-01-27T23:59:59");
    }

    #[test]
    fn window_parse_accepts_full_timestamps() {
        let window = Window::parse("2024-01-08T10:00:00", "2024-01-27T12:30:00Z").unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 1, 27, 12, 30, 0).unwrap());
    }

    #[test]
    fn window_parse_rejects_garbage_and_inverted_ranges() {
        let garbage = Window::parse("yesterday", "2024-01-01");
        assert!(matches!(garbage, Err(AuditError::InvalidInput(_))));
        let inverted = Window::parse("2024-02-01", "2024-01-01");
        assert!(matches!(inverted, Err(AuditError::InvalidInput(_))));
    }

    #[test]
    fn window_serializes_as_sortable_text() {
        let window = Window::parse("2024-01-08", "2024-01-27").unwrap();
        let json = serde_json::to_value(window).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"start": "2024-01-08T00:00:00", "end": "2024-01-27T23:59:59"})
        );

        let back: Window = serde_json::from_value(json).unwrap();
        assert_eq!(back, window);
    }

    #[test]
    fn sub_second_bounds_widen_to_whole_seconds() {
        let start =
            Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap() + Duration::milliseconds(123);
        let end =
            Utc.with_ymd_and_hms(2024, 1, 27, 12, 0, 0).unwrap() + Duration::milliseconds(456);

        let window = Window::covering(start, end).unwrap();

        assert_eq!(window.start_text(), "2024-01-08T10:00:00");
        assert_eq!(window.end_text(), "2024-01-27T12:00:01");
        assert!(window.contains(start) && window.contains(end));
        let back: Window = serde_json::from_value(serde_json::to_value(window).unwrap()).unwrap();
        assert_eq!(back, window);
    }

    #[test]
    fn contains_is_inclusive() {
        let window = Window::parse("2024-01-08T00:00:00", "2024-01-09T00:00:00").unwrap();
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.end + Duration::seconds(1)));
    }
}
