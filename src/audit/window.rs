//! Commit window derivation from issue update times.

use chrono::TimeDelta;

use crate::error::AuditError;
use crate::model::{Issue, Window};

/// Padding applied on both sides of the issue update range, in days.
pub const DEFAULT_BUFFER_DAYS: i64 = 7;

/// Returns the window spanning every issue's update time, padded by `buffer`
/// on each side and widened to whole seconds.
///
/// # Errors
///
/// Returns [`AuditError::InvalidInput`] when `issues` is empty, `buffer` is
/// negative, or the padded window leaves the representable date range.
pub fn derive_window(issues: &[Issue], buffer: TimeDelta) -> Result<Window, AuditError> {
    if buffer < TimeDelta::zero() {
        return Err(AuditError::InvalidInput(format!(
            "window buffer must not be negative, got {} days",
            buffer.num_days()
        )));
    }
    let earliest = issues.iter().map(|issue| issue.updated).min();
    let latest = issues.iter().map(|issue| issue.updated).max();
    let (Some(earliest), Some(latest)) = (earliest, latest) else {
        return Err(AuditError::InvalidInput("no issues to derive a commit window from".into()));
    };

    let out_of_range = || {
        AuditError::InvalidInput(format!(
            "a {}-day buffer moves the window out of range",
            buffer.num_days()
        ))
    };
    let start = earliest.checked_sub_signed(buffer).ok_or_else(out_of_range)?;
    let end = latest.checked_add_signed(buffer).ok_or_else(out_of_range)?;
    Window::covering(start, end)
}
