//! Change report construction, text rendering and publishing.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::errors::{CycleError, NotifyError};
use crate::domain::models::{
    ChangeReport, DiffResult, FailureKind, FieldChange, JoinKind, MembershipTotals, NotifyConfig,
    ReportBody, Snapshot, SuppressedCounts,
};
use crate::domain::ports::NotificationSink;
use crate::services::confidence_filter::FilteredDiff;

/// Build the report for a cycle that produced a new snapshot.
pub fn build_report(
    subject_id: &str,
    generated_at: DateTime<Utc>,
    filtered: &FilteredDiff,
    current: &Snapshot,
) -> ChangeReport {
    let totals = MembershipTotals {
        communities: current.len(),
        by_role: current.role_totals(),
    };
    let body = if filtered.visible.is_empty() {
        ReportBody::NoChanges {
            suppressed: filtered.suppressed,
            totals,
        }
    } else {
        ReportBody::Changes {
            diff: filtered.visible.clone(),
            suppressed: filtered.suppressed,
            totals,
        }
    };
    ChangeReport {
        subject_id: subject_id.to_string(),
        generated_at,
        body,
    }
}

/// Build the error report for an aborted cycle.
///
/// Returns `None` for cancellation, which is not reported.
pub fn failure_report(
    subject_id: &str,
    generated_at: DateTime<Utc>,
    error: &CycleError,
    retry_in: Option<Duration>,
) -> Option<ChangeReport> {
    let kind = error.failure_kind()?;
    Some(ChangeReport {
        subject_id: subject_id.to_string(),
        generated_at,
        body: ReportBody::Failed {
            kind,
            message: error.to_string(),
            retry_in,
        },
    })
}

/// Renders reports as grouped plain text.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    max_items_per_group: usize,
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(&NotifyConfig::default())
    }
}

impl ReportFormatter {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            max_items_per_group: config.max_items_per_group.max(1),
        }
    }

    pub fn render(&self, report: &ChangeReport) -> String {
        let mut out = String::new();
        match &report.body {
            ReportBody::Changes {
                diff,
                suppressed,
                totals,
            } => {
                let _ = writeln!(
                    out,
                    "Membership changes for {} ({})",
                    report.subject_id,
                    report.generated_at.format("%Y-%m-%d %H:%M UTC")
                );
                self.render_diff(&mut out, diff);
                render_footer(&mut out, totals, *suppressed);
            }
            ReportBody::NoChanges { suppressed, totals } => {
                let _ = writeln!(out, "{}: scan completed, no changes", report.subject_id);
                render_footer(&mut out, totals, *suppressed);
            }
            ReportBody::Failed {
                kind,
                message,
                retry_in,
            } => {
                let _ = write!(
                    out,
                    "{}: scan failed ({}): {}",
                    report.subject_id,
                    failure_label(*kind),
                    message
                );
                if let Some(delay) = retry_in {
                    let _ = write!(out, ". Retrying in {}", format_delay(*delay));
                }
                out.push('\n');
            }
        }
        out
    }

    fn render_diff(&self, out: &mut String, diff: &DiffResult) {
        let created: Vec<String> = diff
            .joined_of(JoinKind::Created)
            .map(|e| {
                format!(
                    "+ {} [{}] ({:.2})",
                    e.community.display_name, e.community.role, e.community.confidence
                )
            })
            .collect();
        self.render_group(out, "Created", &created);

        let joined: Vec<String> = diff
            .joined_of(JoinKind::Joined)
            .map(|e| format!("+ {} ({:.2})", e.community.display_name, e.community.confidence))
            .collect();
        self.render_group(out, "Joined", &joined);

        let left: Vec<String> = diff
            .left
            .iter()
            .map(|c| format!("- {} [{}]", c.display_name, c.role))
            .collect();
        self.render_group(out, "Left", &left);

        let roles: Vec<String> = diff
            .role_changed
            .iter()
            .map(|c| format!("~ {}: {} -> {}", c.display_name, c.old_role, c.new_role))
            .collect();
        self.render_group(out, "Role changes", &roles);

        let updated: Vec<String> = diff
            .updated
            .iter()
            .map(|u| {
                let fields: Vec<String> = u.changes.iter().map(describe_field_change).collect();
                format!("* {}: {}", u.community.display_name, fields.join(", "))
            })
            .collect();
        self.render_group(out, "Updated", &updated);
    }

    fn render_group(&self, out: &mut String, title: &str, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        let _ = writeln!(out, "{title} ({}):", lines.len());
        for line in lines.iter().take(self.max_items_per_group) {
            let _ = writeln!(out, "  {line}");
        }
        if lines.len() > self.max_items_per_group {
            let _ = writeln!(out, "  …and {} more", lines.len() - self.max_items_per_group);
        }
    }
}

fn describe_field_change(change: &FieldChange) -> String {
    match change {
        FieldChange::DisplayName { old, new } => format!("name '{old}' -> '{new}'"),
        FieldChange::Confidence { old, new } => format!("confidence {old:.2} -> {new:.2}"),
    }
}

fn render_footer(out: &mut String, totals: &MembershipTotals, suppressed: SuppressedCounts) {
    let roles: Vec<String> = totals
        .by_role
        .iter()
        .rev()
        .map(|(role, count)| format!("{role} {count}"))
        .collect();
    if roles.is_empty() {
        let _ = writeln!(out, "Total: {} communities", totals.communities);
    } else {
        let _ = writeln!(out, "Total: {} communities ({})", totals.communities, roles.join(", "));
    }
    if suppressed.total() > 0 {
        let _ = writeln!(out, "{} low-confidence changes hidden", suppressed.total());
    }
}

fn failure_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::CandidateSource => "candidate source",
        FailureKind::Store => "snapshot store",
    }
}

fn format_delay(delay: Duration) -> String {
    let secs = delay.as_secs();
    if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{secs}s")
    } else {
        format!("{}ms", delay.as_millis())
    }
}

/// Publishes reports through a sink and logs the outcome.
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub async fn publish(&self, report: &ChangeReport) -> Result<(), NotifyError> {
        match self.sink.publish(report).await {
            Ok(()) => {
                info!(
                    subject_id = %report.subject_id,
                    failure = report.is_failure(),
                    changes = report.diff().map_or(0, DiffResult::change_count),
                    "Report published"
                );
                Ok(())
            }
            Err(e) => {
                warn!(subject_id = %report.subject_id, error = %e, "Failed to publish report");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::CandidateSourceError;
    use crate::domain::models::{CanonicalCommunity, JoinedEntry, Role, RoleChange};
    use std::collections::BTreeMap;

    fn community(id: &str, role: Role) -> CanonicalCommunity {
        let now = Utc::now();
        CanonicalCommunity {
            id: id.to_string(),
            display_name: format!("Community {id}"),
            role,
            confidence: 0.9,
            source_count: 1,
            first_seen_at: now,
            last_seen_at: now,
            methods: vec![],
            source_ids: vec![id.to_string()],
        }
    }

    fn totals(n: usize) -> MembershipTotals {
        MembershipTotals {
            communities: n,
            by_role: BTreeMap::from([(Role::Member, n)]),
        }
    }

    #[test]
    fn test_build_report_without_changes() {
        let current = Snapshot::from_communities("alice", Utc::now(), vec![community("a", Role::Member)]);
        let report = build_report("alice", Utc::now(), &FilteredDiff::default(), &current);

        assert!(!report.has_changes());
        assert_eq!(report.totals().unwrap().communities, 1);
        let text = ReportFormatter::default().render(&report);
        assert!(text.contains("alice: scan completed, no changes"));
        assert!(text.contains("Total: 1 communities (member 1)"));
    }

    #[test]
    fn test_groups_are_capped() {
        let joined = (0..8)
            .map(|i| JoinedEntry {
                kind: JoinKind::Joined,
                community: community(&format!("c{i}"), Role::Member),
            })
            .collect();
        let report = ChangeReport {
            subject_id: "alice".to_string(),
            generated_at: Utc::now(),
            body: ReportBody::Changes {
                diff: DiffResult {
                    joined,
                    ..DiffResult::default()
                },
                suppressed: SuppressedCounts {
                    joined: 2,
                    ..SuppressedCounts::default()
                },
                totals: totals(8),
            },
        };

        let text = ReportFormatter::default().render(&report);

        assert!(text.contains("Joined (8):"));
        assert!(text.contains("Community c4"));
        assert!(!text.contains("Community c5"));
        assert!(text.contains("…and 3 more"));
        assert!(text.contains("2 low-confidence changes hidden"));
    }

    #[test]
    fn test_render_created_and_role_changes() {
        let report = ChangeReport {
            subject_id: "alice".to_string(),
            generated_at: Utc::now(),
            body: ReportBody::Changes {
                diff: DiffResult {
                    joined: vec![JoinedEntry {
                        kind: JoinKind::Created,
                        community: community("b", Role::Admin),
                    }],
                    role_changed: vec![RoleChange {
                        id: "x".to_string(),
                        display_name: "Community x".to_string(),
                        old_role: Role::Member,
                        new_role: Role::Admin,
                        confidence: 0.9,
                    }],
                    ..DiffResult::default()
                },
                suppressed: SuppressedCounts::default(),
                totals: totals(2),
            },
        };

        let text = ReportFormatter::default().render(&report);

        assert!(text.contains("Created (1):\n  + Community b [admin] (0.90)"));
        assert!(text.contains("Role changes (1):\n  ~ Community x: member -> admin"));
        assert!(!text.contains("Joined"));
    }

    #[test]
    fn test_failure_report_rendering() {
        let err: CycleError = CandidateSourceError::NoCandidates {
            subject_id: "alice".to_string(),
        }
        .into();
        let report = failure_report("alice", Utc::now(), &err, Some(Duration::from_secs(40))).unwrap();

        assert!(report.is_failure());
        let text = ReportFormatter::default().render(&report);
        assert!(text.starts_with("alice: scan failed (candidate source):"));
        assert!(text.contains("Retrying in 40s"));
    }

    #[test]
    fn test_cancellation_is_not_reported() {
        assert!(failure_report("alice", Utc::now(), &CycleError::Cancelled, None).is_none());
    }
}
