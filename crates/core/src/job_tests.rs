// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

fn pending_job() -> Job {
    Job::new(
        JobId::new("job-2026-03-14-abc123"),
        "agent-1",
        "Execute your configured task",
        TriggerKind::Manual,
        t0(),
    )
}

#[test]
fn new_job_is_pending() {
    let job = pending_job();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(!job.is_terminal());
    assert!(job.finished_at.is_none());
    assert!(job.exit_reason.is_none());
    assert!(job.session_id.is_none());
}

#[test]
fn lifecycle_pending_running_completed() {
    let mut job = pending_job();
    job.mark_running();
    assert_eq!(job.status, JobStatus::Running);

    job.complete(t0());
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.exit_reason, Some(ExitReason::Success));
    assert_eq!(job.finished_at, Some(t0()));
}

#[test]
fn terminal_jobs_are_immutable() {
    let mut job = pending_job();
    job.mark_running();
    job.cancel(t0());
    assert_eq!(job.status, JobStatus::Cancelled);

    // No back-transitions from a terminal state
    job.complete(t0());
    job.fail("late error", t0());
    job.mark_running();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.exit_reason, Some(ExitReason::Cancelled));
    assert!(job.error_message.is_none());
}

#[test]
fn fail_records_message() {
    let mut job = pending_job();
    job.mark_running();
    job.fail("stream broke", t0());
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.exit_reason, Some(ExitReason::Error));
    assert_eq!(job.error_message.as_deref(), Some("stream broke"));
}

#[test]
fn record_session_keeps_first() {
    let mut job = pending_job();
    job.record_session("sess-1");
    job.record_session("sess-2");
    assert_eq!(job.session_id.as_deref(), Some("sess-1"));
}

#[test]
fn yaml_round_trip_uses_snake_case() {
    let mut job = pending_job().with_schedule("hourly");
    job.mark_running();
    job.complete(t0());

    let yaml = serde_yaml::to_string(&job).unwrap();
    assert!(yaml.contains("trigger: manual"));
    assert!(yaml.contains("status: completed"));
    assert!(yaml.contains("exit_reason: success"));
    assert!(yaml.contains("schedule: hourly"));

    let parsed: Job = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, job);
}

#[test]
fn optional_fields_are_omitted_when_absent() {
    let yaml = serde_yaml::to_string(&pending_job()).unwrap();
    assert!(!yaml.contains("finished_at"));
    assert!(!yaml.contains("error_message"));
    assert!(!yaml.contains("forked_from"));
}

#[yare::parameterized(
    pending   = { JobStatus::Pending,   false },
    running   = { JobStatus::Running,   false },
    completed = { JobStatus::Completed, true },
    failed    = { JobStatus::Failed,    true },
    cancelled = { JobStatus::Cancelled, true },
)]
fn terminal_statuses(status: JobStatus, expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}
