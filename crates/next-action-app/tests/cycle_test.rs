//! Sync cycles driven against an in-memory sink.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Result, anyhow};
use next_action_app::{ChangeSink, Config, ConfigOverrides, ServiceError, SyncService};
use next_action_core::{
    InboxMode, Label, LabelId, LabelSet, LabelUpdate, Project, ProjectId, Snapshot, Task, TaskId,
};
use time::OffsetDateTime;
use time::macros::datetime;

const NOW: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);

#[derive(Clone, Default)]
struct MockSink {
    inner: Arc<MockSinkInner>,
}

#[derive(Default)]
struct MockSinkInner {
    snapshot: Mutex<Snapshot>,
    pending: Mutex<Vec<LabelUpdate>>,
    committed: Mutex<Vec<LabelUpdate>>,
    snapshot_calls: Mutex<u32>,
    flush_calls: Mutex<u32>,
    fail_snapshot: Mutex<bool>,
    fail_flush: Mutex<bool>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChangeSink for MockSink {
    type Error = anyhow::Error;

    fn snapshot(&mut self) -> Result<Snapshot, Self::Error> {
        *guard(&self.inner.snapshot_calls) += 1;
        if *guard(&self.inner.fail_snapshot) {
            return Err(anyhow!("connection reset"));
        }
        Ok(guard(&self.inner.snapshot).clone())
    }

    fn enqueue_label_update(&mut self, update: LabelUpdate) {
        guard(&self.inner.pending).push(update);
    }

    fn flush(&mut self) -> Result<usize, Self::Error> {
        *guard(&self.inner.flush_calls) += 1;
        let updates = std::mem::take(&mut *guard(&self.inner.pending));
        if *guard(&self.inner.fail_flush) {
            return Err(anyhow!("commit rejected"));
        }
        guard(&self.inner.snapshot).apply(&updates);
        let count = updates.len();
        guard(&self.inner.committed).extend(updates);
        Ok(count)
    }

    fn pending_count(&self) -> usize {
        guard(&self.inner.pending).len()
    }
}

impl MockSink {
    fn with_snapshot(snapshot: Snapshot) -> Self {
        let sink = Self::default();
        *guard(&sink.inner.snapshot) = snapshot;
        sink
    }

    fn committed(&self) -> Vec<LabelUpdate> {
        guard(&self.inner.committed).clone()
    }

    fn flush_calls(&self) -> u32 {
        *guard(&self.inner.flush_calls)
    }

    fn snapshot_calls(&self) -> u32 {
        *guard(&self.inner.snapshot_calls)
    }

    fn fail_snapshot(&self, fail: bool) {
        *guard(&self.inner.fail_snapshot) = fail;
    }

    fn fail_flush(&self, fail: bool) {
        *guard(&self.inner.fail_flush) = fail;
    }

    fn labels_of(&self, task: &str) -> LabelSet {
        guard(&self.inner.snapshot)
            .tasks
            .iter()
            .find(|candidate| candidate.id.as_str() == task)
            .map(|candidate| candidate.labels.clone())
            .unwrap_or_else(|| panic!("task {task} not in snapshot"))
    }
}

fn project(id: &str, name: &str) -> Project {
    Project {
        id: ProjectId::new(id),
        name: name.to_owned(),
        ..Project::default()
    }
}

fn task(id: &str, project: &str, indent: u32, order: i64, labels: &[&str]) -> Task {
    Task {
        id: TaskId::new(id),
        content: format!("Task {id}"),
        project: ProjectId::new(project),
        indent,
        order,
        labels: labels.iter().map(|&label| LabelId::new(label)).collect(),
        ..Task::default()
    }
}

fn label(name: &str) -> Label {
    Label {
        id: LabelId::new(name),
        name: name.to_owned(),
    }
}

fn account() -> Snapshot {
    Snapshot {
        projects: vec![project("inbox", "Inbox"), project("launch", "Launch_"), project("misc", "Misc")],
        tasks: vec![
            task("i1", "inbox", 1, 5, &[]),
            task("i2", "inbox", 1, 10, &[]),
            task("i3", "inbox", 1, 15, &[]),
            task("l1", "launch", 1, 0, &[]),
            task("l1a", "launch", 2, 1, &[]),
            task("l2", "launch", 1, 2, &["next_action"]),
            task("m1", "misc", 1, 0, &["next_action"]),
        ],
        labels: vec![label("next_action"), label("@home")],
    }
}

fn start(sink: &MockSink, overrides: ConfigOverrides) -> Result<SyncService<MockSink>> {
    let config = Config::default().with_overrides(overrides)?;
    let service = SyncService::start(sink.clone(), &config.label_names(), config.reconcile_options()?)?;
    Ok(service)
}

fn has_marker(labels: &LabelSet) -> bool {
    labels.contains(&LabelId::new("next_action"))
}

#[test]
fn start_fails_when_marker_label_is_missing() {
    let mut snapshot = account();
    snapshot.labels.retain(|label| label.name != "next_action");
    let sink = MockSink::with_snapshot(snapshot);

    let config = Config::default();
    let options = config
        .reconcile_options()
        .unwrap_or_else(|err| panic!("default options: {err}"));
    let result = SyncService::start(sink.clone(), &config.label_names(), options);
    assert!(matches!(result, Err(ServiceError::LabelNotFound(name)) if name == "next_action"));
    assert_eq!(sink.flush_calls(), 0);
}

#[test]
fn first_cycle_commits_and_second_cycle_is_a_no_op() -> Result<()> {
    let sink = MockSink::with_snapshot(account());
    let mut service = start(
        &sink,
        ConfigOverrides {
            inbox: Some(InboxMode::Serial),
            ..ConfigOverrides::default()
        },
    )?;

    let report = service.run_cycle(NOW)?;
    assert_eq!(report.managed_projects, 2);
    assert_eq!(report.committed, report.staged);
    assert!(report.committed > 0);

    // Serial inbox: only the lowest order is actionable.
    assert!(has_marker(&sink.labels_of("i1")));
    assert!(!has_marker(&sink.labels_of("i2")));
    assert!(!has_marker(&sink.labels_of("i3")));
    // Serial project: first root is internal, its child is the next action.
    assert!(!has_marker(&sink.labels_of("l1")));
    assert!(has_marker(&sink.labels_of("l1a")));
    assert!(!has_marker(&sink.labels_of("l2")));
    // Unmanaged projects keep their labels without --remove-label.
    assert!(has_marker(&sink.labels_of("m1")));

    let flushes = sink.flush_calls();
    let second = service.run_cycle(NOW)?;
    assert_eq!(second.staged, 0);
    assert_eq!(second.committed, 0);
    assert_eq!(sink.flush_calls(), flushes, "nothing pending means no commit");
    Ok(())
}

#[test]
fn remove_label_strips_unmanaged_projects() -> Result<()> {
    let sink = MockSink::with_snapshot(account());
    let mut service = start(
        &sink,
        ConfigOverrides {
            remove_label: true,
            ..ConfigOverrides::default()
        },
    )?;

    service.run_cycle(NOW)?;
    assert!(!has_marker(&sink.labels_of("m1")));
    // Parallel inbox by default.
    assert!(has_marker(&sink.labels_of("i1")));
    assert!(has_marker(&sink.labels_of("i3")));
    Ok(())
}

#[test]
fn snapshot_failure_aborts_without_commit() -> Result<()> {
    let sink = MockSink::with_snapshot(account());
    let mut service = start(&sink, ConfigOverrides::default())?;

    sink.fail_snapshot(true);
    let Err(err) = service.run_cycle(NOW) else {
        panic!("failed snapshot should abort the cycle");
    };
    assert!(matches!(err, ServiceError::Snapshot(_)));
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(sink.flush_calls(), 0);
    assert!(sink.committed().is_empty());
    assert_eq!(service.sink().pending_count(), 0);

    sink.fail_snapshot(false);
    let report = service.run_cycle(NOW)?;
    assert!(report.committed > 0);
    assert_eq!(sink.snapshot_calls(), 3);
    Ok(())
}

#[test]
fn commit_failure_discards_staged_updates() -> Result<()> {
    let sink = MockSink::with_snapshot(account());
    let mut service = start(&sink, ConfigOverrides::default())?;

    sink.fail_flush(true);
    let Err(err) = service.run_cycle(NOW) else {
        panic!("failed commit should surface");
    };
    assert!(matches!(err, ServiceError::Commit(_)));
    assert_eq!(service.sink().pending_count(), 0);
    assert!(!has_marker(&sink.labels_of("i1")));

    // The next cycle recomputes the same changes from scratch.
    sink.fail_flush(false);
    let report = service.run_cycle(NOW)?;
    assert_eq!(report.committed, report.staged);
    assert!(has_marker(&sink.labels_of("i1")));
    Ok(())
}

#[test]
fn unreadable_due_dates_are_skipped_and_reported() -> Result<()> {
    let mut snapshot = account();
    if let Some(task) = snapshot.tasks.iter_mut().find(|task| task.id.as_str() == "i2") {
        task.due = Some("someday soon".into());
    }
    let sink = MockSink::with_snapshot(snapshot);
    let mut service = start(&sink, ConfigOverrides::default())?;

    let report = service.run_cycle(NOW)?;
    assert_eq!(report.skipped, 1);
    assert!(!has_marker(&sink.labels_of("i2")));
    assert!(has_marker(&sink.labels_of("i1")));
    Ok(())
}
