use std::sync::Arc;

use super::{ApplyOptions, EngineError, SessionEngine, SessionStorage};
use crate::conflict::{ConflictReason, ConflictResolution};
use crate::diff::DiffOptions;
use crate::events::SessionChangeKind;
use crate::infrastructure::config::{EngineSettings, HunkMode};
use crate::model::{
    Change, ChangeKind, Hunk, HunkId, OperationId, OperationStatus, SessionId, SessionStatus,
    ValidationError,
};
use crate::store::MemoryContentStore;

fn setup(files: &[(&str, &str)]) -> (Arc<MemoryContentStore>, SessionEngine) {
    let store = Arc::new(MemoryContentStore::with_files(files.iter().copied()));
    let engine = SessionEngine::new(store.clone());
    (store, engine)
}

fn no_backup() -> ApplyOptions {
    ApplyOptions {
        create_backup: false,
        ..ApplyOptions::default()
    }
}

#[tokio::test]
async fn test_apply_single_create() -> anyhow::Result<()> {
    let (store, engine) = setup(&[]);
    let session = engine.create_session("create", "agent", None);
    engine.add_operation(&session.id, Change::create("a.txt", "hello"), None)?;

    let result = engine.apply(&session.id, ApplyOptions::default()).await?;

    assert_eq!(store.get("a.txt").as_deref(), Some("hello"));
    assert!(result.success);
    assert_eq!(
        (result.success_count, result.failed_count, result.skipped_count),
        (1, 0, 0)
    );
    let session = engine.get_session(&session.id)?;
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.completed_at.is_some());
    assert_eq!(session.operations[0].status, OperationStatus::Applied);
    assert!(session.operations[0].applied_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_rejected_hunk_writes_original_back() -> anyhow::Result<()> {
    let (store, engine) = setup(&[("a.txt", "a\nb")]);
    let session = engine.create_session("modify", "agent", None);
    let op = engine.add_operation(&session.id, Change::modify("a.txt", "a\nb", "a\nc"), None)?;
    let hunks = op.change.hunks.clone().unwrap_or_default();
    assert_eq!(hunks.len(), 1);

    assert!(engine.set_hunk_accepted(&session.id, &op.id, &hunks[0].id, false));
    let result = engine.apply(&session.id, ApplyOptions::default()).await?;

    assert_eq!(result.success_count, 1);
    assert_eq!(store.get("a.txt").as_deref(), Some("a\nb"));
    assert_eq!(
        engine.get_operation(&session.id, &op.id).map(|o| o.status),
        Some(OperationStatus::Applied)
    );

    Ok(())
}

#[tokio::test]
async fn test_partial_hunk_acceptance_with_line_level_hunks() -> anyhow::Result<()> {
    let store = Arc::new(MemoryContentStore::with_files([("a.txt", "1\n2\n3\n4\n5")]));
    let settings = EngineSettings {
        hunk_strategy: HunkMode::LineLevel,
        context_lines: 1,
        ..EngineSettings::default()
    };
    let engine = SessionEngine::builder(store.clone()).settings(settings).build();
    let session = engine.create_session("lines", "agent", None);
    let op = engine.add_operation(
        &session.id,
        Change::modify("a.txt", "1\n2\n3\n4\n5", "1\nTWO\n3\n4\nFIVE"),
        None,
    )?;
    let hunks = op.change.hunks.clone().unwrap_or_default();
    assert_eq!(hunks.len(), 2);

    engine.set_hunk_accepted(&session.id, &op.id, &hunks[1].id, false);
    engine.apply(&session.id, ApplyOptions::default()).await?;

    assert_eq!(store.get("a.txt").as_deref(), Some("1\nTWO\n3\n4\n5"));

    Ok(())
}

#[tokio::test]
async fn test_failure_without_stop_gives_partial_completion() -> anyhow::Result<()> {
    let (store, engine) = setup(&[]);
    store.fail_on("bad.txt");
    let session = engine.create_session("mixed", "agent", None);
    engine.add_operation(&session.id, Change::create("good.txt", "ok"), None)?;
    let bad = engine.add_operation(&session.id, Change::create("bad.txt", "no"), None)?;
    engine.add_operation(&session.id, Change::create("late.txt", "ok"), None)?;

    let result = engine.apply(&session.id, ApplyOptions::default()).await?;

    assert!(!result.success);
    assert_eq!((result.success_count, result.failed_count), (2, 1));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].operation_id, bad.id);
    assert_eq!(result.errors[0].file_path, "bad.txt");
    assert!(store.get("late.txt").is_some());

    let session = engine.get_session(&session.id)?;
    assert_eq!(session.status, SessionStatus::PartiallyCompleted);
    let failed = session.operation(&bad.id).ok_or(anyhow::anyhow!("missing op"))?;
    assert_eq!(failed.status, OperationStatus::Failed);
    assert!(failed.error.as_deref().is_some_and(|e| e.contains("bad.txt")));

    Ok(())
}

#[tokio::test]
async fn test_all_failed_gives_cancelled() -> anyhow::Result<()> {
    let (store, engine) = setup(&[]);
    store.fail_on("bad.txt");
    let session = engine.create_session("doomed", "agent", None);
    engine.add_operation(&session.id, Change::create("bad.txt", "no"), None)?;

    let result = engine.apply(&session.id, ApplyOptions::default()).await?;

    assert_eq!((result.success_count, result.failed_count), (0, 1));
    assert_eq!(engine.get_session(&session.id)?.status, SessionStatus::Cancelled);

    Ok(())
}

#[tokio::test]
async fn test_stop_on_error_leaves_remaining_pending() -> anyhow::Result<()> {
    let (store, engine) = setup(&[]);
    store.fail_on("bad.txt");
    let session = engine.create_session("halt", "agent", None);
    engine.add_operation(&session.id, Change::create("good.txt", "ok"), None)?;
    engine.add_operation(&session.id, Change::create("bad.txt", "no"), None)?;
    let late = engine.add_operation(&session.id, Change::create("late.txt", "ok"), None)?;

    let options = ApplyOptions {
        stop_on_error: true,
        ..ApplyOptions::default()
    };
    let result = engine.apply(&session.id, options).await?;

    assert_eq!((result.success_count, result.failed_count), (1, 1));
    assert!(store.get("late.txt").is_none());
    assert_eq!(
        engine.get_operation(&session.id, &late.id).map(|o| o.status),
        Some(OperationStatus::Pending)
    );
    assert_eq!(
        engine.get_session(&session.id)?.status,
        SessionStatus::PartiallyCompleted
    );

    Ok(())
}

#[tokio::test]
async fn test_rejected_operations_are_skipped() -> anyhow::Result<()> {
    let (store, engine) = setup(&[]);
    let session = engine.create_session("skip", "agent", None);
    engine.add_operation(&session.id, Change::create("a.txt", "a"), None)?;
    let rejected = engine.add_operation(&session.id, Change::create("b.txt", "b"), None)?;
    assert!(engine.reject_operation(&session.id, &rejected.id));

    let result = engine.apply(&session.id, ApplyOptions::default()).await?;

    assert!(result.success);
    assert_eq!(
        (result.success_count, result.failed_count, result.skipped_count),
        (1, 0, 1)
    );
    assert!(store.get("b.txt").is_none());
    assert_eq!(
        engine.get_session(&session.id)?.status,
        SessionStatus::PartiallyCompleted
    );

    Ok(())
}

#[tokio::test]
async fn test_second_apply_applies_nothing() -> anyhow::Result<()> {
    let (store, engine) = setup(&[("m.txt", "old")]);
    let session = engine.create_session("twice", "agent", None);
    engine.add_operation(&session.id, Change::create("a.txt", "a"), None)?;
    engine.add_operation(&session.id, Change::modify("m.txt", "old", "new"), None)?;

    engine.apply(&session.id, ApplyOptions::default()).await?;
    store.put("a.txt", "edited after apply");
    let second = engine.apply(&session.id, ApplyOptions::default()).await?;

    assert!(second.success);
    assert_eq!(
        (second.success_count, second.failed_count, second.skipped_count),
        (0, 0, 0)
    );
    assert_eq!(store.get("a.txt").as_deref(), Some("edited after apply"));

    Ok(())
}

#[tokio::test]
async fn test_reapply_keeps_partial_status_while_an_operation_failed() -> anyhow::Result<()> {
    let (store, engine) = setup(&[]);
    store.fail_on("bad.txt");
    let session = engine.create_session("retry", "agent", None);
    engine.add_operation(&session.id, Change::create("good.txt", "ok"), None)?;
    let bad = engine.add_operation(&session.id, Change::create("bad.txt", "no"), None)?;

    engine.apply(&session.id, ApplyOptions::default()).await?;
    let second = engine.apply(&session.id, ApplyOptions::default()).await?;

    assert_eq!(
        (second.success_count, second.failed_count, second.skipped_count),
        (0, 0, 0)
    );
    assert_eq!(
        engine.get_session(&session.id)?.status,
        SessionStatus::PartiallyCompleted
    );

    // Retrying the failed operation completes the session
    store.clear_failure("bad.txt");
    assert!(engine.accept_operation(&session.id, &bad.id));
    let retry = engine.apply(&session.id, ApplyOptions::default()).await?;

    assert_eq!(retry.success_count, 1);
    assert_eq!(store.get("bad.txt").as_deref(), Some("no"));
    assert_eq!(engine.get_session(&session.id)?.status, SessionStatus::Completed);

    Ok(())
}

#[tokio::test]
async fn test_apply_after_cancel_is_rejected() -> anyhow::Result<()> {
    let (store, engine) = setup(&[]);
    let session = engine.create_session("cancelled", "agent", None);
    engine.add_operation(&session.id, Change::create("a.txt", "hello"), None)?;
    engine.cancel(&session.id)?;

    let result = engine.apply(&session.id, ApplyOptions::default()).await;

    assert!(matches!(
        result,
        Err(EngineError::InvalidSessionState {
            status: SessionStatus::Cancelled,
            action: "apply",
            ..
        })
    ));
    assert!(store.get("a.txt").is_none());
    let session = engine.get_session(&session.id)?;
    assert_eq!(session.status, SessionStatus::Cancelled);
    assert_eq!(session.operations[0].status, OperationStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn test_add_operation_rejects_extreme_hunk_range() -> anyhow::Result<()> {
    let (_store, engine) = setup(&[]);
    let session = engine.create_session("hostile", "agent", None);
    let mut hunk = Hunk::new(1, vec!["a".into()], 1, vec!["b".into()]);
    hunk.original_range.end.line = u32::MAX;

    let result = engine.add_operation(
        &session.id,
        Change::modify("a.txt", "a", "b").with_hunks(vec![hunk]),
        None,
    );

    assert!(matches!(
        result,
        Err(EngineError::InvalidChange(ValidationError::HunkRangeMismatch { .. }))
    ));
    assert!(engine.get_session(&session.id)?.operations.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_apply_then_revert_restores_every_path() -> anyhow::Result<()> {
    let (store, engine) = setup(&[
        ("keep.txt", "untouched"),
        ("mod.txt", "line 1\nline 2\n"),
        ("del.txt", "doomed"),
        ("old.txt", "moving"),
    ]);
    let before = store.snapshot();

    let session = engine.create_session("mixed", "agent", None);
    engine.add_operation(&session.id, Change::create("new.txt", "fresh"), None)?;
    engine.add_operation(
        &session.id,
        Change::modify("mod.txt", "line 1\nline 2\n", "line 1\nline two\n"),
        None,
    )?;
    engine.add_operation(&session.id, Change::delete("del.txt", "doomed"), None)?;
    engine.add_operation(&session.id, Change::rename("old.txt", "renamed.txt"), None)?;

    let applied = engine.apply(&session.id, ApplyOptions::default()).await?;
    assert_eq!(applied.success_count, 4);
    assert_eq!(store.get("mod.txt").as_deref(), Some("line 1\nline two\n"));
    assert!(store.get("del.txt").is_none());
    assert_eq!(store.get("renamed.txt").as_deref(), Some("moving"));

    let reverted = engine.revert(&session.id).await?;

    assert!(reverted.success);
    assert_eq!((reverted.reverted_count, reverted.failed_count), (4, 0));
    assert_eq!(store.snapshot(), before);
    let session = engine.get_session(&session.id)?;
    assert_eq!(session.status, SessionStatus::Reverted);
    assert!(
        session
            .operations
            .iter()
            .all(|op| op.status == OperationStatus::Reverted)
    );
    assert!(engine.backup_paths(&session.id).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_revert_delete_recreates_from_backup() -> anyhow::Result<()> {
    let (store, engine) = setup(&[("gone.txt", "precious")]);
    let session = engine.create_session("delete", "agent", None);
    engine.add_operation(&session.id, Change::delete("gone.txt", "precious"), None)?;

    engine.apply(&session.id, ApplyOptions::default()).await?;
    assert_eq!(engine.backup_paths(&session.id), vec!["gone.txt".to_string()]);
    assert!(store.get("gone.txt").is_none());

    engine.revert(&session.id).await?;

    assert_eq!(store.get("gone.txt").as_deref(), Some("precious"));

    Ok(())
}

#[tokio::test]
async fn test_revert_without_backup_uses_recorded_original() -> anyhow::Result<()> {
    let (store, engine) = setup(&[("a.txt", "before")]);
    let session = engine.create_session("no backup", "agent", None);
    engine.add_operation(&session.id, Change::modify("a.txt", "before", "after"), None)?;

    engine.apply(&session.id, no_backup()).await?;
    assert!(engine.backup_paths(&session.id).is_empty());
    engine.revert(&session.id).await?;

    assert_eq!(store.get("a.txt").as_deref(), Some("before"));

    Ok(())
}

#[tokio::test]
async fn test_revert_failure_keeps_operation_applied() -> anyhow::Result<()> {
    let (store, engine) = setup(&[]);
    let session = engine.create_session("sticky", "agent", None);
    let first = engine.add_operation(&session.id, Change::create("a.txt", "a"), None)?;
    let second = engine.add_operation(&session.id, Change::create("b.txt", "b"), None)?;
    engine.apply(&session.id, ApplyOptions::default()).await?;

    store.fail_on("b.txt");
    let result = engine.revert(&session.id).await?;

    assert!(!result.success);
    assert_eq!((result.reverted_count, result.failed_count), (1, 1));
    assert_eq!(result.errors[0].operation_id, second.id);
    assert!(store.get("a.txt").is_none());
    assert_eq!(store.get("b.txt").as_deref(), Some("b"));

    let session = engine.get_session(&session.id)?;
    assert_eq!(session.status, SessionStatus::Reverted);
    let kept = session.operation(&second.id).ok_or(anyhow::anyhow!("missing op"))?;
    assert_eq!(kept.status, OperationStatus::Applied);
    assert!(kept.error.is_some());
    assert_eq!(
        session.operation(&first.id).map(|o| o.status),
        Some(OperationStatus::Reverted)
    );

    Ok(())
}

#[tokio::test]
async fn test_invalid_state_transitions() -> anyhow::Result<()> {
    let (_store, engine) = setup(&[]);
    let session = engine.create_session("state", "agent", None);
    engine.add_operation(&session.id, Change::create("a.txt", "a"), None)?;

    let early = engine.revert(&session.id).await;
    assert!(matches!(
        early,
        Err(EngineError::InvalidSessionState {
            status: SessionStatus::PendingReview,
            ..
        })
    ));

    engine.apply(&session.id, ApplyOptions::default()).await?;
    let late_add = engine.add_operation(&session.id, Change::create("b.txt", "b"), None);
    assert!(matches!(late_add, Err(EngineError::InvalidSessionState { .. })));

    engine.revert(&session.id).await?;
    let reapply = engine.apply(&session.id, ApplyOptions::default()).await;
    assert!(matches!(
        reapply,
        Err(EngineError::InvalidSessionState {
            status: SessionStatus::Reverted,
            action: "apply",
            ..
        })
    ));

    Ok(())
}

#[tokio::test]
async fn test_unknown_session_and_invalid_change() -> anyhow::Result<()> {
    let (_store, engine) = setup(&[]);
    let unknown = SessionId::generate();

    assert!(matches!(
        engine.add_operation(&unknown, Change::create("a", "a"), None),
        Err(EngineError::SessionNotFound(_))
    ));
    assert!(matches!(
        engine.apply(&unknown, ApplyOptions::default()).await,
        Err(EngineError::SessionNotFound(_))
    ));
    assert!(matches!(engine.cancel(&unknown), Err(EngineError::SessionNotFound(_))));

    let session = engine.create_session("invalid", "agent", None);
    let mut rename = Change::rename("a.txt", "b.txt");
    rename.new_file_path = None;
    assert!(matches!(
        engine.add_operation(&session.id, rename, None),
        Err(EngineError::InvalidChange(_))
    ));
    assert_eq!(engine.get_session(&session.id)?.status, SessionStatus::Building);

    Ok(())
}

#[tokio::test]
async fn test_unknown_ids_are_no_ops() -> anyhow::Result<()> {
    let (_store, engine) = setup(&[]);
    let session = engine.create_session("noop", "agent", None);
    let op = engine.add_operation(&session.id, Change::modify("a", "x", "y"), None)?;
    let missing_op = OperationId::generate();

    assert!(!engine.remove_operation(&session.id, &missing_op));
    assert!(!engine.update_operation_status(&session.id, &missing_op, OperationStatus::Rejected));
    assert!(!engine.set_hunk_accepted(&session.id, &op.id, &HunkId::generate(), false));
    assert!(!engine.set_all_hunks_accepted(&SessionId::generate(), &op.id, false));
    assert!(engine.get_operation(&session.id, &missing_op).is_none());

    assert!(engine.remove_operation(&session.id, &op.id));
    assert_eq!(engine.get_session(&session.id)?.status, SessionStatus::Building);

    Ok(())
}

#[tokio::test]
async fn test_conflict_detection_and_recheck() -> anyhow::Result<()> {
    let (store, engine) = setup(&[("same.txt", "v1"), ("drift.txt", "v1")]);
    let session = engine.create_session("conflicts", "agent", None);
    engine.add_operation(&session.id, Change::modify("same.txt", "v1", "v2"), None)?;
    let drift = engine.add_operation(&session.id, Change::modify("drift.txt", "v1", "v2"), None)?;
    engine.add_operation(&session.id, Change::create("new.txt", "n"), None)?;

    store.put("drift.txt", "someone else");
    let conflicts = engine.check_conflicts(&session.id).await?;

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].operation_id, drift.id);
    assert_eq!(conflicts[0].reason, ConflictReason::ContentChanged);
    assert_eq!(conflicts[0].disk_content.as_deref(), Some("someone else"));
    assert_eq!(conflicts[0].resolutions, ConflictResolution::ALL.to_vec());
    assert_eq!(
        engine.get_operation(&session.id, &drift.id).map(|o| o.status),
        Some(OperationStatus::Conflict)
    );

    store.put("drift.txt", "v1");
    assert!(engine.check_conflicts(&session.id).await?.is_empty());
    assert_eq!(
        engine.get_operation(&session.id, &drift.id).map(|o| o.status),
        Some(OperationStatus::Pending)
    );

    Ok(())
}

#[tokio::test]
async fn test_missing_file_is_a_conflict() -> anyhow::Result<()> {
    let (_store, engine) = setup(&[]);
    let session = engine.create_session("missing", "agent", None);
    engine.add_operation(&session.id, Change::delete("gone.txt", "content"), None)?;

    let conflicts = engine.check_conflicts(&session.id).await?;

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].reason, ConflictReason::FileMissing);
    assert!(conflicts[0].disk_content.is_none());
    assert_eq!(conflicts[0].kind, ChangeKind::Delete);

    Ok(())
}

#[tokio::test]
async fn test_conflicting_operations_are_not_applied() -> anyhow::Result<()> {
    let (store, engine) = setup(&[("a.txt", "theirs")]);
    let session = engine.create_session("unresolved", "agent", None);
    engine.add_operation(&session.id, Change::modify("a.txt", "ours-base", "ours"), None)?;
    engine.check_conflicts(&session.id).await?;

    let result = engine.apply(&session.id, ApplyOptions::default()).await?;

    assert_eq!(
        (result.success_count, result.failed_count, result.skipped_count),
        (0, 0, 0)
    );
    assert_eq!(store.get("a.txt").as_deref(), Some("theirs"));

    Ok(())
}

#[tokio::test]
async fn test_resolve_keep_ours_overwrites_and_revert_restores_disk() -> anyhow::Result<()> {
    let (store, engine) = setup(&[("a.txt", "theirs")]);
    let session = engine.create_session("ours", "agent", None);
    let op = engine.add_operation(&session.id, Change::modify("a.txt", "base", "ours"), None)?;
    engine.check_conflicts(&session.id).await?;

    let resolved = engine.resolve_conflict(&session.id, &op.id, ConflictResolution::KeepOurs)?;
    assert_eq!(resolved.map(|o| o.status), Some(OperationStatus::Pending));

    engine.apply(&session.id, ApplyOptions::default()).await?;
    assert_eq!(store.get("a.txt").as_deref(), Some("ours"));

    engine.revert(&session.id).await?;
    assert_eq!(store.get("a.txt").as_deref(), Some("theirs"));

    Ok(())
}

#[tokio::test]
async fn test_resolve_keep_theirs_and_manual() -> anyhow::Result<()> {
    let (store, engine) = setup(&[("a.txt", "theirs"), ("b.txt", "theirs")]);
    let session = engine.create_session("theirs", "agent", None);
    let a = engine.add_operation(&session.id, Change::modify("a.txt", "base", "ours"), None)?;
    let b = engine.add_operation(&session.id, Change::modify("b.txt", "base", "ours"), None)?;
    engine.check_conflicts(&session.id).await?;

    let a = engine.resolve_conflict(&session.id, &a.id, ConflictResolution::KeepTheirs)?;
    let b = engine.resolve_conflict(&session.id, &b.id, ConflictResolution::Manual)?;
    assert_eq!(a.map(|o| o.status), Some(OperationStatus::Rejected));
    assert_eq!(b.map(|o| o.status), Some(OperationStatus::Conflict));

    let result = engine.apply(&session.id, ApplyOptions::default()).await?;
    assert_eq!(result.skipped_count, 1);
    assert_eq!(store.get("a.txt").as_deref(), Some("theirs"));
    assert_eq!(store.get("b.txt").as_deref(), Some("theirs"));

    assert!(
        engine
            .resolve_conflict(&session.id, &OperationId::generate(), ConflictResolution::Manual)?
            .is_none()
    );

    Ok(())
}

#[tokio::test]
async fn test_cancel_leaves_store_untouched() -> anyhow::Result<()> {
    let (store, engine) = setup(&[("a.txt", "a")]);
    let session = engine.create_session("cancel", "agent", None);
    engine.add_operation(&session.id, Change::delete("a.txt", "a"), None)?;

    let cancelled = engine.cancel(&session.id)?;

    assert_eq!(cancelled.status, SessionStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());
    assert_eq!(cancelled.operations[0].status, OperationStatus::Pending);
    assert_eq!(store.get("a.txt").as_deref(), Some("a"));

    let reverted = engine.revert(&session.id).await?;
    assert_eq!(reverted.reverted_count, 0);
    assert_eq!(engine.get_session(&session.id)?.status, SessionStatus::Reverted);

    Ok(())
}

#[tokio::test]
async fn test_cancel_after_completion_is_a_no_op() -> anyhow::Result<()> {
    let (_store, engine) = setup(&[]);
    let session = engine.create_session("done", "agent", None);
    engine.add_operation(&session.id, Change::create("a.txt", "a"), None)?;
    engine.apply(&session.id, ApplyOptions::default()).await?;
    let mut events = engine.subscribe();

    let after = engine.cancel(&session.id)?;

    assert_eq!(after.status, SessionStatus::Completed);
    assert!(events.drain().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_events_follow_call_order() -> anyhow::Result<()> {
    let (_store, engine) = setup(&[]);
    let mut events = engine.subscribe();

    let session = engine.create_session("events", "agent", None);
    let op = engine.add_operation(&session.id, Change::create("a.txt", "a"), None)?;
    engine.apply(&session.id, ApplyOptions::default()).await?;

    let kinds: Vec<_> = events.drain().into_iter().map(|e| e.change).collect();
    assert_eq!(
        kinds,
        vec![
            SessionChangeKind::Created,
            SessionChangeKind::OperationAdded,
            SessionChangeKind::Updated,
            SessionChangeKind::OperationUpdated,
            SessionChangeKind::Completed,
        ]
    );

    engine.update_operation_status(&session.id, &op.id, OperationStatus::Applied);
    assert!(events.drain().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_save_after_apply_flushes_written_paths() -> anyhow::Result<()> {
    let (store, engine) = setup(&[("gone.txt", "x")]);
    let session = engine.create_session("flush", "agent", None);
    engine.add_operation(&session.id, Change::create("a.txt", "a"), None)?;
    engine.add_operation(&session.id, Change::delete("gone.txt", "x"), None)?;

    let options = ApplyOptions {
        save_after_apply: true,
        ..ApplyOptions::default()
    };
    engine.apply(&session.id, options).await?;

    assert_eq!(store.flushed(), vec!["a.txt".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_injected_storage_and_listing() -> anyhow::Result<()> {
    let storage = Arc::new(SessionStorage::new());
    let store = Arc::new(MemoryContentStore::new());
    let engine = SessionEngine::with_storage(store, storage.clone());

    let first = engine.create_session("first", "agent", None);
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = engine.create_session("second", "agent", Some("desc".into()));

    assert_eq!(storage.len(), 2);
    assert_eq!(engine.session_count(), 2);
    let listed: Vec<_> = engine.list_sessions().into_iter().map(|s| s.id).collect();
    assert_eq!(listed, vec![second.id.clone(), first.id.clone()]);

    engine.delete_session(&first.id)?;
    assert_eq!(engine.session_count(), 1);
    assert!(matches!(
        engine.get_session(&first.id),
        Err(EngineError::SessionNotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_diff_rendering_through_engine() -> anyhow::Result<()> {
    let (_store, engine) = setup(&[]);
    let session = engine.create_session("diff", "agent", None);
    let create = engine.add_operation(&session.id, Change::create("a.txt", "hi"), None)?;
    engine.add_operation(&session.id, Change::rename("b.txt", "c.txt"), None)?;

    let one = engine.generate_operation_diff(&session.id, &create.id, &DiffOptions::default())?;
    assert!(one.contains("+++ b/a.txt"));

    let all = engine.generate_session_diff(&session.id, &DiffOptions::default())?;
    assert!(all.starts_with(&one));
    assert!(all.contains("rename to c.txt"));

    assert!(matches!(
        engine.generate_operation_diff(&session.id, &OperationId::generate(), &DiffOptions::default()),
        Err(EngineError::Internal(_))
    ));

    Ok(())
}
