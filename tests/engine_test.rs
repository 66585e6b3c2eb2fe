//! Integration tests for queue ordering, soft-delete, undo, and purge.

use taskq::Error;
use taskq::engine::Engine;
use taskq::model::*;

fn test_engine() -> Engine {
    Engine::in_memory().expect("failed to create in-memory engine")
}

fn names(engine: &Engine) -> Vec<String> {
    engine
        .all_tasks()
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect()
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

#[test]
fn add_to_empty_queue_gets_order_one() {
    let mut engine = test_engine();

    let task = engine.add("First task").unwrap();

    assert_eq!(task.queue_order, 1);
    assert_eq!(task.state, TaskState::Active);
    assert_eq!(engine.queue_size().unwrap(), 1);
    assert_eq!(engine.current_task().unwrap().unwrap().id, task.id);
}

#[test]
fn add_keeps_insertion_order() {
    let mut engine = test_engine();

    engine.add("Task 1").unwrap();
    engine.add("Task 2").unwrap();
    engine.add("Task 3").unwrap();

    assert_eq!(engine.queue_size().unwrap(), 3);
    assert_eq!(engine.current_task().unwrap().unwrap().name, "Task 1");

    let tasks = engine.all_tasks().unwrap();
    for pair in tasks.windows(2) {
        assert!(pair[0].queue_order < pair[1].queue_order);
    }
}

#[test]
fn add_trims_name() {
    let mut engine = test_engine();
    let task = engine.add("  padded  ").unwrap();
    assert_eq!(task.name, "padded");
}

#[test]
fn add_rejects_blank_name() {
    let mut engine = test_engine();

    let err = engine.add("   ").unwrap_err();

    assert!(matches!(err, Error::Validation(_)), "got {err:?}");
    assert_eq!(engine.queue_size().unwrap(), 0);
}

#[test]
fn add_after_soft_delete_still_takes_a_fresh_order() {
    let mut engine = test_engine();

    let first = engine.add("first").unwrap();
    let second = engine.add("second").unwrap();
    engine.soft_delete(second.id).unwrap();

    let third = engine.add("third").unwrap();

    assert!(third.queue_order > second.queue_order);
    assert!(third.queue_order > first.queue_order);
}

#[test]
fn empty_queue_has_no_current_task() {
    let engine = test_engine();
    assert!(engine.current_task().unwrap().is_none());
    assert_eq!(engine.queue_size().unwrap(), 0);
    assert!(engine.all_tasks().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Rotate
// ---------------------------------------------------------------------------

#[test]
fn rotate_moves_head_to_back() {
    let mut engine = test_engine();
    engine.add("Task 1").unwrap();
    engine.add("Task 2").unwrap();
    engine.add("Task 3").unwrap();
    let first = engine.current_task().unwrap().unwrap();

    engine.rotate_with_pause(first.id).unwrap();

    assert_eq!(engine.current_task().unwrap().unwrap().name, "Task 2");
    assert_eq!(engine.queue_size().unwrap(), 3);
    assert_eq!(engine.all_tasks().unwrap()[2].name, "Task 1");
}

#[test]
fn rotating_sole_task_keeps_it_current() {
    let mut engine = test_engine();
    let only = engine.add("Only task").unwrap();

    engine.rotate(only.id).unwrap();

    let current = engine.current_task().unwrap().unwrap();
    assert_eq!(current.id, only.id);
    assert_eq!(current.name, "Only task");
    assert_eq!(engine.queue_size().unwrap(), 1);
}

#[test]
fn rotate_middle_task() {
    let mut engine = test_engine();
    engine.add("a").unwrap();
    let b = engine.add("b").unwrap();
    engine.add("c").unwrap();

    engine.rotate(b.id).unwrap();

    assert_eq!(names(&engine), ["a", "c", "b"]);
}

#[test]
fn full_cycle_returns_to_start() {
    let mut engine = test_engine();
    engine.add("a").unwrap();
    engine.add("b").unwrap();
    engine.add("c").unwrap();

    for _ in 0..3 {
        let head = engine.current_task().unwrap().unwrap();
        engine.rotate(head.id).unwrap();
    }

    assert_eq!(names(&engine), ["a", "b", "c"]);
}

#[test]
fn rotate_goes_behind_soft_deleted_tasks() {
    let mut engine = test_engine();
    let a = engine.add("a").unwrap();
    engine.add("b").unwrap();
    let c = engine.add("c").unwrap();

    engine.soft_delete(c.id).unwrap();
    let rotated = engine.rotate(a.id).unwrap();
    assert!(rotated.queue_order > c.queue_order);

    engine.undo_delete().unwrap();
    assert_eq!(names(&engine), ["b", "c", "a"]);
}

#[test]
fn rotate_unknown_task_is_not_found() {
    let mut engine = test_engine();
    let err = engine.rotate(TaskId(42)).unwrap_err();
    assert!(matches!(err, Error::NotFound(TaskId(42))), "got {err:?}");
}

#[test]
fn rotate_deleted_task_is_not_found() {
    let mut engine = test_engine();
    let task = engine.add("gone").unwrap();
    engine.soft_delete(task.id).unwrap();

    let err = engine.rotate(task.id).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Soft delete and undo
// ---------------------------------------------------------------------------

#[test]
fn soft_delete_hides_task_but_keeps_it_addressable() {
    let mut engine = test_engine();
    let a = engine.add("a").unwrap();
    engine.add("b").unwrap();

    engine.soft_delete(a.id).unwrap();

    assert_eq!(engine.queue_size().unwrap(), 1);
    assert_eq!(engine.current_task().unwrap().unwrap().name, "b");
    assert!(engine.has_deleted_task().unwrap());

    let hidden = engine.task(a.id).unwrap().expect("still addressable");
    assert!(hidden.is_deleted());
    assert_eq!(hidden.queue_order, a.queue_order);
}

#[test]
fn soft_delete_twice_is_not_found() {
    let mut engine = test_engine();
    let task = engine.add("once").unwrap();
    engine.soft_delete(task.id).unwrap();

    let err = engine.soft_delete(task.id).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
}

#[test]
fn undo_restores_original_position() {
    let mut engine = test_engine();
    let a = engine.add("a").unwrap();
    engine.add("b").unwrap();
    engine.add("c").unwrap();

    engine.soft_delete(a.id).unwrap();
    assert_eq!(names(&engine), ["b", "c"]);

    let restored = engine.undo_delete().unwrap();

    assert_eq!(restored, 1);
    assert_eq!(names(&engine), ["a", "b", "c"]);
    assert_eq!(engine.current_task().unwrap().unwrap().id, a.id);
    assert!(!engine.has_deleted_task().unwrap());
}

#[test]
fn undo_restores_every_pending_delete() {
    let mut engine = test_engine();
    let a = engine.add("a").unwrap();
    let b = engine.add("b").unwrap();
    engine.add("c").unwrap();

    engine.soft_delete(a.id).unwrap();
    engine.soft_delete(b.id).unwrap();
    assert_eq!(engine.queue_size().unwrap(), 1);

    assert_eq!(engine.undo_delete().unwrap(), 2);
    assert_eq!(names(&engine), ["a", "b", "c"]);
}

#[test]
fn undo_with_nothing_deleted_is_noop() {
    let mut engine = test_engine();
    engine.add("a").unwrap();

    assert_eq!(engine.undo_delete().unwrap(), 0);
    assert_eq!(names(&engine), ["a"]);
}

#[test]
fn queue_size_counts_adds_minus_pending_deletes() {
    let mut engine = test_engine();
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(engine.add(&format!("task {i}")).unwrap().id);
    }

    engine.soft_delete(ids[1]).unwrap();
    engine.soft_delete(ids[3]).unwrap();
    assert_eq!(engine.queue_size().unwrap(), 3);

    engine.undo_delete().unwrap();
    assert_eq!(engine.queue_size().unwrap(), 5);
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

#[test]
fn cleanup_closes_the_undo_window() {
    let mut engine = test_engine();
    let a = engine.add("a").unwrap();
    engine.add("b").unwrap();
    engine.soft_delete(a.id).unwrap();

    assert_eq!(engine.cleanup_deleted_tasks().unwrap(), 1);

    assert!(!engine.has_deleted_task().unwrap());
    assert_eq!(engine.undo_delete().unwrap(), 0);
    assert_eq!(names(&engine), ["b"]);
    assert!(engine.task(a.id).unwrap().is_none());
}

#[test]
fn cleanup_leaves_live_tasks_alone() {
    let mut engine = test_engine();
    engine.add("a").unwrap();
    engine.add("b").unwrap();

    assert_eq!(engine.cleanup_deleted_tasks().unwrap(), 0);
    assert_eq!(names(&engine), ["a", "b"]);
}

// ---------------------------------------------------------------------------
// Rename
// ---------------------------------------------------------------------------

#[test]
fn rename_updates_name_and_keeps_id() {
    let mut engine = test_engine();
    let task = engine.add("Original name").unwrap();

    let renamed = engine.rename(task.id, "Updated name").unwrap();

    assert_eq!(renamed.id, task.id);
    assert_eq!(renamed.name, "Updated name");
    let current = engine.current_task().unwrap().unwrap();
    assert_eq!(current.name, "Updated name");
    assert_eq!(current.id, task.id);
}

#[test]
fn rename_persists_without_reordering() {
    let mut engine = test_engine();
    let first = engine.add("Task 1").unwrap();
    engine.add("Task 2").unwrap();

    engine.rename(first.id, "Modified Task 1").unwrap();

    assert_eq!(names(&engine), ["Modified Task 1", "Task 2"]);
}

#[test]
fn rename_to_same_trimmed_name_is_noop() {
    let mut engine = test_engine();
    let task = engine.add("same").unwrap();

    let renamed = engine.rename(task.id, "  same ").unwrap();

    assert_eq!(renamed, task);
}

#[test]
fn rename_rejects_blank_name() {
    let mut engine = test_engine();
    let task = engine.add("keep").unwrap();

    let err = engine.rename(task.id, "\t ").unwrap_err();

    assert!(matches!(err, Error::Validation(_)), "got {err:?}");
    assert_eq!(engine.task(task.id).unwrap().unwrap().name, "keep");
}

#[test]
fn rename_unknown_task_is_not_found() {
    let mut engine = test_engine();
    let err = engine.rename(TaskId(7), "anything").unwrap_err();
    assert!(matches!(err, Error::NotFound(TaskId(7))), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Composite operations
// ---------------------------------------------------------------------------

#[test]
fn rotate_with_pause_closes_active_session() {
    let mut engine = test_engine();
    let task1 = engine.add("Task 1").unwrap();
    engine.add("Task 2").unwrap();

    engine.start_session(task1.id).unwrap();
    assert!(engine.has_active_session(task1.id).unwrap());

    let moved = engine.rotate_with_pause(task1.id).unwrap();

    assert!(!engine.has_active_session(task1.id).unwrap());
    let paused = moved.paused.expect("session should have been closed");
    assert!(paused.end_time.is_some());
    assert_eq!(engine.sessions(task1.id).unwrap()[0].end_time, paused.end_time);
    assert_eq!(engine.current_task().unwrap().unwrap().name, "Task 2");
}

#[test]
fn rotate_with_pause_without_session_just_rotates() {
    let mut engine = test_engine();
    let a = engine.add("a").unwrap();
    engine.add("b").unwrap();

    let moved = engine.rotate_with_pause(a.id).unwrap();

    assert!(moved.paused.is_none());
    assert_eq!(names(&engine), ["b", "a"]);
}

#[test]
fn failed_rotate_leaves_session_open() {
    let mut engine = test_engine();
    let task = engine.add("working").unwrap();
    engine.start_session(task.id).unwrap();

    // Deleted tasks cannot rotate; the pause in the same transaction
    // must roll back with it.
    engine.soft_delete(task.id).unwrap();
    let err = engine.rotate_with_pause(task.id).unwrap_err();

    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    assert!(engine.has_active_session(task.id).unwrap());
}

#[test]
fn delete_with_pause_closes_session_and_hides_task() {
    let mut engine = test_engine();
    let a = engine.add("a").unwrap();
    engine.add("b").unwrap();
    engine.start_session(a.id).unwrap();

    let moved = engine.delete_with_pause(a.id).unwrap();

    assert!(moved.task.is_deleted());
    assert!(moved.paused.is_some());
    assert!(!engine.has_active_session(a.id).unwrap());
    assert_eq!(names(&engine), ["b"]);

    engine.undo_delete().unwrap();
    assert_eq!(names(&engine), ["a", "b"]);
}

#[test]
fn failed_delete_leaves_session_open() {
    let mut engine = test_engine();
    let task = engine.add("x").unwrap();
    engine.start_session(task.id).unwrap();
    engine.soft_delete(task.id).unwrap();

    assert!(engine.delete_with_pause(task.id).is_err());
    assert!(engine.has_active_session(task.id).unwrap());
}

#[test]
fn scenario_add_three_then_rotate() {
    let mut engine = test_engine();
    engine.add("Task 1").unwrap();
    engine.add("Task 2").unwrap();
    engine.add("Task 3").unwrap();

    let current = engine.current_task().unwrap().unwrap();
    assert_eq!(current.name, "Task 1");
    assert_eq!(engine.queue_size().unwrap(), 3);

    engine.rotate(current.id).unwrap();

    assert_eq!(engine.current_task().unwrap().unwrap().name, "Task 2");
    assert_eq!(engine.all_tasks().unwrap()[2].name, "Task 1");
}
