//! Durability: state written through one engine is visible after reopening.

use taskq::engine::Engine;

#[test]
fn queue_and_sessions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskq.db");

    let (rotated_id, deleted_id) = {
        let mut engine = Engine::open(&path).unwrap();
        let a = engine.add("a").unwrap();
        engine.add("b").unwrap();
        let c = engine.add("c").unwrap();

        engine.start_session(a.id).unwrap();
        engine.rotate_with_pause(a.id).unwrap();
        engine.soft_delete(c.id).unwrap();
        (a.id, c.id)
    };

    let mut engine = Engine::open(&path).unwrap();

    let names: Vec<_> = engine.all_tasks().unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, ["b", "a"]);
    assert!(!engine.has_active_session(rotated_id).unwrap());
    assert_eq!(engine.sessions(rotated_id).unwrap().len(), 1);

    // The undo window stays open across restarts until cleanup runs.
    assert!(engine.has_deleted_task().unwrap());
    assert_eq!(engine.undo_delete().unwrap(), 1);
    assert!(engine.task(deleted_id).unwrap().is_some());
}

#[test]
fn open_session_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskq.db");

    let task_id = {
        let mut engine = Engine::open(&path).unwrap();
        let task = engine.add("long running").unwrap();
        engine.start_session(task.id).unwrap();
        task.id
    };

    let mut engine = Engine::open(&path).unwrap();
    assert!(engine.has_active_session(task_id).unwrap());
    assert!(engine.pause_session(task_id).unwrap().is_some());
}
