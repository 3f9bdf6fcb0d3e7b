use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use tempfile::tempdir;

use taskpad::error::TaskpadError;
use taskpad::model::{EditOutcome, EditRequest, FilterMode, NewTask, Priority, SortMode};
use taskpad::store::kv::{FileKv, KeyValueStore};
use taskpad::store::prefs;
use taskpad::store::tasks::{StoreEvent, TaskStore};
use taskpad::view::{self, ViewQuery};

#[test]
fn test_full_workflow() {
    let dir = tempdir().unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let mut store = taskpad::store::open(dir.path()).unwrap();
    let seen: Rc<RefCell<Vec<StoreEvent>>> = Rc::default();
    let sink = Rc::clone(&seen);
    store.subscribe(move |event, tasks| {
        assert!(tasks.len() <= 3);
        sink.borrow_mut().push(event);
    });

    let milk = store
        .create(NewTask {
            priority: Some(Priority::High),
            due_date: Some(today),
            ..NewTask::new("Buy milk")
        })
        .unwrap()
        .unwrap();
    let report = store
        .create(NewTask {
            category: Some("Work".into()),
            notes: Some("quarterly numbers".into()),
            ..NewTask::new("Write report")
        })
        .unwrap()
        .unwrap();
    let gym = store.create(NewTask::new("Gym")).unwrap().unwrap();
    assert!(milk.id != report.id && report.id != gym.id);

    store.toggle_complete(gym.id).unwrap();
    let outcome = store
        .edit(
            report.id,
            EditRequest {
                title: Some("Write Q2 report".into()),
                notes: None,
            },
        )
        .unwrap();
    assert!(matches!(outcome, EditOutcome::Applied(ref t) if t.notes == "quarterly numbers"));

    let due_today = view::visible(
        store.tasks(),
        &ViewQuery::new(FilterMode::Today, "", SortMode::CreatedAsc),
        today,
    );
    assert_eq!(due_today.len(), 1);
    assert_eq!(due_today[0].id, milk.id);

    let found = view::visible(
        store.tasks(),
        &ViewQuery::new(FilterMode::Pending, "QUARTERLY", SortMode::AlphaAsc),
        today,
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text, "Write Q2 report");

    store.delete(milk.id).unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![
            StoreEvent::Created(milk.id),
            StoreEvent::Created(report.id),
            StoreEvent::Created(gym.id),
            StoreEvent::Toggled(gym.id),
            StoreEvent::Edited(report.id),
            StoreEvent::Deleted(milk.id),
        ]
    );

    // Everything survives a reopen.
    let reopened = taskpad::store::open(dir.path()).unwrap();
    assert_eq!(reopened.tasks(), store.tasks());
    let counts = reopened.counts();
    assert_eq!((counts.total, counts.completed, counts.pending), (2, 1, 1));
}

#[test]
fn noops_leave_storage_untouched() {
    let dir = tempdir().unwrap();
    let mut store = taskpad::store::open(dir.path()).unwrap();

    assert_eq!(store.create(NewTask::new("   ")).unwrap(), None);
    assert_eq!(store.toggle_complete(7).unwrap(), None);
    assert_eq!(store.delete(7).unwrap(), None);
    assert_eq!(
        store.edit(7, EditRequest::default()).unwrap(),
        EditOutcome::NotFound
    );
    assert!(!dir.path().join("tasks.json").exists());
}

#[test]
fn theme_preference_is_independent_of_tasks() {
    let dir = tempdir().unwrap();
    let kv = FileKv::open(dir.path()).unwrap();

    assert_eq!(prefs::toggle_theme(&kv).unwrap().as_str(), "dark");
    assert_eq!(kv.get("tasks").unwrap(), None);

    let store = TaskStore::load(&kv).unwrap();
    assert!(store.tasks().is_empty());
    assert_eq!(prefs::load_theme(store.storage()).unwrap().as_str(), "dark");
}

#[test]
fn held_lock_blocks_writes() {
    let dir = tempdir().unwrap();
    let mut store = taskpad::store::open(dir.path()).unwrap();
    let _held = taskpad::store::lock::acquire_lock(&dir.path().join("store.lock")).unwrap();

    let err = store.create(NewTask::new("blocked")).unwrap_err();
    assert!(matches!(err, TaskpadError::Locked(_)));
}
