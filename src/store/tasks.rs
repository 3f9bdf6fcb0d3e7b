use std::collections::HashSet;

use chrono::{SubsecRound, Utc};
use tracing::{debug, info, warn};

use crate::error::{Result, TaskpadError};
use crate::model::{Counts, DEFAULT_CATEGORY, EditOutcome, EditRequest, NewTask, Task};
use crate::store::kv::KeyValueStore;

pub const TASKS_KEY: &str = "tasks";

/// What changed in the collection. Delivered to listeners after the new
/// collection has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Created(u64),
    Toggled(u64),
    Edited(u64),
    Deleted(u64),
    Replaced(usize),
}

type Listener = Box<dyn FnMut(StoreEvent, &[Task])>;

/// Owns the task collection and writes all of it back after every mutation.
pub struct TaskStore<S: KeyValueStore> {
    storage: S,
    tasks: Vec<Task>,
    listeners: Vec<Listener>,
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Load the stored collection. No stored value means an empty collection.
    #[tracing::instrument(skip(storage))]
    pub fn load(storage: S) -> Result<Self> {
        let tasks = read_collection(&storage)?;
        debug!(count = tasks.len(), "loaded task collection");
        Ok(Self {
            storage,
            tasks,
            listeners: Vec::new(),
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn counts(&self) -> Counts {
        Counts::of(&self.tasks)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn subscribe(&mut self, listener: impl FnMut(StoreEvent, &[Task]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Append a task. Blank text is discarded and yields `None`.
    pub fn create(&mut self, input: NewTask) -> Result<Option<Task>> {
        let text = input.text.trim();
        if text.is_empty() {
            warn!("ignoring task with empty text");
            return Ok(None);
        }

        // Stored as epoch millis, so keep memory and disk identical.
        let now = Utc::now().trunc_subsecs(3);
        let task = Task {
            id: self.fresh_id(now.timestamp_millis()),
            text: text.to_string(),
            completed: false,
            category: input
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            notes: input.notes.unwrap_or_default(),
            created_at: Some(now),
        };

        let mut next = self.tasks.clone();
        next.push(task.clone());
        self.commit(next, StoreEvent::Created(task.id))?;
        info!(id = task.id, "created task");
        Ok(Some(task))
    }

    pub fn toggle_complete(&mut self, id: u64) -> Result<Option<Task>> {
        let Some(pos) = self.position(id) else {
            warn!(id, "toggle ignored: no such task");
            return Ok(None);
        };
        let mut next = self.tasks.clone();
        next[pos].completed = !next[pos].completed;
        let updated = next[pos].clone();

        self.commit(next, StoreEvent::Toggled(id))?;
        info!(id, completed = updated.completed, "toggled task");
        Ok(Some(updated))
    }

    pub fn edit(&mut self, id: u64, request: EditRequest) -> Result<EditOutcome> {
        let Some(pos) = self.position(id) else {
            warn!(id, "edit ignored: no such task");
            return Ok(EditOutcome::NotFound);
        };
        let Some(title) = request.title else {
            debug!(id, "edit cancelled");
            return Ok(EditOutcome::Cancelled);
        };
        let title = title.trim();
        if title.is_empty() {
            warn!(id, "edit rejected: empty title");
            return Ok(EditOutcome::Rejected);
        }

        let mut next = self.tasks.clone();
        next[pos].text = title.to_string();
        if let Some(notes) = request.notes {
            next[pos].notes = notes;
        }
        let updated = next[pos].clone();

        self.commit(next, StoreEvent::Edited(id))?;
        info!(id, "edited task");
        Ok(EditOutcome::Applied(updated))
    }

    pub fn delete(&mut self, id: u64) -> Result<Option<Task>> {
        let Some(pos) = self.position(id) else {
            warn!(id, "delete ignored: no such task");
            return Ok(None);
        };
        let mut next = self.tasks.clone();
        let removed = next.remove(pos);

        self.commit(next, StoreEvent::Deleted(id))?;
        info!(id, "deleted task");
        Ok(Some(removed))
    }

    /// Swap in a whole collection (used by import). Records with blank text
    /// are dropped and later duplicates of an id are discarded.
    pub fn replace_all(&mut self, incoming: Vec<Task>) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(incoming.len());
        for mut task in incoming {
            let text = task.text.trim();
            if text.is_empty() || !seen.insert(task.id) {
                continue;
            }
            task.text = text.to_string();
            kept.push(task);
        }

        let count = kept.len();
        self.commit(kept, StoreEvent::Replaced(count))?;
        info!(count, "replaced task collection");
        Ok(count)
    }

    /// Re-read the stored collection, picking up writes made by other
    /// processes since this store was loaded.
    pub fn reload(&mut self) -> Result<()> {
        self.tasks = read_collection(&self.storage)?;
        debug!(count = self.tasks.len(), "reloaded task collection");
        Ok(())
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn fresh_id(&self, now_millis: i64) -> u64 {
        let candidate = u64::try_from(now_millis).unwrap_or_default();
        if self.tasks.iter().all(|t| t.id != candidate) {
            return candidate;
        }
        self.tasks
            .iter()
            .map(|t| t.id)
            .max()
            .unwrap_or(candidate)
            .saturating_add(1)
    }

    /// Write `next`, and only once it is stored make it the live collection.
    fn commit(&mut self, next: Vec<Task>, event: StoreEvent) -> Result<()> {
        let json = serde_json::to_string(&next)?;
        self.storage.set(TASKS_KEY, &json)?;
        self.tasks = next;
        for listener in &mut self.listeners {
            listener(event, &self.tasks);
        }
        Ok(())
    }
}

fn read_collection(storage: &impl KeyValueStore) -> Result<Vec<Task>> {
    match storage.get(TASKS_KEY)? {
        Some(raw) if !raw.trim().is_empty() => parse_collection(&raw),
        _ => Ok(Vec::new()),
    }
}

/// Parse a serialized collection, reporting the first bad record.
pub fn parse_collection(raw: &str) -> Result<Vec<Task>> {
    serde_json::from_str(raw)
        .map_err(|err| TaskpadError::CorruptStore(TASKS_KEY.to_string(), err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::model::Priority;
    use crate::store::kv::{FileKv, MemoryKv};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn store() -> TaskStore<MemoryKv> {
        TaskStore::load(MemoryKv::new()).unwrap()
    }

    #[test]
    fn empty_storage_loads_empty_collection() {
        let s = store();
        assert!(s.tasks().is_empty());
        assert_eq!(s.counts(), Counts::default());
    }

    #[test]
    fn whitespace_only_create_is_a_no_op() {
        let mut s = store();
        assert_eq!(s.create(NewTask::new("   \t ")).unwrap(), None);
        assert!(s.tasks().is_empty());
        assert_eq!(s.storage().get(TASKS_KEY).unwrap(), None);
    }

    #[test]
    fn create_applies_defaults() {
        let mut s = store();
        let existing = s.create(NewTask::new("Existing")).unwrap().unwrap();
        let task = s.create(NewTask::new("  Buy milk ")).unwrap().unwrap();

        assert_eq!(s.tasks().len(), 2);
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert_eq!(task.category, "Other");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.due_date, None);
        assert_eq!(task.notes, "");
        assert!(task.created_at.is_some());
        assert_ne!(task.id, existing.id);
    }

    #[test]
    fn create_keeps_supplied_fields() {
        let mut s = store();
        let task = s
            .create(NewTask {
                text: "File taxes".into(),
                category: Some("Finance".into()),
                priority: Some(Priority::High),
                due_date: NaiveDate::from_ymd_opt(2024, 4, 15),
                notes: Some("use last year's forms".into()),
            })
            .unwrap()
            .unwrap();
        assert_eq!(task.category, "Finance");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 4, 15));
        assert_eq!(task.notes, "use last year's forms");
    }

    #[test]
    fn blank_category_falls_back_to_default() {
        let mut s = store();
        let task = s
            .create(NewTask {
                category: Some("  ".into()),
                ..NewTask::new("x")
            })
            .unwrap()
            .unwrap();
        assert_eq!(task.category, "Other");
    }

    #[test]
    fn rapid_creates_get_distinct_ids() {
        let mut s = store();
        for i in 0..50 {
            s.create(NewTask::new(format!("task {i}"))).unwrap();
        }
        let ids: HashSet<u64> = s.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn toggle_twice_restores_original() {
        let mut s = store();
        let original = s.create(NewTask::new("Walk dog")).unwrap().unwrap();

        let once = s.toggle_complete(original.id).unwrap().unwrap();
        assert!(once.completed);
        let twice = s.toggle_complete(original.id).unwrap().unwrap();
        assert_eq!(twice, original);
    }

    #[test]
    fn toggle_unknown_id_is_ignored() {
        let mut s = store();
        s.create(NewTask::new("a")).unwrap();
        let before = s.tasks().to_vec();
        assert_eq!(s.toggle_complete(1).unwrap(), None);
        assert_eq!(s.tasks(), before.as_slice());
    }

    #[test]
    fn delete_unknown_id_is_ignored() {
        let mut s = store();
        s.create(NewTask::new("a")).unwrap();
        s.create(NewTask::new("b")).unwrap();
        let before = s.tasks().to_vec();

        assert_eq!(s.delete(12345).unwrap(), None);
        assert_eq!(s.tasks(), before.as_slice());
    }

    #[test]
    fn delete_removes_only_the_target() {
        let mut s = store();
        let a = s.create(NewTask::new("a")).unwrap().unwrap();
        let b = s.create(NewTask::new("b")).unwrap().unwrap();

        let removed = s.delete(a.id).unwrap().unwrap();
        assert_eq!(removed.id, a.id);
        assert_eq!(s.tasks().len(), 1);
        assert_eq!(s.tasks()[0].id, b.id);
    }

    #[test]
    fn edit_cancelled_leaves_task_untouched() {
        let mut s = store();
        let t = s.create(NewTask::new("Original")).unwrap().unwrap();
        let outcome = s
            .edit(
                t.id,
                EditRequest {
                    title: None,
                    notes: Some("ignored".into()),
                },
            )
            .unwrap();
        assert_eq!(outcome, EditOutcome::Cancelled);
        assert_eq!(s.get(t.id), Some(&t));
    }

    #[test]
    fn edit_with_empty_title_is_rejected_entirely() {
        let mut s = store();
        let t = s.create(NewTask::new("Original")).unwrap().unwrap();
        let outcome = s
            .edit(
                t.id,
                EditRequest {
                    title: Some("   ".into()),
                    notes: Some("new notes".into()),
                },
            )
            .unwrap();
        assert_eq!(outcome, EditOutcome::Rejected);
        assert_eq!(s.get(t.id), Some(&t));
    }

    #[test]
    fn edit_applies_title_and_optional_notes() {
        let mut s = store();
        let t = s
            .create(NewTask {
                notes: Some("keep me".into()),
                ..NewTask::new("Original")
            })
            .unwrap()
            .unwrap();

        let outcome = s
            .edit(
                t.id,
                EditRequest {
                    title: Some(" Renamed ".into()),
                    notes: None,
                },
            )
            .unwrap();
        let EditOutcome::Applied(updated) = outcome else {
            panic!("expected edit to apply");
        };
        assert_eq!(updated.text, "Renamed");
        assert_eq!(updated.notes, "keep me");

        s.edit(
            t.id,
            EditRequest {
                title: Some("Renamed".into()),
                notes: Some(String::new()),
            },
        )
        .unwrap();
        assert_eq!(s.get(t.id).unwrap().notes, "");
    }

    #[test]
    fn edit_unknown_id_reports_not_found() {
        let mut s = store();
        let outcome = s
            .edit(
                99,
                EditRequest {
                    title: Some("x".into()),
                    notes: None,
                },
            )
            .unwrap();
        assert_eq!(outcome, EditOutcome::NotFound);
    }

    #[test]
    fn counts_balance_after_mixed_operations() {
        let mut s = store();
        let mut ids = Vec::new();
        for i in 0..6 {
            ids.push(s.create(NewTask::new(format!("t{i}"))).unwrap().unwrap().id);
            let c = s.counts();
            assert_eq!(c.total, c.completed + c.pending);
        }
        s.toggle_complete(ids[0]).unwrap();
        s.toggle_complete(ids[3]).unwrap();
        s.delete(ids[3]).unwrap();
        s.toggle_complete(ids[5]).unwrap();
        s.delete(ids[1]).unwrap();

        let c = s.counts();
        assert_eq!(c.total, 4);
        assert_eq!(c.completed, 2);
        assert_eq!(c.pending, 2);
    }

    #[test]
    fn listeners_see_each_mutation_after_write() {
        let mut s = store();
        let seen: Rc<RefCell<Vec<(StoreEvent, usize)>>> = Rc::default();
        let sink = Rc::clone(&seen);
        s.subscribe(move |event, tasks| sink.borrow_mut().push((event, tasks.len())));

        let t = s.create(NewTask::new("a")).unwrap().unwrap();
        s.create(NewTask::new("  ")).unwrap();
        s.toggle_complete(t.id).unwrap();
        s.delete(t.id).unwrap();
        s.delete(t.id).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                (StoreEvent::Created(t.id), 1),
                (StoreEvent::Toggled(t.id), 1),
                (StoreEvent::Deleted(t.id), 0),
            ]
        );
    }

    #[test]
    fn every_mutation_rewrites_the_whole_collection() {
        let mut s = store();
        let a = s.create(NewTask::new("a")).unwrap().unwrap();
        s.create(NewTask::new("b")).unwrap();
        s.toggle_complete(a.id).unwrap();

        let raw = s.storage().get(TASKS_KEY).unwrap().unwrap();
        let stored = parse_collection(&raw).unwrap();
        assert_eq!(stored, s.tasks());
    }

    #[test]
    fn collection_survives_reopen() {
        let dir = tempdir().unwrap();
        let created = {
            let mut s = TaskStore::load(FileKv::open(dir.path()).unwrap()).unwrap();
            let a = s.create(NewTask::new("persist me")).unwrap().unwrap();
            s.create(NewTask::new("and me")).unwrap();
            s.toggle_complete(a.id).unwrap();
            s.tasks().to_vec()
        };

        let reopened = TaskStore::load(FileKv::open(dir.path()).unwrap()).unwrap();
        assert_eq!(reopened.tasks(), created.as_slice());
    }

    #[test]
    fn corrupt_collection_is_reported() {
        let kv = MemoryKv::new();
        kv.set(TASKS_KEY, "{not json").unwrap();
        let err = TaskStore::load(kv).err().unwrap();
        assert_eq!(err.code(), "corrupt_store");
    }

    #[test]
    fn replace_all_drops_blank_and_duplicate_records() {
        let mut s = store();
        let incoming: Vec<Task> = serde_json::from_str(
            r#"[
                {"id": 1, "text": "keep"},
                {"id": 2, "text": "   "},
                {"id": 1, "text": "duplicate"},
                {"id": 3, "text": " trimmed "}
            ]"#,
        )
        .unwrap();

        let count = s.replace_all(incoming).unwrap();
        assert_eq!(count, 2);
        let texts: Vec<&str> = s.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["keep", "trimmed"]);
    }

    /// Storage whose writes can be made to fail on demand.
    struct ToggleableKv {
        inner: MemoryKv,
        failing: std::cell::Cell<bool>,
    }

    impl KeyValueStore for ToggleableKv {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.failing.get() {
                return Err(TaskpadError::Locked("store.lock".into()));
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn failed_write_leaves_collection_unchanged() {
        let kv = ToggleableKv {
            inner: MemoryKv::new(),
            failing: std::cell::Cell::new(false),
        };
        let mut s = TaskStore::load(&kv).unwrap();
        let a = s.create(NewTask::new("a")).unwrap().unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        s.subscribe(move |event, _| sink.borrow_mut().push(event));

        kv.failing.set(true);
        assert!(s.create(NewTask::new("ghost")).is_err());
        assert!(s.toggle_complete(a.id).is_err());
        let edit = EditRequest {
            title: Some("renamed".into()),
            notes: None,
        };
        assert!(s.edit(a.id, edit).is_err());
        assert!(s.delete(a.id).is_err());
        assert!(s.replace_all(Vec::new()).is_err());

        assert_eq!(s.tasks(), std::slice::from_ref(&a));
        assert!(events.borrow().is_empty());

        kv.failing.set(false);
        s.create(NewTask::new("b")).unwrap();
        assert_eq!(s.tasks().len(), 2);

        let stored = kv.inner.get(TASKS_KEY).unwrap().unwrap();
        assert!(!stored.contains("ghost"));
        assert!(!stored.contains("renamed"));
        assert!(stored.contains(r#""completed":false"#));
        assert!(!stored.contains(r#""completed":true"#));
    }

    #[test]
    fn reload_picks_up_writes_from_another_handle() {
        let kv = MemoryKv::new();
        let mut first = TaskStore::load(&kv).unwrap();
        let mut second = TaskStore::load(&kv).unwrap();

        first.create(NewTask::new("from first")).unwrap();
        second.reload().unwrap();
        second.create(NewTask::new("from second")).unwrap();

        let reopened = TaskStore::load(&kv).unwrap();
        let texts: Vec<&str> = reopened.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["from first", "from second"]);
    }
}
