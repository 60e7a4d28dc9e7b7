//! The in-memory task collection of a session

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::id::TaskId;
use crate::task::{Task, TaskDraft};

/// Counters displayed next to the task list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

/// Display order: uncompleted tasks first, then by date, then most pressing priority first.
/// Ties keep their relative order.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.completed().cmp(&b.completed())
        .then_with(|| a.date().cmp(&b.date()))
        .then_with(|| a.priority().rank().cmp(&b.priority().rank()))
}

/// Sort tasks in display order. See [`compare_tasks`]
pub fn sort_tasks<T: AsRef<Task>>(tasks: &mut [T]) {
    tasks.sort_by(|a, b| compare_tasks(a.as_ref(), b.as_ref()));
}

impl AsRef<Task> for Task {
    fn as_ref(&self) -> &Task {
        self
    }
}


/// The ordered list of a user's tasks, i.e. the unit that is persisted remotely
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id() == id)
    }

    /// Replace the whole content, e.g. with a snapshot received from the remote store
    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Append a new uncompleted task, with a fresh id. Returns the created task
    pub fn create(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> &Task {
        let mut id = TaskId::random();
        while self.position(&id).is_some() {
            id = TaskId::random();
        }
        log::debug!("Creating task {} ({:?})", id, draft.title);
        self.tasks.push(Task::new(id, draft, now));
        let last = self.tasks.len() - 1;
        &self.tasks[last]
    }

    /// Replace the editable fields of a task. Returns false (and does nothing) if `id` is unknown
    pub fn update(&mut self, id: &TaskId, draft: TaskDraft) -> bool {
        match self.tasks.iter_mut().find(|t| t.id() == id) {
            None => {
                log::debug!("No task {} to update", id);
                false
            },
            Some(task) => {
                task.apply_draft(draft);
                true
            },
        }
    }

    /// Remove a task. Returns false if there was no such task
    pub fn delete(&mut self, id: &TaskId) -> bool {
        match self.position(id) {
            None => {
                log::debug!("No task {} to delete", id);
                false
            },
            Some(index) => {
                self.tasks.remove(index);
                true
            },
        }
    }

    /// Flip the completion status of a task. Returns false (and does nothing) if `id` is unknown
    pub fn toggle_complete(&mut self, id: &TaskId, now: DateTime<Utc>) -> bool {
        match self.tasks.iter_mut().find(|t| t.id() == id) {
            None => {
                log::debug!("No task {} to toggle", id);
                false
            },
            Some(task) => {
                task.toggle_completion(now);
                true
            },
        }
    }

    /// The tasks of a view, in the collection order
    pub fn filter(&self, category: Category, today: NaiveDate) -> Vec<&Task> {
        category.filter(&self.tasks, today)
    }

    /// The tasks of a view, in display order
    pub fn view(&self, category: Category, today: NaiveDate) -> Vec<Task> {
        let mut shown: Vec<Task> = self.filter(category, today).into_iter().cloned().collect();
        sort_tasks(&mut shown);
        shown
    }

    pub fn stats(&self) -> Stats {
        let total = self.tasks.len();
        let completed = self.tasks.iter().filter(|t| t.completed()).count();
        Stats {
            total,
            completed,
            pending: total - completed,
        }
    }
}

impl From<Vec<Task>> for TaskList {
    fn from(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::task::Priority;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd(2024, 5, d)
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.ymd(2024, 5, 1).and_hms(8, 0, 0) + Duration::minutes(minutes)
    }

    fn draft(title: &str, date: NaiveDate, priority: Priority) -> TaskDraft {
        TaskDraft::new(title, date).with_priority(priority)
    }

    #[test]
    fn completed_tasks_sink() {
        let mut list = TaskList::new();
        let first = list.create(draft("early but done", day(1), Priority::Urgent), at(0)).id().clone();
        list.create(draft("late", day(30), Priority::Low), at(1));
        list.toggle_complete(&first, at(2));

        let shown = list.view(Category::All, day(1));
        let titles: Vec<&str> = shown.iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["late", "early but done"]);
    }

    #[test]
    fn date_then_priority() {
        let mut list = TaskList::new();
        list.create(draft("low", day(3), Priority::Low), at(0));
        list.create(draft("medium", day(2), Priority::Medium), at(1));
        list.create(draft("urgent", day(3), Priority::Urgent), at(2));
        list.create(draft("high", day(3), Priority::High), at(3));

        let shown = list.view(Category::All, day(1));
        let titles: Vec<&str> = shown.iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["medium", "urgent", "high", "low"]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut list = TaskList::new();
        list.create(draft("a", day(3), Priority::Low), at(0));
        list.create(draft("b", day(3), Priority::Low), at(1));
        list.create(draft("c", day(3), Priority::Low), at(2));
        let shown = list.view(Category::All, day(1));
        let titles: Vec<&str> = shown.iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn lookup_misses_change_nothing() {
        let mut list = TaskList::new();
        list.create(draft("a", day(3), Priority::Low), at(0));
        let before = list.clone();

        let ghost = TaskId::from("ghost");
        assert!(list.update(&ghost, draft("b", day(4), Priority::High)) == false);
        assert!(list.toggle_complete(&ghost, at(1)) == false);
        assert!(list.delete(&ghost) == false);
        assert_eq!(list, before);
    }

    #[test]
    fn update_keeps_identity() {
        let mut list = TaskList::new();
        list.create(draft("a", day(3), Priority::Low), at(0));
        let id = list.create(draft("b", day(3), Priority::Low), at(5)).id().clone();

        assert!(list.update(&id, draft("b2", day(9), Priority::Urgent)));
        let task = list.get(&id).unwrap();
        assert_eq!(task.title(), "b2");
        assert_eq!(task.created_at(), &at(5));
        // still at the same position
        assert_eq!(list.tasks()[1].id(), &id);
    }

    #[test]
    fn creation_dates_follow_creation_order() {
        let mut list = TaskList::new();
        for i in 0..5 {
            list.create(draft(&format!("t{}", i), day(3), Priority::Low), at(i));
        }
        for pair in list.tasks().windows(2) {
            assert!(pair[0].created_at() <= pair[1].created_at());
        }
    }

    #[test]
    fn stats_add_up() {
        let mut list = TaskList::new();
        assert_eq!(list.stats(), Stats::default());

        let a = list.create(draft("a", day(3), Priority::Low), at(0)).id().clone();
        list.create(draft("b", day(3), Priority::Low), at(1));
        list.create(draft("c", day(3), Priority::Low), at(2));
        list.toggle_complete(&a, at(3));

        let stats = list.stats();
        assert_eq!(stats, Stats { total: 3, completed: 1, pending: 2 });
        list.delete(&a);
        let stats = list.stats();
        assert_eq!(stats.total, stats.completed + stats.pending);
    }
}
