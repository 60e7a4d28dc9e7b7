//! What the user sees of a task collection

use chrono::NaiveDate;

use crate::calendar_export::{self, CalendarSyncOutcome};
use crate::category::Category;
use crate::collection::{Stats, TaskList};
use crate::task::Task;

/// A rendered state of a collection, as published by a [`Controller`](crate::controller::Controller)
#[derive(Clone, Debug, PartialEq)]
pub struct Board {
    /// The selected view
    pub category: Category,
    /// The heading of the selected view
    pub title: &'static str,
    /// The tasks of the selected view, in display order
    pub visible: Vec<Task>,
    /// Every task, in collection order
    pub collection: Vec<Task>,
    pub stats: Stats,
    /// The day the view has been computed for
    pub today: NaiveDate,
}

impl Board {
    pub fn render(tasks: &TaskList, category: Category, today: NaiveDate) -> Self {
        Self {
            category,
            title: category.title(),
            visible: tasks.view(category, today),
            collection: tasks.tasks().to_vec(),
            stats: tasks.stats(),
            today,
        }
    }

    /// Whether the selected view has nothing to show
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// The task of the collection at a given position in the view, starting from 1
    pub fn visible_task(&self, number: usize) -> Option<&Task> {
        number.checked_sub(1).and_then(|index| self.visible.get(index))
    }

    /// What an export to an external calendar would do right now
    pub fn calendar_sync(&self) -> CalendarSyncOutcome {
        calendar_export::calendar_sync(&self.collection)
    }
}
