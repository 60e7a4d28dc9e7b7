//! Named views over a task collection

use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};

use crate::task::{Priority, Task};

/// Which tasks should be displayed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Tasks dated today
    Today,
    /// Tasks dated from today to a week from now, both included
    Week,
    /// Tasks dated in the current calendar month
    Month,
    /// Every task
    All,
    /// Completed tasks only
    Completed,
    /// High and urgent tasks
    Priority,
}

impl Default for Category {
    fn default() -> Self {
        Category::All
    }
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Today,
        Category::Week,
        Category::Month,
        Category::All,
        Category::Completed,
        Category::Priority,
    ];

    /// Parse a category name. Unknown names fall back to [`Category::All`]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "today" => Category::Today,
            "week" => Category::Week,
            "month" => Category::Month,
            "completed" => Category::Completed,
            "priority" => Category::Priority,
            "all" => Category::All,
            other => {
                log::debug!("Unknown category {:?}, showing every task", other);
                Category::All
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::Today => "today",
            Category::Week => "week",
            Category::Month => "month",
            Category::All => "all",
            Category::Completed => "completed",
            Category::Priority => "priority",
        }
    }

    /// The heading displayed above this view
    pub fn title(&self) -> &'static str {
        match self {
            Category::Today => "Today's Tasks",
            Category::Week => "This Week's Tasks",
            Category::Month => "This Month's Tasks",
            Category::All => "All Tasks",
            Category::Completed => "Completed Tasks",
            Category::Priority => "Priority Tasks",
        }
    }

    /// Whether `task` belongs to this view, `today` being the current calendar day
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        match self {
            Category::Today => task.date() == today,
            Category::Week => task.date() >= today && task.date() <= today + Duration::days(7),
            Category::Month => task.date().year() == today.year() && task.date().month() == today.month(),
            Category::Completed => task.completed(),
            Category::Priority => matches!(task.priority(), Priority::High | Priority::Urgent),
            Category::All => true,
        }
    }

    /// Keep the tasks of this view, in their original order
    pub fn filter<'a, I>(&self, tasks: I, today: NaiveDate) -> Vec<&'a Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        tasks.into_iter()
            .filter(|task| self.matches(task, today))
            .collect()
    }
}

impl FromStr for Category {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
