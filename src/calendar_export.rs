//! Export of tasks to an external calendar
//!
//! Tasks can be flagged for export to Google Calendar. The export itself is not available yet: this only reports
//! what would be exported.

use std::fmt::{Display, Formatter};

use crate::task::Task;

/// What a calendar export did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalendarSyncOutcome {
    /// No pending task is flagged for export
    NothingToSync,
    /// Some tasks would be exported, but the export is not implemented
    NotImplemented { pending: usize },
}

impl Display for CalendarSyncOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarSyncOutcome::NothingToSync => write!(f, "No tasks marked for Google Calendar sync"),
            CalendarSyncOutcome::NotImplemented { pending } => write!(
                f, "Google Calendar sync would export {} task(s). This feature is not available yet", pending
            ),
        }
    }
}

/// The tasks an export would send: flagged and not completed
pub fn sync_candidates(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter()
        .filter(|t| t.sync_google() && t.completed() == false)
        .collect()
}

pub fn calendar_sync(tasks: &[Task]) -> CalendarSyncOutcome {
    let pending = sync_candidates(tasks).len();
    log::info!("{} task(s) to export to Google Calendar", pending);
    match pending {
        0 => CalendarSyncOutcome::NothingToSync,
        pending => CalendarSyncOutcome::NotImplemented { pending },
    }
}
