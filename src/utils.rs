//! Console helpers, used by the `taskdeck` binary

use std::io::{stdout, Write};

use crate::collection::Stats;
use crate::controller::Board;
use crate::task::Task;

/// A debug utility that pretty-prints a board
pub fn print_board(board: &Board) {
    println!("{} ({})", board.title, board.today);
    if board.is_empty() {
        println!("    No tasks");
    }
    for (number, task) in board.visible.iter().enumerate() {
        print_task(number + 1, task);
    }
    print_stats(&board.stats);
}

pub fn print_task(number: usize, task: &Task) {
    let completion = if task.completed() { "✓" } else { " " };
    let time = match task.time() {
        None => String::new(),
        Some(time) => format!(" {}", time.format("%H:%M")),
    };
    let sync = if task.sync_google() { " [calendar]" } else { "" };
    println!("  {:>3}. [{}] {}{}\t{:<6}\t{}{}", number, completion, task.date(), time, task.priority().as_str(), task.title(), sync);
    if task.description().is_empty() == false {
        println!("            {}", task.description());
    }
}

pub fn print_stats(stats: &Stats) {
    println!("Total: {}  Completed: {}  Pending: {}", stats.total, stats.completed, stats.pending);
}

/// Print a question, without ending the line
pub fn prompt(question: &str) {
    print!("{}", question);
    let _ = stdout().flush();
}

/// Whether a console answer is a yes. Anything but an explicit yes is a no
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(is_yes("") == false);
        assert!(is_yes("no") == false);
    }
}
