//! Some utility functions, mostly to display tasks as text

use std::fmt::Write;

use crate::board::TaskBoard;
use crate::task::Task;

pub mod comparison;

/// The text of a task card: its fields, one per line
pub fn render_card(task: &Task) -> String {
    let mut card = String::new();
    let _ = writeln!(card, "{}", task.task());
    let _ = writeln!(card, "Status: {}", task.status());
    let _ = writeln!(card, "Priority: {}", task.priority());
    let _ = writeln!(card, "Due Date: {}", task.due_date());
    card
}

/// The progress line, then pending tasks, then completed tasks
pub fn render_board(board: &TaskBoard) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "completed {} %", board.completion_label());
    for task in board.pending() {
        let _ = writeln!(text, "  [ ] {} (priority {})\t{}", task.task(), task.priority(), task.id());
    }
    let _ = writeln!(text, "Completed Tasks");
    for task in board.completed() {
        let _ = writeln!(text, "  [✓] {} (priority {})\t{}", task.task(), task.priority(), task.id());
    }
    text
}

/// A debug utility that pretty-prints a board
pub fn print_board(board: &TaskBoard) {
    print!("{}", render_board(board));
}
