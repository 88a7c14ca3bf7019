//! What a to-do list view displays, derived from the current tasks
//!
//! Nothing here is stored: a board is recomputed from the task list every time it is needed.

use crate::task::Task;
use crate::utils::comparison::compare_tasks_by_priority;

/// Tasks split by status, each list sorted by decreasing priority
#[derive(Clone, Debug, PartialEq)]
pub struct TaskBoard<'a> {
    pending: Vec<&'a Task>,
    completed: Vec<&'a Task>,
}

impl<'a> TaskBoard<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        let (mut completed, mut pending): (Vec<&Task>, Vec<&Task>) = tasks.iter()
            .partition(|task| task.completed());

        // Stable sorts: tasks with equal priorities keep their fetch order
        pending.sort_by(compare_tasks_by_priority);
        completed.sort_by(compare_tasks_by_priority);

        Self { pending, completed }
    }

    pub fn pending(&self) -> &[&'a Task]   { &self.pending   }
    pub fn completed(&self) -> &[&'a Task] { &self.completed }

    pub fn total(&self) -> usize {
        self.pending.len() + self.completed.len()
    }

    /// Share of completed tasks, between 0 and 100. An empty board is 0% complete
    pub fn completion_percentage(&self) -> f64 {
        completion_percentage(self.completed.len(), self.total())
    }

    /// The completion percentage, rounded to two decimals (e.g. `33.33`)
    pub fn completion_label(&self) -> String {
        format!("{:.2}", self.completion_percentage())
    }
}

/// `completed / total * 100`, or 0 when there is nothing to complete
pub fn completion_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}
