//! # Submission Modes
//!
//! A [`Submission`] selects where an entry lands in a pool's queue and carries
//! the work itself:
//!
//! - `Normal` appends to the tail; normal entries keep their relative order.
//! - `Urgent` prepends to the head, ahead of every entry present at insertion.
//! - `Sequence` bundles several steps into one tail entry. A single worker runs
//!   the steps back to back in the given order, with no other entry in between.
//!
//! ```rust
//! use cadre_api::submission::Submission;
//! use cadre_api::task::task;
//!
//! let normal = Submission::normal(|| println!("tail"));
//! let urgent = Submission::urgent(|| println!("head"));
//! let steps = Submission::sequence([
//!     task(|| println!("first")),
//!     task(|| println!("second")),
//! ]);
//! assert_eq!(steps.len(), 2);
//! # let _ = (normal, urgent);
//! ```

use std::fmt;

use crate::task::Task;

/// Queue placement for a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// Tail of the queue
    #[default]
    Normal,
    /// Head of the queue
    Urgent,
}

/// An entry submitted to a pool, tagged with its queueing discipline.
pub enum Submission {
    /// Appended to the tail
    Normal(Task),
    /// Prepended to the head
    Urgent(Task),
    /// Steps run consecutively by one worker, appended to the tail as one entry
    Sequence(Vec<Task>),
}

impl Submission {
    pub fn normal<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Submission::Normal(Box::new(f))
    }

    pub fn urgent<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Submission::Urgent(Box::new(f))
    }

    pub fn sequence<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = Task>,
    {
        Submission::Sequence(steps.into_iter().collect())
    }

    /// Wraps a single task with the given placement.
    pub fn with_priority(priority: Priority, task: Task) -> Self {
        match priority {
            Priority::Normal => Submission::Normal(task),
            Priority::Urgent => Submission::Urgent(task),
        }
    }

    /// Where this entry is placed in the queue.
    pub fn priority(&self) -> Priority {
        match self {
            Submission::Urgent(_) => Priority::Urgent,
            Submission::Normal(_) | Submission::Sequence(_) => Priority::Normal,
        }
    }

    /// Number of tasks carried by the entry.
    pub fn len(&self) -> usize {
        match self {
            Submission::Normal(_) | Submission::Urgent(_) => 1,
            Submission::Sequence(steps) => steps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the mode, used in logs.
    pub fn mode(&self) -> &'static str {
        match self {
            Submission::Normal(_) => "normal",
            Submission::Urgent(_) => "urgent",
            Submission::Sequence(_) => "sequence",
        }
    }
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("mode", &self.mode())
            .field("tasks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::task;

    #[test]
    fn placement_follows_mode() {
        assert_eq!(Submission::normal(|| {}).priority(), Priority::Normal);
        assert_eq!(Submission::urgent(|| {}).priority(), Priority::Urgent);
        assert_eq!(Submission::sequence(vec![task(|| {})]).priority(), Priority::Normal);
        assert_eq!(
            Submission::with_priority(Priority::Urgent, task(|| {})).mode(),
            "urgent"
        );
    }

    #[test]
    fn sequence_counts_steps() {
        let seq = Submission::sequence((0..3).map(|_| task(|| {})));
        assert_eq!(seq.len(), 3);
        assert!(!seq.is_empty());
        assert!(Submission::sequence(Vec::new()).is_empty());
        assert_eq!(format!("{:?}", seq), "Submission { mode: \"sequence\", tasks: 3 }");
    }
}
