//! Deferred units of work and the boundary that runs them.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::errors::{TaskError, TaskResult};

/// An argument-less computation consumed exactly once by one worker.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Boxes a closure into a [`Task`].
pub fn task<F>(f: F) -> Task
where
    F: FnOnce() + Send + 'static,
{
    Box::new(f)
}

/// Runs `f`, converting a panic into [`TaskError::Panicked`].
pub fn run_guarded<F, R>(f: F) -> TaskResult<R>
where
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| TaskError::Panicked {
        message: panic_message(payload.as_ref()),
    })
}

/// Runs sequence steps back to back, stopping at the first one that panics.
pub fn run_steps(steps: Vec<Task>) -> TaskResult<()> {
    let total = steps.len();
    for (step, task) in steps.into_iter().enumerate() {
        if let Err(TaskError::Panicked { message }) = run_guarded(task) {
            tracing::debug!(step, skipped = total - step - 1, "Sequence step panicked");
            return Err(TaskError::StepPanicked { step, message });
        }
    }
    Ok(())
}

/// Renders a panic payload as text.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn guarded_run_returns_value() {
        assert_eq!(run_guarded(|| 21 * 2), Ok(42));
    }

    #[test]
    fn guarded_run_captures_panic_message() {
        let result: TaskResult<()> = run_guarded(|| panic!("boom {}", 7));
        assert_eq!(result, Err(TaskError::Panicked { message: "boom 7".to_string() }));

        let result: TaskResult<()> = run_guarded(|| panic!("static"));
        assert_eq!(result, Err(TaskError::Panicked { message: "static".to_string() }));
    }

    #[test]
    fn steps_stop_at_first_failure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let steps: Vec<Task> = (0..4)
            .map(|i| {
                let seen = seen.clone();
                task(move || {
                    if i == 2 {
                        panic!("step two");
                    }
                    seen.lock().unwrap().push(i);
                })
            })
            .collect();

        let result = run_steps(steps);
        assert_eq!(
            result,
            Err(TaskError::StepPanicked { step: 2, message: "step two".to_string() })
        );
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }
}
