use std::sync::{Arc, Mutex};
use std::thread;

use cadre_api::{completion, run_guarded, run_steps, task, Priority, Submission, Task, TaskError};

/// Minimal executor: runs a submission inline the way a worker would.
fn execute(submission: Submission) -> Result<(), TaskError> {
    match submission {
        Submission::Normal(t) | Submission::Urgent(t) => run_guarded(t),
        Submission::Sequence(steps) => run_steps(steps),
    }
}

#[test]
fn test_priority_selects_variant() {
    let urgent = Submission::with_priority(Priority::Urgent, task(|| {}));
    assert_eq!(urgent.priority(), Priority::Urgent);
    assert_eq!(urgent.mode(), "urgent");

    let normal = Submission::with_priority(Priority::default(), task(|| {}));
    assert_eq!(normal.priority(), Priority::Normal);
    assert_eq!(normal.len(), 1);
}

#[test]
fn test_sequence_executes_in_given_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let steps: Vec<Task> = ["fetch", "parse", "store"]
        .into_iter()
        .map(|name| {
            let log = log.clone();
            task(move || log.lock().unwrap().push(name))
        })
        .collect();

    let sequence = Submission::sequence(steps);
    assert_eq!(sequence.mode(), "sequence");
    assert_eq!(sequence.priority(), Priority::Normal);
    assert_eq!(execute(sequence), Ok(()));
    assert_eq!(*log.lock().unwrap(), vec!["fetch", "parse", "store"]);
}

#[test]
fn test_empty_sequence_succeeds() {
    let sequence = Submission::sequence(Vec::new());
    assert!(sequence.is_empty());
    assert_eq!(execute(sequence), Ok(()));
}

#[test]
fn test_handle_crosses_threads() {
    let (completer, handle) = completion::<String>();
    let worker = thread::spawn(move || {
        let result = run_guarded(|| "computed".to_string());
        completer.complete(result)
    });

    assert_eq!(handle.wait(), Ok("computed".to_string()));
    assert!(worker.join().unwrap());
}

#[test]
fn test_completer_notices_dropped_handle() {
    let (completer, handle) = completion::<u8>();
    assert!(completer.is_wanted());
    drop(handle);
    assert!(!completer.is_wanted());
    assert!(!completer.complete(Ok(1)));
}

#[tokio::test]
async fn test_handle_is_awaitable() {
    let (completer, handle) = completion::<u32>();
    let _ = tokio::task::spawn_blocking(move || completer.complete(Ok(99)));
    assert_eq!(handle.await, Ok(99));
}
