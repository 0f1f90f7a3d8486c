use parking_lot::{Condvar, MutexGuard};

/// Counters of one quiescence phase, stored inside the state the
/// participants' lock protects.
#[derive(Debug, Default)]
pub(crate) struct Phase {
    open: bool,
    idle: usize,
    generation: u64,
}

impl Phase {
    /// Whether a caller is waiting for every participant to go idle.
    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.open
    }

    /// Identifies the open phase, if any. A participant may only arrive in a
    /// phase whose ticket it held before its last empty poll.
    pub(crate) fn ticket(&self) -> Option<u64> {
        self.open.then_some(self.generation)
    }

    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.idle
    }
}

/// Lock-protected state that takes part in a [`Rendezvous`].
pub(crate) trait Participants {
    /// How many participants must report idle to complete the phase.
    fn participants(&self) -> usize;

    fn phase(&mut self) -> &mut Phase;
}

/// A phased barrier whose participant count may change while a phase is open.
///
/// Participants report idle with [`arrive`](Self::arrive) and stay parked
/// until the phase closes. A caller opens a phase with
/// [`quiesce`](Self::quiesce), which returns once the idle count reaches the
/// *current* participant count, then releases everyone at once. A participant
/// that leaves mid-phase must call [`departed`](Self::departed) so the waiter
/// re-checks against the smaller count.
#[derive(Debug, Default)]
pub(crate) struct Rendezvous {
    arrivals: Condvar,
    release: Condvar,
}

impl Rendezvous {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reports idle and parks until the open phase closes.
    pub(crate) fn arrive<T: Participants>(&self, guard: &mut MutexGuard<'_, T>) {
        let generation = {
            let phase = guard.phase();
            phase.idle += 1;
            phase.generation
        };
        self.arrivals.notify_all();
        while guard.phase().generation == generation {
            self.release.wait(guard);
        }
    }

    /// Opens a phase (or joins the one already open) and blocks until every
    /// participant has arrived, then closes it and releases them.
    pub(crate) fn quiesce<T: Participants>(&self, guard: &mut MutexGuard<'_, T>) {
        let generation = {
            let phase = guard.phase();
            phase.open = true;
            phase.generation
        };
        loop {
            if guard.phase().generation != generation {
                // Another waiter closed this phase.
                return;
            }
            let idle = guard.phase().idle;
            if idle >= guard.participants() {
                break;
            }
            self.arrivals.wait(guard);
        }

        let phase = guard.phase();
        phase.open = false;
        phase.idle = 0;
        phase.generation = phase.generation.wrapping_add(1);
        self.release.notify_all();
    }

    /// Wakes waiters after the participant count dropped.
    pub(crate) fn departed(&self) {
        self.arrivals.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Group {
        members: usize,
        phase: Phase,
    }

    impl Participants for Group {
        fn participants(&self) -> usize {
            self.members
        }

        fn phase(&mut self) -> &mut Phase {
            &mut self.phase
        }
    }

    struct Shared {
        state: Mutex<Group>,
        rendezvous: Rendezvous,
    }

    fn shared(members: usize) -> Arc<Shared> {
        Arc::new(Shared {
            state: Mutex::new(Group { members, ..Default::default() }),
            rendezvous: Rendezvous::new(),
        })
    }

    /// Member loop: arrive whenever a phase is open, leave when `leave` says so.
    fn member(shared: Arc<Shared>, released: Arc<AtomicUsize>, leave: bool) {
        loop {
            let mut state = shared.state.lock();
            if state.phase.is_open() {
                if leave {
                    state.members -= 1;
                    drop(state);
                    shared.rendezvous.departed();
                    return;
                }
                shared.rendezvous.arrive(&mut state);
                released.fetch_add(1, Ordering::SeqCst);
                return;
            }
            drop(state);
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn empty_group_completes_immediately() {
        let shared = shared(0);
        let mut state = shared.state.lock();
        shared.rendezvous.quiesce(&mut state);
        assert!(!state.phase.is_open());
        assert_eq!(state.phase.idle(), 0);
    }

    #[test]
    fn releases_all_members_together() {
        let shared = shared(3);
        let released = Arc::new(AtomicUsize::new(0));
        let members: Vec<_> = (0..3)
            .map(|_| {
                let (shared, released) = (shared.clone(), released.clone());
                thread::spawn(move || member(shared, released, false))
            })
            .collect();

        {
            let mut state = shared.state.lock();
            shared.rendezvous.quiesce(&mut state);
            assert_eq!(state.phase.idle(), 0);
        }
        for m in members {
            m.join().unwrap();
        }
        assert_eq!(released.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn departure_mid_phase_uses_updated_count() {
        let shared = shared(3);
        let released = Arc::new(AtomicUsize::new(0));
        let members: Vec<_> = [false, false, true]
            .into_iter()
            .map(|leave| {
                let (shared, released) = (shared.clone(), released.clone());
                thread::spawn(move || member(shared, released, leave))
            })
            .collect();

        {
            let mut state = shared.state.lock();
            shared.rendezvous.quiesce(&mut state);
            assert_eq!(state.members, 2);
        }
        for m in members {
            m.join().unwrap();
        }
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }
}
