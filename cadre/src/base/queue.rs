use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

/// A double-ended queue shared between producers and pool workers.
///
/// Every operation takes the single internal lock for the duration of one
/// push, pop or length read; callers never hold it across task execution.
///
/// # Thread Safety
/// - Safe for any number of concurrent producers and consumers
/// - Never held together with a pool's registry lock
pub struct ConcurrentQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> ConcurrentQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Inserts an element at the head.
    pub fn push_front(&self, element: T) {
        self.inner.lock().push_front(element);
    }

    /// Appends an element at the tail.
    pub fn push_back(&self, element: T) {
        self.inner.lock().push_back(element);
    }

    /// Removes the head element, if any.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Snapshot of the number of queued elements.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Removes every queued element, returning them in queue order.
    pub fn drain(&self) -> Vec<T> {
        self.inner.lock().drain(..).collect()
    }
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ConcurrentQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentQueue")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn front_and_back_placement() {
        let queue = ConcurrentQueue::new();
        queue.push_back(2);
        queue.push_back(3);
        queue.push_front(1);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_empties_in_order() {
        let queue = ConcurrentQueue::new();
        for i in 0..5 {
            queue.push_back(i);
        }
        assert_eq!(queue.drain(), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_producers_and_consumers_lose_nothing() {
        let queue = Arc::new(ConcurrentQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        if i % 2 == 0 {
                            queue.push_back(p * 1000 + i);
                        } else {
                            queue.push_front(p * 1000 + i);
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut taken = 0;
                    while queue.try_pop().is_some() {
                        taken += 1;
                    }
                    taken
                })
            })
            .collect();
        let total: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
        assert_eq!(total, 1000);
    }
}
