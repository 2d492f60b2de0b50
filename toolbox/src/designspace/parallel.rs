//! Worker-pool plumbing for design space sweeps.
//!
//! Work is a stack of case numbers behind one mutex; workers pop until the
//! stack drains. Each worker opens its own LP environment on entry and
//! keeps its results private, and the driver merges them after join, so
//! the only contention is the stack itself.

use crate::designspace::DesignSpace;
use crate::lp::LpEnvironment;
use crate::primitives::consts::WORK_STACK_CHUNK;
use std::sync::Mutex;

/// A shared stack of pending case numbers.
pub(crate) struct WorkStack {
    inner: Mutex<Vec<u64>>,
}

impl WorkStack {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_case_numbers(numbers: impl IntoIterator<Item = u64>) -> Self {
        let stack = Self::new();
        for number in numbers {
            stack.push(number);
        }
        stack
    }

    pub(crate) fn push(&self, number: u64) {
        let mut inner = self.inner.lock().unwrap();
        if inner.len() == inner.capacity() {
            inner.reserve(WORK_STACK_CHUNK);
        }
        inner.push(number);
    }

    pub(crate) fn pop(&self) -> Option<u64> {
        self.inner.lock().unwrap().pop()
    }
}

/// Runs `body` over every case number, parallel unless the design space is
/// serial. Each call may contribute any number of `(name, value)` pairs;
/// under the serial path their order follows the input order, under the
/// parallel path only the set is deterministic.
pub(crate) fn sweep<T, F>(ds: &DesignSpace, numbers: Vec<u64>, body: F) -> Vec<(String, T)>
where
    T: Send,
    F: Fn(&mut LpEnvironment, u64) -> Vec<(String, T)> + Sync,
{
    let serial = ds.serial() || cfg!(feature = "single-threaded");
    if serial {
        let mut env = LpEnvironment::new();
        return numbers
            .into_iter()
            .flat_map(|number| body(&mut env, number))
            .collect();
    }

    let workers = ds.opts().effective_workers().max(1);
    let stack = WorkStack::with_case_numbers(numbers);
    let mut merged = Vec::new();
    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let stack = &stack;
            let body = &body;
            handles.push(scope.spawn(move || {
                let mut env = LpEnvironment::new();
                let mut local = Vec::new();
                while let Some(number) = stack.pop() {
                    local.extend(body(&mut env, number));
                }
                local
            }));
        }
        for handle in handles {
            merged.extend(handle.join().expect("sweep worker panicked"));
        }
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_is_lifo() {
        let stack = WorkStack::with_case_numbers(1..=3);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        stack.push(9);
        assert_eq!(stack.pop(), Some(9));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
    }
}
