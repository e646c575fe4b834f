//! Re-entrancy detection for service construction.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::error::{ContainerError, ContainerResult};

const MAX_DEPTH: usize = 1024;

/// Ids currently being built, per thread.
///
/// A service requested again while it is still being built on the same
/// thread is a dependency cycle. Other threads building the same id are not.
#[derive(Debug, Default)]
pub(crate) struct LoadingStack {
    stacks: Mutex<HashMap<ThreadId, Vec<String>>>,
}

impl LoadingStack {
    /// Pushes `id`; the returned guard pops it again.
    pub(crate) fn enter(&self, id: &str) -> ContainerResult<LoadingGuard<'_>> {
        let thread = thread::current().id();
        let mut stacks = self.stacks.lock();
        let stack = stacks.entry(thread).or_default();

        if stack.iter().any(|loading| loading == id) {
            let mut path = stack.clone();
            path.push(id.to_string());
            return Err(ContainerError::Circular(path));
        }

        if stack.len() >= MAX_DEPTH {
            return Err(ContainerError::Runtime(format!(
                "Maximum resolution depth of {} exceeded while building [{}].",
                MAX_DEPTH, id
            )));
        }

        stack.push(id.to_string());
        Ok(LoadingGuard { owner: self, thread })
    }

    /// Ids being built on the current thread, outermost first.
    pub(crate) fn current(&self) -> Vec<String> {
        self.stacks
            .lock()
            .get(&thread::current().id())
            .cloned()
            .unwrap_or_default()
    }
}

pub(crate) struct LoadingGuard<'a> {
    owner: &'a LoadingStack,
    thread: ThreadId,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut stacks = self.owner.stacks.lock();
        if let Some(stack) = stacks.get_mut(&self.thread) {
            stack.pop();
            if stack.is_empty() {
                stacks.remove(&self.thread);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentry_is_circular() {
        let loading = LoadingStack::default();
        let _a = loading.enter("a").unwrap();
        let _b = loading.enter("b").unwrap();

        assert_eq!(
            loading.enter("a").err(),
            Some(ContainerError::Circular(vec!["a".into(), "b".into(), "a".into()]))
        );
        assert_eq!(loading.current(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_guard_pops_on_drop() {
        let loading = LoadingStack::default();
        {
            let _guard = loading.enter("a").unwrap();
        }
        assert!(loading.current().is_empty());
        assert!(loading.enter("a").is_ok());
    }

    #[test]
    fn test_other_threads_are_independent() {
        let loading = LoadingStack::default();
        let _guard = loading.enter("a").unwrap();

        thread::scope(|scope| {
            scope.spawn(|| {
                assert!(loading.enter("a").is_ok());
            });
        });
    }
}
