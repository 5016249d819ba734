//! Thread-local creation stack for detecting cycles the singleton cache
//! cannot break.

use std::cell::RefCell;

use crate::error::{ContainerError, ContainerResult};

// Beans currently being built on this thread, tagged with their container.
thread_local! {
    static CREATION_TLS: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a bean as in creation on this thread; popped on drop.
pub(crate) struct CreationGuard {
    container: usize,
    name: String,
}

impl CreationGuard {
    /// Fails with `CircularReference` if `name` is already in creation for
    /// the same container on this thread, or `DepthExceeded` once
    /// `max_depth` beans are nested.
    pub(crate) fn enter(container: usize, name: &str, max_depth: usize) -> ContainerResult<Self> {
        CREATION_TLS.with(|tls| {
            let mut stack = tls.borrow_mut();

            if stack.iter().any(|(c, n)| *c == container && n == name) {
                let mut path: Vec<String> = stack
                    .iter()
                    .filter(|(c, _)| *c == container)
                    .map(|(_, n)| n.clone())
                    .skip_while(|n| n != name)
                    .collect();
                path.push(name.to_string());
                return Err(ContainerError::CircularReference { path });
            }

            if stack.iter().filter(|(c, _)| *c == container).count() >= max_depth {
                return Err(ContainerError::DepthExceeded(max_depth));
            }

            stack.push((container, name.to_string()));
            Ok(())
        })?;

        Ok(CreationGuard {
            container,
            name: name.to_string(),
        })
    }
}

impl Drop for CreationGuard {
    fn drop(&mut self) {
        CREATION_TLS.with(|tls| {
            let mut stack = tls.borrow_mut();
            if let Some(pos) = stack
                .iter()
                .rposition(|(c, n)| *c == self.container && *n == self.name)
            {
                stack.remove(pos);
            }
        });
    }
}

/// Names currently in creation for `container` on this thread, outermost first.
pub(crate) fn creation_path(container: usize) -> Vec<String> {
    CREATION_TLS.with(|tls| {
        tls.borrow()
            .iter()
            .filter(|(c, _)| *c == container)
            .map(|(_, n)| n.clone())
            .collect()
    })
}

/// The innermost bean in creation for `container` on this thread.
pub(crate) fn current_creation(container: usize) -> Option<String> {
    CREATION_TLS.with(|tls| {
        tls.borrow()
            .iter()
            .rev()
            .find(|(c, _)| *c == container)
            .map(|(_, n)| n.clone())
    })
}
