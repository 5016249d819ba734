//! Internal disposal bag for shutdown-time destroy hooks.

use tracing::trace;

use crate::error::{ContainerError, ContainerResult, InvocationError};
use crate::traits::Object;

/// Runs the destroy capability and the named destroy method of one bean.
pub(crate) struct DisposableBeanAdapter {
    name: String,
    bean: Object,
    destroy_method: Option<String>,
}

impl DisposableBeanAdapter {
    /// Adapter for `bean`, or `None` if it has nothing to run at shutdown.
    pub(crate) fn for_bean(name: &str, bean: Object, destroy_method: Option<&str>) -> Option<Self> {
        if bean.as_disposable().is_none() && destroy_method.is_none() {
            return None;
        }
        Some(DisposableBeanAdapter {
            name: name.to_string(),
            bean,
            destroy_method: destroy_method.map(str::to_string),
        })
    }

    pub(crate) fn destroy(&self) -> ContainerResult<()> {
        let disposable = self.bean.as_disposable();
        if let Some(disposable) = disposable {
            disposable.destroy().map_err(ContainerError::Callback)?;
        }

        let method = match &self.destroy_method {
            Some(method) => method,
            None => return Ok(()),
        };
        // A method named "destroy" on a disposable bean already ran above.
        if disposable.is_some() && method == "destroy" {
            return Ok(());
        }
        match self.bean.invoke(method, &[]) {
            Ok(_) => Ok(()),
            Err(InvocationError::NoSuchMethod { .. }) => Err(ContainerError::NoSuchDestroyMethod {
                name: self.name.clone(),
                method: method.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}

/// Disposers in registration order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    entries: Vec<DisposableBeanAdapter>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, adapter: DisposableBeanAdapter) {
        self.entries.push(adapter);
    }

    /// Drops the disposer of `name` without running it.
    pub(crate) fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|adapter| adapter.name != name);
        self.entries.len() != before
    }

    /// Runs every disposer once, in registration order, without stopping at
    /// failures. Returns each bean's outcome.
    pub(crate) fn run_all_in_order(self) -> Vec<(String, ContainerResult<()>)> {
        self.entries
            .into_iter()
            .map(|adapter| {
                trace!(bean = %adapter.name, "running disposer");
                let outcome = adapter.destroy();
                (adapter.name, outcome)
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
