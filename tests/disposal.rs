//! Shutdown: destroy hooks run once, in registration order, and a failing
//! hook does not stop the rest.

mod common;

use std::sync::Arc;

use common::{entries, failing_tracked, log, tracked, Node};
use ferrous_beans::{
    Bean, BeanContainer, BeanDefinition, BeanType, BoxError, ContainerAware, ContainerError,
    ContainerObserver, DisposableBean, MetricsObserver, WeakBeanContainer,
};
use parking_lot::Mutex;

#[derive(Default)]
struct DestroyRecorder {
    seen: Mutex<Vec<(String, bool)>>,
}

impl ContainerObserver for DestroyRecorder {
    fn destroyed(&self, name: &str, error: Option<&ContainerError>) {
        self.seen.lock().push((name.to_string(), error.is_some()));
    }
}

#[test]
fn test_destroy_in_registration_order() {
    let events = log();
    let container = BeanContainer::new();
    for name in ["first", "second", "third"] {
        container.register_definition(name, BeanDefinition::new(tracked(&events)));
    }
    container.pre_instantiate_singletons().unwrap();
    events.lock().clear();

    container.destroy_singletons().unwrap();
    assert_eq!(
        entries(&events),
        vec!["destroy:first", "destroy:second", "destroy:third"]
    );
}

#[test]
fn test_dependencies_complete_and_register_first() {
    let events = log();
    let container = BeanContainer::new();
    container.register_definition(
        "service",
        BeanDefinition::new(tracked(&events)).reference("repo", "repo"),
    );
    container.register_definition("repo", BeanDefinition::new(tracked(&events)));
    container.pre_instantiate_singletons().unwrap();
    events.lock().clear();

    container.destroy_singletons().unwrap();
    assert_eq!(entries(&events), vec!["destroy:repo", "destroy:service"]);
}

#[test]
fn test_failing_disposer_does_not_stop_the_others() {
    let events = log();
    let container = BeanContainer::new();
    let recorder = Arc::new(DestroyRecorder::default());
    container.add_observer(recorder.clone());

    container.register_definition("a", BeanDefinition::new(tracked(&events)));
    container.register_definition("b", BeanDefinition::new(failing_tracked(&events)));
    container.register_definition("c", BeanDefinition::new(tracked(&events)));
    container.pre_instantiate_singletons().unwrap();
    events.lock().clear();

    match container.destroy_singletons() {
        Err(ContainerError::DestroyFailed { failures }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "b");
            assert!(failures[0].1.to_string().contains("destroy refused"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(entries(&events), vec!["destroy:a", "destroy:b", "destroy:c"]);
    assert_eq!(
        *recorder.seen.lock(),
        vec![
            ("a".to_string(), false),
            ("b".to_string(), true),
            ("c".to_string(), false)
        ]
    );
}

#[test]
fn test_named_destroy_method_runs_after_the_capability() {
    let events = log();
    let container = BeanContainer::new();
    container.register_definition(
        "pool",
        BeanDefinition::new(tracked(&events)).destroy_method("close"),
    );
    container.resolve("pool").unwrap();
    events.lock().clear();

    container.destroy_singletons().unwrap();
    assert_eq!(entries(&events), vec!["destroy:pool", "close:pool"]);
}

#[test]
fn test_missing_destroy_method_is_reported() {
    let container = BeanContainer::new();
    container.register_definition(
        "node",
        BeanDefinition::new(BeanType::of::<Node>()).destroy_method("shutdown"),
    );
    container.resolve("node").unwrap();

    match container.destroy_singletons() {
        Err(ContainerError::DestroyFailed { failures }) => {
            assert!(matches!(
                &failures[0].1,
                ContainerError::NoSuchDestroyMethod { name, method } if name == "node" && method == "shutdown"
            ));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_prototypes_are_never_destroyed() {
    let events = log();
    let container = BeanContainer::new();
    container.register_definition("proto", BeanDefinition::new(tracked(&events)).prototype());
    container.resolve("proto").unwrap();
    container.resolve("proto").unwrap();
    events.lock().clear();

    container.destroy_singletons().unwrap();
    assert!(entries(&events).is_empty());
}

#[test]
fn test_destroy_runs_each_hook_once_and_clears_the_cache() {
    let events = log();
    let metrics = Arc::new(MetricsObserver::new());
    let container = BeanContainer::new();
    container.add_observer(metrics.clone());
    container.register_definition("svc", BeanDefinition::new(tracked(&events)));

    let before = container.resolve("svc").unwrap();
    container.destroy_singletons().unwrap();
    container.destroy_singletons().unwrap();

    assert_eq!(metrics.destruction_count(), 1);
    assert!(!container.contains_singleton("svc"));
    assert!(container.singletons().is_empty());

    // the definition survives; a new instance is built on demand
    let after = container.resolve("svc").unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    container.destroy_singletons().unwrap();
    assert_eq!(metrics.destruction_count(), 2);
}

#[test]
fn test_registered_singletons_are_released_without_hooks() {
    let events = log();
    let container = BeanContainer::new();
    let object = Arc::new(common::Tracked::new(events.clone(), false));
    container.register_singleton("manual", object).unwrap();

    container.destroy_singletons().unwrap();
    assert!(entries(&events).is_empty());
    assert!(!container.contains_bean("manual"));
}

/// Looks itself up in the container while its destroy hook runs.
#[derive(Default)]
struct SelfChecking {
    container: Mutex<Option<WeakBeanContainer>>,
    cached_during_destroy: Mutex<Option<bool>>,
}

impl ContainerAware for SelfChecking {
    fn set_container(&self, container: &BeanContainer) -> Result<(), BoxError> {
        *self.container.lock() = Some(container.downgrade());
        Ok(())
    }
}

impl DisposableBean for SelfChecking {
    fn destroy(&self) -> Result<(), BoxError> {
        let container = self.container.lock().as_ref().and_then(WeakBeanContainer::upgrade);
        *self.cached_during_destroy.lock() = container.map(|c| c.contains_singleton("checker"));
        Ok(())
    }
}

impl Bean for SelfChecking {
    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        Some(self)
    }

    fn as_disposable(&self) -> Option<&dyn DisposableBean> {
        Some(self)
    }
}

#[test]
fn test_beans_are_unpublished_before_hooks_run() {
    let container = BeanContainer::new();
    container.register_definition("checker", BeanDefinition::new(BeanType::of::<SelfChecking>()));
    let checker = container.get::<SelfChecking>("checker").unwrap();

    container.destroy_singletons().unwrap();
    assert_eq!(*checker.cached_during_destroy.lock(), Some(false));
}
