//! Post-processor hooks: ordering, chain termination, replacement and
//! property contributions.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{entries, log, tracked, Log, Node};
use ferrous_beans::{
    Bean, BeanContainer, BeanDefinition, BeanPostProcessor, BeanType, BoxError, ContainerAware,
    ContainerError, ContainerResult, ContainerSettings, InstantiationAwareBeanPostProcessor,
    Object, PropertyValue, PropertyValues, Value, WeakBeanContainer,
};
use parking_lot::Mutex;

/// Logs both initialization hooks under a label.
struct Labelled {
    label: &'static str,
    log: Log,
    stop_after: bool,
}

impl Labelled {
    fn new(label: &'static str, log: &Log) -> Self {
        Labelled {
            label,
            log: log.clone(),
            stop_after: false,
        }
    }
}

impl BeanPostProcessor for Labelled {
    fn post_process_before_initialization(
        &self,
        bean: Object,
        name: &str,
        _container: &BeanContainer,
    ) -> ContainerResult<Option<Object>> {
        self.log.lock().push(format!("{} before {}", self.label, name));
        Ok(Some(bean))
    }

    fn post_process_after_initialization(
        &self,
        bean: Object,
        name: &str,
        _container: &BeanContainer,
    ) -> ContainerResult<Option<Object>> {
        self.log.lock().push(format!("{} after {}", self.label, name));
        if self.stop_after {
            return Ok(None);
        }
        Ok(Some(bean))
    }
}

#[test]
fn test_hooks_wrap_init_callbacks_in_registration_order() {
    let events = log();
    let container = BeanContainer::new();
    container.add_post_processor(Arc::new(Labelled::new("p1", &events)));
    container.add_post_processor(Arc::new(Labelled::new("p2", &events)));
    container.register_definition(
        "svc",
        BeanDefinition::new(tracked(&events)).init_method("start"),
    );

    container.resolve("svc").unwrap();
    assert_eq!(
        entries(&events),
        vec![
            "p1 before svc",
            "p2 before svc",
            "init:svc",
            "start:svc",
            "p1 after svc",
            "p2 after svc",
        ]
    );
}

#[test]
fn test_none_ends_the_chain_and_keeps_the_last_object() {
    let events = log();
    let container = BeanContainer::new();
    container.add_post_processor(Arc::new(Labelled {
        stop_after: true,
        ..Labelled::new("stopper", &events)
    }));
    container.add_post_processor(Arc::new(Labelled::new("skipped", &events)));
    container.register_definition("node", BeanDefinition::new(BeanType::of::<Node>()));

    let node = container.resolve("node").unwrap();
    assert!(node.is::<Node>());
    assert_eq!(
        entries(&events),
        vec![
            "stopper before node",
            "skipped before node",
            "stopper after node",
        ]
    );
}

#[test]
fn test_re_adding_a_processor_moves_it_to_the_end() {
    let events = log();
    let container = BeanContainer::with_settings(ContainerSettings {
        annotation_injection: false,
        ..ContainerSettings::default()
    });
    let first: Arc<dyn BeanPostProcessor> = Arc::new(Labelled::new("first", &events));
    container.add_post_processor(first.clone());
    container.add_post_processor(Arc::new(Labelled::new("second", &events)));
    container.add_post_processor(first);
    assert_eq!(container.post_processor_count(), 2);

    container.register_definition("node", BeanDefinition::new(BeanType::of::<Node>()));
    container.resolve("node").unwrap();
    assert_eq!(
        entries(&events)[..2],
        ["second before node".to_string(), "first before node".to_string()]
    );
}

struct Wrapper(Object);
impl Bean for Wrapper {}

/// Replaces `target` before its init hooks run.
struct ReplaceBefore;

impl BeanPostProcessor for ReplaceBefore {
    fn post_process_before_initialization(
        &self,
        bean: Object,
        name: &str,
        _container: &BeanContainer,
    ) -> ContainerResult<Option<Object>> {
        if name == "target" {
            return Ok(Some(Arc::new(Wrapper(bean))));
        }
        Ok(Some(bean))
    }
}

#[test]
fn test_replacement_flows_into_cache_and_dependents() {
    let container = BeanContainer::new();
    container.add_post_processor(Arc::new(ReplaceBefore));
    container.register_definition("target", BeanDefinition::new(BeanType::of::<Node>()));
    container.register_definition(
        "user",
        BeanDefinition::new(BeanType::of::<Node>()).reference("target", "target"),
    );

    let user = container.get::<Node>("user").unwrap();
    let held = user.object("target").unwrap();
    assert!(held.is::<Wrapper>());
    assert!(Arc::ptr_eq(&held, &container.resolve("target").unwrap()));
    assert!(held.downcast_ref::<Wrapper>().unwrap().0.is::<Node>());
}

struct Failing;

impl BeanPostProcessor for Failing {
    fn post_process_after_initialization(
        &self,
        _bean: Object,
        _name: &str,
        _container: &BeanContainer,
    ) -> ContainerResult<Option<Object>> {
        Err(ContainerError::callback("processor exploded"))
    }
}

#[test]
fn test_processor_failure_fails_the_creation() {
    let container = BeanContainer::new();
    container.add_post_processor(Arc::new(Failing));
    container.register_definition("node", BeanDefinition::new(BeanType::of::<Node>()));

    match container.resolve("node") {
        Err(ContainerError::ConstructionFailed { name, source }) => {
            assert_eq!(name, "node");
            assert_eq!(source.to_string(), "processor exploded");
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
    assert!(!container.contains_singleton("node"));
}

/// Contributes a `stamp` literal to every bean.
#[derive(Default)]
struct Stamper {
    calls: AtomicUsize,
}

impl BeanPostProcessor for Stamper {
    fn as_instantiation_aware(&self) -> Option<&dyn InstantiationAwareBeanPostProcessor> {
        Some(self)
    }
}

impl InstantiationAwareBeanPostProcessor for Stamper {
    fn post_process_property_values(
        &self,
        _definition: &BeanDefinition,
        _bean: &Object,
        _name: &str,
        _container: &BeanContainer,
    ) -> ContainerResult<Option<PropertyValues>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as i64;
        let mut values = PropertyValues::new();
        values.add(PropertyValue::literal("stamp", call));
        Ok(Some(values))
    }
}

#[test]
fn test_property_contributions_merge_by_name() {
    let stamper = Arc::new(Stamper::default());
    let container = BeanContainer::new();
    container.add_post_processor(stamper.clone());
    // the injection processor runs first and contributes nothing
    assert_eq!(container.post_processor_count(), 2);
    container.register_definition(
        "proto",
        BeanDefinition::new(BeanType::of::<Node>())
            .prototype()
            .property("color", "red"),
    );

    for expected in 0..3 {
        let node = container.get::<Node>("proto").unwrap();
        assert_eq!(node.get("stamp"), Some(Value::Int(expected)));
        assert_eq!(node.get("color"), Some(Value::from("red")));
    }

    // repeated merges replace rather than append
    let definition = container.definition("proto").unwrap();
    assert_eq!(definition.property_values().len(), 2);
    assert_eq!(stamper.calls.load(Ordering::SeqCst), 3);
}

#[derive(Default)]
struct Registrar {
    container: Mutex<Option<WeakBeanContainer>>,
}

impl ContainerAware for Registrar {
    fn set_container(&self, container: &BeanContainer) -> Result<(), BoxError> {
        *self.container.lock() = Some(container.downgrade());
        Ok(())
    }
}

impl Bean for Registrar {
    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        Some(self)
    }
}

#[test]
fn test_container_aware_beans_receive_a_handle() {
    let container = BeanContainer::new();
    container.register_definition("node", BeanDefinition::new(BeanType::of::<Node>()));
    container.register_definition("registrar", BeanDefinition::new(BeanType::of::<Registrar>()));

    let registrar = container.get::<Registrar>("registrar").unwrap();
    let handle = registrar.container.lock().clone().unwrap();
    let upgraded = handle.upgrade().unwrap();
    assert!(upgraded.resolve("node").is_ok());

    drop(upgraded);
    drop(container);
    assert!(handle.upgrade().is_none());
}
