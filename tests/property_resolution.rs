//! Property-based tests over generated reference graphs.

mod common;

use std::sync::Arc;

use common::{entries, log, tracked, Node};
use ferrous_beans::{BeanContainer, BeanDefinition, BeanType};
use proptest::prelude::*;

const BEANS: usize = 8;

fn name(i: usize) -> String {
    format!("n{}", i)
}

proptest! {
    #[test]
    fn singleton_graphs_always_resolve(
        edges in prop::collection::vec((0..BEANS, 0..BEANS), 0..24),
        entry in 0..BEANS,
    ) {
        let container = BeanContainer::new();
        for i in 0..BEANS {
            let mut definition = BeanDefinition::new(BeanType::of::<Node>());
            for (_, to) in edges.iter().filter(|(from, _)| *from == i) {
                definition = definition.reference(format!("to_{}", to), name(*to));
            }
            container.register_definition(name(i), definition);
        }

        container.resolve(&name(entry)).unwrap();
        container.pre_instantiate_singletons().unwrap();

        // every held reference is the cached singleton
        for (from, to) in &edges {
            let held = container
                .get::<Node>(&name(*from))
                .unwrap()
                .object(&format!("to_{}", to))
                .unwrap();
            prop_assert!(Arc::ptr_eq(&held, &container.resolve(&name(*to)).unwrap()));
        }
        prop_assert_eq!(container.singletons().len(), BEANS);
        prop_assert!(container.validate().is_valid());
    }

    #[test]
    fn acyclic_chains_resolve_with_any_scope_mix(prototypes in prop::collection::vec(any::<bool>(), 1..30)) {
        let container = BeanContainer::new();
        let len = prototypes.len();
        for (i, prototype) in prototypes.iter().enumerate() {
            let mut definition = BeanDefinition::new(BeanType::of::<Node>());
            if *prototype {
                definition = definition.prototype();
            }
            if i + 1 < len {
                definition = definition.reference("next", name(i + 1));
            }
            container.register_definition(name(i), definition);
        }

        prop_assert!(container.validate().errors.is_empty());

        let mut current = container.get::<Node>(&name(0)).unwrap();
        let mut depth = 1;
        while let Some(next) = current.object("next") {
            current = next.downcast_arc::<Node>().map_err(|_| TestCaseError::fail("not a node"))?;
            depth += 1;
        }
        prop_assert_eq!(depth, len);

        let singletons = prototypes.iter().filter(|p| !**p).count();
        prop_assert_eq!(container.singletons().len(), singletons);
    }

    #[test]
    fn destroy_follows_completion_order(order in Just((0..BEANS).collect::<Vec<_>>()).prop_shuffle()) {
        let events = log();
        let container = BeanContainer::new();
        for i in 0..BEANS {
            container.register_definition(name(i), BeanDefinition::new(tracked(&events)));
        }
        for i in &order {
            container.resolve(&name(*i)).unwrap();
        }
        events.lock().clear();

        container.destroy_singletons().unwrap();
        let expected: Vec<String> = order.iter().map(|i| format!("destroy:{}", name(*i))).collect();
        prop_assert_eq!(entries(&events), expected);
    }
}
