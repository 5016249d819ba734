#![no_main]

use std::collections::HashMap;

use ferrous_beans::{
    Bean, BeanContainer, BeanDefinition, BeanType, ContainerError, ContainerSettings,
    InvocationError, Value,
};
use libfuzzer_sys::fuzz_target;
use parking_lot::Mutex;

#[derive(Default)]
struct Node {
    props: Mutex<HashMap<String, Value>>,
}

impl Bean for Node {
    fn set_property(&self, name: &str, value: Value) -> Result<(), InvocationError> {
        self.props.lock().insert(name.to_string(), value);
        Ok(())
    }
}

const BEANS: usize = 6;

// Each byte describes one definition: bits 0-2 pick a reference target
// (values >= BEANS mean "none"), bit 3 makes it a prototype, bit 4 lazy,
// bit 5 references a bean that does not exist.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let allow_circular = data[0] & 0x80 == 0;
    let container = BeanContainer::with_settings(ContainerSettings {
        allow_circular_references: allow_circular,
        max_creation_depth: 64,
        ..ContainerSettings::default()
    });

    for (i, byte) in data.iter().take(BEANS).enumerate() {
        let mut definition = BeanDefinition::new(BeanType::of::<Node>());
        let target = (byte & 0x07) as usize;
        if target < BEANS {
            definition = definition.reference("next", format!("n{}", target));
        }
        if byte & 0x08 != 0 {
            definition = definition.prototype();
        }
        if byte & 0x10 != 0 {
            definition = definition.lazy();
        }
        if byte & 0x20 != 0 {
            definition = definition.reference("ghost", "missing");
        }
        container.register_definition(format!("n{}", i), definition);
    }

    let report = container.validate();

    for i in 0..BEANS {
        match container.resolve(&format!("n{}", i)) {
            Ok(_) | Err(ContainerError::DefinitionNotFound(_)) => {}
            Err(error) => match error.root_cause() {
                ContainerError::DefinitionNotFound(_)
                | ContainerError::CircularReference { .. }
                | ContainerError::DepthExceeded(_) => assert!(!report.is_valid()),
                other => panic!("unexpected failure: {}", other),
            },
        }
        // nothing is left half-built on this thread
        assert!(!container.is_currently_in_creation(&format!("n{}", i)));
    }

    let _ = container.destroy_singletons();
});
