#![no_main]

use libfuzzer_sys::fuzz_target;
use viserio_container::{reference, ClassMetadata, ClassRegistry, ContainerBuilder, ParameterDescriptor, ServiceLocator, Value};

const IDS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fuzz_target!(|data: &[u8]| {
    let mut registry = ClassRegistry::new();
    registry.register_class(ClassMetadata::new("Node").constructor(
        vec![ParameterDescriptor::new("next").with_default(Value::Null)],
        |_, _| Ok(Value::Null),
    ));

    let mut builder = ContainerBuilder::new(registry);

    // Each triple is: kind, id, target
    for chunk in data.chunks_exact(3) {
        let id = IDS[chunk[1] as usize % IDS.len()];
        let target = IDS[chunk[2] as usize % IDS.len()];

        match chunk[0] % 4 {
            0 => {
                builder.bind(id, "Node");
            }
            1 => {
                builder.bind(id, "Node").add_argument(reference(target));
            }
            2 => {
                builder.set_alias(id, target);
            }
            _ => {
                let _ = builder.bind(id, "Node").decorate(target, None, i32::from(chunk[2] % 3));
            }
        }
    }

    // Compilation either fails cleanly or yields a container that never panics
    if let Ok(container) = builder.build() {
        for id in IDS {
            if container.has(id) {
                let _ = container.get(id);
            }
        }
        let _ = builder.dump();
    }
});
