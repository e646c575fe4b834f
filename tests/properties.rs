use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use viserio_container::compiler::{Expr, NameCache};
use viserio_container::{
    Argument, ClassMetadata, ClassRegistry, ContainerBuilder, ContainerError, Definition, OutOfBounds,
    ParameterDescriptor, Value,
};

proptest! {
    #[test]
    fn accessor_names_are_unique_identifiers(ids in prop::collection::hash_set("[a-zA-Z0-9._\\\\-]{1,12}", 1..24)) {
        let mut names = NameCache::new();
        let mut seen = HashSet::new();

        for id in &ids {
            let name = names.method_name(id);
            prop_assert!(name.starts_with("get_"));
            prop_assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            prop_assert!(seen.insert(name.clone()), "duplicate accessor {}", name);
            prop_assert_eq!(names.method_name(id), name);
        }
    }

    #[test]
    fn added_arguments_are_contiguous(values in prop::collection::vec(any::<i64>(), 0..16)) {
        let mut definition = Definition::object("service", "Service");
        for value in &values {
            definition.add_argument(*value);
        }

        let positional = definition.get_arguments().positional();
        prop_assert_eq!(positional.len(), values.len());
        for (position, (index, argument)) in positional.into_iter().enumerate() {
            prop_assert_eq!(index, position as i64);
            prop_assert_eq!(argument, &Argument::from(values[position]));
        }
    }

    #[test]
    fn replace_outside_range_is_rejected(count in 1usize..8, index in -16i64..32) {
        let mut definition = Definition::object("service", "Service");
        for value in 0..count {
            definition.add_argument(value as i64);
        }

        let result = definition.replace_argument(index, "replacement");
        if index >= 0 && (index as usize) < count {
            prop_assert!(result.is_ok());
            prop_assert_eq!(definition.get_argument(index).unwrap(), &Argument::from("replacement"));
        } else {
            prop_assert_eq!(
                result.unwrap_err(),
                ContainerError::OutOfBounds(OutOfBounds::OutOfRange { index, max: count - 1 })
            );
        }
    }

    #[test]
    fn tagged_services_sorted_by_priority(priorities in prop::collection::vec(-5i64..5, 1..12)) {
        let mut registry = ClassRegistry::new();
        registry
            .register_class(ClassMetadata::new("Handler").constructor(vec![], |_, _| Ok(Value::Null)))
            .register_class(ClassMetadata::new("Dispatcher").constructor(
                vec![ParameterDescriptor::typed("handlers", "iterable")],
                |_, _| Ok(Value::Null),
            ));

        let mut builder = ContainerBuilder::new(registry);
        for (position, priority) in priorities.iter().enumerate() {
            builder
                .bind(format!("handler.{}", position), "Handler")
                .add_tag("handler", BTreeMap::from([("priority".to_string(), Value::from(*priority))]));
        }
        builder.bind("dispatcher", "Dispatcher").add_argument(Argument::Tagged("handler".into()));

        let graph = builder.compile().unwrap();
        let Expr::New { args, .. } = &graph.entry("dispatcher").unwrap().construct else {
            panic!("expected constructor call");
        };
        let Expr::List(items) = &args[0] else {
            panic!("expected tagged list");
        };

        let order: Vec<(i64, usize)> = items
            .iter()
            .map(|item| match item {
                Expr::Service(id) => {
                    let position: usize = id.trim_start_matches("handler.").parse().unwrap();
                    (priorities[position], position)
                }
                other => panic!("unexpected {:?}", other),
            })
            .collect();

        prop_assert_eq!(order.len(), priorities.len());
        for pair in order.windows(2) {
            prop_assert!(pair[0].0 > pair[1].0 || (pair[0].0 == pair[1].0 && pair[0].1 < pair[1].1));
        }
    }
}
