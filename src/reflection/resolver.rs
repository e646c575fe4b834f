//! Signature cache and parameter resolution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{is_container_type, CallableId, ClassRegistry, ClosureReference, ParameterDescriptor, Signature};
use crate::definition::Arguments;
use crate::error::{ContainerError, ContainerResult};
use crate::value::{Argument, Value};

/// Service found for a requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMatch {
    pub id: String,
    /// Non-shared, dependency free object service whose class can be built
    /// inline instead of through its accessor.
    pub inline_class: Option<String>,
}

/// Lookup of registered services by type, provided by the compiler.
pub trait ServiceLookup {
    fn find_by_type(&self, ty: &str) -> Option<ServiceMatch>;
}

/// How one parameter gets its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterBinding {
    /// Explicitly configured argument
    Argument(Argument),
    /// Registered service matched by type
    Service(String),
    /// Fresh instance of a class nobody registered, or an inlined service
    Construct { class: String, call: ResolvedCall },
    /// Declared default value
    Default(Value),
    /// Nullable parameter with nothing to inject
    Null,
}

/// Bindings for every parameter of one call, in declaration order.
///
/// Parameters bound to the container are consumed and do not appear in
/// `bindings`; `pass_container` records that at least one was.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedCall {
    pub pass_container: bool,
    pub bindings: Vec<ParameterBinding>,
}

/// Resolution flags for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveMode {
    pub autowire: bool,
    /// Factory and closure invocations hand the container to a leading
    /// untyped parameter.
    pub factory: bool,
}

/// Reads signatures from a [`ClassRegistry`] and resolves parameters.
///
/// One resolver lives for one compile run; its signature cache is dropped
/// with it.
pub struct ReflectionResolver {
    registry: Arc<ClassRegistry>,
    cache: HashMap<CallableId, Arc<Signature>>,
    building: Vec<String>,
}

impl ReflectionResolver {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
            building: Vec::new(),
        }
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Number of cached signatures.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Signature of a constructor, method or function; `None` for a class
    /// without a constructor.
    pub fn signature(&mut self, id: &CallableId) -> ContainerResult<Option<Arc<Signature>>> {
        if let Some(signature) = self.cache.get(id) {
            return Ok(Some(signature.clone()));
        }

        match self.registry.signature(id)? {
            Some(signature) => {
                let signature = Arc::new(signature);
                self.cache.insert(id.clone(), signature.clone());
                Ok(Some(signature))
            }
            None => Ok(None),
        }
    }

    pub fn closure_signature(&mut self, reference: &ClosureReference) -> Arc<Signature> {
        self.cache
            .entry(reference.callable_id())
            .or_insert_with(|| {
                Arc::new(Signature::new(
                    reference.callable_id(),
                    reference.parameters.clone(),
                    reference.return_type.clone(),
                ))
            })
            .clone()
    }

    /// Binds every parameter of `signature`.
    ///
    /// Per parameter, in order: a named argument, the container (by type, or
    /// a leading untyped factory parameter), a positional argument, a service
    /// or fresh instance for class types when autowiring, the default value,
    /// `null` for nullable parameters. Anything else is an
    /// [`ContainerError::UnresolvableParameter`] naming `context`.
    ///
    /// Positional index `n` targets the `n`-th parameter that is not bound to
    /// the container, so gaps fall back to autowiring or defaults. Positions
    /// past the last parameter are passed through in index order.
    pub fn resolve(
        &mut self,
        context: &str,
        signature: &Signature,
        arguments: &Arguments,
        mode: ResolveMode,
        lookup: &dyn ServiceLookup,
    ) -> ContainerResult<ResolvedCall> {
        let positional = arguments.positional();
        if let Some((index, _)) = positional.iter().find(|(index, _)| *index < 0) {
            return Err(ContainerError::InvalidArgument(format!(
                "The argument index [{}] of [{}] is negative.",
                index, context
            )));
        }

        let mut position = 0i64;
        let mut call = ResolvedCall::default();
        let parameter_count = signature.parameters.len();

        for (index, parameter) in signature.parameters.iter().enumerate() {
            let named = arguments.named(&parameter.name);
            let takes_container = named.is_none()
                && (parameter
                    .declared_type
                    .as_deref()
                    .map_or(false, is_container_type)
                    || (mode.factory
                        && index == 0
                        && parameter_count >= 2
                        && parameter.declared_type.is_none()));
            if takes_container {
                call.pass_container = true;
                continue;
            }

            let by_position = positional
                .iter()
                .find(|(candidate, _)| *candidate == position)
                .map(|(_, argument)| *argument);
            let binding = match (named, by_position) {
                (Some(_), Some(_)) => {
                    return Err(ContainerError::InvalidArgument(format!(
                        "The parameter [${}] of [{}] is configured both by name and at index [{}].",
                        parameter.name, context, position
                    )))
                }
                (Some(argument), None) | (None, Some(argument)) => ParameterBinding::Argument(argument.clone()),
                (None, None) => self.resolve_missing(context, parameter, mode, lookup)?,
            };
            call.bindings.push(binding);
            position += 1;
        }

        for (_, argument) in positional.iter().filter(|(index, _)| *index >= position) {
            call.bindings.push(ParameterBinding::Argument((*argument).clone()));
        }

        Ok(call)
    }

    fn resolve_missing(
        &mut self,
        context: &str,
        parameter: &ParameterDescriptor,
        mode: ResolveMode,
        lookup: &dyn ServiceLookup,
    ) -> ContainerResult<ParameterBinding> {
        if mode.autowire {
            if let Some(class) = parameter.class_type() {
                if let Some(found) = lookup.find_by_type(class) {
                    return Ok(match found.inline_class {
                        Some(class) => ParameterBinding::Construct {
                            class,
                            call: ResolvedCall::default(),
                        },
                        None => ParameterBinding::Service(found.id),
                    });
                }

                let instantiable = self
                    .registry
                    .class(class)
                    .map(|metadata| metadata.is_instantiable())
                    .unwrap_or(false);
                if instantiable {
                    let class = class.to_string();
                    return self.construct_fresh(&class, lookup);
                }
            }
        }

        if let Some(default) = &parameter.default_value {
            return Ok(ParameterBinding::Default(default.clone()));
        }

        if parameter.nullable || parameter.is_optional {
            return Ok(ParameterBinding::Null);
        }

        Err(ContainerError::UnresolvableParameter {
            parameter: parameter.name.clone(),
            class: context.to_string(),
        })
    }

    /// Resolves an unregistered class through its own constructor.
    fn construct_fresh(&mut self, class: &str, lookup: &dyn ServiceLookup) -> ContainerResult<ParameterBinding> {
        if self.building.iter().any(|building| building == class) {
            let mut path = self.building.clone();
            path.push(class.to_string());
            return Err(ContainerError::Circular(path));
        }

        debug!(class, "autowiring unregistered class");
        let signature = self.signature(&CallableId::Constructor(class.to_string()))?;

        self.building.push(class.to_string());
        let call = match signature {
            Some(signature) => self.resolve(
                class,
                &signature,
                &Arguments::new(),
                ResolveMode {
                    autowire: true,
                    factory: false,
                },
                lookup,
            ),
            None => Ok(ResolvedCall::default()),
        };
        self.building.pop();

        Ok(ParameterBinding::Construct {
            class: class.to_string(),
            call: call?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::ClassMetadata;
    use crate::value::reference;

    struct NoServices;

    impl ServiceLookup for NoServices {
        fn find_by_type(&self, _ty: &str) -> Option<ServiceMatch> {
            None
        }
    }

    struct Services(Vec<(&'static str, &'static str)>);

    impl ServiceLookup for Services {
        fn find_by_type(&self, ty: &str) -> Option<ServiceMatch> {
            self.0.iter().find(|(candidate, _)| *candidate == ty).map(|(_, id)| ServiceMatch {
                id: id.to_string(),
                inline_class: None,
            })
        }
    }

    fn registry() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry
            .register_class(ClassMetadata::new("Clock").constructor(vec![], |_, _| Ok(Value::Null)))
            .register_class(
                ClassMetadata::new("Mailer").constructor(
                    vec![
                        ParameterDescriptor::typed("clock", "Clock"),
                        ParameterDescriptor::typed("logger", "Logger"),
                        ParameterDescriptor::new("retries").with_default(3),
                    ],
                    |_, _| Ok(Value::Null),
                ),
            )
            .register_class(
                ClassMetadata::new("Loop").constructor(
                    vec![ParameterDescriptor::typed("other", "Loop")],
                    |_, _| Ok(Value::Null),
                ),
            );
        Arc::new(registry)
    }

    const AUTOWIRE: ResolveMode = ResolveMode {
        autowire: true,
        factory: false,
    };

    #[test]
    fn test_signature_is_cached() {
        let mut resolver = ReflectionResolver::new(registry());
        let id = CallableId::Constructor("Mailer".into());

        let first = resolver.signature(&id).unwrap().unwrap();
        let second = resolver.signature(&id).unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached(), 1);
        assert_eq!(first.parameters.len(), 3);
    }

    #[test]
    fn test_autowire_prefers_registered_service() {
        let mut resolver = ReflectionResolver::new(registry());
        let signature = resolver
            .signature(&CallableId::Constructor("Mailer".into()))
            .unwrap()
            .unwrap();
        let lookup = Services(vec![("Logger", "logger"), ("Clock", "clock")]);

        let call = resolver
            .resolve("Mailer", &signature, &Arguments::new(), AUTOWIRE, &lookup)
            .unwrap();

        assert_eq!(
            call.bindings,
            vec![
                ParameterBinding::Service("clock".into()),
                ParameterBinding::Service("logger".into()),
                ParameterBinding::Default(Value::Int(3)),
            ]
        );
    }

    #[test]
    fn test_autowire_constructs_unregistered_class() {
        let mut resolver = ReflectionResolver::new(registry());
        let signature = resolver
            .signature(&CallableId::Constructor("Mailer".into()))
            .unwrap()
            .unwrap();
        let mut arguments = Arguments::new();
        arguments.set("logger".into(), reference("logger"));

        let call = resolver
            .resolve("Mailer", &signature, &arguments, AUTOWIRE, &NoServices)
            .unwrap();

        assert_eq!(
            call.bindings[0],
            ParameterBinding::Construct {
                class: "Clock".into(),
                call: ResolvedCall::default()
            }
        );
        assert_eq!(call.bindings[1], ParameterBinding::Argument(reference("logger")));
    }

    #[test]
    fn test_unresolvable_parameter_names_parameter_and_class() {
        let mut resolver = ReflectionResolver::new(registry());
        let signature = resolver
            .signature(&CallableId::Constructor("Mailer".into()))
            .unwrap()
            .unwrap();

        let error = resolver
            .resolve("Mailer", &signature, &Arguments::new(), AUTOWIRE, &NoServices)
            .unwrap_err();

        assert_eq!(
            error,
            ContainerError::UnresolvableParameter {
                parameter: "logger".into(),
                class: "Mailer".into()
            }
        );
    }

    #[test]
    fn test_without_autowiring_typed_parameters_fail() {
        let mut resolver = ReflectionResolver::new(registry());
        let signature = resolver
            .signature(&CallableId::Constructor("Mailer".into()))
            .unwrap()
            .unwrap();
        let lookup = Services(vec![("Logger", "logger"), ("Clock", "clock")]);

        let error = resolver
            .resolve(
                "Mailer",
                &signature,
                &Arguments::new(),
                ResolveMode {
                    autowire: false,
                    factory: false,
                },
                &lookup,
            )
            .unwrap_err();

        assert!(matches!(error, ContainerError::UnresolvableParameter { parameter, .. } if parameter == "clock"));
    }

    #[test]
    fn test_fresh_construction_detects_cycles() {
        let mut resolver = ReflectionResolver::new(registry());
        let signature = Signature::new(
            CallableId::Function("make".into()),
            vec![ParameterDescriptor::typed("loop", "Loop")],
            None,
        );

        let error = resolver
            .resolve("make", &signature, &Arguments::new(), AUTOWIRE, &NoServices)
            .unwrap_err();

        assert_eq!(error, ContainerError::Circular(vec!["Loop".into(), "Loop".into()]));
    }

    #[test]
    fn test_leading_untyped_factory_parameter_takes_container() {
        let mut resolver = ReflectionResolver::new(registry());
        let signature = Signature::new(
            CallableId::Function("make".into()),
            vec![
                ParameterDescriptor::new("container"),
                ParameterDescriptor::new("name"),
            ],
            None,
        );
        let arguments: Arguments = vec![Argument::from("mailer")].into_iter().collect();
        let factory = ResolveMode {
            autowire: false,
            factory: true,
        };

        let call = resolver
            .resolve("make", &signature, &arguments, factory, &NoServices)
            .unwrap();

        assert!(call.pass_container);
        assert_eq!(call.bindings, vec![ParameterBinding::Argument(Argument::from("mailer"))]);
    }

    fn smtp() -> Signature {
        Signature::new(
            CallableId::Constructor("Smtp".into()),
            vec![
                ParameterDescriptor::new("host").with_default("localhost"),
                ParameterDescriptor::new("port").with_default(25),
            ],
            None,
        )
    }

    #[test]
    fn test_positional_index_targets_declared_position() {
        let mut resolver = ReflectionResolver::new(registry());
        let mut arguments = Arguments::new();
        arguments.set(1i64.into(), Argument::from(2525));

        let call = resolver
            .resolve("Smtp", &smtp(), &arguments, AUTOWIRE, &NoServices)
            .unwrap();

        assert_eq!(
            call.bindings,
            vec![
                ParameterBinding::Default(Value::from("localhost")),
                ParameterBinding::Argument(Argument::from(2525)),
            ]
        );
    }

    #[test]
    fn test_positions_skip_container_parameters() {
        let mut resolver = ReflectionResolver::new(registry());
        let signature = Signature::new(
            CallableId::Function("make".into()),
            vec![
                ParameterDescriptor::typed("locator", "ContainerInterface"),
                ParameterDescriptor::new("name").with_default("default"),
                ParameterDescriptor::new("retries").with_default(3),
            ],
            None,
        );
        let mut arguments = Arguments::new();
        arguments.set(1i64.into(), Argument::from(5));

        let call = resolver
            .resolve("make", &signature, &arguments, AUTOWIRE, &NoServices)
            .unwrap();

        assert!(call.pass_container);
        assert_eq!(
            call.bindings,
            vec![
                ParameterBinding::Default(Value::from("default")),
                ParameterBinding::Argument(Argument::from(5)),
            ]
        );
    }

    #[test]
    fn test_surplus_positional_arguments_are_appended() {
        let mut resolver = ReflectionResolver::new(registry());
        let arguments: Arguments = vec![Argument::from("mx"), Argument::from(587), Argument::from(true)]
            .into_iter()
            .collect();

        let call = resolver
            .resolve("Smtp", &smtp(), &arguments, AUTOWIRE, &NoServices)
            .unwrap();

        assert_eq!(call.bindings.len(), 3);
        assert_eq!(call.bindings[2], ParameterBinding::Argument(Argument::from(true)));
    }

    #[test]
    fn test_named_and_positional_for_same_parameter_is_rejected() {
        let mut resolver = ReflectionResolver::new(registry());
        let mut arguments = Arguments::new();
        arguments.set("port".into(), Argument::from(2525));
        arguments.set(1i64.into(), Argument::from(587));

        let error = resolver
            .resolve("Smtp", &smtp(), &arguments, AUTOWIRE, &NoServices)
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "The parameter [$port] of [Smtp] is configured both by name and at index [1]."
        );
    }

    #[test]
    fn test_negative_index_is_rejected() {
        let mut resolver = ReflectionResolver::new(registry());
        let mut arguments = Arguments::new();
        arguments.set((-1i64).into(), Argument::from(1));

        let error = resolver
            .resolve("Smtp", &smtp(), &arguments, AUTOWIRE, &NoServices)
            .unwrap_err();

        assert!(matches!(error, ContainerError::InvalidArgument(_)));
    }

    #[test]
    fn test_single_untyped_factory_parameter_is_not_the_container() {
        let mut resolver = ReflectionResolver::new(registry());
        let signature = Signature::new(
            CallableId::Function("make".into()),
            vec![ParameterDescriptor::new("name")],
            None,
        );
        let arguments: Arguments = vec![Argument::from("mailer")].into_iter().collect();
        let factory = ResolveMode {
            autowire: false,
            factory: true,
        };

        let call = resolver
            .resolve("make", &signature, &arguments, factory, &NoServices)
            .unwrap();

        assert!(!call.pass_container);
        assert_eq!(call.bindings.len(), 1);
    }
}
