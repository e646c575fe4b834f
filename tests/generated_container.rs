use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use viserio_container::{
    reference, Argument, BindingType, ClassMetadata, ClassRegistry, CompilerConfig, ContainerBuilder,
    ContainerError, Instance, ParameterDescriptor, ServiceLocator, Value,
};

mod generated {
    include!("generated/app_container.rs");
}

use generated::AppContainer;

const SOURCE: &str = include_str!("generated/app_container.rs");

#[derive(Debug)]
struct FileLogger {
    path: String,
}

#[derive(Debug)]
struct App {
    logger: Arc<FileLogger>,
}

fn registry(loggers: Arc<AtomicUsize>) -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry
        .register_class(
            ClassMetadata::new("Clock").constructor(vec![], |_, _| Ok(Value::Object(Instance::new("Clock", ())))),
        )
        .register_class(ClassMetadata::new("FileLogger").constructor(
            vec![ParameterDescriptor::typed("path", "string")],
            move |_, args| {
                loggers.fetch_add(1, Ordering::SeqCst);
                let path = args[0].as_str().unwrap_or_default().to_string();
                Ok(Value::Object(Instance::new("FileLogger", FileLogger { path })))
            },
        ))
        .register_class(ClassMetadata::new("App").constructor(
            vec![ParameterDescriptor::typed("logger", "FileLogger")],
            |_, args| {
                let logger = args[0]
                    .downcast::<FileLogger>()
                    .ok_or_else(|| ContainerError::Runtime("expected a logger".into()))?;
                Ok(Value::Object(Instance::new("App", App { logger })))
            },
        ));
    registry
}

fn app_builder() -> ContainerBuilder {
    let config = CompilerConfig::default().with_container_name("AppContainer");
    let mut builder = ContainerBuilder::new(registry(Arc::new(AtomicUsize::new(0)))).with_config(config);
    builder.set_parameter("log.path", "/tmp/log");
    builder
        .bind("logger", "FileLogger")
        .add_argument(Argument::Parameter("log.path".into()));
    builder.bind("service", "App").add_argument(reference("logger"));
    builder.bind("clock", "Clock").set_binding_type(BindingType::Transient);
    builder.set_alias("log", "logger");
    builder
}

fn generated(loggers: Arc<AtomicUsize>) -> AppContainer {
    AppContainer::new(Arc::new(registry(loggers)), HashMap::new())
}

// ===== Checked-in source =====

#[test]
fn test_dump_matches_checked_in_source() {
    assert_eq!(app_builder().dump().unwrap(), SOURCE);
}

#[test]
fn test_dump_to_writes_checked_in_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app_container.rs");

    app_builder().dump_to(&path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), SOURCE);
}

// ===== Generated container behaviour =====

#[test]
fn test_generated_shared_service_builds_dependency_once() {
    let loggers = Arc::new(AtomicUsize::new(0));
    let container = generated(loggers.clone());

    let first = container.get_typed::<App>("service").unwrap();
    let second = container.get_typed::<App>("service").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.logger, &second.logger));
    assert_eq!(first.logger.path, "/tmp/log");
    assert_eq!(loggers.load(Ordering::SeqCst), 1);
}

#[test]
fn test_generated_alias_shares_instance() {
    let loggers = Arc::new(AtomicUsize::new(0));
    let container = generated(loggers.clone());

    let logger = container.get("logger").unwrap();
    assert!(container.get("log").unwrap().same(&logger));
    let app = container.get_typed::<App>("service").unwrap();
    assert!(Arc::ptr_eq(&app.logger, &logger.downcast::<FileLogger>().unwrap()));
    assert_eq!(loggers.load(Ordering::SeqCst), 1);
    assert!(container.runtime().initialized("logger"));
}

#[test]
fn test_generated_transient_service_is_fresh() {
    let container = generated(Arc::new(AtomicUsize::new(0)));

    let first = container.get("clock").unwrap();
    let second = container.get("clock").unwrap();

    assert!(!first.same(&second));
    assert!(!container.runtime().initialized("clock"));
}

#[test]
fn test_generated_lookup_of_unknown_ids() {
    let container = generated(Arc::new(AtomicUsize::new(0)));

    assert!(container.has("log"));
    assert!(!container.has("mailer"));
    assert_eq!(
        container.get("mailer").unwrap_err(),
        ContainerError::NotFound("mailer".into())
    );
    assert_eq!(container.parameter("log.path").unwrap().as_str(), Some("/tmp/log"));
    assert!(container.parameter("log.level").is_err());
}
