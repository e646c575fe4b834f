// @generated by viserio-container. Do not edit.

use std::collections::HashMap;
use std::sync::Arc;

use viserio_container::reflection::{ClassRegistry, Invoker};
use viserio_container::{ContainerError, ContainerResult, ServiceLocator, ServiceRuntime, Value};

pub struct AppContainer {
    runtime: ServiceRuntime,
}

impl AppContainer {
    pub fn new(registry: Arc<ClassRegistry>, closures: HashMap<String, Invoker>) -> Self {
        Self {
            runtime: ServiceRuntime::new(registry).with_closures(closures),
        }
    }

    pub fn runtime(&self) -> &ServiceRuntime {
        &self.runtime
    }

    fn get_clock(&self) -> ContainerResult<Value> {
        self.runtime.transient("clock", || {
            let instance = self.runtime.construct("Clock", self, vec![])?;
            Ok(instance)
        })
    }

    fn get_logger(&self) -> ContainerResult<Value> {
        self.runtime.shared("logger", || {
            let instance = self.runtime.construct("FileLogger", self, vec![self.parameter("log.path")?])?;
            Ok(instance)
        })
    }

    fn get_service(&self) -> ContainerResult<Value> {
        self.runtime.shared("service", || {
            let instance = self.runtime.construct("App", self, vec![self.get_logger()?])?;
            Ok(instance)
        })
    }
}

impl ServiceLocator for AppContainer {
    fn get(&self, id: &str) -> ContainerResult<Value> {
        match id {
            "clock" => self.get_clock(),
            "log" => self.get_logger(),
            "logger" => self.get_logger(),
            "service" => self.get_service(),
            _ => Err(ContainerError::NotFound(id.to_string())),
        }
    }

    fn has(&self, id: &str) -> bool {
        matches!(id, "clock" | "log" | "logger" | "service")
    }

    fn parameter(&self, name: &str) -> ContainerResult<Value> {
        match name {
            "log.path" => Ok(Value::Str("/tmp/log".to_string())),
            _ => Err(ContainerError::NotFound(name.to_string())),
        }
    }
}
