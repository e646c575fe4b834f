//! Method calls applied after construction.

use crate::error::{ContainerError, ContainerResult};
use crate::value::Argument;

/// One call to make on a freshly built service.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Vec<Argument>,
    /// When true the call returns a modified copy that replaces the service.
    pub returns_clone: bool,
}

/// Insertion-ordered list of method calls; the order is the emitted call order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodCalls {
    calls: Vec<MethodCall>,
}

impl MethodCalls {
    pub fn add(
        &mut self,
        method: impl Into<String>,
        arguments: Vec<Argument>,
        returns_clone: bool,
    ) -> ContainerResult<()> {
        let method = method.into();
        if method.is_empty() {
            return Err(ContainerError::InvalidArgument(
                "Method name cannot be empty.".to_string(),
            ));
        }

        self.calls.push(MethodCall {
            method,
            arguments,
            returns_clone,
        });
        Ok(())
    }

    /// Removes the first call named `method`, whatever its arguments.
    pub fn remove(&mut self, method: &str) -> bool {
        match self.calls.iter().position(|call| call.method == method) {
            Some(position) => {
                self.calls.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, method: &str) -> bool {
        self.calls.iter().any(|call| call.method == method)
    }

    /// Replaces every call, validating each method name.
    pub fn set(&mut self, calls: Vec<MethodCall>) -> ContainerResult<()> {
        let mut replacement = MethodCalls::default();
        for call in calls {
            replacement.add(call.method, call.arguments, call.returns_clone)?;
        }
        *self = replacement;
        Ok(())
    }

    pub fn as_slice(&self) -> &[MethodCall] {
        &self.calls
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
