//! Decoration link from a decorator to the service it wraps.

use crate::error::{ContainerError, ContainerResult};

/// `(inner id, renamed id, priority)` as stored on the decorating definition.
///
/// Among decorators of the same inner service, a higher priority wraps later,
/// so it ends up outermost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorLink {
    pub inner_id: String,
    pub renamed_id: Option<String>,
    pub priority: i32,
}

impl DecoratorLink {
    pub fn new(
        inner_id: impl Into<String>,
        renamed_id: Option<String>,
        priority: i32,
    ) -> ContainerResult<Self> {
        let inner_id = inner_id.into();
        if renamed_id.as_deref() == Some(inner_id.as_str()) {
            return Err(ContainerError::InvalidArgument(format!(
                "The decorated service inner name for [{}] must be different than the service name itself.",
                inner_id
            )));
        }

        Ok(Self {
            inner_id,
            renamed_id,
            priority,
        })
    }

    /// Id the wrapped service is moved to; `<decorator>.inner` when unnamed.
    pub fn inner_alias(&self, decorator_id: &str) -> String {
        self.renamed_id
            .clone()
            .unwrap_or_else(|| format!("{}.inner", decorator_id))
    }

    pub fn as_tuple(&self) -> (&str, Option<&str>, i32) {
        (&self.inner_id, self.renamed_id.as_deref(), self.priority)
    }
}
