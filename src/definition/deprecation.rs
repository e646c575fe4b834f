//! Deprecation flag and message template.

use crate::error::{ContainerError, ContainerResult};

pub const DEFAULT_DEPRECATION_TEMPLATE: &str =
    "The [%s] service is deprecated. You should stop using it, as it will be removed in the future.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    deprecated: bool,
    template: String,
}

impl Default for Deprecation {
    fn default() -> Self {
        Self {
            deprecated: false,
            template: DEFAULT_DEPRECATION_TEMPLATE.to_string(),
        }
    }
}

impl Deprecation {
    /// Sets the flag; a provided template must contain `%s`.
    pub fn set(&mut self, status: bool, template: Option<&str>) -> ContainerResult<()> {
        if let Some(template) = template {
            if template.contains('\r') || template.contains('\n') || template.contains("*/") {
                return Err(ContainerError::InvalidArgument(
                    "Invalid characters found in deprecation template.".to_string(),
                ));
            }

            if !template.contains("%s") {
                return Err(ContainerError::InvalidArgument(
                    "The deprecation template must contain the [%s] placeholder.".to_string(),
                ));
            }

            self.template = template.to_string();
        }

        self.deprecated = status;
        Ok(())
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Template with `%s` replaced by the service name.
    pub fn message(&self, name: &str) -> String {
        self.template.replace("%s", name)
    }
}
