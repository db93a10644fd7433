#![forbid(unsafe_code)]

use crate::Invocable;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// `module:function` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetRef {
    pub module: String,
    pub function: String,
}

impl TargetRef {
    /// Requires exactly one `:` with non-empty halves.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut parts = raw.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(module), Some(function), None)
                if !module.trim().is_empty() && !function.trim().is_empty() =>
            {
                Ok(Self {
                    module: module.trim().to_string(),
                    function: function.trim().to_string(),
                })
            }
            _ => Err(format!(
                "target `{raw}` must have the form <module>:<function>"
            )),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.function)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot resolve target function `{target}`: {detail}")]
pub struct TargetResolutionError {
    pub target: String,
    pub detail: String,
}

/// Turns a target reference into something callable.
pub trait TargetResolver {
    fn resolve(&self, target: &TargetRef) -> Result<Arc<dyn Invocable>, TargetResolutionError>;
}

/// Map-based resolver keyed by the full `module:function` string.
#[derive(Clone, Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, Arc<dyn Invocable>>,
}

impl TargetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `target` under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: &str,
        target: impl Invocable + 'static,
    ) -> Result<&mut Self, String> {
        let parsed = TargetRef::parse(name)?;
        self.targets.insert(parsed.to_string(), Arc::new(target));
        Ok(self)
    }

    /// Makes `alias` resolve to whatever `existing` resolves to.
    pub fn alias(&mut self, alias: &str, existing: &str) -> Result<&mut Self, String> {
        let parsed_alias = TargetRef::parse(alias)?;
        let target = self
            .targets
            .get(existing)
            .cloned()
            .ok_or_else(|| format!("cannot alias unknown target `{existing}`"))?;
        self.targets.insert(parsed_alias.to_string(), target);
        Ok(self)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.targets.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("targets", &self.names())
            .finish()
    }
}

impl TargetResolver for TargetRegistry {
    fn resolve(&self, target: &TargetRef) -> Result<Arc<dyn Invocable>, TargetResolutionError> {
        let key = target.to_string();
        if let Some(found) = self.targets.get(&key) {
            return Ok(Arc::clone(found));
        }

        let module_known = self
            .targets
            .keys()
            .any(|name| name.split(':').next() == Some(target.module.as_str()));
        let detail = if module_known {
            format!(
                "module `{}` has no function `{}`",
                target.module, target.function
            )
        } else {
            format!(
                "no module named `{}` (registered: {})",
                target.module,
                self.names().join(", ")
            )
        };
        Err(TargetResolutionError {
            target: key,
            detail,
        })
    }
}
