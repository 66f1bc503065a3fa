use crate::error::RegistryError;
use crate::fixers;
use crate::resolved::ResolvedFix;
use cmorfix_fixer_api::Fix;
use cmorfix_types::HandlerKey;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

type Constructor = Arc<dyn Fn() -> anyhow::Result<Box<dyn Fix>> + Send + Sync>;

/// Outcome of looking up a handler.
///
/// `Absent` is the common case and not an error.
pub enum Resolution {
    Absent,
    /// `key` is the registration that served the request: the variable's own key or the
    /// dataset-wide `allvars` key.
    Found { key: HandlerKey, handler: Box<dyn Fix> },
    /// Registered, but the constructor failed or panicked.
    Broken { key: HandlerKey, reason: String },
}

impl Resolution {
    pub fn is_absent(&self) -> bool {
        matches!(self, Resolution::Absent)
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }

    pub fn is_broken(&self) -> bool {
        matches!(self, Resolution::Broken { .. })
    }

    /// Collapse to an optional handler, treating a broken handler as absent.
    pub fn into_handler(self) -> Option<Box<dyn Fix>> {
        match self {
            Resolution::Found { handler, .. } => Some(handler),
            Resolution::Absent => None,
            Resolution::Broken { key, reason } => {
                warn!(key = %key, reason = %reason, "ignoring broken fix");
                None
            }
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Absent => f.write_str("Absent"),
            Resolution::Found { key, handler } => f
                .debug_struct("Found")
                .field("key", key)
                .field("handler", &handler.name())
                .finish(),
            Resolution::Broken { key, reason } => f
                .debug_struct("Broken")
                .field("key", key)
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Registration table mapping normalized keys to handler constructors.
///
/// Built once at startup and read-only afterwards, so it can be shared across worker threads.
#[derive(Clone, Default)]
pub struct FixRegistry {
    entries: BTreeMap<HandlerKey, Constructor>,
}

impl fmt::Debug for FixRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixRegistry")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FixRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in fix.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for fix in fixers::BUILTIN {
            // The built-in table is keyed uniquely; a clash is a bug in that table.
            let meta = &fix.meta;
            if let Err(err) = registry.register(meta.project, meta.model, meta.variable, fix.construct)
            {
                warn!(error = %err, "skipping built-in fix");
            }
        }
        registry
    }

    /// Register `construct` under the normalized (project, model, variable) key.
    pub fn register<F>(
        &mut self,
        project: &str,
        model: &str,
        variable: &str,
        construct: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn() -> anyhow::Result<Box<dyn Fix>> + Send + Sync + 'static,
    {
        let key = HandlerKey::new(project, model, variable);
        if self.entries.contains_key(&key) {
            return Err(RegistryError::Duplicate { key });
        }
        debug!(key = %key, "registered fix");
        self.entries.insert(key, Arc::new(construct));
        Ok(())
    }

    pub fn contains(&self, key: &HandlerKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered keys in deterministic order.
    pub fn keys(&self) -> impl Iterator<Item = &HandlerKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registration serving `key`: the exact key if registered, else the dataset-wide key of
    /// the same project and model.
    pub fn lookup(&self, key: &HandlerKey) -> Option<&HandlerKey> {
        if let Some((own, _)) = self.entries.get_key_value(key) {
            return Some(own);
        }
        let wide = HandlerKey::all_vars(&key.project, &key.model);
        self.entries.get_key_value(&wide).map(|(k, _)| k)
    }

    /// Resolve the handler for one triple. Names are normalized first.
    pub fn resolve(&self, project: &str, model: &str, variable: &str) -> Resolution {
        self.resolve_key(&HandlerKey::new(project, model, variable))
    }

    /// Resolve an already normalized key. A new handler is built on every call.
    pub fn resolve_key(&self, key: &HandlerKey) -> Resolution {
        let Some((matched, construct)) = self
            .lookup(key)
            .and_then(|k| self.entries.get_key_value(k))
        else {
            debug!(key = %key, "no fix registered");
            return Resolution::Absent;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| construct())) {
            Ok(Ok(handler)) => {
                debug!(key = %key, matched = %matched, handler = handler.name(), "resolved fix");
                Resolution::Found {
                    key: matched.clone(),
                    handler,
                }
            }
            Ok(Err(err)) => broken(matched, format!("{err:#}")),
            Err(payload) => broken(
                matched,
                format!("constructor panicked: {}", panic_message(payload.as_ref())),
            ),
        }
    }

    /// Resolve `project/model/variable` without any disabled patterns.
    pub fn resolve_fix(&self, project: &str, model: &str, variable: &str) -> ResolvedFix {
        ResolvedFix::resolve(self, project, model, variable, &[])
    }
}

fn broken(key: &HandlerKey, reason: String) -> Resolution {
    // Callers decide whether this is worth a warning.
    debug!(key = %key, reason = %reason, "fix is registered but cannot be constructed");
    Resolution::Broken {
        key: key.clone(),
        reason,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmorfix_fixer_api::NoopFix;

    fn noop() -> anyhow::Result<Box<dyn Fix>> {
        Ok(Box::new(NoopFix))
    }

    #[test]
    fn absent_when_nothing_registered() {
        let registry = FixRegistry::new();
        assert!(registry.resolve("CMIP6", "CESM2", "tas").is_absent());
    }

    #[test]
    fn absent_when_project_unknown() {
        let mut registry = FixRegistry::new();
        registry.register("CMIP6", "CESM2", "tas", noop).unwrap();
        assert!(registry.resolve("CMIP5", "CESM2", "tas").is_absent());
        assert!(registry.resolve("CMIP6", "CESM1", "tas").is_absent());
        assert!(registry.resolve("CMIP6", "CESM2", "pr").is_absent());
    }

    #[test]
    fn lookup_normalizes_names() {
        let mut registry = FixRegistry::new();
        registry.register("CMIP6", "MODEL_X", "pr", noop).unwrap();
        assert!(registry.resolve("CMIP6", "MODEL-X", "pr").is_found());
        assert!(registry.contains(&HandlerKey::new("CMIP6", "MODEL-X", "pr")));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = FixRegistry::new();
        registry.register("CMIP6", "MODEL-X", "pr", noop).unwrap();
        let err = registry
            .register("CMIP6", "MODEL_X", "pr", noop)
            .unwrap_err();
        assert!(err.to_string().contains("CMIP6/MODEL_X/pr"));
    }

    #[test]
    fn constructor_error_is_broken_and_collapses_to_none() {
        let mut registry = FixRegistry::new();
        registry
            .register("CMIP6", "CESM2", "tas", || Err(anyhow::anyhow!("missing table")))
            .unwrap();
        let resolution = registry.resolve("CMIP6", "CESM2", "tas");
        match &resolution {
            Resolution::Broken { key, reason } => {
                assert_eq!(key.to_string(), "CMIP6/CESM2/tas");
                assert!(reason.contains("missing table"));
            }
            other => panic!("expected broken, got {other:?}"),
        }
        assert!(resolution.into_handler().is_none());
    }

    #[test]
    fn panicking_constructor_is_broken() {
        let mut registry = FixRegistry::new();
        registry
            .register("CMIP6", "CESM2", "tas", || panic!("grid file missing"))
            .unwrap();
        let resolution = registry.resolve("CMIP6", "CESM2", "tas");
        match resolution {
            Resolution::Broken { reason, .. } => {
                assert!(reason.contains("constructor panicked"));
                assert!(reason.contains("grid file missing"));
            }
            other => panic!("expected broken, got {other:?}"),
        }
    }

    #[test]
    fn dataset_wide_fix_serves_unregistered_variables() {
        let mut registry = FixRegistry::new();
        registry.register("CMIP5", "FGOALS-g2", "allvars", noop).unwrap();
        match registry.resolve("CMIP5", "FGOALS_g2", "tas") {
            Resolution::Found { key, .. } => {
                assert_eq!(key.to_string(), "CMIP5/FGOALS_g2/allvars")
            }
            other => panic!("expected found, got {other:?}"),
        }
        assert!(registry.resolve("CMIP5", "FGOALS-s2", "tas").is_absent());
    }

    #[test]
    fn variable_fix_takes_precedence_over_dataset_wide_fix() {
        let mut registry = FixRegistry::new();
        registry.register("CMIP6", "CESM2", "allvars", noop).unwrap();
        registry.register("CMIP6", "CESM2", "tas", noop).unwrap();
        let key = HandlerKey::new("CMIP6", "CESM2", "tas");
        assert_eq!(registry.lookup(&key), Some(&key));
        match registry.resolve_key(&key) {
            Resolution::Found { key: matched, .. } => assert_eq!(matched, key),
            other => panic!("expected found, got {other:?}"),
        }
    }

    #[test]
    fn builtin_registry_is_populated_and_sorted() {
        let registry = FixRegistry::builtin();
        assert_eq!(registry.len(), fixers::BUILTIN.len());
        let keys: Vec<_> = registry.keys().cloned().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FixRegistry>();
    }
}
