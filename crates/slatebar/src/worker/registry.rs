use super::traits::ErasedWorker;
use super::{Capability, Worker, WorkerError, WorkerMetadata};
use std::collections::BTreeMap;
use tracing::debug;

type Factory = Box<dyn Fn() -> Box<dyn ErasedWorker> + Send + Sync>;

/// Maps worker names to factories.
///
/// Built once at startup and handed to the orchestrator; every reload builds
/// fresh worker instances from it.
pub struct WorkerRegistry {
    factories: BTreeMap<&'static str, Factory>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with every worker shipped in this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::workers::register_builtin(&mut registry);
        registry
    }

    /// Register a worker type under the name its metadata reports.
    /// A later registration under the same name replaces the earlier one.
    pub fn register<W, F>(&mut self, factory: F)
    where
        W: Worker + 'static,
        F: Fn() -> W + Send + Sync + 'static,
    {
        let name = Worker::metadata(&factory()).name;
        self.factories.insert(
            name,
            Box::new(move || -> Box<dyn ErasedWorker> { Box::new(factory()) }),
        );
    }

    /// Build and configure a worker instance.
    ///
    /// Settings are only handed to workers that declare
    /// [`Capability::Configurable`].
    pub fn build(
        &self,
        name: &str,
        settings: &toml::Table,
    ) -> Result<Box<dyn ErasedWorker>, WorkerError> {
        let factory = self.factories.get(name).ok_or_else(|| WorkerError::Unknown {
            name: name.to_string(),
        })?;
        let mut worker = factory();
        if worker.metadata().has(Capability::Configurable) {
            worker.configure(settings)?;
        } else if !settings.is_empty() {
            debug!(worker = name, "ignoring settings for non-configurable worker");
        }
        Ok(worker)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Metadata for all registered workers, sorted by name
    pub fn list(&self) -> Vec<WorkerMetadata> {
        self.factories.values().map(|f| f().metadata()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::UpdateSender;
    use slatebar_core::Block;
    use tokio_util::sync::CancellationToken;

    struct Fixed {
        text: String,
    }

    impl Worker for Fixed {
        fn metadata(&self) -> WorkerMetadata {
            WorkerMetadata {
                name: "fixed",
                description: "test worker",
                capabilities: vec![Capability::Configurable],
            }
        }

        fn configure(&mut self, settings: &toml::Table) -> Result<(), WorkerError> {
            self.text = settings
                .get("text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| WorkerError::config("missing text"))?
                .to_string();
            Ok(())
        }

        async fn run(
            &self,
            _updates: UpdateSender,
            _cancel: CancellationToken,
        ) -> Result<(), WorkerError> {
            Ok(())
        }

        fn render(&self) -> Vec<Block> {
            vec![Block::new(self.text.clone())]
        }
    }

    fn registry() -> WorkerRegistry {
        let mut registry = WorkerRegistry::new();
        registry.register(|| Fixed {
            text: String::new(),
        });
        registry
    }

    #[test]
    fn test_build_configures_worker() {
        let settings: toml::Table = toml::from_str("text = \"hi\"").unwrap();
        let worker = registry().build("fixed", &settings).unwrap();
        assert_eq!(worker.render()[0].full_text, "hi");
    }

    #[test]
    fn test_unknown_name() {
        let err = registry().build("nope", &toml::Table::new()).err().unwrap();
        assert!(matches!(err, WorkerError::Unknown { .. }));
    }

    #[test]
    fn test_configure_failure_surfaces() {
        let err = registry().build("fixed", &toml::Table::new()).err().unwrap();
        assert!(matches!(err, WorkerError::Config { .. }));
    }

    #[test]
    fn test_builtin_names() {
        let registry = WorkerRegistry::builtin();
        for name in ["static", "clicks", "time", "shell"] {
            assert!(registry.contains(name), "missing builtin {name}");
        }
        assert_eq!(registry.len(), 4);
    }
}
