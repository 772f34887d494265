//! Per-run state shared by every analyzer.

use crate::ast::{ClassDecl, PhpFile};
use crate::cache::{AnalysisCache, MemoryCache, NoCache};
use crate::config::AnalyzerConfig;
use crate::error::{ErrorCollector, Result};
use crate::runtime::{NoRuntime, PhpProcessRuntime, RuntimeProvider};
use crate::workspace::{ClassRepository, LoadedClass};
use log::info;
use std::path::Path;

/// Everything one analysis run owns: class lookup, the warning sink, the
/// runtime fallback and the result cache.
///
/// A context is never shared between runs; parallel workers each build
/// their own.
pub struct AnalysisContext {
    pub repository: ClassRepository,
    pub errors: ErrorCollector,
    pub config: AnalyzerConfig,
    runtime: Box<dyn RuntimeProvider>,
    cache: Box<dyn AnalysisCache>,
}

impl AnalysisContext {
    pub fn new(repository: ClassRepository, config: AnalyzerConfig) -> Self {
        let cache: Box<dyn AnalysisCache> = if config.cache.enabled {
            Box::new(MemoryCache::new())
        } else {
            Box::new(NoCache)
        };
        Self {
            repository,
            errors: ErrorCollector::new(config.fail_fast),
            config,
            runtime: Box::new(NoRuntime),
            cache,
        }
    }

    /// Context over in-memory sources only, with caching disabled
    pub fn in_memory(sources: &[(&str, &str)]) -> Self {
        let repository = ClassRepository::new();
        for (path, source) in sources {
            repository.add_source(*path, *source);
        }
        let mut config = AnalyzerConfig::default();
        config.cache.enabled = false;
        Self::new(repository, config)
    }

    /// Index a project on disk and pick the runtime from configuration
    pub fn for_project(root: &Path, config: AnalyzerConfig) -> anyhow::Result<Self> {
        let repository = ClassRepository::for_project(root, &config)?;
        let runtime: Box<dyn RuntimeProvider> = match &config.runtime.php_binary {
            Some(binary) => {
                info!("Runtime fallback enabled via {}", binary);
                Box::new(PhpProcessRuntime::new(
                    binary.clone(),
                    root.to_path_buf(),
                    config.runtime.timeout_secs,
                ))
            }
            None => Box::new(NoRuntime),
        };
        Ok(Self::new(repository, config).with_runtime(runtime))
    }

    pub fn with_runtime(mut self, runtime: Box<dyn RuntimeProvider>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_cache(mut self, cache: Box<dyn AnalysisCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn runtime(&self) -> &dyn RuntimeProvider {
        self.runtime.as_ref()
    }

    pub fn cache(&self) -> &dyn AnalysisCache {
        self.cache.as_ref()
    }

    pub fn load_class(&self, fqn: &str) -> Result<LoadedClass> {
        self.repository.load(fqn)
    }

    /// Resolve a name as written in `file` (inside `class` when given)
    pub fn resolve_class_name(
        &self,
        name: &str,
        file: &PhpFile,
        class: Option<&ClassDecl>,
    ) -> Option<String> {
        self.repository.resolve_name(name, file, class)
    }

    /// Resolve a name written inside a loaded class, falling back to the
    /// name PHP would assume
    pub fn resolve_in(&self, name: &str, loaded: &LoadedClass) -> String {
        self.repository.resolve_name_lenient(name, loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{no_context, ErrorKind};

    #[test]
    fn test_in_memory_context() {
        let ctx = AnalysisContext::in_memory(&[(
            "app/Enums/Status.php",
            "<?php\nnamespace App\\Enums;\n\nenum Status: string { case A = 'a'; }\n",
        )]);
        assert!(ctx.load_class("App\\Enums\\Status").is_ok());
        assert!(!ctx.runtime().is_available());
        assert!(ctx.errors.is_empty());
        ctx.errors.record("Test", ErrorKind::AnalysisError, "x", no_context());
        assert_eq!(ctx.errors.len(), 1);
    }
}
