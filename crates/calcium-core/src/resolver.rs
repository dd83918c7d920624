//! Output-directory resolution hooks.
//!
//! Each processing method has its own resolver. The deployment decides where
//! suite2p and CaImAn write their results; the engine only asks.

use std::path::PathBuf;

use tracing::warn;

use crate::config::AppConfig;
use crate::lookup::ProcessingMethod;
use crate::storage::models::ProcessingTaskKey;

pub trait OutputDirResolver: Send + Sync {
    /// Expected output directory for a task, or `None` if it cannot be
    /// determined yet.
    fn output_dir(&self, key: &ProcessingTaskKey) -> Option<PathBuf>;
}

impl<F> OutputDirResolver for F
where
    F: Fn(&ProcessingTaskKey) -> Option<PathBuf> + Send + Sync,
{
    fn output_dir(&self, key: &ProcessingTaskKey) -> Option<PathBuf> {
        self(key)
    }
}

/// Resolves `<base>/scan_<scan_id>/<processing_instance>`.
#[derive(Debug, Clone)]
pub struct DirectoryLayoutResolver {
    base: PathBuf,
}

impl DirectoryLayoutResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl OutputDirResolver for DirectoryLayoutResolver {
    fn output_dir(&self, key: &ProcessingTaskKey) -> Option<PathBuf> {
        Some(
            self.base
                .join(format!("scan_{}", key.scan_id))
                .join(key.processing_instance.hyphenated().to_string()),
        )
    }
}

/// Used when no output location is configured for a method.
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredResolver {
    pub method: ProcessingMethod,
}

impl OutputDirResolver for UnconfiguredResolver {
    fn output_dir(&self, key: &ProcessingTaskKey) -> Option<PathBuf> {
        warn!("No {} output directory configured, {} stays pending", self.method, key);
        None
    }
}

/// One resolver per processing method.
pub struct Resolvers {
    suite2p: Box<dyn OutputDirResolver>,
    caiman: Box<dyn OutputDirResolver>,
}

impl Resolvers {
    pub fn new(
        suite2p: impl OutputDirResolver + 'static,
        caiman: impl OutputDirResolver + 'static,
    ) -> Self {
        Self {
            suite2p: Box::new(suite2p),
            caiman: Box::new(caiman),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            suite2p: layout_or_unconfigured(
                config.suite2p_output_dir.as_deref(),
                ProcessingMethod::Suite2p,
            ),
            caiman: layout_or_unconfigured(
                config.caiman_output_dir.as_deref(),
                ProcessingMethod::Caiman,
            ),
        }
    }

    pub fn for_method(&self, method: ProcessingMethod) -> &dyn OutputDirResolver {
        match method {
            ProcessingMethod::Suite2p => self.suite2p.as_ref(),
            ProcessingMethod::Caiman => self.caiman.as_ref(),
        }
    }
}

fn layout_or_unconfigured(
    base: Option<&str>,
    method: ProcessingMethod,
) -> Box<dyn OutputDirResolver> {
    match base {
        Some(base) => Box::new(DirectoryLayoutResolver::new(base)),
        None => Box::new(UnconfiguredResolver { method }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use uuid::Uuid;

    #[test]
    fn test_layout_resolver_path() {
        let instance = Uuid::parse_str("6f1c2a4e-8d55-4c39-9b1e-2a7d0c3e9f10").unwrap();
        let key = ProcessingTaskKey::new(7, instance);
        let resolver = DirectoryLayoutResolver::new("/data/suite2p");
        assert_eq!(
            resolver.output_dir(&key).unwrap(),
            Path::new("/data/suite2p/scan_7/6f1c2a4e-8d55-4c39-9b1e-2a7d0c3e9f10")
        );
    }

    #[test]
    fn test_selects_resolver_by_method() {
        let resolvers = Resolvers::new(
            |_: &ProcessingTaskKey| Some(PathBuf::from("/s2p")),
            |_: &ProcessingTaskKey| Some(PathBuf::from("/caiman")),
        );
        let key = ProcessingTaskKey::generate(1);
        assert_eq!(
            resolvers.for_method(ProcessingMethod::Suite2p).output_dir(&key),
            Some(PathBuf::from("/s2p"))
        );
        assert_eq!(
            resolvers.for_method(ProcessingMethod::Caiman).output_dir(&key),
            Some(PathBuf::from("/caiman"))
        );
    }

    #[test]
    fn test_unconfigured_method_resolves_nothing() {
        let config = AppConfig {
            root_data_dir: "/data".to_string(),
            database_path: "calcium.db".to_string(),
            output_patterns: vec!["*".to_string()],
            suite2p_output_dir: Some("/data/suite2p".to_string()),
            caiman_output_dir: None,
        };
        let resolvers = Resolvers::from_config(&config);
        let key = ProcessingTaskKey::generate(3);
        assert!(resolvers
            .for_method(ProcessingMethod::Suite2p)
            .output_dir(&key)
            .is_some());
        assert!(resolvers
            .for_method(ProcessingMethod::Caiman)
            .output_dir(&key)
            .is_none());
    }
}
