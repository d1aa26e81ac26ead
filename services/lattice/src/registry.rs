//! Declared namespaces and engine limits.
//!
//! The registry is read on every request; `max_read_depth` lives in an
//! atomic so operators (and tests) can change it at runtime and the next
//! check observes the new value. Nothing downstream caches a copy.
use crate::config::LatticeConfig;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
pub struct NamespaceRegistry {
    namespaces: HashSet<String>,
    max_read_depth: AtomicU32,
    default_page_size: usize,
    max_page_size: usize,
}

impl NamespaceRegistry {
    pub fn new(
        namespaces: impl IntoIterator<Item = String>,
        max_read_depth: u32,
        default_page_size: usize,
        max_page_size: usize,
    ) -> Self {
        Self {
            namespaces: namespaces.into_iter().collect(),
            max_read_depth: AtomicU32::new(max_read_depth.max(1)),
            default_page_size: default_page_size.max(1),
            max_page_size: max_page_size.max(1),
        }
    }

    pub fn from_config(config: &LatticeConfig) -> Self {
        Self::new(
            config.namespaces.iter().cloned(),
            config.max_read_depth,
            config.default_page_size,
            config.max_page_size,
        )
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.namespaces.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn max_read_depth(&self) -> u32 {
        self.max_read_depth.load(Ordering::Relaxed)
    }

    /// Takes effect for subsequent checks; in-flight traversals keep the
    /// budget they started with.
    pub fn set_max_read_depth(&self, depth: u32) {
        self.max_read_depth.store(depth.max(1), Ordering::Relaxed);
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Resolve a caller-supplied page size: absent or zero falls back to
    /// the default, anything above the maximum is clamped.
    pub fn clamp_page_size(&self, requested: Option<usize>) -> usize {
        match requested {
            None | Some(0) => self.default_page_size,
            Some(size) => size.min(self.max_page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> NamespaceRegistry {
        NamespaceRegistry::new(["files".to_string(), "groups".to_string()], 5, 100, 1000)
    }

    #[test]
    fn membership_and_listing() {
        let registry = registry();
        assert!(registry.contains("files"));
        assert!(!registry.contains("videos"));
        assert_eq!(registry.namespaces(), vec!["files", "groups"]);
    }

    #[test]
    fn max_read_depth_is_mutable_at_runtime() {
        let registry = registry();
        assert_eq!(registry.max_read_depth(), 5);
        registry.set_max_read_depth(2);
        assert_eq!(registry.max_read_depth(), 2);
        // Zero is not a usable budget; it pins to the minimum.
        registry.set_max_read_depth(0);
        assert_eq!(registry.max_read_depth(), 1);
    }

    #[test]
    fn page_size_clamping() {
        let registry = registry();
        assert_eq!(registry.clamp_page_size(None), 100);
        assert_eq!(registry.clamp_page_size(Some(0)), 100);
        assert_eq!(registry.clamp_page_size(Some(25)), 25);
        assert_eq!(registry.clamp_page_size(Some(10_000)), 1000);
    }
}
