//! DetectorRegistry: named factories, lazy construction, unavailable tracking.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::detector::Detector;
use crate::detectors::builtin_factories;
use crate::error::DetectorInitError;

pub type DetectorFactory = fn() -> Result<Box<dyn Detector>, DetectorInitError>;

/// A constructed detector plus its registration slot.
#[derive(Clone)]
pub struct LoadedDetector {
    pub name: String,
    /// Position in registration order, the last tie-break when merging.
    pub order: usize,
    pub detector: Arc<dyn Detector>,
}

impl std::fmt::Debug for LoadedDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedDetector")
            .field("name", &self.name)
            .field("order", &self.order)
            .finish()
    }
}

#[derive(Default)]
struct Cache {
    loaded: BTreeMap<String, Arc<dyn Detector>>,
    unavailable: BTreeMap<String, String>,
}

/// Registry of detector factories. Instances are built on first use and
/// cached until [`DetectorRegistry::reset`].
pub struct DetectorRegistry {
    factories: Vec<(String, DetectorFactory)>,
    disabled: HashSet<String>,
    cache: Mutex<Cache>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
            disabled: HashSet::new(),
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Registers `factory` under `name`. Re-registering a name replaces the
    /// factory in place and drops any cached instance.
    pub fn register(&mut self, name: &str, factory: DetectorFactory) {
        if let Some(entry) = self.factories.iter_mut().find(|(n, _)| n == name) {
            entry.1 = factory;
            let cache = self.cache.get_mut().unwrap_or_else(PoisonError::into_inner);
            cache.loaded.remove(name);
            cache.unavailable.remove(name);
        } else {
            self.factories.push((name.to_string(), factory));
        }
    }

    pub fn disable(&mut self, name: &str) {
        self.disabled.insert(name.to_string());
    }

    pub fn enable(&mut self, name: &str) {
        self.disabled.remove(name);
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        !self.disabled.contains(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// The detector registered as `name`, constructing it on first request.
    /// `None` for unknown names and for detectors whose construction failed.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Detector>> {
        let factory = self.factories.iter().find(|(n, _)| n == name).map(|(_, f)| *f)?;
        let mut cache = self.lock();
        Self::construct(&mut cache, name, factory)
    }

    /// Names of detectors currently instantiated.
    pub fn list_loaded(&self) -> BTreeSet<String> {
        self.lock().loaded.keys().cloned().collect()
    }

    /// Name → reason for every detector whose construction failed.
    pub fn unavailable(&self) -> BTreeMap<String, String> {
        self.lock().unavailable.clone()
    }

    /// Drops every cached instance and forgets past failures, so the next
    /// request constructs fresh detectors.
    pub fn reset(&self) {
        let mut cache = self.lock();
        let dropped = cache.loaded.len();
        cache.loaded.clear();
        cache.unavailable.clear();
        tracing::debug!(dropped, "detector cache reset");
    }

    /// Every enabled, constructible detector in registration order.
    pub fn load_all(&self) -> Vec<LoadedDetector> {
        let mut cache = self.lock();
        self.factories
            .iter()
            .enumerate()
            .filter(|(_, (name, _))| !self.disabled.contains(name))
            .filter_map(|(order, (name, factory))| {
                Self::construct(&mut cache, name, *factory).map(|detector| LoadedDetector {
                    name: name.clone(),
                    order,
                    detector,
                })
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn construct(cache: &mut Cache, name: &str, factory: DetectorFactory) -> Option<Arc<dyn Detector>> {
        if let Some(detector) = cache.loaded.get(name) {
            return Some(Arc::clone(detector));
        }
        if cache.unavailable.contains_key(name) {
            return None;
        }

        match std::panic::catch_unwind(factory) {
            Ok(Ok(detector)) => {
                let detector: Arc<dyn Detector> = Arc::from(detector);
                if detector.id() != name {
                    tracing::warn!(name, id = detector.id(), "detector id differs from its registry name");
                }
                tracing::debug!(name, "detector constructed");
                cache.loaded.insert(name.to_string(), Arc::clone(&detector));
                Some(detector)
            }
            Ok(Err(err)) => {
                tracing::warn!(name, error = %err, "detector unavailable");
                cache.unavailable.insert(name.to_string(), err.to_string());
                None
            }
            Err(_) => {
                tracing::error!(name, "detector factory panicked");
                cache
                    .unavailable
                    .insert(name.to_string(), "factory panicked".to_string());
                None
            }
        }
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A registry with every built-in detector.
pub fn default_registry() -> DetectorRegistry {
    let mut registry = DetectorRegistry::new();
    for (name, factory) in builtin_factories() {
        registry.register(name, factory);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectorKind;
    use crate::view::SentenceView;
    use clausemap_protocol::Slot;

    struct Broken;

    impl Detector for Broken {
        fn id(&self) -> &'static str {
            "broken"
        }
        fn kind(&self) -> DetectorKind {
            DetectorKind::Generic
        }
        fn priority(&self) -> u8 {
            99
        }
        fn score(&self, _: &SentenceView<'_>) -> f32 {
            0.0
        }
        fn extract(&self, _: &SentenceView<'_>) -> Vec<Slot> {
            Vec::new()
        }
    }

    fn failing() -> Result<Box<dyn Detector>, DetectorInitError> {
        Err(DetectorInitError::Failed {
            name: "broken".to_string(),
            reason: "lexicon missing".to_string(),
        })
    }

    fn panicking() -> Result<Box<dyn Detector>, DetectorInitError> {
        panic!("boom")
    }

    fn working() -> Result<Box<dyn Detector>, DetectorInitError> {
        Ok(Box::new(Broken))
    }

    #[test]
    fn test_lazy_construction() {
        let registry = default_registry();
        assert!(registry.list_loaded().is_empty());

        let basic = registry.get("basic").unwrap();
        assert_eq!(basic.id(), "basic");
        assert_eq!(registry.list_loaded().into_iter().collect::<Vec<_>>(), vec!["basic"]);

        // cached: same instance on the second request
        let again = registry.get("basic").unwrap();
        assert!(Arc::ptr_eq(&basic, &again));
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_reset_clears_instances() {
        let registry = default_registry();
        let first = registry.get("modal").unwrap();
        registry.reset();
        assert!(registry.list_loaded().is_empty());
        let second = registry.get("modal").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_construction_is_isolated() {
        let mut registry = default_registry();
        registry.register("broken", failing);
        registry.register("explodes", panicking);

        let loaded = registry.load_all();
        let names: Vec<_> = loaded.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["basic", "modifier", "relative", "passive", "modal", "question"]);

        let unavailable = registry.unavailable();
        assert!(unavailable["broken"].contains("lexicon missing"));
        assert_eq!(unavailable["explodes"], "factory panicked");
    }

    #[test]
    fn test_reregister_replaces_factory() {
        let mut registry = DetectorRegistry::new();
        registry.register("broken", failing);
        assert!(registry.get("broken").is_none());

        registry.register("broken", working);
        assert!(registry.get("broken").is_some());
        assert!(registry.unavailable().is_empty());
    }

    #[test]
    fn test_disabled_detectors_are_skipped() {
        let mut registry = default_registry();
        registry.disable("question");
        let loaded = registry.load_all();
        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded.last().unwrap().order, 4);

        registry.enable("question");
        assert_eq!(registry.load_all().len(), 6);
    }
}
