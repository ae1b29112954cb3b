use std::collections::BTreeMap;

use strum::IntoEnumIterator;

use crate::{Config, GenBox, generator::Provider};

/// Provider identifier to generator, built once per run and read-only afterwards.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, GenBox>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One generator per known provider, each holding whatever key the config has for it.
    /// Providers without a key are still registered and fail when asked to generate.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for provider in Provider::iter() {
            registry.register(provider.id(), provider.make(config.api_key(provider)));
        }
        registry
    }

    pub fn register(&mut self, id: impl Into<String>, generator: GenBox) -> &mut Self {
        self.generators.insert(id.into(), generator);
        self
    }

    pub fn get(&self, id: &str) -> Option<&GenBox> {
        self.generators.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.generators.contains_key(id)
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;

    #[test]
    fn from_config_registers_every_provider() {
        let config = Config::load(MemoryStore::default()).unwrap();
        let registry = GeneratorRegistry::from_config(&config);

        assert_eq!(
            registry.providers().collect::<Vec<_>>(),
            vec!["openai", "stability"]
        );
        for id in ["openai", "stability"] {
            assert!(registry.contains(id));
            assert_eq!(registry.get(id).map(|g| g.provider()), Some(id));
        }
        assert!(!registry.contains("midjourney"));
        assert!(registry.get("midjourney").is_none());
    }
}
