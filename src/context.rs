use parking_lot::{Mutex, MutexGuard};

use crate::config::Config;
use crate::core::kv::{KvStore, MemoryStore};
use crate::generator::{ImageGenerator, PlaceholderGenerator};

/// Everything a handler needs: storage, the image generator and settings.
pub struct AppContext {
    store: Box<dyn KvStore>,
    generator: Box<dyn ImageGenerator>,
    config: Config,
    write_lock: Mutex<()>,
}

impl AppContext {
    pub fn new(store: Box<dyn KvStore>, generator: Box<dyn ImageGenerator>, config: Config) -> Self {
        Self {
            store,
            generator,
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Memory-backed context with the placeholder generator.
    pub fn in_memory(config: Config) -> Self {
        let generator = PlaceholderGenerator::new(config.generated_image_size);
        Self::new(Box::new(MemoryStore::new()), Box::new(generator), config)
    }

    #[cfg(target_arch = "wasm32")]
    pub fn from_spin() -> anyhow::Result<Self> {
        let config = Config::from_env();
        let generator = PlaceholderGenerator::new(config.generated_image_size);
        Ok(Self::new(
            Box::new(crate::core::kv::SpinStore::open_default()?),
            Box::new(generator),
            config,
        ))
    }

    pub fn store(&self) -> &dyn KvStore {
        self.store.as_ref()
    }

    pub fn generator(&self) -> &dyn ImageGenerator {
        self.generator.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Held for the duration of a mutating request so index updates don't interleave.
    pub fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock()
    }
}
