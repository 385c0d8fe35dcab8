use std::sync::{Arc, Weak};

use naga::FastHashMap;
use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::module::{CacheEntry, ModuleContent, ShaderModule};
use crate::ShaderError;

new_key_type! { pub(crate) struct ModuleKey; }

/// Device-wide de-duplication of shader modules by content.
///
/// The cache only holds weak references. A module removes its own entry when the last strong
/// reference to it is dropped.
#[derive(Debug, Default)]
pub struct ModuleCache {
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    modules: SlotMap<ModuleKey, Weak<ShaderModule>>,
    keys: FastHashMap<ModuleContent, ModuleKey>,
}

impl CacheInner {
    fn get(&self, content: &ModuleContent) -> Option<Arc<ShaderModule>> {
        let key = self.keys.get(content)?;
        self.modules.get(*key)?.upgrade()
    }
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live module with `content`, creating it with `create` if there is none.
    ///
    /// `create` runs without the cache locked, so distinct modules are created in parallel. If
    /// another thread inserts the same content meanwhile, its module wins and ours is discarded.
    /// Failed creations aren't cached.
    pub fn get_or_create(
        self: &Arc<Self>,
        content: ModuleContent,
        create: impl FnOnce(ModuleContent) -> Result<ShaderModule, ShaderError>,
    ) -> Result<Arc<ShaderModule>, ShaderError> {
        if let Some(module) = self.get(&content) {
            log::debug!("shader module {:?} served from cache", module.label().unwrap_or(""));
            return Ok(module);
        }

        let module = create(content.clone())?;

        let mut inner = self.inner.lock();
        if let Some(existing) = inner.get(&content) {
            return Ok(existing);
        }

        // The content may still map to a module that's mid-drop.
        if let Some(stale) = inner.keys.remove(&content) {
            inner.modules.remove(stale);
        }

        let key = inner.modules.insert(Weak::new());
        let module = Arc::new(module.attach(CacheEntry {
            cache: Arc::downgrade(self),
            key,
        }));
        inner.modules[key] = Arc::downgrade(&module);
        inner.keys.insert(content, key);

        Ok(module)
    }

    pub fn get(&self, content: &ModuleContent) -> Option<Arc<ShaderModule>> {
        self.inner.lock().get(content)
    }

    pub fn contains(&self, content: &ModuleContent) -> bool {
        let inner = self.inner.lock();
        inner
            .keys
            .get(content)
            .and_then(|&key| inner.modules.get(key))
            .map_or(false, |module| module.strong_count() > 0)
    }

    /// Number of live cached modules.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .modules
            .values()
            .filter(|module| module.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn remove(&self, key: ModuleKey, content: &ModuleContent) {
        let mut inner = self.inner.lock();
        inner.modules.remove(key);
        if inner.keys.get(content) == Some(&key) {
            inner.keys.remove(content);
        }
    }
}
