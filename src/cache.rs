//! Parse-handle cache.
//!
//! Decoding a payload needs the service's compiled schema plus the
//! fully-qualified message type of the method and direction involved. That
//! resolution is cheap but sits on the hot path of every inbound packet, so
//! the bound parse function is built once and memoized under a typed
//! composite key: `(service, method name or index, direction)`.
//!
//! A handle built from a method name is also stored under the method's index
//! (and vice versa) in the same critical section, so both addressings hit the
//! same function afterwards. Entries live until the owning service is
//! re-registered, at which point [`ParseHandleCache::invalidate_service`]
//! drops them.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use prost_reflect::DynamicMessage;

use crate::error::{PbrpcError, Result};
use crate::registry::ServiceEntry;

/// Which side of a method the handle decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The method's input message (`msgin`).
    In,
    /// The method's output message (`msgout`).
    Out,
}

/// Method addressing: by name or by wire index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodKey {
    Name(String),
    Index(u32),
}

impl From<&str> for MethodKey {
    fn from(name: &str) -> Self {
        MethodKey::Name(name.to_string())
    }
}

impl From<u32> for MethodKey {
    fn from(index: u32) -> Self {
        MethodKey::Index(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    service: String,
    method: MethodKey,
    direction: Direction,
}

/// A bound parse function: raw bytes in, typed message out.
pub type ParseHandle = Arc<dyn Fn(&[u8]) -> Result<DynamicMessage> + Send + Sync>;

/// Process-wide memo of `(service, method, direction)` → parse function.
#[derive(Default)]
pub struct ParseHandleCache {
    entries: RwLock<HashMap<CacheKey, ParseHandle>>,
}

impl ParseHandleCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up (or build and memoize) the parse handle for a method.
    ///
    /// Repeated calls with the same key return the same function reference,
    /// whether addressed by name or by index.
    ///
    /// # Errors
    ///
    /// - [`PbrpcError::UnknownMethod`] if the method does not resolve
    /// - [`PbrpcError::UnknownService`] if the entry has no usable schema
    ///   (its descriptor load failed)
    /// - [`PbrpcError::UnknownMessageType`] if the configured message type is
    ///   missing from the compiled descriptor
    pub fn get_or_build(
        &self,
        entry: &ServiceEntry,
        method: &MethodKey,
        direction: Direction,
    ) -> Result<ParseHandle> {
        let service = entry.service_name();

        {
            let entries = self.entries.read().expect("cache lock poisoned");
            if let Some(handle) = entries.get(&CacheKey {
                service: service.to_string(),
                method: method.clone(),
                direction,
            }) {
                return Ok(handle.clone());
            }
        }

        // Resolve both addressings of the method.
        let method_name = match method {
            MethodKey::Index(index) => entry
                .method_name_by_index(*index)
                .ok_or_else(|| PbrpcError::UnknownMethod {
                    service: service.to_string(),
                    method: format!("#{index}"),
                })?
                .to_string(),
            MethodKey::Name(name) => name.clone(),
        };
        let method_conf =
            entry
                .method(&method_name)
                .ok_or_else(|| PbrpcError::UnknownMethod {
                    service: service.to_string(),
                    method: method_name.clone(),
                })?;
        let method_index = method_conf.index;

        let schema = entry
            .schema()
            .ok_or_else(|| PbrpcError::UnknownService(service.to_string()))?;

        let message_type = match direction {
            Direction::In => &method_conf.msgin,
            Direction::Out => &method_conf.msgout,
        };
        let full_name = format!("{}.{}", entry.package_name(), message_type);

        // Resolve the descriptor eagerly so a bad type name fails here, not
        // on first parse.
        let descriptor = schema.message_descriptor(&full_name)?;
        let handle: ParseHandle = Arc::new(move |buf: &[u8]| {
            DynamicMessage::decode(descriptor.clone(), buf).map_err(PbrpcError::from)
        });

        let mut entries = self.entries.write().expect("cache lock poisoned");
        // Another caller may have built the handle while we resolved; keep
        // theirs so references stay stable.
        let name_key = CacheKey {
            service: service.to_string(),
            method: MethodKey::Name(method_name),
            direction,
        };
        if let Some(existing) = entries.get(&name_key) {
            return Ok(existing.clone());
        }
        let index_key = CacheKey {
            service: service.to_string(),
            method: MethodKey::Index(method_index),
            direction,
        };
        entries.insert(name_key, handle.clone());
        entries.insert(index_key, handle.clone());
        Ok(handle)
    }

    /// Drop every cached handle bound to `service`.
    pub fn invalidate_service(&self, service: &str) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.retain(|key, _| key.service != service);
    }

    /// Number of cached entries (dual-indexed handles count twice).
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
