//! Service registry: per-service configuration and descriptor loading.
//!
//! The registry maps service names to [`ServiceEntry`] records. Registration
//! takes one or many [`ServiceConfig`]s, loads each distinct descriptor path
//! exactly once through a [`DescriptorSource`], compiles the blob into a
//! [`Schema`], and fans the result out to every service that named the path.
//! A load or compile failure leaves an *empty* entry behind (configuration
//! kept, schema cleared) so later lookups fail predictably instead of seeing
//! stale data; the errors are aggregated and reported once when the whole
//! batch has resolved.
//!
//! Entries live for the process lifetime and are only ever overwritten: a
//! later registration for the same service name wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Deserialize;
use thiserror::Error;

use crate::error::{PbrpcError, Result};
use crate::schema::{DescriptorSource, Schema};

/// One method of a service, as supplied at registration.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodConfig {
    /// Input message type name, relative to the package.
    pub msgin: String,
    /// Output message type name, relative to the package.
    pub msgout: String,
    /// Wire index of the method, assigned by the caller, unique per service.
    pub index: u32,
}

/// Registration input for one service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Unique service name.
    pub service_name: String,
    /// Path of the compiled descriptor (`.desc`) this service's types live in.
    pub descriptor_path: String,
    /// Package prefix for resolving message type names.
    pub package_name: String,
    /// Whether outbound payloads for this service are gzip-compressed.
    #[serde(default)]
    pub gzip: bool,
    /// Methods by name.
    pub methods: HashMap<String, MethodConfig>,
}

/// Registry record for one service.
///
/// Holds the original configuration, the reverse index (method index → name,
/// built once at registration), and the compiled schema. An entry without a
/// schema is "empty": its descriptor failed to load, and every lookup through
/// it fails with [`PbrpcError::UnknownService`].
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    config: ServiceConfig,
    reverse_index: HashMap<u32, String>,
    schema: Option<Arc<Schema>>,
}

impl ServiceEntry {
    /// Build an entry around a compiled schema.
    ///
    /// # Errors
    ///
    /// [`PbrpcError::DuplicateMethodIndex`] if two methods share an index;
    /// the reverse index must resolve every index back to exactly one method.
    pub fn compiled(config: ServiceConfig, schema: Arc<Schema>) -> Result<Self> {
        let mut reverse_index = HashMap::with_capacity(config.methods.len());
        for (name, method) in &config.methods {
            if reverse_index.insert(method.index, name.clone()).is_some() {
                return Err(PbrpcError::DuplicateMethodIndex {
                    service: config.service_name.clone(),
                    index: method.index,
                });
            }
        }
        Ok(Self {
            config,
            reverse_index,
            schema: Some(schema),
        })
    }

    /// Build an empty entry: configuration without a usable schema.
    pub fn empty(config: ServiceConfig) -> Self {
        Self {
            config,
            reverse_index: HashMap::new(),
            schema: None,
        }
    }

    /// The service's unique name.
    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }

    /// Package prefix for message type resolution.
    pub fn package_name(&self) -> &str {
        &self.config.package_name
    }

    /// Whether payloads of this service are gzip-compressed on send.
    pub fn gzip_enabled(&self) -> bool {
        self.config.gzip
    }

    /// Method configuration by name.
    pub fn method(&self, name: &str) -> Option<&MethodConfig> {
        self.config.methods.get(name)
    }

    /// Reverse lookup: method name by wire index.
    pub fn method_name_by_index(&self, index: u32) -> Option<&str> {
        self.reverse_index.get(&index).map(String::as_str)
    }

    /// The compiled schema, if the descriptor loaded.
    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.schema.clone()
    }
}

/// Errors aggregated across one registration batch.
#[derive(Debug, Error)]
#[error("{} error(s) during service registration", .0.len())]
pub struct RegistrationErrors(pub Vec<PbrpcError>);

/// Name → entry mapping for every registered service.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Arc<ServiceEntry>>>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one or many services, loading their descriptors.
    ///
    /// Distinct descriptor paths are loaded exactly once; services sharing a
    /// path share the compiled schema (logged, not an error: descriptors do
    /// not declare which services they serve, types resolve at use time).
    /// Every path is attempted even when an earlier one fails; the combined
    /// errors come back in one [`RegistrationErrors`].
    pub async fn register(
        &self,
        configs: Vec<ServiceConfig>,
        source: &dyn DescriptorSource,
    ) -> std::result::Result<(), RegistrationErrors> {
        if configs.is_empty() {
            return Err(RegistrationErrors(vec![PbrpcError::EmptyRegistration]));
        }

        let mut by_path: HashMap<String, Vec<ServiceConfig>> = HashMap::new();
        for config in configs {
            by_path
                .entry(config.descriptor_path.clone())
                .or_default()
                .push(config);
        }

        let mut errors = Vec::new();

        for (path, configs) in by_path {
            if configs.len() > 1 {
                let names: Vec<&str> = configs.iter().map(|c| c.service_name.as_str()).collect();
                tracing::warn!("repeat to load [{}] for services {:?}", path, names);
            }

            match source.load(&path).await {
                Ok(data) => {
                    tracing::debug!("load [{}] ok, data length is {}", path, data.len());
                    match Schema::compile(&data).map(Arc::new) {
                        Ok(schema) => {
                            for config in configs {
                                match ServiceEntry::compiled(config.clone(), schema.clone()) {
                                    Ok(entry) => self.insert(entry),
                                    Err(e) => {
                                        errors.push(e);
                                        self.insert(ServiceEntry::empty(config));
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            tracing::error!("compile [{}] failed: {}", path, e);
                            for config in configs {
                                self.insert(ServiceEntry::empty(config));
                            }
                            errors.push(e);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("load [{}] failed: {}", path, e);
                    for config in configs {
                        self.insert(ServiceEntry::empty(config));
                    }
                    errors.push(PbrpcError::DescriptorLoad { path, source: e });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RegistrationErrors(errors))
        }
    }

    fn insert(&self, entry: ServiceEntry) {
        let mut services = self.services.write().expect("registry lock poisoned");
        services.insert(entry.service_name().to_string(), Arc::new(entry));
    }

    /// Look up a service by name.
    pub fn get(&self, service_name: &str) -> Option<Arc<ServiceEntry>> {
        let services = self.services.read().expect("registry lock poisoned");
        services.get(service_name).cloned()
    }

    /// Snapshot of every registered service.
    pub fn all(&self) -> HashMap<String, Arc<ServiceEntry>> {
        self.services.read().expect("registry lock poisoned").clone()
    }
}
