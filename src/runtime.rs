//! Protocol runtime: the one object a process constructs.
//!
//! Owns the service registry, the parse-handle cache, and the correlation-id
//! counter, and wires them into the full outbound/inbound flows:
//!
//! - outbound request: registry lookup → payload serialization → optional
//!   gzip → meta build (fresh correlation id) → size-checked assembly
//! - inbound request: disassembled packet → decompress per meta →
//!   In-direction parse handle → typed message
//! - inbound response: caller names the in-flight service/method (the
//!   response meta does not carry them) → decompress → Out-direction handle
//!
//! Re-registering a service explicitly invalidates its cached parse handles,
//! so a hot-reloaded descriptor can never be parsed through the old schema.

use bytes::Bytes;
use prost_reflect::DynamicMessage;

use crate::cache::{Direction, MethodKey, ParseHandle, ParseHandleCache};
use crate::compress;
use crate::correlation::CorrelationIds;
use crate::error::{PbrpcError, Result};
use crate::protocol::{
    assemble_request_packet, assemble_response_packet, err_code, CompressType, RequestMeta,
    RequestPacket, ResponseMeta, ResponsePacket,
};
use crate::registry::{RegistrationErrors, ServiceConfig, ServiceEntry, ServiceRegistry};
use crate::schema::DescriptorSource;

use std::collections::HashMap;
use std::sync::Arc;

/// An assembled outbound request: the meta that went into it (the caller
/// needs the correlation id to match the response) plus the wire bytes.
#[derive(Debug, Clone)]
pub struct AssembledRequest {
    pub meta: RequestMeta,
    pub packet: Bytes,
}

/// An assembled outbound response.
#[derive(Debug, Clone)]
pub struct AssembledResponse {
    pub meta: ResponseMeta,
    pub packet: Bytes,
}

/// Process-wide protocol state, constructed once and passed by reference.
#[derive(Default)]
pub struct ProtocolRuntime {
    registry: ServiceRegistry,
    cache: ParseHandleCache,
    correlation: CorrelationIds,
}

impl ProtocolRuntime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one or many services, loading descriptors through `source`.
    ///
    /// Any parse handles cached for the named services are invalidated, so a
    /// re-registration fully replaces the old schema.
    pub async fn register(
        &self,
        configs: Vec<ServiceConfig>,
        source: &dyn DescriptorSource,
    ) -> std::result::Result<(), RegistrationErrors> {
        let names: Vec<String> = configs.iter().map(|c| c.service_name.clone()).collect();
        let result = self.registry.register(configs, source).await;
        for name in &names {
            self.cache.invalidate_service(name);
        }
        result
    }

    /// Look up a registered service.
    pub fn service(&self, service_name: &str) -> Option<Arc<ServiceEntry>> {
        self.registry.get(service_name)
    }

    /// Snapshot of all registered services.
    pub fn services(&self) -> HashMap<String, Arc<ServiceEntry>> {
        self.registry.all()
    }

    fn usable_entry(&self, service: &str) -> Result<(Arc<ServiceEntry>, Arc<crate::schema::Schema>)> {
        let entry = self
            .registry
            .get(service)
            .ok_or_else(|| PbrpcError::UnknownService(service.to_string()))?;
        let schema = entry
            .schema()
            .ok_or_else(|| PbrpcError::UnknownService(service.to_string()))?;
        Ok((entry, schema))
    }

    /// Build a complete request packet for `service.method`.
    ///
    /// Serializes `params` against the method's input type, applies gzip when
    /// the service config enables it (setting `compress_type` to 2), assigns
    /// the next correlation id, and assembles header + meta + payload.
    pub async fn make_request(
        &self,
        service: &str,
        method: &str,
        params: &serde_json::Value,
        log_id: Option<u64>,
    ) -> Result<AssembledRequest> {
        let (entry, schema) = self.usable_entry(service)?;
        let method_conf = entry
            .method(method)
            .ok_or_else(|| PbrpcError::UnknownMethod {
                service: service.to_string(),
                method: method.to_string(),
            })?;

        let full_name = format!("{}.{}", entry.package_name(), method_conf.msgin);
        let mut payload = Bytes::from(schema.serialize(params, &full_name)?);

        let compress = if entry.gzip_enabled() {
            payload = compress::gzip(payload).await?;
            CompressType::Gzip
        } else {
            CompressType::None
        };

        let meta = RequestMeta {
            service_name: service.to_string(),
            method_index: method_conf.index,
            compress_type: compress.to_wire(),
            correlation_id: self.correlation.next_id(),
            log_id,
            method_name: Some(method.to_string()),
        };

        let packet = assemble_request_packet(&meta, &payload)?;
        Ok(AssembledRequest { meta, packet })
    }

    /// Build a success response packet echoing `correlation_id`.
    ///
    /// `result` is serialized against the method's output type; gzip follows
    /// the service config, like the request side.
    pub async fn make_response(
        &self,
        service: &str,
        method: &MethodKey,
        correlation_id: u64,
        result: &serde_json::Value,
    ) -> Result<AssembledResponse> {
        let (entry, schema) = self.usable_entry(service)?;
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

        let full_name = format!("{}.{}", entry.package_name(), method_conf.msgout);
        let mut payload = Bytes::from(schema.serialize(result, &full_name)?);

        let compress = if entry.gzip_enabled() {
            payload = compress::gzip(payload).await?;
            CompressType::Gzip
        } else {
            CompressType::None
        };

        let meta = ResponseMeta {
            error_code: err_code::OK,
            error_text: String::new(),
            compress_type: compress.to_wire(),
            correlation_id,
        };

        let packet = assemble_response_packet(&meta, &payload)?;
        Ok(AssembledResponse { meta, packet })
    }

    /// Build an error response packet. Carries no payload, so it works even
    /// for services whose schema never loaded.
    pub fn make_error_response(
        &self,
        correlation_id: u64,
        error_code: i32,
        error_text: &str,
    ) -> Result<AssembledResponse> {
        let meta = ResponseMeta {
            error_code,
            error_text: error_text.to_string(),
            compress_type: None,
            correlation_id,
        };
        let packet = assemble_response_packet(&meta, &[])?;
        Ok(AssembledResponse { meta, packet })
    }

    /// The memoized parse function for a method and direction.
    pub fn parse_handle(
        &self,
        service: &str,
        method: &MethodKey,
        direction: Direction,
    ) -> Result<ParseHandle> {
        let entry = self
            .registry
            .get(service)
            .ok_or_else(|| PbrpcError::UnknownService(service.to_string()))?;
        self.cache.get_or_build(&entry, method, direction)
    }

    /// Decode the payload of an inbound request into a typed message.
    ///
    /// Service and method come from the request meta itself. Decompression
    /// (if flagged) completes before the parse runs; a decompression failure
    /// surfaces without attempting the parse.
    pub async fn read_request_payload(&self, packet: &RequestPacket) -> Result<DynamicMessage> {
        let compress = CompressType::from_wire(packet.meta.compress_type)?;
        let data = compress::decode_payload(compress, packet.payload.clone()).await?;
        let handle = self.parse_handle(
            &packet.meta.service_name,
            &MethodKey::Index(packet.meta.method_index),
            Direction::In,
        )?;
        handle(&data)
    }

    /// Decode the payload of an inbound response into a typed message.
    ///
    /// The response meta carries no service or method; the caller supplies
    /// them from the in-flight request matched by correlation id.
    pub async fn read_response_payload(
        &self,
        service: &str,
        method: &MethodKey,
        packet: &ResponsePacket,
    ) -> Result<DynamicMessage> {
        let compress = CompressType::from_wire(packet.meta.compress_type)?;
        let data = compress::decode_payload(compress, packet.payload.clone()).await?;
        let handle = self.parse_handle(service, method, Direction::Out)?;
        handle(&data)
    }
}
