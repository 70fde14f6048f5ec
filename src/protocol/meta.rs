//! Meta pack encoding and decoding.
//!
//! Every packet carries a protobuf-encoded metadata message right after the
//! header: [`RequestMeta`] on the request side, [`ResponseMeta`] on the
//! response side. The messages are defined here as hand-written `prost`
//! derives with fixed tags; compression applies only to the payload, never to
//! the meta pack.

use prost::Message;

use crate::error::{PbrpcError, Result};

/// Fully-qualified type name of the request meta message.
pub const REQUEST_META_TYPE: &str = "baidu.hulu.pbrpc.RpcRequestMeta";

/// Fully-qualified type name of the response meta message.
pub const RESPONSE_META_TYPE: &str = "baidu.hulu.pbrpc.RpcResponseMeta";

/// Base error codes carried in [`ResponseMeta::error_code`].
///
/// Zero is success, negative values are protocol-defined errors, positive
/// values are reserved for transport/system codes.
pub mod err_code {
    pub const OK: i32 = 0;
    pub const ERROR_NOTIFY: i32 = -1;
    pub const ERROR_INVALID_ARGS: i32 = -2;
    pub const ERROR_INVALID_LISTEN_ADDR: i32 = -3;
    pub const ERROR_SYS_ERROR: i32 = -4;
    pub const ERROR_NET_ERROR: i32 = -5;
    pub const ERROR_CONNECT_ERROR: i32 = -6;
    pub const ERROR_NOT_CREATED: i32 = -7;
    pub const ERROR_NO_MEMORY: i32 = -8;
    /// Thread pool has stopped or was never started.
    pub const ERROR_NO_WORKER: i32 = -9;
    pub const ERROR_AFTER_BROKEN: i32 = -10;
    pub const ERROR_ALREADY_FREED: i32 = -11;
    pub const ERROR_ALREADY_EXECED: i32 = -12;
    pub const ERROR_CONNECT_TIMEDOUT: i32 = -13;
    pub const ERROR_BUF_WRITE_STREAM_IS_EMPTY: i32 = -14;
    pub const ERROR_BUF_WRITE_STREAM_NO_AVAILABLE: i32 = -15;
    pub const ERROR_CONN_CLOSED: i32 = -16;
    pub const ERROR_END: i32 = -50;
}

/// Payload compression scheme, as carried in the `compress_type` meta field.
///
/// The wire value is a bare integer; only absent/0 (no compression) and 2
/// (gzip) are valid. Every other value is rejected deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressType {
    None,
    Gzip,
}

impl CompressType {
    /// Wire value for gzip, the only supported compression scheme.
    pub const GZIP_WIRE: u32 = 2;

    /// Interpret a wire-level `compress_type` field.
    pub fn from_wire(value: Option<u32>) -> Result<Self> {
        match value {
            None | Some(0) => Ok(CompressType::None),
            Some(Self::GZIP_WIRE) => Ok(CompressType::Gzip),
            Some(other) => Err(PbrpcError::UnsupportedCompression(other)),
        }
    }

    /// Wire representation; `None` stays absent rather than encoding a zero.
    pub fn to_wire(self) -> Option<u32> {
        match self {
            CompressType::None => None,
            CompressType::Gzip => Some(Self::GZIP_WIRE),
        }
    }
}

/// Request meta pack (`baidu.hulu.pbrpc.RpcRequestMeta`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestMeta {
    /// Target service name.
    #[prost(string, tag = "1")]
    pub service_name: ::prost::alloc::string::String,
    /// Method index within the service (assigned at registration).
    #[prost(uint32, tag = "2")]
    pub method_index: u32,
    /// Payload compression, see [`CompressType`]; absent means none.
    #[prost(uint32, optional, tag = "3")]
    pub compress_type: ::core::option::Option<u32>,
    /// Process-unique, monotonically increasing request id.
    #[prost(uint64, tag = "4")]
    pub correlation_id: u64,
    /// Optional caller-supplied log correlation value.
    #[prost(uint64, optional, tag = "5")]
    pub log_id: ::core::option::Option<u64>,
    /// Method name, carried for convenience alongside the index.
    #[prost(string, optional, tag = "6")]
    pub method_name: ::core::option::Option<::prost::alloc::string::String>,
}

/// Response meta pack (`baidu.hulu.pbrpc.RpcResponseMeta`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseMeta {
    /// Zero on success, negative on defined errors, see [`err_code`].
    #[prost(int32, tag = "1")]
    pub error_code: i32,
    /// Human-readable error description.
    #[prost(string, tag = "2")]
    pub error_text: ::prost::alloc::string::String,
    /// Payload compression, see [`CompressType`]; absent means none.
    #[prost(uint32, optional, tag = "3")]
    pub compress_type: ::core::option::Option<u32>,
    /// Echo of the request's correlation id, used for matching.
    #[prost(uint64, tag = "4")]
    pub correlation_id: u64,
}

/// Serialize a request meta pack.
pub fn encode_request_meta(meta: &RequestMeta) -> Vec<u8> {
    meta.encode_to_vec()
}

/// Serialize a response meta pack.
pub fn encode_response_meta(meta: &ResponseMeta) -> Vec<u8> {
    meta.encode_to_vec()
}

/// Decode a request meta pack from its exact byte slice.
pub fn decode_request_meta(buf: &[u8]) -> Result<RequestMeta> {
    RequestMeta::decode(buf).map_err(PbrpcError::from)
}

/// Decode a response meta pack from its exact byte slice.
pub fn decode_response_meta(buf: &[u8]) -> Result<ResponseMeta> {
    ResponseMeta::decode(buf).map_err(PbrpcError::from)
}
