//! Error types for hulu-pbrpc.

use thiserror::Error;

/// Main error type for all protocol operations.
#[derive(Debug, Error)]
pub enum PbrpcError {
    /// Frame header too short or internally inconsistent.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The first four bytes are not the HULU magic tag.
    #[error("protocol mismatch: magic bytes {0:?}")]
    ProtocolMismatch([u8; 4]),

    /// Declared meta size exceeds the actual buffer.
    #[error("truncated meta pack: need {declared} bytes, {available} available")]
    TruncatedMeta { declared: usize, available: usize },

    /// Declared total size exceeds the actual buffer.
    #[error("truncated payload: need {declared} bytes, {available} available")]
    TruncatedPayload { declared: usize, available: usize },

    /// No configuration (or no usable schema) for the named service.
    #[error("no config for service [{0}]")]
    UnknownService(String),

    /// Method not defined on the service.
    #[error("no config method [{method}] on the service [{service}]")]
    UnknownMethod { service: String, method: String },

    /// Message type not defined in the compiled descriptor.
    #[error("message type [{0}] not found in descriptor")]
    UnknownMessageType(String),

    /// compress_type carried a value other than absent/0/2.
    #[error("compress_type {0} invalid or not supported")]
    UnsupportedCompression(u32),

    /// meta + payload exceed the hard packet ceiling.
    #[error("packet size {size} beyond the maximum limit {limit}")]
    PacketTooLarge { size: usize, limit: usize },

    /// Descriptor file could not be loaded.
    #[error("failed to load descriptor [{path}]: {source}")]
    DescriptorLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor bytes did not compile into a schema.
    #[error("schema compile failed: {0}")]
    SchemaCompile(String),

    /// Two methods of one service share an index.
    #[error("duplicate method index {index} on service [{service}]")]
    DuplicateMethodIndex { service: String, index: u32 },

    /// Metadata block failed to decode as protobuf.
    #[error("meta decode error: {0}")]
    MetaDecode(#[from] prost::DecodeError),

    /// Payload value did not serialize against its message type.
    #[error("payload serialize error for [{type_name}]: {message}")]
    PayloadSerialize { type_name: String, message: String },

    /// I/O error from compression or descriptor loading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Registration called with no service configurations.
    #[error("pbrpc configures is empty")]
    EmptyRegistration,
}

/// Result type alias using PbrpcError.
pub type Result<T> = std::result::Result<T, PbrpcError>;
