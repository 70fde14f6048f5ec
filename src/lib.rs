//! # hulu-pbrpc
//!
//! Wire-level protocol core for the HULU pbrpc binary RPC protocol: framed,
//! length-prefixed packets carrying a protobuf meta pack and a protobuf
//! payload, with optional gzip compression and correlation-id based
//! request/response matching.
//!
//! ## Architecture
//!
//! - **Framing** ([`protocol`]): 12-byte `"HULU"` header, meta pack
//!   encode/decode, packet assembly/disassembly, fragmented-read buffering
//! - **Dispatch** ([`registry`], [`cache`]): per-service method tables
//!   compiled from descriptor blobs, with memoized parse handles
//! - **Pipelines** ([`compress`]): async gzip on payloads
//! - **Glue** ([`runtime`]): one [`ProtocolRuntime`] per process ties it all
//!   together
//!
//! The crate is endpoint-agnostic: it turns raw bytes into typed packets and
//! back, and leaves sockets, reconnection, and retry policy to the transport.
//!
//! ## Example
//!
//! ```ignore
//! use hulu_pbrpc::{FsDescriptorSource, ProtocolRuntime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = ProtocolRuntime::new();
//!     let configs = serde_json::from_str(&std::fs::read_to_string("services.json")?)?;
//!     runtime.register(configs, &FsDescriptorSource).await?;
//!
//!     let request = runtime
//!         .make_request("EchoService", "echo", &serde_json::json!({"text": "hi"}), None)
//!         .await?;
//!     // hand request.packet to the transport...
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod compress;
pub mod correlation;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod schema;

mod runtime;

pub use cache::{Direction, MethodKey, ParseHandle, ParseHandleCache};
pub use error::{PbrpcError, Result};
pub use registry::{MethodConfig, RegistrationErrors, ServiceConfig, ServiceRegistry};
pub use runtime::{AssembledRequest, AssembledResponse, ProtocolRuntime};
pub use schema::{DescriptorSource, FsDescriptorSource, Schema};
