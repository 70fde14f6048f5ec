//! Compiled schema handles and descriptor loading.
//!
//! A [`Schema`] wraps a `prost_reflect::DescriptorPool` compiled from a raw
//! descriptor blob (a serialized `FileDescriptorSet`, the `.desc` output of
//! `protoc`). Message types are addressed by fully-qualified name and resolve
//! at use time; the registry does not verify up front that a descriptor
//! defines any particular service.
//!
//! Descriptor bytes come from a [`DescriptorSource`], the async collaborator
//! that owns where blobs actually live (usually the filesystem).

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};

use crate::error::{PbrpcError, Result};

/// Boxed future, used at the descriptor-loading seam.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Async producer of descriptor blobs, keyed by path.
pub trait DescriptorSource: Send + Sync {
    /// Load the raw descriptor bytes behind `path`.
    fn load(&self, path: &str) -> BoxFuture<'_, std::io::Result<Bytes>>;
}

/// [`DescriptorSource`] reading `.desc` files from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDescriptorSource;

impl DescriptorSource for FsDescriptorSource {
    fn load(&self, path: &str) -> BoxFuture<'_, std::io::Result<Bytes>> {
        let path = path.to_string();
        Box::pin(async move { tokio::fs::read(path).await.map(Bytes::from) })
    }
}

/// A compiled schema: serialize/parse capability per fully-qualified type.
#[derive(Debug, Clone)]
pub struct Schema {
    pool: DescriptorPool,
}

impl Schema {
    /// Compile a schema from a raw descriptor blob.
    pub fn compile(bytes: &[u8]) -> Result<Self> {
        let pool = DescriptorPool::decode(bytes)
            .map_err(|e| PbrpcError::SchemaCompile(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Resolve a message descriptor by fully-qualified type name.
    pub fn message_descriptor(&self, type_name: &str) -> Result<MessageDescriptor> {
        self.pool
            .get_message_by_name(type_name)
            .ok_or_else(|| PbrpcError::UnknownMessageType(type_name.to_string()))
    }

    /// Serialize a JSON-shaped value as the named message type.
    pub fn serialize(&self, value: &serde_json::Value, type_name: &str) -> Result<Vec<u8>> {
        let descriptor = self.message_descriptor(type_name)?;
        let message = DynamicMessage::deserialize(descriptor, value.clone()).map_err(|e| {
            PbrpcError::PayloadSerialize {
                type_name: type_name.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(prost::Message::encode_to_vec(&message))
    }

    /// Parse raw bytes as the named message type.
    pub fn parse(&self, buf: &[u8], type_name: &str) -> Result<DynamicMessage> {
        let descriptor = self.message_descriptor(type_name)?;
        DynamicMessage::decode(descriptor, buf).map_err(PbrpcError::from)
    }
}
