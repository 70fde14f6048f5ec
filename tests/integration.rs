//! Integration tests for hulu-pbrpc.
//!
//! End-to-end scenarios across the runtime: registration, request assembly,
//! disassembly, compression, and parse-handle behavior under re-registration.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use hulu_pbrpc::protocol::{
    disassemble_request_packet, disassemble_response_packet, err_code, CompressType, PacketBuffer,
    ResponseMeta,
};
use hulu_pbrpc::schema::BoxFuture;
use hulu_pbrpc::{
    DescriptorSource, Direction, MethodConfig, MethodKey, PbrpcError, ProtocolRuntime,
    ServiceConfig,
};
use prost::Message;
use prost_types::{
    field_descriptor_proto, DescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    FileDescriptorSet,
};
use serde_json::json;

/// In-memory descriptor source.
struct MemorySource(HashMap<String, Bytes>);

impl MemorySource {
    fn with(path: &str, data: Vec<u8>) -> Self {
        let mut files = HashMap::new();
        files.insert(path.to_string(), Bytes::from(data));
        Self(files)
    }
}

impl DescriptorSource for MemorySource {
    fn load(&self, path: &str) -> BoxFuture<'_, std::io::Result<Bytes>> {
        let result = self.0.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no file [{path}]"))
        });
        Box::pin(async move { result })
    }
}

/// Descriptor set defining demo.echo.{EchoRequest,EchoResponse}.
fn echo_descriptor_set() -> Vec<u8> {
    let field = FieldDescriptorProto {
        name: Some("text".to_string()),
        number: Some(1),
        label: Some(field_descriptor_proto::Label::Optional as i32),
        r#type: Some(field_descriptor_proto::Type::String as i32),
        json_name: Some("text".to_string()),
        ..Default::default()
    };
    let message = |name: &str| DescriptorProto {
        name: Some(name.to_string()),
        field: vec![field.clone()],
        ..Default::default()
    };
    let file = FileDescriptorProto {
        name: Some("echo.proto".to_string()),
        package: Some("demo.echo".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![message("EchoRequest"), message("EchoResponse")],
        ..Default::default()
    };
    FileDescriptorSet { file: vec![file] }.encode_to_vec()
}

fn echo_config(gzip: bool) -> ServiceConfig {
    ServiceConfig {
        service_name: "Echo".to_string(),
        descriptor_path: "echo.desc".to_string(),
        package_name: "demo.echo".to_string(),
        gzip,
        methods: [(
            "echo".to_string(),
            MethodConfig {
                msgin: "EchoRequest".to_string(),
                msgout: "EchoResponse".to_string(),
                index: 1,
            },
        )]
        .into_iter()
        .collect(),
    }
}

async fn echo_runtime(gzip: bool) -> ProtocolRuntime {
    let runtime = ProtocolRuntime::new();
    let source = MemorySource::with("echo.desc", echo_descriptor_set());
    runtime
        .register(vec![echo_config(gzip)], &source)
        .await
        .unwrap();
    runtime
}

fn text_of(message: &prost_reflect::DynamicMessage) -> String {
    message
        .get_field_by_name("text")
        .unwrap()
        .as_str()
        .unwrap()
        .to_string()
}

/// Uncompressed echo request through assembly and disassembly, checked
/// field by field.
#[tokio::test]
async fn test_echo_request_roundtrip() {
    let runtime = echo_runtime(false).await;

    let request = runtime
        .make_request("Echo", "echo", &json!({"text": "hi"}), None)
        .await
        .unwrap();

    assert_eq!(request.meta.correlation_id, 0);
    assert_eq!(request.meta.method_index, 1);
    assert_eq!(request.meta.compress_type, None);

    let packet = disassemble_request_packet(&request.packet).unwrap();
    assert_eq!(packet.meta, request.meta);
    assert_eq!(packet.meta.correlation_id, 0);
    assert_eq!(packet.meta.method_index, 1);
    assert!(packet.rest.is_empty());

    let message = runtime.read_request_payload(&packet).await.unwrap();
    assert_eq!(text_of(&message), "hi");
}

/// Gzip scenario: compress_type flagged as 2 on the wire, payload recovered
/// exactly after decompression.
#[tokio::test]
async fn test_echo_request_roundtrip_gzip() {
    let runtime = echo_runtime(true).await;

    let request = runtime
        .make_request("Echo", "echo", &json!({"text": "hi"}), None)
        .await
        .unwrap();
    assert_eq!(request.meta.compress_type, CompressType::Gzip.to_wire());
    assert_eq!(request.meta.compress_type, Some(2));

    let packet = disassemble_request_packet(&request.packet).unwrap();
    let message = runtime.read_request_payload(&packet).await.unwrap();
    assert_eq!(text_of(&message), "hi");
}

/// Full client/server exchange: request out, response built server-side,
/// response payload parsed client-side by method index.
#[tokio::test]
async fn test_request_response_exchange() {
    let runtime = echo_runtime(false).await;

    let request = runtime
        .make_request("Echo", "echo", &json!({"text": "ping"}), Some(1234))
        .await
        .unwrap();

    // Server side: disassemble, parse, respond.
    let inbound = disassemble_request_packet(&request.packet).unwrap();
    assert_eq!(inbound.meta.log_id, Some(1234));
    assert_eq!(inbound.meta.method_name.as_deref(), Some("echo"));
    let params = runtime.read_request_payload(&inbound).await.unwrap();
    assert_eq!(text_of(&params), "ping");

    let response = runtime
        .make_response(
            "Echo",
            &MethodKey::Index(inbound.meta.method_index),
            inbound.meta.correlation_id,
            &json!({"text": "pong"}),
        )
        .await
        .unwrap();

    // Client side: correlation id matches, payload decodes.
    let outbound = disassemble_response_packet(&response.packet).unwrap();
    assert_eq!(outbound.meta.correlation_id, request.meta.correlation_id);
    assert_eq!(outbound.meta.error_code, err_code::OK);

    let result = runtime
        .read_response_payload("Echo", &MethodKey::Name("echo".to_string()), &outbound)
        .await
        .unwrap();
    assert_eq!(text_of(&result), "pong");
}

/// Error responses need no schema and carry the negative code through.
#[tokio::test]
async fn test_error_response_roundtrip() {
    let runtime = ProtocolRuntime::new();

    let response = runtime
        .make_error_response(7, err_code::ERROR_SYS_ERROR, "boom")
        .unwrap();

    let packet = disassemble_response_packet(&response.packet).unwrap();
    assert_eq!(packet.meta.correlation_id, 7);
    assert_eq!(packet.meta.error_code, -4);
    assert_eq!(packet.meta.error_text, "boom");
    assert!(packet.payload.is_empty());
}

/// A success response echoing correlation id 0 with an all-default result
/// message assembles into a bare 12-byte packet and still round-trips.
#[tokio::test]
async fn test_empty_response_roundtrip() {
    let runtime = echo_runtime(false).await;

    let response = runtime
        .make_response("Echo", &MethodKey::Index(1), 0, &json!({}))
        .await
        .unwrap();
    assert_eq!(response.packet.len(), 12);

    let packet = disassemble_response_packet(&response.packet).unwrap();
    assert_eq!(packet.meta.correlation_id, 0);
    assert_eq!(packet.meta.error_code, err_code::OK);

    let message = runtime
        .read_response_payload("Echo", &MethodKey::Index(1), &packet)
        .await
        .unwrap();
    assert_eq!(text_of(&message), "");

    // Same shape via the error path: OK code, empty text, no payload.
    let response = runtime.make_error_response(0, err_code::OK, "").unwrap();
    let packet = disassemble_response_packet(&response.packet).unwrap();
    assert_eq!(packet.meta.correlation_id, 0);
    assert!(packet.payload.is_empty());
}

/// Correlation ids across sequential requests are strictly increasing.
#[tokio::test]
async fn test_correlation_ids_increase() {
    let runtime = echo_runtime(false).await;

    let mut previous = None;
    for _ in 0..5 {
        let request = runtime
            .make_request("Echo", "echo", &json!({"text": "x"}), None)
            .await
            .unwrap();
        if let Some(prev) = previous {
            assert!(request.meta.correlation_id > prev);
        }
        previous = Some(request.meta.correlation_id);
    }
}

/// Two packets written back to back disassemble in order via `rest`, and the
/// PacketBuffer splits the same stream when it arrives fragmented.
#[tokio::test]
async fn test_pipelined_packets() {
    let runtime = echo_runtime(false).await;

    let first = runtime
        .make_request("Echo", "echo", &json!({"text": "one"}), None)
        .await
        .unwrap();
    let second = runtime
        .make_request("Echo", "echo", &json!({"text": "two"}), None)
        .await
        .unwrap();

    let mut stream = first.packet.to_vec();
    stream.extend_from_slice(&second.packet);
    let stream = Bytes::from(stream);

    let one = disassemble_request_packet(&stream).unwrap();
    let two = disassemble_request_packet(&one.rest).unwrap();
    assert_eq!(one.meta.correlation_id, first.meta.correlation_id);
    assert_eq!(two.meta.correlation_id, second.meta.correlation_id);
    assert!(two.rest.is_empty());

    // Same stream, delivered in awkward fragments.
    let mut buffer = PacketBuffer::new();
    let mut packets = Vec::new();
    for chunk in stream.chunks(7) {
        packets.extend(buffer.push(chunk).unwrap());
    }
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0], first.packet);
    assert_eq!(packets[1], second.packet);
}

/// Parse handles are referentially stable and shared between name and index
/// addressing; re-registration replaces them.
#[tokio::test]
async fn test_parse_handle_stability_and_invalidation() {
    let runtime = echo_runtime(false).await;

    let by_name = runtime
        .parse_handle("Echo", &MethodKey::Name("echo".to_string()), Direction::Out)
        .unwrap();
    let by_index = runtime
        .parse_handle("Echo", &MethodKey::Index(1), Direction::Out)
        .unwrap();
    assert!(Arc::ptr_eq(&by_name, &by_index));

    // Re-register: the old handle must not survive.
    let source = MemorySource::with("echo.desc", echo_descriptor_set());
    runtime
        .register(vec![echo_config(false)], &source)
        .await
        .unwrap();

    let rebuilt = runtime
        .parse_handle("Echo", &MethodKey::Index(1), Direction::Out)
        .unwrap();
    assert!(!Arc::ptr_eq(&by_name, &rebuilt));
}

/// Lookups against unknown names fail with the right taxonomy.
#[tokio::test]
async fn test_unknown_service_and_method() {
    let runtime = echo_runtime(false).await;

    let err = runtime
        .make_request("Nope", "echo", &json!({}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PbrpcError::UnknownService(_)));

    let err = runtime
        .make_request("Echo", "nope", &json!({}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PbrpcError::UnknownMethod { .. }));
}

/// A service whose descriptor failed to load is registered but unusable:
/// every lookup errors instead of crashing.
#[tokio::test]
async fn test_failed_registration_lookups_error() {
    let runtime = ProtocolRuntime::new();
    let source = MemorySource(HashMap::new());

    let err = runtime
        .register(vec![echo_config(false)], &source)
        .await
        .unwrap_err();
    assert_eq!(err.0.len(), 1);

    assert!(runtime.service("Echo").is_some());

    let err = runtime
        .parse_handle("Echo", &MethodKey::Index(1), Direction::In)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        PbrpcError::UnknownService(_) | PbrpcError::UnknownMethod { .. }
    ));

    let err = runtime
        .make_request("Echo", "echo", &json!({"text": "hi"}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PbrpcError::UnknownService(_)));
}

/// An unsupported compress_type on an inbound packet is rejected before any
/// parsing is attempted.
#[tokio::test]
async fn test_unsupported_compression_rejected() {
    let runtime = echo_runtime(false).await;

    let meta = ResponseMeta {
        error_code: err_code::OK,
        error_text: String::new(),
        compress_type: Some(1),
        correlation_id: 3,
    };
    let bytes = hulu_pbrpc::protocol::assemble_response_packet(&meta, b"whatever").unwrap();
    let parsed = disassemble_response_packet(&bytes).unwrap();

    let err = runtime
        .read_response_payload("Echo", &MethodKey::Index(1), &parsed)
        .await
        .unwrap_err();
    assert!(matches!(err, PbrpcError::UnsupportedCompression(1)));
}
