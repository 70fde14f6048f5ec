//! Wire-level protocol: header framing, meta packs, packet assembly.

mod meta;
mod packet;
mod packet_buffer;
mod wire_format;

pub use meta::{
    decode_request_meta, decode_response_meta, encode_request_meta, encode_response_meta, err_code,
    CompressType, RequestMeta, ResponseMeta, REQUEST_META_TYPE, RESPONSE_META_TYPE,
};
pub use packet::{
    assemble_request_packet, assemble_response_packet, disassemble_request_packet,
    disassemble_response_packet, RequestPacket, ResponsePacket,
};
pub use packet_buffer::PacketBuffer;
pub use wire_format::{make_header, parse_header, Header, HEADER_SIZE, MAGIC, MAX_PACKET_SIZE};
