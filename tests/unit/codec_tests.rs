//! Unit tests for the line-framing codec.

use bytes::BytesMut;
use enclave_agent::rpc::codec::{Frame, RpcCodec};
use enclave_agent::AgentError;
use futures_util::StreamExt;
use tokio_util::codec::{Decoder, FramedRead};

#[test]
fn decodes_complete_line_and_strips_newline() {
    let mut codec = RpcCodec::default();
    let mut buf = BytesMut::from(&b"{\"method\":\"ping\"}\n"[..]);

    let frame = codec.decode(&mut buf).expect("decode succeeds");

    assert_eq!(frame, Some(Frame::Line("{\"method\":\"ping\"}".into())));
}

#[test]
fn buffers_partial_line_until_newline_arrives() {
    let mut codec = RpcCodec::default();
    let mut buf = BytesMut::from(&b"{\"meth"[..]);

    assert_eq!(codec.decode(&mut buf).expect("decode succeeds"), None);

    buf.extend_from_slice(b"od\":\"ping\"}\n");
    let frame = codec.decode(&mut buf).expect("decode succeeds");
    assert_eq!(frame, Some(Frame::Line("{\"method\":\"ping\"}".into())));
}

#[test]
fn drains_multiple_buffered_lines_in_order() {
    let mut codec = RpcCodec::default();
    let mut buf = BytesMut::from(&b"first\nsecond\n"[..]);

    assert_eq!(
        codec.decode(&mut buf).expect("decode succeeds"),
        Some(Frame::Line("first".into()))
    );
    assert_eq!(
        codec.decode(&mut buf).expect("decode succeeds"),
        Some(Frame::Line("second".into()))
    );
    assert_eq!(codec.decode(&mut buf).expect("decode succeeds"), None);
}

#[test]
fn oversized_line_yields_sentinel_then_stream_recovers() {
    let mut codec = RpcCodec::new(8);
    let mut buf = BytesMut::from(&b"aaaaaaaaaaaaaaaa\nok\n"[..]);

    // Not a decode error: an error would terminate a framed stream.
    let frame = codec.decode(&mut buf).expect("decode succeeds");
    assert_eq!(frame, Some(Frame::Oversized));

    // The codec discards up to the next newline and resumes.
    let frame = codec.decode(&mut buf).expect("decode succeeds");
    assert_eq!(frame, Some(Frame::Line("ok".into())));
}

#[tokio::test]
async fn framed_stream_survives_oversized_line() {
    let input: &[u8] = b"aaaaaaaaaaaaaaaa\n{\"x\":1}\n";
    let mut frames = FramedRead::new(input, RpcCodec::new(8));

    assert_eq!(
        frames.next().await.transpose().expect("decode succeeds"),
        Some(Frame::Oversized)
    );
    assert_eq!(
        frames.next().await.transpose().expect("decode succeeds"),
        Some(Frame::Line("{\"x\":1}".into()))
    );
    assert_eq!(
        frames.next().await.transpose().expect("decode succeeds"),
        None
    );
}

#[test]
fn invalid_utf8_line_is_a_transport_error() {
    let mut codec = RpcCodec::default();
    let mut buf = BytesMut::from(&[0xff, 0xfe, b'\n'][..]);

    let err = codec.decode(&mut buf).expect_err("decode rejected");
    assert!(matches!(err, AgentError::Internal(_)));
}

#[test]
fn decode_eof_yields_final_unterminated_line() {
    let mut codec = RpcCodec::default();
    let mut buf = BytesMut::from(&b"tail-line"[..]);

    assert_eq!(codec.decode(&mut buf).expect("decode succeeds"), None);

    let frame = codec.decode_eof(&mut buf).expect("decode_eof succeeds");
    assert_eq!(frame, Some(Frame::Line("tail-line".into())));
    assert_eq!(codec.decode_eof(&mut buf).expect("decode_eof succeeds"), None);
}
