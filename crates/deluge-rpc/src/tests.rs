use std::collections::BTreeMap;
use std::io;
use std::io::Read;
use std::io::Write;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rencode::Value;

use crate::codec::split_body;
use crate::Client;
use crate::Codec;
use crate::Error;
use crate::ResponseHeader;

/// In-memory stand-in for the daemon connection: reads come from a
/// scripted buffer, writes are captured.
#[derive(Default)]
struct MockStream {
    input: io::Cursor<Vec<u8>>,
    output: Vec<u8>,
}

impl MockStream {
    fn scripted(frames: Vec<u8>) -> Self {
        Self {
            input: io::Cursor::new(frames),
            output: Vec::new(),
        }
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn zlib_frame(value: &Value) -> Vec<u8> {
    let mut zw = ZlibEncoder::new(Vec::new(), Compression::default());
    rencode::Encoder::new(&mut zw).encode(value).unwrap();
    zw.finish().unwrap()
}

fn response(kind: i64, seq: i64, payload: Value) -> Vec<u8> {
    zlib_frame(&Value::List(vec![Value::Int(kind), Value::Int(seq), payload]))
}

fn unzlib(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    ZlibDecoder::new(bytes).read_to_end(&mut out).unwrap();
    out
}

/// Writes a request through a codec and hands back the decoded inner tuple.
fn written_request(body: &Value) -> Vec<Value> {
    let mut codec = Codec::new(MockStream::default());
    codec.write_request(7, "core.get_session_state", body).unwrap();
    let written = codec.into_inner().output;

    let outer = rencode::from_bytes(&unzlib(&written)).unwrap();
    let Value::List(mut outer) = outer else {
        panic!("request is not a list");
    };
    assert_eq!(outer.len(), 1);
    let Value::List(tuple) = outer.remove(0) else {
        panic!("request body is not a list");
    };
    tuple
}

// ==== REQUEST FRAMING ====

#[test]
fn request_frame_matches_daemon_info_fixture() {
    let mut codec = Codec::new(MockStream::default());
    codec.write_request(1, "daemon.info", &Value::None).unwrap();
    let written = codec.into_inner().output;

    let mut expected = vec![0xC1, 0xC4, 0x01, 0x8B];
    expected.extend_from_slice(b"daemon.info");
    expected.extend_from_slice(&[0xC0, 0x66]);
    assert_eq!(unzlib(&written), expected);
}

#[test]
fn request_tuple_has_four_fields() {
    let tuple = written_request(&Value::None);
    assert_eq!(tuple.len(), 4);
    assert_eq!(tuple[0], Value::Int(7));
    assert_eq!(tuple[1], Value::Text("core.get_session_state".to_owned()));
    assert_eq!(tuple[2], Value::List(Vec::new()));
    assert_eq!(tuple[3], Value::Dict(BTreeMap::new()));
}

#[test]
fn list_body_becomes_positional_args() {
    let body = Value::List(vec![Value::Int(1), Value::Text("two".to_owned())]);
    let tuple = written_request(&body);
    assert_eq!(tuple[2], body);
    assert_eq!(tuple[3], Value::Dict(BTreeMap::new()));
}

#[test]
fn dict_body_is_searched_for_args_and_kwargs() {
    let mut kwargs = BTreeMap::new();
    kwargs.insert("timeout".to_owned(), Value::Int(30));

    let mut body = BTreeMap::new();
    body.insert("Args".to_owned(), Value::List(vec![Value::Int(9)]));
    body.insert("KWARGS".to_owned(), Value::Dict(kwargs.clone()));
    body.insert("ignored".to_owned(), Value::Int(1));

    let tuple = written_request(&Value::Dict(body));
    assert_eq!(tuple[2], Value::List(vec![Value::Int(9)]));
    assert_eq!(tuple[3], Value::Dict(kwargs));
}

#[test]
fn scalar_body_means_no_arguments() {
    let tuple = written_request(&Value::Int(42));
    assert_eq!(tuple[2], Value::List(Vec::new()));
    assert_eq!(tuple[3], Value::Dict(BTreeMap::new()));
}

#[test]
fn split_body_ignores_wrongly_shaped_parts() {
    let mut body = BTreeMap::new();
    body.insert("args".to_owned(), Value::Int(1));
    body.insert("kwargs".to_owned(), Value::Text("nope".to_owned()));
    let (args, kwargs) = split_body(&Value::Dict(body));
    assert!(args.is_empty());
    assert!(kwargs.is_empty());
}

// ==== RESPONSE CLASSIFICATION ====

#[test]
fn result_response_stashes_payload_once() {
    let stream = MockStream::scripted(response(1, 5, Value::Text("ok".to_owned())));
    let mut codec = Codec::new(stream);

    let mut header = ResponseHeader::default();
    codec.read_response_header(&mut header).unwrap();
    assert_eq!(header.seq, 5);

    assert_eq!(codec.read_response_body(), Some(Value::Text("ok".to_owned())));
    assert_eq!(codec.read_response_body(), None);
}

#[test]
fn error_response_names_the_remote_exception() {
    let payload = Value::List(vec![
        Value::Text("InvalidTorrentError".to_owned()),
        Value::Text("no such torrent".to_owned()),
        Value::Text("traceback (ignored)".to_owned()),
    ]);
    let mut codec = Codec::new(MockStream::scripted(response(2, 8, payload)));

    let mut header = ResponseHeader::default();
    let err = codec.read_response_header(&mut header).unwrap_err();
    // The seq is routed even on failure.
    assert_eq!(header.seq, 8);
    assert_eq!(err.to_string(), "InvalidTorrentError: no such torrent");
    assert!(err.is_recoverable());
    assert_eq!(codec.read_response_body(), None);
}

#[test]
fn event_frames_are_consumed_but_unsupported() {
    let frames = [
        response(3, 0, Value::List(vec![Value::Text("TorrentAddedEvent".to_owned())])),
        response(1, 2, Value::Int(11)),
    ]
    .concat();
    let mut codec = Codec::new(MockStream::scripted(frames));

    let mut header = ResponseHeader::default();
    let err = codec.read_response_header(&mut header).unwrap_err();
    assert_eq!(err.to_string(), "event is not supported");
    assert!(err.is_recoverable());

    // The frame was consumed; the next one reads cleanly.
    codec.read_response_header(&mut header).unwrap();
    assert_eq!(header.seq, 2);
    assert_eq!(codec.read_response_body(), Some(Value::Int(11)));
}

#[test]
fn unknown_message_kinds_are_rejected() {
    let mut codec = Codec::new(MockStream::scripted(response(9, 1, Value::None)));
    let mut header = ResponseHeader::default();
    let err = codec.read_response_header(&mut header).unwrap_err();
    assert_eq!(err.to_string(), "unknown message type");
    assert!(matches!(err, Error::UnknownMessageType(9)));
}

#[test]
fn malformed_envelopes_are_protocol_errors() {
    let mut codec = Codec::new(MockStream::scripted(zlib_frame(&Value::Int(1))));
    let mut header = ResponseHeader::default();
    assert!(matches!(
        codec.read_response_header(&mut header),
        Err(Error::Protocol(_)),
    ));

    let short = zlib_frame(&Value::List(vec![Value::Int(1), Value::Int(2)]));
    let mut codec = Codec::new(MockStream::scripted(short));
    assert!(matches!(
        codec.read_response_header(&mut header),
        Err(Error::Protocol(_)),
    ));
}

#[test]
fn corrupt_compression_fails_the_frame() {
    let mut codec = Codec::new(MockStream::scripted(vec![0xDE, 0xAD, 0xBE, 0xEF]));
    let mut header = ResponseHeader::default();
    let err = codec.read_response_header(&mut header).unwrap_err();
    assert!(!err.is_recoverable());
}

#[test]
fn back_to_back_frames_stay_aligned() {
    let frames = [
        response(1, 1, Value::Int(100)),
        response(1, 2, Value::Int(200)),
    ]
    .concat();
    let mut codec = Codec::new(MockStream::scripted(frames));

    let mut header = ResponseHeader::default();
    codec.read_response_header(&mut header).unwrap();
    assert_eq!(header.seq, 1);
    assert_eq!(codec.read_response_body(), Some(Value::Int(100)));

    codec.read_response_header(&mut header).unwrap();
    assert_eq!(header.seq, 2);
    assert_eq!(codec.read_response_body(), Some(Value::Int(200)));
}

// ==== CLIENT ====

#[test]
fn client_call_returns_typed_result() {
    let stream = MockStream::scripted(response(1, 1, Value::Text("2.1.1".to_owned())));
    let client = Client::new(stream);

    let version: String = client.call("daemon.info", Value::None).unwrap();
    assert_eq!(version, "2.1.1");

    // The request went out as seq 1 with no arguments.
    let written = client.into_inner().output;
    let outer = rencode::from_bytes(&unzlib(&written)).unwrap();
    assert_eq!(
        outer,
        Value::List(vec![Value::List(vec![
            Value::Int(1),
            Value::Text("daemon.info".to_owned()),
            Value::List(Vec::new()),
            Value::Dict(BTreeMap::new()),
        ])]),
    );
}

#[test]
fn client_surfaces_remote_errors() {
    let payload = Value::List(vec![
        Value::Text("BadLoginError".to_owned()),
        Value::Text("Password does not match".to_owned()),
    ]);
    let client = Client::new(MockStream::scripted(response(2, 1, payload)));

    let err = client.call_value("daemon.login", Value::None).unwrap_err();
    assert_eq!(err.to_string(), "BadLoginError: Password does not match");
}

#[test]
fn client_rejects_mismatched_sequence_numbers() {
    let client = Client::new(MockStream::scripted(response(1, 42, Value::Int(1))));

    let err = client.call_value("daemon.info", Value::None).unwrap_err();
    assert!(matches!(err, Error::SeqMismatch { expected: 1, got: 42 }));
}

#[test]
fn client_sequence_numbers_increase() {
    let frames = [
        response(1, 1, Value::None),
        response(1, 2, Value::None),
    ]
    .concat();
    let client = Client::new(MockStream::scripted(frames));

    client.call_value("core.pause_session", Value::None).unwrap();
    client.call_value("core.resume_session", Value::None).unwrap();
}

#[test]
fn client_call_with_sends_explicit_parts() {
    let client = Client::new(MockStream::scripted(response(1, 1, Value::Bool(true))));

    let mut kwargs = BTreeMap::new();
    kwargs.insert("paused".to_owned(), Value::Bool(true));
    let args = vec![Value::Text("magnet:?xt=urn:btih:aaaa".to_owned())];

    let result = client
        .call_with("core.add_torrent_magnet", args.clone(), kwargs.clone())
        .unwrap();
    assert_eq!(result, Value::Bool(true));

    let written = client.into_inner().output;
    let outer = rencode::from_bytes(&unzlib(&written)).unwrap();
    assert_eq!(
        outer,
        Value::List(vec![Value::List(vec![
            Value::Int(1),
            Value::Text("core.add_torrent_magnet".to_owned()),
            Value::List(args),
            Value::Dict(kwargs),
        ])]),
    );
}

#[test]
fn client_null_result_decodes_as_none() {
    let client = Client::new(MockStream::scripted(response(1, 1, Value::None)));
    let result: Option<i64> = client.call("core.pause_session", Value::None).unwrap();
    assert_eq!(result, None);
}
