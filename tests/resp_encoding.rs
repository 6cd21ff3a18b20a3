//! Black-box RESP3 request-writer tests driven through the public API.

use redis_sentinel_resp::resp::{write_requests, Arg, KeywordArg, RawBytes, ToArg};

#[test]
fn a_pipeline_of_mixed_commands_produces_commands_in_order() {
    let mut buf = Vec::new();
    write_requests(
        &mut buf,
        vec![
            vec!["HELLO".to_arg(), 3_i64.to_arg()],
            vec!["SET".to_arg(), "k".to_arg(), "v".to_arg()],
            vec!["GET".to_arg(), "k".to_arg()],
        ],
        true,
    )
    .unwrap();

    assert_eq!(
        buf,
        b"*2\r\n$5\r\nHELLO\r\n:3\r\n\
          *3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n\
          *2\r\n$3\r\nGET\r\n$1\r\nk\r\n"
    );
}

#[test]
fn a_raw_bytes_wrapper_survives_a_binary_payload_verbatim() {
    let mut buf = Vec::new();
    let payload = RawBytes::new(vec![0xDE, 0xAD, 0xBE, 0xEF]);
    write_requests(&mut buf, vec![vec!["SET".to_arg(), "k".to_arg(), payload.to_arg()]], true).unwrap();
    assert!(buf.ends_with(&[0xDE, 0xAD, 0xBE, 0xEF, b'\r', b'\n']));
}

#[test]
fn a_namespaced_keyword_argument_encodes_qualified() {
    let mut buf = Vec::new();
    let kw: Arg = KeywordArg::qualified("GEO", "RADIUS").to_arg();
    write_requests(&mut buf, vec![vec![kw]], true).unwrap();
    assert_eq!(buf, b"*1\r\n$10\r\nGEO/RADIUS\r\n");
}

#[test]
fn an_encoding_error_leaves_the_sink_untouched() {
    let mut buf = Vec::new();
    let result = write_requests(&mut buf, vec![vec![Arg::Null]], false);
    assert!(result.is_err());
    assert!(buf.is_empty());
}
