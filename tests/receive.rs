//! End-to-end receive cycles over scripted readers.
//!
//! Each test drives [`receive_message`] with a [`ScriptedReader`] under a
//! paused clock where timing matters.

use std::time::Duration;

use h1recv::{
    ParseError,
    ParseState,
    ReceiveConfig,
    ReceiveError,
    ReceiveSession,
    Request,
    Timeout,
    TimeoutKind,
    Version,
    deadline::Budget,
    receive_message,
};
use h1recv_testing::{ScriptedReader, post, small_config};
use proptest::{collection::vec, prelude::*};
use rstest::rstest;
use tokio_util::sync::CancellationToken;

const SIMPLE_GET: &[u8] = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";

async fn receive(
    reader: &mut ScriptedReader,
    config: &ReceiveConfig,
) -> (Result<(Request, h1recv::Metrics), ReceiveError>, ReceiveSession) {
    let mut session = ReceiveSession::new(config);
    let result = receive_message(reader, &mut session, &CancellationToken::new()).await;
    (result, session)
}

#[tokio::test]
async fn single_read_delivers_a_complete_request() {
    let mut reader = ScriptedReader::new().data(SIMPLE_GET);
    let reads = reader.reads();
    let (result, session) = receive(&mut reader, &ReceiveConfig::default()).await;
    let (request, metrics) = result.expect("request");

    assert_eq!(request.method(), "GET");
    assert_eq!(request.target(), "/");
    assert_eq!(request.version(), Version::Http11);
    assert_eq!(request.headers().len(), 1);
    assert_eq!(request.headers().get("host"), Some("a"));
    assert!(request.body().is_empty());
    assert_eq!(metrics.bytes_total(), SIMPLE_GET.len());
    assert_eq!(reads.get(), 1);
    assert_eq!(session.state(), ParseState::Completed);
}

#[tokio::test]
async fn byte_by_byte_delivery_matches_a_single_read() {
    let (whole, _) = receive(
        &mut ScriptedReader::new().data(SIMPLE_GET),
        &ReceiveConfig::default(),
    )
    .await;
    let mut reader = ScriptedReader::bytewise(SIMPLE_GET);
    let reads = reader.reads();
    let (split, _) = receive(&mut reader, &ReceiveConfig::default()).await;

    let (whole, _) = whole.expect("whole request");
    let (split, metrics) = split.expect("split request");
    assert_eq!(split, whole);
    assert_eq!(reads.get(), SIMPLE_GET.len());
    assert_eq!(metrics.reads(), SIMPLE_GET.len());
}

#[tokio::test]
async fn body_split_across_reads_is_reassembled() {
    let mut reader = ScriptedReader::new()
        .data("POST /up HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel")
        .data("lo");
    let (result, _) = receive(&mut reader, &ReceiveConfig::default()).await;
    let (request, metrics) = result.expect("request");
    assert_eq!(request.body().as_ref(), b"hello");
    assert_eq!(metrics.reads(), 2);
}

#[rstest]
#[case::default_budget(ReceiveConfig::default(), Duration::from_secs(30))]
#[case::short_budget(
    ReceiveConfig::default().total_timeout(Duration::from_millis(750)),
    Duration::from_millis(750)
)]
#[tokio::test(start_paused = true)]
async fn silence_is_a_no_data_timeout(#[case] config: ReceiveConfig, #[case] expected: Duration) {
    let start = tokio::time::Instant::now();
    let mut reader = ScriptedReader::new().stall();
    let (result, session) = receive(&mut reader, &config).await;
    assert!(matches!(result, Err(ReceiveError::Timeout(TimeoutKind::NoData))));
    assert_eq!(start.elapsed(), expected);
    assert_eq!(session.budget(), Budget::Remaining(Duration::ZERO));
}

#[tokio::test(start_paused = true)]
async fn start_line_then_silence_is_a_headers_timeout() {
    let mut reader = ScriptedReader::new().data("GET /slow HTTP/1.1\r\n").stall();
    let (result, session) = receive(&mut reader, &small_config()).await;
    assert!(matches!(result, Err(ReceiveError::Timeout(TimeoutKind::Headers))));
    assert_eq!(session.state(), ParseState::InHeaders);
}

#[rstest]
#[case::partial_request_line(b"GET / HTTP".as_slice(), TimeoutKind::StartLine)]
#[case::partial_body(b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\nab".as_slice(), TimeoutKind::Body)]
#[tokio::test(start_paused = true)]
async fn timeouts_name_the_phase_in_progress(#[case] sent: &[u8], #[case] expected: TimeoutKind) {
    let mut reader = ScriptedReader::new().data(sent).stall();
    let (result, _) = receive(&mut reader, &small_config()).await;
    match result {
        Err(ReceiveError::Timeout(kind)) => assert_eq!(kind, expected),
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[rstest]
#[case::mid_request_line(b"GET / HTTP".as_slice())]
#[case::mid_header(b"GET / HTTP/1.1\r\nHost: exa".as_slice())]
#[tokio::test]
async fn close_mid_message_is_end_of_stream(#[case] sent: &[u8]) {
    let mut reader = ScriptedReader::new().data(sent);
    let reads = reader.reads();
    let (result, _) = receive(&mut reader, &ReceiveConfig::default()).await;
    match result {
        Err(ReceiveError::EndOfStream { bytes_received }) => {
            assert_eq!(bytes_received, sent.len());
        }
        other => panic!("expected end of stream, got {other:?}"),
    }
    assert_eq!(reads.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn budget_shrinks_by_the_time_spent_in_each_read() {
    let config = ReceiveConfig::default().total_timeout(Duration::from_secs(10));
    let mut reader = ScriptedReader::new()
        .wait(Duration::from_millis(1_500))
        .data("GET / HTTP/1.1\r\n")
        .wait(Duration::from_millis(2_000))
        .data("Host: a\r\n")
        .wait(Duration::from_millis(500))
        .data("\r\n");
    let (result, session) = receive(&mut reader, &config).await;
    let (_, metrics) = result.expect("request");

    assert_eq!(metrics.reads(), 3);
    assert_eq!(metrics.elapsed(), Duration::from_secs(4));
    assert_eq!(metrics.slowest_read(), Some(Duration::from_secs(2)));
    assert_eq!(metrics.fastest_read(), Some(Duration::from_millis(500)));
    assert_eq!(session.budget(), Budget::Remaining(Duration::from_secs(6)));
}

#[tokio::test(start_paused = true)]
async fn a_read_that_spends_the_budget_ends_the_cycle_without_another_read() {
    let config = ReceiveConfig::default().total_timeout(Duration::from_secs(1));
    let mut reader = ScriptedReader::new()
        .wait(Duration::from_secs(1))
        .data("GET / HTTP/1.1\r\n")
        .data("\r\n");
    let reads = reader.reads();
    let (result, _) = receive(&mut reader, &config).await;
    assert!(matches!(result, Err(ReceiveError::Timeout(TimeoutKind::Headers))));
    assert_eq!(reads.get(), 1);
    assert_eq!(reader.remaining(), 1);
}

#[tokio::test]
async fn unbounded_budget_never_times_out() {
    let config = ReceiveConfig::default().total_timeout(Timeout::Unbounded);
    let mut reader = ScriptedReader::chunked(&post("/u", b"payload"), 3);
    let (result, session) = receive(&mut reader, &config).await;
    assert_eq!(result.expect("request").0.body().as_ref(), b"payload");
    assert_eq!(session.budget(), Budget::Unbounded);
}

#[tokio::test]
async fn message_larger_than_the_buffer_is_rejected() {
    let config = ReceiveConfig::default().buffer_capacity(32);
    let mut reader = ScriptedReader::new()
        .data("GET /a-rather-long-target HTTP/1.1\r\nHost: a\r\n\r\n");
    let (result, _) = receive(&mut reader, &config).await;
    assert!(matches!(
        result,
        Err(ReceiveError::Parse(ParseError::MessageTooLarge { limit: 32, .. }))
    ));
}

#[tokio::test]
async fn no_read_or_parse_happens_after_a_failure() {
    let mut reader = ScriptedReader::new()
        .data("GET /\r\n\r\n")
        .data("GET / HTTP/1.1\r\n\r\n");
    let reads = reader.reads();
    let (result, session) = receive(&mut reader, &ReceiveConfig::default()).await;
    assert!(matches!(
        result,
        Err(ReceiveError::Parse(ParseError::MalformedStartLine { .. }))
    ));
    assert!(session.is_finished());
    assert_eq!(reads.get(), 1);
    assert_eq!(reader.remaining(), 1);
}

#[tokio::test]
async fn transport_failures_are_reported_as_io() {
    let mut reader = ScriptedReader::new()
        .data("GET / HT")
        .fail(std::io::ErrorKind::ConnectionReset);
    let (result, _) = receive(&mut reader, &ReceiveConfig::default()).await;
    match result {
        Err(ReceiveError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
        other => panic!("expected an io error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn keep_alive_cycles_use_the_keep_alive_budget() {
    let config = ReceiveConfig::default()
        .keepalive_timeout(Duration::from_secs(2))
        .total_timeout(Duration::from_secs(30));
    let mut reader = ScriptedReader::new().data(SIMPLE_GET).stall();
    let cancel = CancellationToken::new();
    let mut session = ReceiveSession::new(&config);
    receive_message(&mut reader, &mut session, &cancel)
        .await
        .expect("first request");

    session.begin_message(true);
    let start = tokio::time::Instant::now();
    let result = receive_message(&mut reader, &mut session, &cancel).await;
    assert!(matches!(result, Err(ReceiveError::Timeout(TimeoutKind::NoData))));
    assert_eq!(start.elapsed(), Duration::from_secs(2));
    assert_eq!(session.cycles(), 2);
}

#[tokio::test]
async fn cancellation_is_not_a_timeout() {
    let mut reader = ScriptedReader::new().stall();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut session = ReceiveSession::new(&ReceiveConfig::default());
    let result = receive_message(&mut reader, &mut session, &cancel).await;
    let err = result.expect_err("cancelled");
    assert!(err.is_cancelled());
    assert!(!err.is_timeout());
    assert_eq!(err.status_hint(), None);
}

/// A request with a tolerated leading empty line and `body` as its payload.
fn request_with_body(body: &[u8]) -> Vec<u8> {
    let mut message = format!(
        "\r\nPOST /p?q=1 HTTP/1.1\r\nHost: example\r\nContent-Length: {}\r\nAccept: */*\r\n\r\n",
        body.len()
    )
    .into_bytes();
    message.extend_from_slice(body);
    message
}

/// Script `message` as reads of the given lengths, with any rest in a final read.
fn split_reads(message: &[u8], lengths: &[usize]) -> ScriptedReader {
    let mut reader = ScriptedReader::new();
    let mut rest = message;
    for &len in lengths {
        if rest.is_empty() {
            break;
        }
        let (chunk, tail) = rest.split_at(len.min(rest.len()));
        reader = reader.data(chunk);
        rest = tail;
    }
    if rest.is_empty() { reader } else { reader.data(rest) }
}

proptest! {
    #[test]
    fn read_boundaries_do_not_change_the_request(
        lengths in vec(1usize..24, 0..32),
        body in vec(any::<u8>(), 0..96),
        slack in 0usize..8,
    ) {
        let message = request_with_body(&body);
        // A buffer barely larger than the message forces compaction between reads.
        let config = ReceiveConfig::default().buffer_capacity(message.len() + slack);

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build tokio runtime");
        let (whole, split) = rt.block_on(async {
            let (whole, _) = receive(&mut ScriptedReader::new().data(message.clone()), &config).await;
            let (split, _) = receive(&mut split_reads(&message, &lengths), &config).await;
            (whole, split)
        });

        let (whole, whole_metrics) = whole.expect("single read delivers the request");
        let (split, split_metrics) = split.expect("split reads deliver the request");
        prop_assert_eq!(whole.body().as_ref(), body.as_slice());
        prop_assert_eq!(&split, &whole);
        prop_assert_eq!(split_metrics.bytes_total(), message.len());
        prop_assert_eq!(split_metrics.bytes_total(), whole_metrics.bytes_total());
    }
}
