//! Criterion benchmarks for incremental parsing throughput.
//!
//! A request with headers and a body is fed through a [`RecvBuffer`] and a
//! [`Parser`] in fixed-size chunks, compacting after every parse the way a
//! receive cycle does.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use h1recv::{Parser, buffer::RecvBuffer};

const CAPACITY: usize = 64 * 1024;

fn sample_request() -> Vec<u8> {
    let body = vec![b'x'; 4096];
    let mut bytes = String::from("POST /upload HTTP/1.1\r\nHost: bench.local\r\n");
    for i in 0..16 {
        bytes.push_str(&format!("X-Header-{i}: value-{i}\r\n"));
    }
    bytes.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
    let mut bytes = bytes.into_bytes();
    bytes.extend_from_slice(&body);
    bytes
}

fn feed(message: &[u8], chunk: usize, buffer: &mut RecvBuffer, parser: &mut Parser) -> usize {
    buffer.clear();
    parser.reset();
    let mut consumed = 0;
    for piece in message.chunks(chunk) {
        buffer.write_window()[..piece.len()].copy_from_slice(piece);
        buffer.commit(piece.len());
        match parser.parse(buffer.parse_window()) {
            Ok(progress) => {
                buffer.consume(progress.consumed());
                consumed += progress.consumed();
            }
            Err(err) => panic!("benchmark request failed to parse: {err}"),
        }
    }
    consumed
}

fn benchmark_chunked_parse(c: &mut Criterion) {
    let message = sample_request();
    let mut group = c.benchmark_group("parser/chunked");
    group.throughput(Throughput::Bytes(message.len() as u64));

    for chunk in [1usize, 16, 256, 4096, message.len()] {
        let mut buffer = RecvBuffer::with_capacity(CAPACITY);
        let mut parser = Parser::new(CAPACITY);
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let consumed = feed(black_box(&message), chunk, &mut buffer, &mut parser);
                black_box(parser.take_request());
                consumed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_chunked_parse);
criterion_main!(benches);
