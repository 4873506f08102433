// ABOUTME: Benchmark suite for the SBD wire handling hot paths
// ABOUTME: Measures checksums, frame validation, download reassembly and response parsing

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rockblock::codec::{MAX_MO_PAYLOAD, checksum, decode_frame, encode_frame, reassemble};
use rockblock::connection::LineReader;
use rockblock::datatypes::{SessionStatus, parse_signal_quality, parse_system_time};
use std::time::Duration;

fn sample_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");

    for size in [1, 50, 120, MAX_MO_PAYLOAD] {
        let payload = sample_payload(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| checksum(black_box(payload)))
        });
    }

    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    group.measurement_time(Duration::from_secs(10));

    let payload = sample_payload(270);
    let frame = encode_frame(&payload).unwrap();

    group.bench_function("encode", |b| b.iter(|| encode_frame(black_box(&payload))));
    group.bench_function("decode", |b| b.iter(|| decode_frame(black_box(&frame))));

    // Download as the reader delivers it: echo, CR-split frame, OK
    let mut captured = vec![Bytes::from_static(b"AT+SBDRB")];
    captured.extend(frame[..].split(|&b| b == b'\r').map(Bytes::copy_from_slice));
    captured.push(Bytes::from_static(b"OK"));

    group.bench_function("reassemble", |b| {
        b.iter(|| reassemble(black_box(&captured), b"AT+SBDRB"))
    });

    group.finish();
}

fn bench_responses(c: &mut Criterion) {
    let mut group = c.benchmark_group("responses");

    group.bench_function("session_status", |b| {
        b.iter(|| SessionStatus::parse(black_box(b"+SBDI: 1, 4, 1, 2, 6, 9")))
    });
    group.bench_function("signal_quality", |b| {
        b.iter(|| parse_signal_quality(black_box(b"+CSQ:5")))
    });
    group.bench_function("system_time", |b| {
        b.iter(|| parse_system_time(black_box(b"-MSSTM: 93ea2a7c")))
    });

    group.finish();
}

fn bench_line_reader(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let mut transcript = Vec::new();
    for _ in 0..100 {
        transcript.extend_from_slice(b"AT+CSQ\r\r\n+CSQ:4\r\n\r\nOK\r\n");
    }

    c.bench_function("line_reader_transcript", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut reader = LineReader::new(black_box(transcript.as_slice()));
                let mut count = 0usize;
                while let Some(_line) = reader.read_line().await.unwrap() {
                    count += 1;
                }
                count
            })
        })
    });
}

criterion_group!(
    benches,
    bench_checksum,
    bench_frame,
    bench_responses,
    bench_line_reader
);
criterion_main!(benches);
