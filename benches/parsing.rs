//! Benchmarks for line framing and event parsing.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio_util::codec::Decoder;

use slirc_session::{Event, LineCodec, Source};

/// Channel message with a full user prefix
const PREFIX_MESSAGE: &str = ":nick!user@host PRIVMSG #channel :Hello, world!";

/// CTCP ACTION message
const ACTION_MESSAGE: &str = ":nick!user@host PRIVMSG #channel :\u{1}ACTION waves at everyone\u{1}";

/// Numeric response
const NUMERIC_RESPONSE: &str = ":irc.server.net 001 nickname :Welcome to the IRC Network nickname!user@host";

/// WHOIS account numeric
const WHOIS_NUMERIC: &str = ":irc.server.net 330 asker somenick accountname :is logged in as";

fn benchmark_event_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Event Parsing");

    let lines = vec![
        ("with_prefix", PREFIX_MESSAGE),
        ("ctcp_action", ACTION_MESSAGE),
        ("numeric", NUMERIC_RESPONSE),
        ("whois_numeric", WHOIS_NUMERIC),
    ];

    for (name, line) in lines {
        group.bench_with_input(BenchmarkId::new("parse", name), line, |b, s| {
            b.iter(|| {
                let event = Event::parse(black_box(s)).unwrap();
                black_box(event)
            })
        });
    }

    group.finish();
}

fn benchmark_source_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Source Parsing");

    group.bench_function("full_prefix", |b| {
        b.iter(|| {
            let source = Source::parse(black_box("nick!user@host.example.org"));
            black_box(source)
        })
    });

    group.bench_function("server_name", |b| {
        b.iter(|| {
            let source = Source::parse(black_box("irc.server.net"));
            black_box(source)
        })
    });

    group.finish();
}

fn benchmark_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Line Framing");

    let mut burst = Vec::new();
    for i in 0..32 {
        burst.extend_from_slice(
            format!(":nick!user@host PRIVMSG #channel :message number {i}\r\n").as_bytes(),
        );
    }

    group.bench_function("burst_of_32_lines", |b| {
        b.iter(|| {
            let mut codec = LineCodec::new();
            let mut buf = BytesMut::from(&burst[..]);
            let mut count = 0usize;
            while let Some(line) = codec.decode(&mut buf).unwrap() {
                black_box(line);
                count += 1;
            }
            black_box(count)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_event_parsing,
    benchmark_source_parsing,
    benchmark_framing,
);

criterion_main!(benches);
