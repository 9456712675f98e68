use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use dsvcodec::dsv::{
    self, CodecConfig, DelimiterMatcher, ReaderSource, Row, RowDecoder, RowEncoder,
    StandardStrategy,
};
use std::io::Cursor;

const ALPHABET: &[u8] = b"abcdefghij klmnopqrstuvwxyz0123456789";

/// Deterministic rows; roughly one field in `special_every` needs quoting.
fn gen_rows(rows: usize, width: usize, seed: u64, special_every: u64) -> Vec<Row> {
    let mut s = seed;
    let mut next = move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        s >> 33
    };
    (0..rows)
        .map(|_| {
            (0..width)
                .map(|_| {
                    let len = (next() % 16) as usize;
                    let mut field: String = (0..len)
                        .map(|_| ALPHABET[(next() as usize) % ALPHABET.len()] as char)
                        .collect();
                    match next() % special_every {
                        0 => field.push(','),
                        1 => field.push('"'),
                        2 => field.push_str("\r\n"),
                        _ => {}
                    }
                    field
                })
                .collect()
        })
        .collect()
}

fn strategy(delimiter: &str) -> StandardStrategy {
    let config = CodecConfig::builder()
        .delimiter(delimiter)
        .line_separator("\r\n")
        .build()
        .unwrap();
    StandardStrategy::new(config)
}

fn encode_all(rows: &[Row], strategy: &StandardStrategy) -> String {
    let encoder = RowEncoder::new(strategy);
    let mut out = String::new();
    for row in rows {
        encoder.encode_row(row, &mut out);
    }
    out
}

fn bench_decode_str(c: &mut Criterion) {
    let mut g = c.benchmark_group("decode_str_mb_s");
    for rows in [1_000usize, 10_000, 100_000] {
        let strategy = strategy(",");
        let text = encode_all(&gen_rows(rows, 8, 1, 16), &strategy);
        g.throughput(Throughput::Bytes(text.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| {
                let decoded = dsv::decode_str(black_box(&text), &strategy).unwrap();
                black_box(decoded);
            });
        });
    }
    g.finish();
}

fn bench_decode_reader(c: &mut Criterion) {
    let mut g = c.benchmark_group("decode_reader_mb_s");
    let strategy = strategy(",");
    let bytes = encode_all(&gen_rows(50_000, 8, 2, 16), &strategy).into_bytes();
    g.throughput(Throughput::Bytes(bytes.len() as u64));
    g.bench_function("reader_source", |b| {
        b.iter(|| {
            let source = ReaderSource::new(Cursor::new(black_box(&bytes[..])));
            let mut decoder = RowDecoder::new(source, &strategy).unwrap();
            let mut fields = 0usize;
            while let Some(row) = decoder.next_row().unwrap() {
                fields += row.len();
            }
            black_box(fields);
        });
    });
    g.finish();
}

fn bench_delimiter_width(c: &mut Criterion) {
    let mut g = c.benchmark_group("decode_vs_delimiter_width");
    let rows = gen_rows(20_000, 8, 3, 1_000);
    for delimiter in [",", "||", "<|>", "<<||>>"] {
        let strategy = strategy(delimiter);
        let text = encode_all(&rows, &strategy);
        g.throughput(Throughput::Bytes(text.len() as u64));
        g.bench_with_input(
            BenchmarkId::from_parameter(delimiter.chars().count()),
            &text,
            |b, text| {
                b.iter(|| black_box(dsv::decode_str(text, &strategy).unwrap()));
            },
        );
    }
    g.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut g = c.benchmark_group("encode_mb_s");
    for special_every in [4u64, 64, 1_000_000] {
        let strategy = strategy(",");
        let rows = gen_rows(20_000, 8, 4, special_every);
        let size = encode_all(&rows, &strategy).len();
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(
            BenchmarkId::from_parameter(special_every),
            &rows,
            |b, rows| {
                b.iter(|| black_box(encode_all(black_box(rows), &strategy)));
            },
        );
    }
    g.finish();
}

fn bench_matcher(c: &mut Criterion) {
    let mut g = c.benchmark_group("delimiter_matcher");
    let text: Vec<char> = (0..1_000_000u32)
        .map(|i| ALPHABET[(i as usize * 7) % ALPHABET.len()] as char)
        .collect();
    for delimiter in [",", "<|>", "<<<|||>>>"] {
        g.throughput(Throughput::Elements(text.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(delimiter), &text, |b, text| {
            b.iter(|| {
                let mut matcher = DelimiterMatcher::new(delimiter).unwrap();
                let mut hits = 0usize;
                for &ch in text {
                    matcher.feed(ch);
                    hits += matcher.is_match() as usize;
                }
                black_box(hits);
            });
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_decode_str,
    bench_decode_reader,
    bench_delimiter_width,
    bench_encode,
    bench_matcher
);
criterion_main!(benches);
