use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tml_cfg::{btml, parse_str, to_string};

fn sample_document() -> String {
    let mut source = String::new();
    for section in 0..50 {
        source.push_str(&format!("section{}\n", section));
        for entry in 0..20 {
            source.push_str(&format!("\tkey{} = value{}\n", entry, entry % 5));
            source.push_str(&format!("\tnum{} = {}\n", entry, entry * 3));
        }
        source.push_str("\tflags = 1 2 3 4 5\n");
        source.push_str("# section end\n");
    }
    source
}

fn bench_parse(c: &mut Criterion) {
    let source = sample_document();
    c.bench_function("parse", |b| {
        b.iter(|| parse_str("bench.tml", black_box(&source)).unwrap())
    });
}

fn bench_serialize(c: &mut Criterion) {
    let tree = parse_str("bench.tml", &sample_document()).unwrap();
    c.bench_function("serialize", |b| b.iter(|| to_string(black_box(&tree)).unwrap()));
}

fn bench_btml_encode(c: &mut Criterion) {
    let tree = parse_str("bench.tml", &sample_document()).unwrap();
    c.bench_function("btml_encode", |b| {
        b.iter(|| btml::encode_with_header(black_box(&tree), true).unwrap())
    });
    c.bench_function("btml_encode_plain", |b| {
        b.iter(|| btml::encode(black_box(&tree)))
    });
}

fn bench_btml_decode(c: &mut Criterion) {
    let tree = parse_str("bench.tml", &sample_document()).unwrap();
    let bytes = btml::encode_with_header(&tree, true).unwrap();
    c.bench_function("btml_decode", |b| {
        b.iter(|| btml::decode_with_header(black_box(&bytes)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_serialize,
    bench_btml_encode,
    bench_btml_decode
);
criterion_main!(benches);
