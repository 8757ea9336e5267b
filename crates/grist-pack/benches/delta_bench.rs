use criterion::{black_box, criterion_group, criterion_main, Criterion};
use grist_pack::delta::{self, encode_copy, encode_insert};
use grist_pack::varint::write_size;

fn apply_delta(c: &mut Criterion) {
    // A 64 KiB base blob and a script that stitches the result from
    // copies with small inserts between them.
    let body: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
    let mut base = format!("blob {}\0", body.len()).into_bytes();
    base.extend_from_slice(&body);

    let mut script_body = Vec::new();
    let mut result_len = 0usize;
    for chunk in 0..16 {
        script_body.extend_from_slice(&encode_copy(chunk * 4096, 4096));
        script_body.extend_from_slice(&encode_insert(b"glue"));
        result_len += 4096 + 4;
    }

    let mut script = Vec::new();
    script.extend_from_slice(&write_size(body.len() as u64));
    script.extend_from_slice(&write_size(result_len as u64));
    script.extend_from_slice(&script_body);

    let hunks = delta::parse_hunks(&script, 2).unwrap();

    c.bench_function("parse_hunks_64k", |b| {
        b.iter(|| delta::parse_hunks(black_box(&script), 2).unwrap())
    });

    c.bench_function("apply_delta_64k", |b| {
        b.iter(|| delta::apply(black_box(&base), black_box(&hunks)).unwrap())
    });
}

criterion_group!(benches, apply_delta);
criterion_main!(benches);
