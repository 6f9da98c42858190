use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use spillsort::{Compression, Entry, TempReader, TempWriter};
use tempfile::tempdir;

const N_RECORDS: usize = 10_000;
const VALUE_SIZE: usize = 100;

fn write_spill(dir: &std::path::Path, compression: Compression) -> TempWriter {
    let mut writer = TempWriter::new(dir, compression, false).unwrap();
    for i in 0..N_RECORDS {
        let key = format!("key{i:08}");
        let entry = Entry::copy_from(key.as_bytes(), &[b'x'; VALUE_SIZE]);
        writer.encode(&entry).unwrap();
    }
    writer.flush().unwrap();
    writer
}

fn encode_benchmark(c: &mut Criterion) {
    for compression in [Compression::None, Compression::Zlib, Compression::Lz4] {
        c.bench_function(format!("spill_encode_10k_{compression:?}").as_str(), |b| {
            b.iter_batched(
                || tempdir().unwrap(),
                |dir| {
                    let writer = write_spill(dir.path(), compression);
                    writer.close().unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }
}

fn decode_benchmark(c: &mut Criterion) {
    for compression in [Compression::None, Compression::Zlib, Compression::Lz4] {
        c.bench_function(format!("spill_decode_10k_{compression:?}").as_str(), |b| {
            b.iter_batched(
                || {
                    let dir = tempdir().unwrap();
                    let writer = write_spill(dir.path(), compression);
                    (dir, writer)
                },
                |(_dir, writer)| {
                    let mut reader = TempReader::new(
                        writer.reader_at().unwrap(),
                        writer.offsets(),
                        1 << 20,
                        compression,
                    )
                    .unwrap();
                    let mut n = 0;
                    while let Some(entry) = reader.read_next(0).unwrap() {
                        n += entry.key_len();
                    }
                    assert!(n > 0);
                },
                BatchSize::SmallInput,
            );
        });
    }
}

criterion_group!(benches, encode_benchmark, decode_benchmark);
criterion_main!(benches);
