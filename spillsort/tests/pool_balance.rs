//! Pool accounting across a full encode/decode cycle
//!
//! Kept in its own test binary so the process-wide pool is observed without
//! interference from other tests.

use spillsort::{Compression, Entry, TempReader, TempWriter, global_pool};
use tempfile::tempdir;

#[test]
fn every_fetched_buffer_is_returned() {
    let dir = tempdir().unwrap();
    let before = global_pool().stats();

    let mut writer = TempWriter::new(dir.path(), Compression::Zlib, false).unwrap();
    for run in 0..3 {
        for i in 0..200 {
            let key = format!("run{run}-key{i:04}");
            let value = vec![b'v'; 50 + i % 100];
            writer.encode(&Entry::copy_from(key.as_bytes(), &value)).unwrap();
        }
        writer.flush().unwrap();
    }

    let mut reader = TempReader::new(
        writer.reader_at().unwrap(),
        writer.offsets(),
        1 << 20,
        Compression::Zlib,
    )
    .unwrap();

    let mut decoded = 0;
    for section in 0..reader.num_sections() {
        while let Some(entry) = reader.read_next(section).unwrap() {
            decoded += 1;
            drop(entry);
        }
    }
    assert_eq!(decoded, 600);

    reader.close().unwrap();
    writer.close().unwrap();

    let after = global_pool().stats();
    // One fetch per encoded entry plus one per decoded entry, all returned.
    assert_eq!(after.gets - before.gets, 1200);
    assert_eq!(after.outstanding(), before.outstanding());
}
