//! Blocking decompression feeding the async extractor through bounded
//! channels.

use std::fs::File;
use std::io::{self, Read};

use bytes::Bytes;
use zip::ZipArchive;

/// Decompressed bytes per chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered per entry before the reader blocks.
const CHUNK_QUEUE_DEPTH: usize = 4;

/// The decompressed content of one archive entry, delivered chunk by chunk.
pub(crate) struct EntryBody {
    pub index: usize,
    pub chunks: flume::Receiver<io::Result<Bytes>>,
}

/// Spawn a blocking reader over `entries` (archive indices, in order).
///
/// Each entry is read through a `take(per_entry_limit)` guard, so a lying
/// size header cannot make the reader run unbounded. The reader stops as
/// soon as the receiving side hangs up.
pub(crate) fn spawn_reader(
    mut archive: ZipArchive<File>,
    entries: Vec<usize>,
    per_entry_limit: u64,
) -> flume::Receiver<EntryBody> {
    let (body_tx, body_rx) = flume::bounded(1);

    tokio::task::spawn_blocking(move || {
        for index in entries {
            let (chunk_tx, chunk_rx) = flume::bounded(CHUNK_QUEUE_DEPTH);
            if body_tx
                .send(EntryBody {
                    index,
                    chunks: chunk_rx,
                })
                .is_err()
            {
                return;
            }

            let entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    let _ = chunk_tx.send(Err(io::Error::new(io::ErrorKind::InvalidData, e)));
                    return;
                }
            };

            if !pump(entry.take(per_entry_limit), &chunk_tx) {
                return;
            }
        }
    });

    body_rx
}

/// Copy `reader` into `tx`. Returns false when the reader should stop.
fn pump(mut reader: impl Read, tx: &flume::Sender<io::Result<Bytes>>) -> bool {
    loop {
        let mut buf = vec![0u8; CHUNK_SIZE];
        match reader.read(&mut buf) {
            Ok(0) => return true,
            Ok(n) => {
                buf.truncate(n);
                if tx.send(Ok(Bytes::from(buf))).is_err() {
                    return false;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(Err(e));
                return false;
            }
        }
    }
}
