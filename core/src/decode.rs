//! Concurrent decode stage
//!
//! A fixed pool of `workers` threads repeatedly claims the next frame index
//! from a shared atomic counter and decodes that one image into its own
//! result slot. Slots are `OnceLock`s written only by the index's claimant,
//! so the output needs no locking; results are read after the pool joins.
//! A failed decode never stops other workers.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::decoder::{DecodeError, DecodedImage, ImageDecoder};
use crate::error::{HostPackError, Result};

pub type DecodeOutcome = Result<DecodedImage, DecodeError>;

/// Worker count for `requested` threads over `jobs` images.
///
/// `0` means all available hardware parallelism. Never more workers than
/// jobs, never fewer than one.
pub fn resolve_workers(requested: u32, jobs: usize) -> usize {
    let wanted = match requested {
        0 => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        n => n as usize,
    };
    wanted.min(jobs).max(1)
}

/// Decode every path, returning one outcome per input in input order
pub fn decode_all<D: ImageDecoder + ?Sized>(
    decoder: &D,
    paths: &[PathBuf],
    threads: u32,
) -> Result<Vec<DecodeOutcome>> {
    let workers = resolve_workers(threads, paths.len());
    let slots: Vec<OnceLock<DecodeOutcome>> = (0..paths.len()).map(|_| OnceLock::new()).collect();
    let next = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("hostpack-decode-{i}"))
        .build()
        .map_err(|e| HostPackError::Internal(format!("failed to start decode pool: {e}")))?;

    tracing::debug!(images = paths.len(), workers, "decoding");

    pool.broadcast(|_| {
        loop {
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(path) = paths.get(index) else {
                break;
            };
            let outcome = decoder.decode(path);
            if let Err(e) = &outcome {
                tracing::warn!(index, path = %path.display(), "decode failed: {e}");
            }
            // Each index is claimed exactly once
            let _ = slots[index].set(outcome);
        }
    });

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.into_inner().ok_or_else(|| {
                HostPackError::Internal(format!("decode slot {index} was never filled"))
            })
        })
        .collect()
}

/// Unwrap every outcome, failing on the first unsuccessful frame
pub fn collect_decoded(
    paths: &[PathBuf],
    outcomes: Vec<DecodeOutcome>,
) -> Result<Vec<DecodedImage>> {
    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    if failed > 0 {
        tracing::warn!(failed, total = outcomes.len(), "some images failed to decode");
    }

    outcomes
        .into_iter()
        .zip(paths)
        .enumerate()
        .map(|(index, (outcome, path))| {
            outcome.map_err(|e| HostPackError::DecodeFailed {
                index,
                path: path.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}
