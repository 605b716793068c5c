//! Chunking of row-key equalities into point-lookup splits.

use splitscan_core::PlannerConfig;

/// Splits `keys` into evenly sized chunks.
///
/// Chunks hold at least `batch_get_min_chunk_size` keys unless that would
/// need more than `batch_get_max_splits` chunks, in which case the chunk size
/// grows. Leftover keys go one each to the earliest chunks, so sizes differ by
/// at most one and every key lands in exactly one chunk.
pub fn chunk_row_keys<T>(keys: Vec<T>, config: &PlannerConfig) -> Vec<Vec<T>> {
    let total = keys.len();
    if total == 0 {
        return Vec::new();
    }

    let min_chunk = config.batch_get_min_chunk_size.max(1);
    let max_splits = config.batch_get_max_splits.max(1);

    let chunk_size = if total / min_chunk > max_splits {
        total / max_splits
    } else {
        min_chunk
    };
    let chunk_count = total.div_ceil(chunk_size).clamp(1, max_splits);

    let base = total / chunk_count;
    let extra = total % chunk_count;

    let mut chunks = Vec::with_capacity(chunk_count);
    let mut keys = keys.into_iter();
    for index in 0..chunk_count {
        let size = base + usize::from(index < extra);
        chunks.push(keys.by_ref().take(size).collect());
    }

    tracing::debug!(keys = total, chunks = chunk_count, chunk_size, "chunked row keys for batch get");
    chunks
}
