//! Splitting request lists into upstream-sized batches and joining the answers.

/// Maximum number of items the pricing and deadline endpoints accept per request.
pub const BATCH_SIZE: usize = 5;

/// Batch identifier sent with every chunked request.
pub const BATCH_ID: &str = "1";

/// Splits `items` into consecutive groups of at most `size` elements.
///
/// Order is preserved and only the last group may be shorter. A `size` of
/// zero is treated as one.
pub fn chunk<T>(items: &[T], size: usize) -> Vec<&[T]> {
    items.chunks(size.max(1)).collect()
}

/// Concatenates per-batch results in the order the batches were sent.
pub fn merge_in_order<T>(parts: Vec<Vec<T>>) -> Vec<T> {
    parts.into_iter().flatten().collect()
}
