//! Binary blob detection and line counting.

/// Number of bytes to check for null bytes when detecting binary content.
/// Matches how git handles this as binary files almost always have nulls in headers.
const BINARY_CHECK_BYTES: usize = 8000;

/// Returns `true` if the first [`BINARY_CHECK_BYTES`] of `bytes` contain
/// a null byte, which strongly indicates binary data.
#[must_use]
pub fn is_binary_bytes(bytes: &[u8]) -> bool {
    let check_len = bytes.len().min(BINARY_CHECK_BYTES);
    bytes[..check_len].contains(&0)
}

/// Counts newline bytes, the line total git reports for a blob.
///
/// Binary content has no meaningful line count and yields `0`.
#[must_use]
pub fn count_lines(bytes: &[u8]) -> u64 {
    if is_binary_bytes(bytes) {
        return 0;
    }
    bytes.iter().filter(|&&b| b == b'\n').map(|_| 1_u64).sum()
}
