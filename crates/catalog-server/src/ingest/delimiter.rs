//! Field delimiter detection
//!
//! Inspects the first raw line of a file and selects the most probable
//! delimiter among a fixed candidate set. The stream is not consumed here;
//! the pipeline re-opens the blob to parse from the start.

/// Candidate delimiters in tie-break priority order.
const CANDIDATES: [u8; 3] = [b',', b';', b'\t'];

/// Pick the delimiter with the strictly highest count in the first line.
///
/// Ties resolve by the fixed priority comma > semicolon > tab; an all-zero
/// count defaults to comma. Never fails.
pub fn detect_delimiter(first_line: &str) -> u8 {
    let mut best = CANDIDATES[0];
    let mut best_count = 0usize;

    for &candidate in &CANDIDATES {
        let count = first_line
            .bytes()
            .filter(|&b| b == candidate)
            .count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }

    best
}
