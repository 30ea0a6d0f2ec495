//! Line/offset conversion over plain UTF-8 text.
//!
//! Offsets are byte offsets. Line numbers are 1-based, matching the line
//! hints agents attach to tool calls.

/// Compute line start offsets for efficient position mapping
pub fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut line_starts = vec![0];
    line_starts.extend(
        text.bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i + 1),
    );
    line_starts
}

/// Offset of the first character of `line` (1-based).
///
/// Line 0 is treated as line 1; lines past the end clamp to the start of
/// the last line.
pub fn line_start(text: &str, line: usize) -> usize {
    let starts = compute_line_starts(text);
    let index = line.saturating_sub(1).min(starts.len() - 1);
    starts[index]
}

/// Offset just past the last character of `line` (1-based), excluding the
/// line break.
pub fn line_end(text: &str, line: usize) -> usize {
    let start = line_start(text, line);
    text[start..]
        .find('\n')
        .map(|rel| start + rel)
        .unwrap_or(text.len())
}

/// Move `lines` lines forward from `from`, landing at the start of a line.
///
/// Stops at the end of the text when fewer line breaks remain, so the
/// result is always a valid offset. Advancing zero lines returns `from`
/// unchanged, even when it is in the middle of a line.
pub fn advance_lines(text: &str, from: usize, lines: usize) -> usize {
    let mut offset = from.min(text.len());
    for _ in 0..lines {
        match text[offset..].find('\n') {
            Some(rel) => offset += rel + 1,
            None => return text.len(),
        }
    }
    offset
}
