//! Minimal changed region between two text snapshots.
//!
//! Agents typically replace a whole statement while keeping most of the
//! surrounding text. Stripping the longest common prefix and then the
//! longest common suffix of what remains leaves the slices that actually
//! changed, which is what previews and highlights show.
//!
//! Both granularities return slices borrowed from the inputs. The line
//! variant keeps the changed lines contiguous, so the rejoined slice is
//! a substring of the original text.

use std::ops::Range;

use super::position::compute_line_starts;

/// Character-granular change between `old` and `new`.
///
/// `prefix_len + changed_old.len() + suffix_len == old.len()` and likewise
/// for `new`. All lengths are in bytes and never split a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRegion<'a> {
    pub prefix_len: usize,
    pub suffix_len: usize,
    pub changed_old: &'a str,
    pub changed_new: &'a str,
}

impl CharRegion<'_> {
    /// True when both snapshots are identical.
    pub fn is_unchanged(&self) -> bool {
        self.changed_old.is_empty() && self.changed_new.is_empty()
    }

    /// Changed range relative to the start of `old`.
    pub fn old_range(&self) -> Range<usize> {
        self.prefix_len..self.prefix_len + self.changed_old.len()
    }

    /// Changed range relative to the start of `new`.
    pub fn new_range(&self) -> Range<usize> {
        self.prefix_len..self.prefix_len + self.changed_new.len()
    }
}

/// Line-granular change between `old` and `new`.
///
/// Lines are split on `\n`; `changed_old`/`changed_new` are the changed
/// lines joined with `\n` (no trailing line break).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRegion<'a> {
    pub prefix_lines: usize,
    pub suffix_lines: usize,
    pub changed_old: &'a str,
    pub changed_new: &'a str,
    pub changed_old_line_count: usize,
    pub changed_new_line_count: usize,
}

impl LineRegion<'_> {
    /// True when no line differs between the snapshots.
    pub fn is_unchanged(&self) -> bool {
        self.changed_old_line_count == 0 && self.changed_new_line_count == 0
    }
}

/// Compute the character-granular changed region.
///
/// The suffix scan is bounded by what the prefix left over, so the two
/// never claim the same characters (`"aa"` → `"a"` removes the second `a`).
pub fn diff_chars<'a>(old: &'a str, new: &'a str) -> CharRegion<'a> {
    let prefix_len = common_prefix_len(old, new);
    let old_rest = &old[prefix_len..];
    let new_rest = &new[prefix_len..];
    let suffix_len = common_suffix_len(old_rest, new_rest);

    CharRegion {
        prefix_len,
        suffix_len,
        changed_old: &old_rest[..old_rest.len() - suffix_len],
        changed_new: &new_rest[..new_rest.len() - suffix_len],
    }
}

/// Compute the line-granular changed region.
pub fn diff_lines<'a>(old: &'a str, new: &'a str) -> LineRegion<'a> {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();

    let prefix_lines = old_lines
        .iter()
        .zip(&new_lines)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old_lines.len().min(new_lines.len()) - prefix_lines;
    let suffix_lines = old_lines
        .iter()
        .rev()
        .zip(new_lines.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let changed_old_line_count = old_lines.len() - prefix_lines - suffix_lines;
    let changed_new_line_count = new_lines.len() - prefix_lines - suffix_lines;

    LineRegion {
        prefix_lines,
        suffix_lines,
        changed_old: line_span(old, prefix_lines, changed_old_line_count),
        changed_new: line_span(new, prefix_lines, changed_new_line_count),
        changed_old_line_count,
        changed_new_line_count,
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    while !(a.is_char_boundary(len) && b.is_char_boundary(len)) {
        len -= 1;
    }
    len
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    let mut len = a
        .bytes()
        .rev()
        .zip(b.bytes().rev())
        .take_while(|(x, y)| x == y)
        .count();
    while !(a.is_char_boundary(a.len() - len) && b.is_char_boundary(b.len() - len)) {
        len -= 1;
    }
    len
}

/// Slice covering `count` lines starting at 0-based line `first`.
fn line_span(text: &str, first: usize, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    let starts = compute_line_starts(text);
    let start = starts[first];
    let end = starts
        .get(first + count)
        .map(|next| next - 1)
        .unwrap_or(text.len());
    &text[start..end]
}
