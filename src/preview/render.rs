//! Turn a line-granular change into the styled text of a preview.
//!
//! The changed block is aligned line by line with `similar`, so lines that
//! survive inside the block show up as context instead of as a removal and
//! a re-addition.

use similar::{Algorithm, DiffTag, capture_diff_slices};

use crate::config::Faces;
use crate::host::StyledSegment;
use crate::text::LineRegion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Removed,
    Added,
    Context,
}

impl LineKind {
    pub fn marker(self) -> char {
        match self {
            LineKind::Removed => '-',
            LineKind::Added => '+',
            LineKind::Context => ' ',
        }
    }

    fn face(self, faces: &Faces) -> &str {
        match self {
            LineKind::Removed => &faces.removed,
            LineKind::Added => &faces.added,
            LineKind::Context => &faces.context,
        }
    }
}

/// One line of the rendered diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffRow<'a> {
    pub kind: LineKind,
    pub text: &'a str,
}

/// Rows for the changed block of `region`: removals before additions
/// within each replaced hunk.
pub fn diff_rows<'a>(region: &LineRegion<'a>) -> Vec<DiffRow<'a>> {
    let old = split_lines(region.changed_old, region.changed_old_line_count);
    let new = split_lines(region.changed_new, region.changed_new_line_count);

    let row = |kind, text| DiffRow { kind, text };
    let mut rows = Vec::with_capacity(old.len() + new.len());
    for op in capture_diff_slices(Algorithm::Myers, &old, &new) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {
                rows.extend(old[old_range].iter().map(|t| row(LineKind::Context, *t)))
            }
            DiffTag::Delete => {
                rows.extend(old[old_range].iter().map(|t| row(LineKind::Removed, *t)))
            }
            DiffTag::Insert => rows.extend(new[new_range].iter().map(|t| row(LineKind::Added, *t))),
            DiffTag::Replace => {
                rows.extend(old[old_range].iter().map(|t| row(LineKind::Removed, *t)));
                rows.extend(new[new_range].iter().map(|t| row(LineKind::Added, *t)));
            }
        }
    }
    rows
}

/// Styled display text for `rows`.
///
/// `leading_newline` starts the preview on its own line when the covered
/// range begins mid-line; `trailing_newline` mirrors a covered range that
/// ends with a line break.
pub fn render_display(
    rows: &[DiffRow<'_>],
    faces: &Faces,
    leading_newline: bool,
    trailing_newline: bool,
) -> Vec<StyledSegment> {
    let mut segments = Vec::with_capacity(rows.len() + 1);
    if leading_newline {
        segments.push(StyledSegment::new("\n", faces.context.as_str()));
    }
    let last = rows.len().saturating_sub(1);
    for (i, row) in rows.iter().enumerate() {
        let mut text = String::with_capacity(row.text.len() + 2);
        text.push(row.kind.marker());
        text.push_str(row.text);
        if i < last || trailing_newline {
            text.push('\n');
        }
        segments.push(StyledSegment::new(text, row.kind.face(faces)));
    }
    segments
}

fn split_lines(text: &str, count: usize) -> Vec<&str> {
    if count == 0 {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}
