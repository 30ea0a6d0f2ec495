//! Locate a snippet inside a live document using an approximate line hint.
//!
//! Agent-supplied line numbers drift: they are often off by a few lines, or
//! stale because another edit landed first. Strategies are tried in order
//! and the first one that finds the target wins:
//!
//! 1. [`Strategy::Window`]: a window around the hint (50 lines back,
//!    100 lines forward by default)
//! 2. [`Strategy::Forward`]: from the hint line to the end of the document
//! 3. [`Strategy::Backward`]: from the hint line back to the start
//! 4. [`Strategy::Document`]: the whole document, first match
//!
//! Without a hint only [`Strategy::Document`] runs.
//!
//! An empty target is text created from nothing, such as a new file. It
//! matches at the start of the hint line, or at offset 0 without a hint.

use super::position::{line_end, line_start};

/// Default number of lines searched before the hint line.
pub const WINDOW_LINES_BEFORE: usize = 50;

/// Default number of lines searched after the hint line.
pub const WINDOW_LINES_AFTER: usize = 100;

/// Extent of the windowed search around a line hint.
///
/// The window is asymmetric on purpose: edits tend to drift downwards as
/// earlier edits insert lines above them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub before: usize,
    pub after: usize,
}

impl Default for SearchWindow {
    fn default() -> Self {
        Self {
            before: WINDOW_LINES_BEFORE,
            after: WINDOW_LINES_AFTER,
        }
    }
}

/// One way of searching for the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Window,
    Forward,
    Backward,
    Document,
}

impl Strategy {
    /// Strategies in the order they are attempted.
    pub const ORDERED: [Strategy; 4] = [
        Strategy::Window,
        Strategy::Forward,
        Strategy::Backward,
        Strategy::Document,
    ];

    /// Whether this strategy needs a line hint to run.
    pub fn needs_hint(self) -> bool {
        !matches!(self, Strategy::Document)
    }

    /// Run this strategy alone.
    ///
    /// Hint-based strategies return `None` when `line_hint` is absent. An
    /// empty target returns `None` here; [`Locator::locate`] anchors it.
    pub fn find(
        self,
        text: &str,
        target: &str,
        line_hint: Option<usize>,
        window: SearchWindow,
    ) -> Option<usize> {
        if target.is_empty() {
            return None;
        }
        match (self, line_hint) {
            (Strategy::Document, _) => text.find(target),
            (_, None) => None,
            (Strategy::Window, Some(line)) => {
                let start = line_start(text, line.saturating_sub(window.before));
                let end = line_end(text, line.saturating_add(window.after));
                text[start..end].find(target).map(|rel| start + rel)
            }
            (Strategy::Forward, Some(line)) => {
                let start = line_start(text, line);
                text[start..].find(target).map(|rel| start + rel)
            }
            (Strategy::Backward, Some(line)) => {
                let end = line_start(text, line);
                text[..end].rfind(target)
            }
        }
    }
}

/// A successful locate: the match offset and the strategy that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub offset: usize,
    pub strategy: Strategy,
}

/// Multi-strategy locator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Locator {
    pub window: SearchWindow,
}

impl Locator {
    pub fn new(window: SearchWindow) -> Self {
        Self { window }
    }

    /// Find `target` in `text`, biased towards the 1-based `line_hint`.
    ///
    /// Returns the offset of the first character of the match found by the
    /// first successful strategy, or `None` when no strategy matches.
    pub fn locate(&self, text: &str, target: &str, line_hint: Option<usize>) -> Option<Match> {
        if target.is_empty() {
            return Some(match line_hint {
                Some(line) => Match {
                    offset: line_start(text, line),
                    strategy: Strategy::Window,
                },
                None => Match {
                    offset: 0,
                    strategy: Strategy::Document,
                },
            });
        }
        Strategy::ORDERED
            .into_iter()
            .filter(|strategy| line_hint.is_some() || !strategy.needs_hint())
            .find_map(|strategy| {
                strategy
                    .find(text, target, line_hint, self.window)
                    .map(|offset| Match { offset, strategy })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Document with `target` on each of the given 1-based lines and filler
    /// everywhere else.
    fn document_with(target: &str, lines: &[usize], total: usize) -> String {
        (1..=total)
            .map(|n| {
                if lines.contains(&n) {
                    target.to_string()
                } else {
                    format!("filler line {n}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_window_prefers_occurrence_near_hint() {
        let text = document_with("let target = 1;", &[2, 200], 300);
        let found = Locator::default()
            .locate(&text, "let target = 1;", Some(195))
            .unwrap();
        assert_eq!(found.strategy, Strategy::Window);
        assert_eq!(found.offset, line_start(&text, 200));
    }

    #[test]
    fn test_forward_beyond_window() {
        let text = document_with("needle", &[290], 300);
        let found = Locator::default().locate(&text, "needle", Some(10)).unwrap();
        assert_eq!(found.strategy, Strategy::Forward);
        assert_eq!(found.offset, line_start(&text, 290));
    }

    #[test]
    fn test_backward_beyond_window() {
        let text = document_with("needle", &[3], 300);
        let found = Locator::default().locate(&text, "needle", Some(280)).unwrap();
        assert_eq!(found.strategy, Strategy::Backward);
        assert_eq!(found.offset, line_start(&text, 3));
    }

    #[test]
    fn test_backward_picks_nearest_preceding_match() {
        let text = document_with("needle", &[3, 20], 300);
        let found = Locator::default().locate(&text, "needle", Some(280)).unwrap();
        assert_eq!(found.strategy, Strategy::Backward);
        assert_eq!(found.offset, line_start(&text, 20));
    }

    #[test]
    fn test_without_hint_uses_first_match() {
        let text = document_with("needle", &[5, 6], 10);
        let found = Locator::default().locate(&text, "needle", None).unwrap();
        assert_eq!(found.strategy, Strategy::Document);
        assert_eq!(found.offset, line_start(&text, 5));
    }

    #[test]
    fn test_not_found_regardless_of_hint() {
        let text = document_with("needle", &[5], 10);
        let locator = Locator::default();
        assert_eq!(locator.locate(&text, "haystack", None), None);
        assert_eq!(locator.locate(&text, "haystack", Some(5)), None);
        assert_eq!(locator.locate(&text, "haystack", Some(5000)), None);
    }

    #[test]
    fn test_empty_target_anchors_at_hint_line() {
        let text = "one\ntwo\nthree\n";
        let at_hint = Locator::default().locate(text, "", Some(2)).unwrap();
        assert_eq!(at_hint.offset, 4);
        assert_eq!(at_hint.strategy, Strategy::Window);

        let unhinted = Locator::default().locate(text, "", None).unwrap();
        assert_eq!(unhinted.offset, 0);
        assert_eq!(Locator::default().locate("", "", Some(9)).unwrap().offset, 0);
        assert_eq!(Strategy::Document.find(text, "", None, SearchWindow::default()), None);
    }

    #[test]
    fn test_hint_past_end_of_document() {
        let text = "a\nb\nneedle";
        let found = Locator::default().locate(text, "needle", Some(1000)).unwrap();
        assert_eq!(found.offset, 4);
    }

    #[test]
    fn test_custom_window_is_respected() {
        let text = document_with("needle", &[2, 40], 60);
        let narrow = Locator::new(SearchWindow {
            before: 1,
            after: 1,
        });
        // Neither occurrence is within one line of 20, so the forward pass wins.
        let found = narrow.locate(&text, "needle", Some(20)).unwrap();
        assert_eq!(found.strategy, Strategy::Forward);
        assert_eq!(found.offset, line_start(&text, 40));
    }

    #[test]
    fn test_multi_line_target_within_window() {
        let text = "x\nfoo\nbar\ny";
        let found = Locator::default().locate(text, "foo\nbar", Some(2)).unwrap();
        assert_eq!(found.strategy, Strategy::Window);
        assert_eq!(found.offset, 2);
    }
}
