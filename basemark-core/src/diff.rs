//! Line-granularity diffing between a baseline and the current text.
//!
//! Everything here is a pure function of two immutable strings. The hunk
//! sequence comes from `similar`'s line diff (Myers, deterministic); this
//! module only adds the line-counting rules and the two classifications the
//! annotators consume:
//!
//! - current space: lines of the current text that are `Added` (net new) or
//!   `Modified` (an added run directly following a removed run);
//! - baseline space: lines of the baseline that are `Removed`.

use similar::{ChangeTag, TextDiff};

/// Tag of a hunk in the diff sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkKind {
    Unchanged,
    Added,
    Removed,
}

/// A maximal run of lines sharing one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunk {
    pub kind: HunkKind,
    pub lines: usize,
}

/// Classification attached to a single line.
///
/// `Added` and `Modified` only ever index into the current text; `Removed`
/// only ever indexes into the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LineKind {
    Added,
    Modified,
    Removed,
}

/// Current-space classification: zero-based line indices of the current text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentChanges {
    pub added: Vec<usize>,
    pub modified: Vec<usize>,
}

impl CurrentChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty()
    }

    /// Iterates every classified line with its kind, added lines first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, LineKind)> + '_ {
        self.added
            .iter()
            .map(|&l| (l, LineKind::Added))
            .chain(self.modified.iter().map(|&l| (l, LineKind::Modified)))
    }
}

/// Number of lines in `s`: the newline count, plus one when the text does not
/// end in a newline. The empty string has zero lines.
pub fn count_lines(s: &str) -> usize {
    if s.is_empty() {
        return 0;
    }
    let newlines = s.bytes().filter(|&b| b == b'\n').count();
    if s.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

/// Computes the hunk sequence turning `baseline` into `current`.
///
/// Within a replaced region the removed hunk always precedes the added one,
/// which is what makes the "modified" classification possible.
pub fn diff(baseline: &str, current: &str) -> Vec<Hunk> {
    if baseline == current {
        let lines = count_lines(current);
        return if lines == 0 {
            Vec::new()
        } else {
            vec![Hunk { kind: HunkKind::Unchanged, lines }]
        };
    }
    if baseline.is_empty() {
        return vec![Hunk { kind: HunkKind::Added, lines: count_lines(current) }];
    }
    if current.is_empty() {
        return vec![Hunk { kind: HunkKind::Removed, lines: count_lines(baseline) }];
    }

    let text_diff = TextDiff::from_lines(baseline, current);
    let mut hunks: Vec<Hunk> = Vec::new();
    for change in text_diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => HunkKind::Unchanged,
            ChangeTag::Insert => HunkKind::Added,
            ChangeTag::Delete => HunkKind::Removed,
        };
        match hunks.last_mut() {
            Some(last) if last.kind == kind => last.lines += 1,
            _ => hunks.push(Hunk { kind, lines: 1 }),
        }
    }
    hunks
}

/// Classifies lines of `current` as added or modified relative to `baseline`.
///
/// Walks the hunks with a cursor in current space. Removed hunks do not move
/// the cursor; they only mark the next added hunk as a replacement.
pub fn classify_for_current(baseline: &str, current: &str) -> CurrentChanges {
    let mut out = CurrentChanges::default();
    if baseline == current {
        return out;
    }

    let mut line = 0usize;
    let mut after_removed = false;
    for hunk in diff(baseline, current) {
        match hunk.kind {
            HunkKind::Added => {
                let bucket = if after_removed { &mut out.modified } else { &mut out.added };
                bucket.extend(line..line + hunk.lines);
                line += hunk.lines;
                after_removed = false;
            }
            HunkKind::Removed => after_removed = true,
            HunkKind::Unchanged => {
                line += hunk.lines;
                after_removed = false;
            }
        }
    }
    out
}

/// Zero-based indices of baseline lines that are gone from `current`.
///
/// The cursor lives in baseline space: unchanged and removed hunks advance it,
/// added hunks do not.
pub fn classify_for_baseline(baseline: &str, current: &str) -> Vec<usize> {
    let mut removed = Vec::new();
    if baseline == current {
        return removed;
    }

    let mut line = 0usize;
    for hunk in diff(baseline, current) {
        match hunk.kind {
            HunkKind::Removed => {
                removed.extend(line..line + hunk.lines);
                line += hunk.lines;
            }
            HunkKind::Unchanged => line += hunk.lines,
            HunkKind::Added => {}
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn count_lines_edge_cases() {
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("a"), 1);
        assert_eq!(count_lines("a\n"), 1);
        assert_eq!(count_lines("a\nb"), 2);
        assert_eq!(count_lines("\n\n"), 2);
    }

    #[test]
    fn replaced_line_is_modified_and_removed() {
        let changes = classify_for_current("a\nb\nc", "a\nx\nc");
        assert_eq!(changes.modified, vec![1]);
        assert!(changes.added.is_empty());
        assert_eq!(classify_for_baseline("a\nb\nc", "a\nx\nc"), vec![1]);
    }

    #[test]
    fn empty_baseline_marks_everything_added() {
        let changes = classify_for_current("", "hello");
        assert_eq!(changes.added, vec![0]);
        assert!(changes.modified.is_empty());

        let changes = classify_for_current("", "a\nb\nc\n");
        assert_eq!(changes.added, vec![0, 1, 2]);
        assert!(classify_for_baseline("", "a\nb").is_empty());
    }

    #[test]
    fn empty_current_marks_baseline_removed() {
        assert!(classify_for_current("a\nb\n", "").is_empty());
        assert_eq!(classify_for_baseline("a\nb\n", ""), vec![0, 1]);
    }

    #[test]
    fn pure_insertion_is_added_not_modified() {
        let changes = classify_for_current("a\nc\n", "a\nb\nc\n");
        assert_eq!(changes.added, vec![1]);
        assert!(changes.modified.is_empty());
        assert!(classify_for_baseline("a\nc\n", "a\nb\nc\n").is_empty());
    }

    #[test]
    fn pure_deletion_only_touches_baseline_space() {
        let changes = classify_for_current("a\nb\nc\n", "a\nc\n");
        assert!(changes.is_empty());
        assert_eq!(classify_for_baseline("a\nb\nc\n", "a\nc\n"), vec![1]);
    }

    #[test]
    fn appending_to_unterminated_last_line_replaces_it() {
        // "c" and "c\n" are different lines to a line diff, so the whole
        // added run follows a removal and counts as modified.
        assert_eq!(
            diff("a\nc", "a\nc\nd"),
            vec![
                Hunk { kind: HunkKind::Unchanged, lines: 1 },
                Hunk { kind: HunkKind::Removed, lines: 1 },
                Hunk { kind: HunkKind::Added, lines: 2 },
            ]
        );
        let changes = classify_for_current("a\nc", "a\nc\nd");
        assert_eq!(changes.modified, vec![1, 2]);
        assert!(changes.added.is_empty());
        assert_eq!(classify_for_baseline("a\nc", "a\nc\nd"), vec![1]);
    }

    #[test]
    fn hunks_are_maximal_and_ordered() {
        let hunks = diff("a\nb\nc\n", "a\nx\ny\nc\n");
        assert_eq!(
            hunks,
            vec![
                Hunk { kind: HunkKind::Unchanged, lines: 1 },
                Hunk { kind: HunkKind::Removed, lines: 1 },
                Hunk { kind: HunkKind::Added, lines: 2 },
                Hunk { kind: HunkKind::Unchanged, lines: 1 },
            ]
        );
    }

    #[test]
    fn diff_is_deterministic() {
        let a = "fn main() {\n    one();\n    two();\n}\n";
        let b = "fn main() {\n    two();\n    three();\n}\n";
        assert_eq!(diff(a, b), diff(a, b));
    }

    fn text_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d", ""]), 0..12)
            .prop_flat_map(|lines| {
                let joined = lines.join("\n");
                prop::bool::ANY.prop_map(move |trailing| {
                    if trailing && !joined.is_empty() {
                        format!("{joined}\n")
                    } else {
                        joined.clone()
                    }
                })
            })
    }

    proptest! {
        #[test]
        fn identical_inputs_classify_to_nothing(a in text_strategy()) {
            prop_assert!(classify_for_current(&a, &a).is_empty());
            prop_assert!(classify_for_baseline(&a, &a).is_empty());
        }

        #[test]
        fn current_classification_covers_exactly_the_inserted_lines(
            b in text_strategy(),
            c in text_strategy(),
        ) {
            let changes = classify_for_current(&b, &c);
            let mut classified: Vec<usize> = changes.iter().map(|(l, _)| l).collect();
            classified.sort_unstable();

            let expected: Vec<usize> = if b == c {
                Vec::new()
            } else if b.is_empty() {
                (0..count_lines(&c)).collect()
            } else {
                TextDiff::from_lines(b.as_str(), c.as_str())
                    .iter_all_changes()
                    .filter(|ch| ch.tag() == ChangeTag::Insert)
                    .filter_map(|ch| ch.new_index())
                    .collect()
            };
            prop_assert_eq!(classified, expected);
        }

        #[test]
        fn hunk_line_totals_match_both_texts(b in text_strategy(), c in text_strategy()) {
            let hunks = diff(&b, &c);
            let old: usize = hunks.iter().filter(|h| h.kind != HunkKind::Added).map(|h| h.lines).sum();
            let new: usize = hunks.iter().filter(|h| h.kind != HunkKind::Removed).map(|h| h.lines).sum();
            prop_assert_eq!(old, count_lines(&b));
            prop_assert_eq!(new, count_lines(&c));
        }
    }
}
