//! Line classification and cell splitting for box-drawing tables.
//!
//! The backend renders tables for a terminal, e.g.
//!
//! ```text
//!                 Your Real Estate Projects
//! ┏━━━━┳━━━━━━━━━━━━━━┳━━━━━━━━━━┳━━━━━━━━━━━┓
//! ┃ ID ┃ Name         ┃ Status   ┃    Budget ┃
//! ┡━━━━╇━━━━━━━━━━━━━━╇━━━━━━━━━━╇━━━━━━━━━━━┩
//! │ 1  │ Main St Flip │ Planning │  $150,000 │
//! └────┴──────────────┴──────────┴───────────┘
//! ```
//!
//! or the same shape in plain ASCII (`+---+`, `|`). Only `Data` lines carry
//! records; everything else is layout.

/// Delimiters that open a data row.
const DATA_DELIMITERS: [char; 2] = ['│', '|'];

/// Heavier verticals used only by header rows.
const HEADER_DELIMITERS: [char; 2] = ['┃', '║'];

/// Every vertical glyph a cell boundary can be drawn with.
const ALL_VERTICALS: [char; 4] = ['│', '|', '┃', '║'];

/// Glyphs that may start an inner separator (the rule under a header, or
/// between rows). Outer borders start with a corner instead.
const INNER_RULE_STARTS: [char; 9] = ['├', '┡', '┢', '╞', '╟', '┠', '┣', '|', '│'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// Outer border: top or bottom edge of a table.
    Border,
    /// Inner separator: under the header or between rows.
    Separator,
    Header,
    /// Title, footer or any other free text.
    Text,
    /// A wrapped cell spilling onto the next line (first cell blank).
    Continuation,
    Data,
}

/// Ordered, trimmed, non-empty cells from one data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    /// 1-based line number in the raw response, for diagnostics.
    pub line_no: usize,
    pub cells: Vec<String>,
}

impl ParsedRow {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }
}

fn is_horizontal_glyph(c: char) -> bool {
    matches!(
        c,
        '─' | '━' | '═' | '┄' | '┅' | '┈' | '┉' | '╌' | '╍' | '-' | '='
    )
}

fn is_rule_glyph(c: char) -> bool {
    is_horizontal_glyph(c)
        || c.is_whitespace()
        || c == '+'
        || c == ':'
        || ('\u{2500}'..='\u{257F}').contains(&c)
        || ALL_VERTICALS.contains(&c)
}

/// Classify one line on its own. Header detection for ASCII tables needs
/// neighbouring lines and happens in [`classify_lines`].
fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    let Some(first) = trimmed.chars().next() else {
        return LineKind::Blank;
    };

    if trimmed.chars().any(is_horizontal_glyph) && trimmed.chars().all(is_rule_glyph) {
        return if INNER_RULE_STARTS.contains(&first) {
            LineKind::Separator
        } else {
            LineKind::Border
        };
    }

    if HEADER_DELIMITERS.contains(&first) {
        return LineKind::Header;
    }

    if DATA_DELIMITERS.contains(&first) {
        let rest = &trimmed[first.len_utf8()..];
        let first_cell = rest.split(&ALL_VERTICALS[..]).next().unwrap_or("");
        if first_cell.trim().is_empty() {
            return LineKind::Continuation;
        }
        return LineKind::Data;
    }

    LineKind::Text
}

/// Classify every line of a raw response.
///
/// A `|`/`│` line counts as a header when it sits directly under an outer
/// border (or at the top), directly above an inner separator, in a table
/// that has no heavy header yet, and holds no digits. Column labels never
/// carry ids, amounts or floors; a first record followed by a row rule
/// always does.
pub fn classify_lines(raw: &str) -> Vec<(usize, &str, LineKind)> {
    let mut lines: Vec<(usize, &str, LineKind)> = raw
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line, classify_line(line)))
        .collect();

    let mut has_header = false;
    for i in 0..lines.len() {
        let kind = lines[i].2;
        match kind {
            LineKind::Border | LineKind::Text => has_header = false,
            LineKind::Header => has_header = true,
            LineKind::Data if !has_header => {
                let prev = lines[..i]
                    .iter()
                    .rev()
                    .map(|l| l.2)
                    .find(|k| *k != LineKind::Blank);
                let next = lines[i + 1..].iter().map(|l| l.2).find(|k| *k != LineKind::Blank);

                let opens_table =
                    matches!(prev, None | Some(LineKind::Border) | Some(LineKind::Text));
                let labels_only = !lines[i].1.chars().any(|c| c.is_ascii_digit());
                if opens_table && next == Some(LineKind::Separator) && labels_only {
                    lines[i].2 = LineKind::Header;
                    has_header = true;
                }
            }
            _ => {}
        }
    }

    lines
}

/// Split a data line on its vertical delimiters, trimming each segment and
/// dropping empty ones.
pub fn split_cells(line: &str) -> Vec<String> {
    line.split(&ALL_VERTICALS[..])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RICH_TABLE: &str = "\
                Your Real Estate Projects
┏━━━━┳━━━━━━━━━━━━━━┳━━━━━━━━━━┓
┃ ID ┃ Name         ┃   Budget ┃
┡━━━━╇━━━━━━━━━━━━━━╇━━━━━━━━━━┩
│ 1  │ Main St Flip │ $150,000 │
│    │ (wrapped)    │          │
└────┴──────────────┴──────────┘
";

    const ASCII_TABLE: &str = "\
+----+------+
| ID | Name |
|----+------|
| 1  | Oak  |
| 2  | Elm  |
+----+------+
";

    fn kinds(raw: &str) -> Vec<LineKind> {
        classify_lines(raw).into_iter().map(|l| l.2).collect()
    }

    #[test]
    fn test_classify_rich_heavy_head_table() {
        assert_eq!(
            kinds(RICH_TABLE),
            vec![
                LineKind::Text,
                LineKind::Border,
                LineKind::Header,
                LineKind::Separator,
                LineKind::Data,
                LineKind::Continuation,
                LineKind::Border,
            ]
        );
    }

    #[test]
    fn test_classify_ascii_table_detects_header() {
        assert_eq!(
            kinds(ASCII_TABLE),
            vec![
                LineKind::Border,
                LineKind::Header,
                LineKind::Separator,
                LineKind::Data,
                LineKind::Data,
                LineKind::Border,
            ]
        );
    }

    #[test]
    fn test_headerless_table_with_row_rules_keeps_first_row() {
        let raw = "\
┌────┬──────┐
│ 1  │ Oak  │
├────┼──────┤
│ 2  │ Elm  │
└────┴──────┘
";
        assert_eq!(
            kinds(raw),
            vec![
                LineKind::Border,
                LineKind::Data,
                LineKind::Separator,
                LineKind::Data,
                LineKind::Border,
            ]
        );
    }

    #[test]
    fn test_heavy_header_table_with_row_rules() {
        let raw = "\
┏━━━━┳━━━━━━┓
┃ ID ┃ Name ┃
┡━━━━╇━━━━━━┩
│ 1  │ Oak  │
├────┼──────┤
│ 2  │ Elm  │
└────┴──────┘
";
        assert_eq!(
            kinds(raw),
            vec![
                LineKind::Border,
                LineKind::Header,
                LineKind::Separator,
                LineKind::Data,
                LineKind::Separator,
                LineKind::Data,
                LineKind::Border,
            ]
        );
    }

    #[test]
    fn test_blank_and_text_lines() {
        assert_eq!(
            kinds("\n   \nNo projects found.\n"),
            vec![LineKind::Blank, LineKind::Blank, LineKind::Text]
        );
    }

    #[test]
    fn test_split_cells_trims_and_drops_empty() {
        assert_eq!(
            split_cells("│ 1 │ Main St Flip │  │ $150,000 │"),
            vec!["1", "Main St Flip", "$150,000"]
        );
        assert_eq!(split_cells("| a | b |"), vec!["a", "b"]);
    }
}
