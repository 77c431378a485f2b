//! Label-anchored field extraction.
//!
//! PDF and OCR text often loses the vertical alignment between a label and
//! its value, so a value is looked up with a cascade of strategies:
//!
//! 1. `Label: Value` / `Label = Value` on the same line,
//! 2. `Label Value` where the value is a capitalized run on the same line,
//! 3. the label on a line of its own with the value on a following line.
//!
//! Each strategy is bounded by a set of [`StopLabels`]: when the candidate
//! value begins with another field's label, the candidate is rejected.

use regex::Regex;
use tracing::trace;

use super::patterns::COLUMN_GAP;

/// One label variant, compiled for every strategy.
#[derive(Debug, Clone)]
pub struct LabelPattern {
    source: String,
    delimited: Regex,
    adjacent: Regex,
    anchor: Regex,
    inline: Regex,
}

impl LabelPattern {
    /// Compile a label given as a regex fragment, e.g. `\bPI\s*No\.?`.
    ///
    /// The label is matched case-insensitively.
    pub fn new(label: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: label.to_string(),
            delimited: Regex::new(&format!(r"(?i:{label})[ \t]*[:=][ \t]*([^\n:{{]+)"))?,
            adjacent: Regex::new(&format!(r"(?i:{label})[ \t]+([A-Z][^\n:{{]*)"))?,
            anchor: Regex::new(&format!(r"(?i){label}"))?,
            inline: Regex::new(&format!(r"(?i:{label})[ \t]*[:=]?[ \t]*(.+)$"))?,
        })
    }

    /// Compile a list of label fragments.
    pub fn compile_all(labels: &[&str]) -> Result<Vec<Self>, regex::Error> {
        labels.iter().map(|l| Self::new(l)).collect()
    }

    /// The regex fragment this label was built from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Labels that mark the start of some other field.
#[derive(Debug, Clone, Default)]
pub struct StopLabels {
    patterns: Option<StopPatterns>,
}

#[derive(Debug, Clone)]
struct StopPatterns {
    leading: Regex,
    opening: Regex,
    trailing: Regex,
}

impl StopLabels {
    /// Build a stop set from label fragments such as `Tel` or `Kind`.
    pub fn new<S: AsRef<str>>(tokens: &[S]) -> Result<Self, regex::Error> {
        if tokens.is_empty() {
            return Ok(Self::none());
        }

        let alternation = tokens
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            patterns: Some(StopPatterns {
                leading: Regex::new(&format!(r"(?i)^(?:{alternation})\b"))?,
                opening: Regex::new(&format!(r"(?i)^(?:{alternation})\s*[:=]"))?,
                trailing: Regex::new(&format!(r"(?i)\s+(?:{alternation})\b.*$"))?,
            }),
        })
    }

    /// A stop set that never matches.
    pub fn none() -> Self {
        Self { patterns: None }
    }

    /// The text begins with a stop label.
    pub fn starts(&self, value: &str) -> bool {
        self.patterns
            .as_ref()
            .is_some_and(|p| p.leading.is_match(value.trim_start()))
    }

    /// The line opens another field, i.e. `<stop label>:` or `<stop label>=`.
    pub fn opens_field(&self, line: &str) -> bool {
        self.patterns
            .as_ref()
            .is_some_and(|p| p.opening.is_match(line.trim_start()))
    }

    /// Remove any suffix that starts at a stop label.
    pub fn strip_trailing(&self, value: &str) -> String {
        match &self.patterns {
            Some(p) => p.trailing.replace(value, "").trim().to_string(),
            None => value.trim().to_string(),
        }
    }
}

/// A found value and the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldMatch {
    value: String,
    line: usize,
}

/// Text split once into lines for the line-oriented strategies.
struct SearchText<'a> {
    text: &'a str,
    lines: Vec<&'a str>,
}

impl<'a> SearchText<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            lines: text.split('\n').collect(),
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.text[..offset].matches('\n').count()
    }
}

type Strategy = fn(&LabelPattern, &SearchText<'_>, &StopLabels, usize) -> Option<FieldMatch>;

/// Strategies in priority order.
const STRATEGIES: [(&str, Strategy); 3] = [
    ("delimited", same_line_delimited),
    ("adjacent", same_line_adjacent),
    ("next_line", next_line_lookahead),
];

/// Find the value for a field given its label variants.
///
/// Labels are tried in order; for each label the strategies are tried in
/// order and the first success wins. `max_line_distance` bounds how many
/// lines below a bare label are inspected.
pub fn find_field(
    labels: &[LabelPattern],
    text: &str,
    stops: &StopLabels,
    max_line_distance: usize,
) -> Option<String> {
    let search = SearchText::new(text);
    locate(labels, &search, stops, max_line_distance).map(|m| m.value)
}

/// Like [`find_field`], but keeps the lines that follow the value.
///
/// Continuation lines are gathered until a blank line, a line that starts
/// with a stop label, or `max_lines` lines in total. Lines are joined with
/// `\n`.
pub fn find_field_block(
    labels: &[LabelPattern],
    text: &str,
    stops: &StopLabels,
    max_line_distance: usize,
    max_lines: usize,
) -> Option<String> {
    let search = SearchText::new(text);
    let found = locate(labels, &search, stops, max_line_distance)?;

    let mut block = vec![found.value];
    for line in search.lines.iter().skip(found.line + 1) {
        if block.len() >= max_lines {
            break;
        }
        let line = line.trim();
        if line.is_empty() || stops.starts(line) || stops.opens_field(line) {
            break;
        }
        block.push(line.to_string());
    }

    Some(block.join("\n"))
}

fn locate(
    labels: &[LabelPattern],
    search: &SearchText<'_>,
    stops: &StopLabels,
    max_line_distance: usize,
) -> Option<FieldMatch> {
    for label in labels {
        for (name, strategy) in STRATEGIES {
            if let Some(found) = strategy(label, search, stops, max_line_distance) {
                trace!("label {} matched by {} strategy: {:?}", label.source, name, found.value);
                return Some(found);
            }
        }
    }
    None
}

fn same_line_delimited(
    label: &LabelPattern,
    search: &SearchText<'_>,
    stops: &StopLabels,
    _max_line_distance: usize,
) -> Option<FieldMatch> {
    let caps = label.delimited.captures(search.text)?;
    let group = caps.get(1)?;
    let value = group.as_str().trim();

    if value.is_empty() || stops.starts(value) {
        return None;
    }

    Some(FieldMatch {
        value: value.to_string(),
        line: search.line_of(group.start()),
    })
}

fn same_line_adjacent(
    label: &LabelPattern,
    search: &SearchText<'_>,
    stops: &StopLabels,
    _max_line_distance: usize,
) -> Option<FieldMatch> {
    let caps = label.adjacent.captures(search.text)?;
    let group = caps.get(1)?;

    // The run ends at the first column gap.
    let run = group.as_str();
    let value = match COLUMN_GAP.find(run) {
        Some(gap) => &run[..gap.start()],
        None => run,
    }
    .trim();

    if value.chars().count() < 3 || stops.starts(value) {
        return None;
    }

    Some(FieldMatch {
        value: value.to_string(),
        line: search.line_of(group.start()),
    })
}

fn next_line_lookahead(
    label: &LabelPattern,
    search: &SearchText<'_>,
    stops: &StopLabels,
    max_line_distance: usize,
) -> Option<FieldMatch> {
    for (i, line) in search.lines.iter().enumerate() {
        if !label.anchor.is_match(line) {
            continue;
        }

        // Value after the label on the same line. A line where the label is
        // followed by another label is a column header, not this field.
        if let Some(caps) = label.inline.captures(line) {
            let value = caps[1].trim().trim_start_matches([':', '=']).trim();
            if stops.starts(value) {
                continue;
            }
            if value.chars().any(char::is_alphanumeric) {
                return Some(FieldMatch {
                    value: value.to_string(),
                    line: i,
                });
            }
        }

        // Value on one of the following lines.
        for (offset, next) in search
            .lines
            .iter()
            .enumerate()
            .skip(i + 1)
            .take(max_line_distance)
        {
            let next = next.trim();
            if next.is_empty() {
                continue;
            }
            if stops.opens_field(next) {
                break;
            }
            return Some(FieldMatch {
                value: next.to_string(),
                line: offset,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(l: &[&str]) -> Vec<LabelPattern> {
        LabelPattern::compile_all(l).unwrap()
    }

    fn stops(t: &[&str]) -> StopLabels {
        StopLabels::new(t).unwrap()
    }

    #[test]
    fn test_delimited_value() {
        let text = "Customer Name: ACME MOTORS LTD\nAddress: P.O. Box 1";
        let found = find_field(&labels(&[r"\bCustomer\s*Name\b"]), text, &stops(&["Address"]), 10);
        assert_eq!(found.as_deref(), Some("ACME MOTORS LTD"));
    }

    #[test]
    fn test_equals_delimiter() {
        let found = find_field(&labels(&[r"\bRef\b"]), "Ref = T 123 ABC\n", &StopLabels::none(), 10);
        assert_eq!(found.as_deref(), Some("T 123 ABC"));
    }

    #[test]
    fn test_delimited_rejects_stop_label() {
        // "Attended:" is itself the next field's label.
        let text = "Kind Attention: Attended: JOHN";
        let labels = labels(&[r"\bKind\s*Attention\b"]);
        assert!(same_line_delimited(&labels[0], &SearchText::new(text), &stops(&["Attended"]), 10).is_none());
    }

    #[test]
    fn test_adjacent_value_stops_at_column_gap() {
        let text = "Customer Name ACME MOTORS LTD    Tel 0755 000 000";
        let labels = labels(&[r"\bCustomer\s*Name\b"]);
        let found = same_line_adjacent(&labels[0], &SearchText::new(text), &StopLabels::none(), 10);
        assert_eq!(found.map(|m| m.value).as_deref(), Some("ACME MOTORS LTD"));
    }

    #[test]
    fn test_adjacent_requires_capital_and_length() {
        let labels = labels(&[r"\bRef\b"]);
        let none = StopLabels::none();
        assert!(same_line_adjacent(&labels[0], &SearchText::new("Ref AB"), &none, 10).is_none());
        assert!(same_line_adjacent(&labels[0], &SearchText::new("Ref abc"), &none, 10).is_none());
        assert!(same_line_adjacent(&labels[0], &SearchText::new("Ref ABC"), &none, 10).is_some());
    }

    #[test]
    fn test_next_line_value() {
        let text = "Reference\n\nT 123 ABC\nTel: 0755";
        let found = find_field(&labels(&[r"\bReference\b"]), text, &stops(&["Tel"]), 10);
        assert_eq!(found.as_deref(), Some("T 123 ABC"));
    }

    #[test]
    fn test_next_line_stops_at_next_field() {
        let text = "Attended By\nKind Attention: MR JUMA";
        let found = find_field(
            &labels(&[r"\bAttended\s*By\b"]),
            text,
            &stops(&[r"Kind\s*Attention"]),
            10,
        );
        assert!(found.is_none());
    }

    #[test]
    fn test_next_line_distance_bound() {
        let text = "Remarks\n\n\n\nSEE ATTACHED";
        let l = labels(&[r"\bRemarks\b"]);
        assert!(find_field(&l, text, &StopLabels::none(), 2).is_none());
        assert_eq!(
            find_field(&l, text, &StopLabels::none(), 4).as_deref(),
            Some("SEE ATTACHED")
        );
    }

    #[test]
    fn test_next_line_skips_column_headers() {
        let text = "Sr  Item Code  Description  Qty\n1  41003  ARM  2\nCode\nC-0042";
        let found = find_field(
            &labels(&[r"\bCode\b"]),
            text,
            &stops(&["Description", "Qty"]),
            10,
        );
        assert_eq!(found.as_deref(), Some("C-0042"));
    }

    #[test]
    fn test_label_punctuation_is_not_a_value() {
        let text = "PI No.\nPI-8812";
        let found = find_field(&labels(&[r"\bPI\s*No\.?"]), text, &StopLabels::none(), 10);
        assert_eq!(found.as_deref(), Some("PI-8812"));
    }

    #[test]
    fn test_label_order_is_priority() {
        let text = "Bill To: SECOND CHOICE\nCustomer Name: FIRST CHOICE";
        let found = find_field(
            &labels(&[r"\bCustomer\s*Name\b", r"\bBill\s*To\b"]),
            text,
            &StopLabels::none(),
            10,
        );
        assert_eq!(found.as_deref(), Some("FIRST CHOICE"));
    }

    #[test]
    fn test_block_collects_continuation_lines() {
        let text = "Address: P.O. Box 55\nARUSHA\nTANZANIA\nTel: 0755 000 000";
        let found = find_field_block(&labels(&[r"\bAddress\b"]), text, &stops(&["Tel"]), 10, 4);
        assert_eq!(found.as_deref(), Some("P.O. Box 55\nARUSHA\nTANZANIA"));
    }

    #[test]
    fn test_block_respects_max_lines() {
        let text = "Address: LINE ONE\nLINE TWO\nLINE THREE";
        let found = find_field_block(&labels(&[r"\bAddress\b"]), text, &StopLabels::none(), 10, 2);
        assert_eq!(found.as_deref(), Some("LINE ONE\nLINE TWO"));
    }

    #[test]
    fn test_strip_trailing() {
        let stops = stops(&["Tel", "Fax"]);
        assert_eq!(stops.strip_trailing("ACME LTD Tel 0755 000"), "ACME LTD");
        assert_eq!(stops.strip_trailing("ACME LTD"), "ACME LTD");
    }

    #[test]
    fn test_empty_stop_set_never_matches() {
        let none = StopLabels::none();
        assert!(!none.starts("Tel"));
        assert!(!none.opens_field("Tel:"));
        assert_eq!(none.strip_trailing("A B"), "A B");
    }
}
