//! Line-item table parsing.
//!
//! The table is found by keyword density: the first line hitting enough of
//! the column-header keyword groups is the header. Rows below it are parsed
//! until a totals/footer line. Column layouts differ between suppliers, so
//! the role of each number on a row (quantity, rate, value) is inferred from
//! how many numbers there are and their magnitude. The result is
//! best-effort; a role may be wrong but a row never aborts parsing.

use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::amounts::to_decimal;
use super::patterns::{
    collapse_whitespace, HEADER_DESCRIPTION, HEADER_ITEM, HEADER_QUANTITY, HEADER_RATE,
    HEADER_SERIAL, HEADER_VALUE, ITEM_CODE_IN_TEXT, ITEM_CODE_TOKEN, NUMBER_TOKEN, TABLE_FOOTER,
    UNIT_TOKEN,
};
use crate::models::config::ExtractionConfig;
use crate::models::invoice::LineItem;

/// Parser state while walking the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableState {
    SeekingHeader,
    InTable,
}

/// A number found on a row.
#[derive(Debug, Clone)]
struct NumberToken<'a> {
    raw: &'a str,
    value: Decimal,
    start: usize,
}

/// What a single table line turned out to be.
#[derive(Debug)]
enum Row {
    Item(LineItem),
    /// Numbers only; the largest may complete the previous item.
    Continuation(Decimal),
    Skip,
}

/// Line-item table parser.
#[derive(Debug, Clone)]
pub struct TableParser {
    header_threshold: usize,
    max_description_len: usize,
    rate_scale: u32,
}

impl Default for TableParser {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl TableParser {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            header_threshold: config.header_keyword_threshold,
            max_description_len: config.max_description_len,
            rate_scale: config.rate_scale,
        }
    }

    /// Number of column-header keyword groups a line matches (0-6).
    pub fn header_score(line: &str) -> usize {
        [
            &*HEADER_SERIAL,
            &*HEADER_ITEM,
            &*HEADER_DESCRIPTION,
            &*HEADER_QUANTITY,
            &*HEADER_RATE,
            &*HEADER_VALUE,
        ]
        .iter()
        .filter(|group| group.is_match(line))
        .count()
    }

    /// Parse all line items in document order.
    pub fn parse(&self, text: &str) -> Vec<LineItem> {
        let mut state = TableState::SeekingHeader;
        let mut items: Vec<LineItem> = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match state {
                TableState::SeekingHeader => {
                    if Self::header_score(line) >= self.header_threshold {
                        debug!("item table header at line {}: {}", idx, line);
                        state = TableState::InTable;
                    }
                }
                TableState::InTable => {
                    if TABLE_FOOTER.is_match(line) {
                        debug!("item table ends at line {}: {}", idx, line);
                        break;
                    }

                    match self.parse_row(line) {
                        Row::Item(item) => {
                            trace!("line {} parsed as item: {:?}", idx, item);
                            items.push(item);
                        }
                        Row::Continuation(amount) => {
                            if let Some(last) = items.last_mut() {
                                if is_missing(last.value) {
                                    trace!("line {} completes previous item value: {}", idx, amount);
                                    last.value = Some(amount);
                                    if is_missing(last.rate) {
                                        last.rate = self.rate(amount, last.quantity);
                                    }
                                }
                            }
                        }
                        Row::Skip => trace!("line {} skipped: {}", idx, line),
                    }
                }
            }
        }

        items
    }

    fn parse_row(&self, line: &str) -> Row {
        let numbers = number_tokens(line);
        let fragments = text_fragments(line, &numbers);

        match (fragments.is_empty(), numbers.is_empty()) {
            (_, true) => Row::Skip,
            (true, false) => match numbers.iter().map(|n| n.value).max() {
                Some(max) if max > Decimal::ZERO => Row::Continuation(max),
                _ => Row::Skip,
            },
            (false, false) => self
                .build_item(line, &numbers, &fragments)
                .map_or(Row::Skip, Row::Item),
        }
    }

    fn build_item(
        &self,
        line: &str,
        numbers: &[NumberToken<'_>],
        fragments: &[&str],
    ) -> Option<LineItem> {
        let joined = fragments.join(" ");
        if joined.chars().count() < 2 {
            return None;
        }

        let unit = UNIT_TOKEN.captures(&joined).map(|caps| caps[1].to_uppercase());
        let description = match &unit {
            Some(unit) => strip_unit(&joined, unit),
            None => collapse_whitespace(&joined),
        };
        let description = if description.is_empty() {
            joined.clone()
        } else {
            description
        };
        let description: String = description.chars().take(self.max_description_len).collect();

        // Item code: a plausible token among the first three numbers, else
        // a code-shaped run inside the description.
        let code_index = numbers.iter().take(3).position(|n| is_item_code(n));
        let code = match code_index {
            Some(i) => Some(numbers[i].raw.to_string()),
            None => ITEM_CODE_IN_TEXT
                .captures(&description)
                .map(|caps| caps[1].to_string()),
        };

        // Serial and code columns before the description carry no price.
        let text_start = fragments
            .first()
            .and_then(|f| line.find(f))
            .unwrap_or_default();
        let mut priced: Vec<Decimal> = numbers
            .iter()
            .enumerate()
            .filter(|(i, n)| Some(*i) != code_index && n.start >= text_start)
            .map(|(_, n)| n.value)
            .collect();
        if priced.is_empty() {
            priced = numbers
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != code_index)
                .map(|(_, n)| n.value)
                .collect();
        }

        let mut item = LineItem::new(description);
        item.code = code;
        item.unit = unit;
        self.assign_roles(&mut item, &priced)?;

        if item.description.trim().is_empty() {
            return None;
        }
        if item.value.is_none() && item.quantity == Decimal::ONE {
            return None;
        }
        Some(item)
    }

    /// Infer quantity, rate and value from the row's numbers.
    ///
    /// Returns `None` when the numbers cannot form an item (zero quantity).
    fn assign_roles(&self, item: &mut LineItem, numbers: &[Decimal]) -> Option<()> {
        match numbers {
            [] => {}
            [value] => {
                item.value = Some(*value);
                item.rate = Some(*value);
            }
            [first, second] => {
                let (quantity, value) = if is_whole(*first) && *first < Decimal::ONE_HUNDRED {
                    (*first, *second)
                } else if is_whole(*second) && *second < Decimal::ONE_HUNDRED {
                    (*second, *first)
                } else if first < second {
                    (*first, *second)
                } else {
                    (*second, *first)
                };
                if quantity.is_zero() {
                    return None;
                }
                item.quantity = quantity;
                item.value = Some(value);
                item.rate = self.rate(value, quantity);
            }
            _ => {
                let max = numbers.iter().copied().max()?;
                item.value = Some(max);

                let ten = Decimal::TEN;
                let half = Decimal::new(5, 1);
                let tolerance = Decimal::new(1, 1);
                let quantity = numbers.iter().copied().find(|n| {
                    *n > half
                        && *n < Decimal::ONE_THOUSAND
                        && (*n - n.round()).abs() < tolerance
                        && *n * ten <= max
                });

                if let Some(quantity) = quantity {
                    let quantity = quantity.round();
                    item.quantity = quantity;
                    item.rate = self.rate(max, quantity);
                }
            }
        }
        Some(())
    }

    fn rate(&self, value: Decimal, quantity: Decimal) -> Option<Decimal> {
        value
            .checked_div(quantity)
            .map(|rate| rate.round_dp(self.rate_scale).normalize())
    }
}

// A zero amount is a placeholder for a value printed on the next line.
fn is_missing(amount: Option<Decimal>) -> bool {
    amount.is_none_or(|a| a.is_zero())
}

/// Parse line items with the default settings.
pub fn parse_line_items(text: &str) -> Vec<LineItem> {
    TableParser::default().parse(text)
}

/// Numbers on a line, skipping digits glued to letters (`T456`, `2WD`).
fn number_tokens(line: &str) -> Vec<NumberToken<'_>> {
    NUMBER_TOKEN
        .find_iter(line)
        .filter(|m| {
            let before = line[..m.start()].chars().next_back();
            let after = line[m.end()..].chars().next();
            !before.is_some_and(char::is_alphabetic) && !after.is_some_and(char::is_alphabetic)
        })
        .filter_map(|m| {
            to_decimal(m.as_str()).map(|value| NumberToken {
                raw: m.as_str(),
                value,
                start: m.start(),
            })
        })
        .collect()
}

/// Text between the numbers, in order.
fn text_fragments<'a>(line: &'a str, numbers: &[NumberToken<'_>]) -> Vec<&'a str> {
    let mut fragments = Vec::new();
    let mut cursor = 0;
    for number in numbers {
        fragments.push(&line[cursor..number.start]);
        cursor = number.start + number.raw.len();
    }
    fragments.push(&line[cursor..]);

    fragments
        .into_iter()
        .map(str::trim)
        .filter(|f| f.chars().any(char::is_alphanumeric))
        .collect()
}

fn strip_unit(description: &str, unit: &str) -> String {
    match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(unit))) {
        Ok(pattern) => collapse_whitespace(&pattern.replace_all(description, "")),
        Err(_) => collapse_whitespace(description),
    }
}

fn is_item_code(token: &NumberToken<'_>) -> bool {
    if !ITEM_CODE_TOKEN.is_match(token.raw) {
        return false;
    }
    let n = token.value;
    (Decimal::from(100)..=Decimal::from(999)).contains(&n)
        || (Decimal::from(3000)..=Decimal::from(50000)).contains(&n)
        || (Decimal::from(10000)..=Decimal::from(99999)).contains(&n)
}

fn is_whole(n: Decimal) -> bool {
    n.fract().is_zero()
}
