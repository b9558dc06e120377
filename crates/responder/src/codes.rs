//! Part-code extraction and message classification.
//!
//! Three heuristics run in order over normalized text, each masking what it
//! matched so later ones cannot re-find a fragment:
//!
//! 1. segmented runs (`12345-67890`, `AB12/345 6`) with at least one digit
//!    and one internal separator;
//! 2. bare digit runs of 6–12;
//! 3. alphanumeric runs of 6–20 containing a digit.
//!
//! A message has non-code content when an alphabetic word (any script)
//! survives after the tokens and benign qualifier words are removed.

use std::{collections::HashSet, sync::LazyLock};

use {regex::Regex, serde::Serialize};

/// Characters that may join two segments of a code.
const SEGMENT_SEPARATORS: &[char] = &['-', '_', '/', '.', ' '];
/// Longest separator group accepted between two segments (`" - "`).
const MAX_SEPARATOR_RUN: usize = 3;
const MIN_SEGMENTED_LEN: usize = 6;
const DIGIT_RUN: (usize, usize) = (6, 12);
const ALNUM_RUN: (usize, usize) = (6, 20);

/// A candidate code found in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeToken {
    /// Matched text, uppercased, separators kept.
    pub text: String,
    /// Uppercase alphanumerics only; tokens with equal keys are duplicates.
    pub key: String,
}

impl CodeToken {
    fn new(matched: &str) -> Self {
        let text = matched.trim().to_ascii_uppercase();
        let key = text.chars().filter(char::is_ascii_alphanumeric).collect();
        Self { text, key }
    }
}

/// Result of analysing one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub tokens: Vec<CodeToken>,
    pub has_non_code: bool,
}

impl Extraction {
    /// The message cannot be fully answered automatically.
    pub fn needs_escalation(&self) -> bool {
        self.tokens.is_empty() || self.has_non_code
    }
}

/// Extracts codes and classifies residual text.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    benign: HashSet<String>,
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self::new(&partdesk_config::ResponderConfig::default().benign_words)
    }
}

impl CodeExtractor {
    pub fn new<S: AsRef<str>>(benign_words: &[S]) -> Self {
        Self {
            benign: benign_words
                .iter()
                .map(|w| normalize(w.as_ref()).trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Strip quoting, normalize, extract, and classify one raw message.
    pub fn analyze(&self, raw: &str) -> Extraction {
        let text = normalize(&strip_quote_header(raw));
        let mut chars: Vec<char> = text.chars().collect();
        let tokens = extract_masking(&mut chars);
        let has_non_code = self.has_non_code(&chars);
        Extraction {
            tokens,
            has_non_code,
        }
    }

    /// `residual` is the message with every token span blanked out.
    fn has_non_code(&self, residual: &[char]) -> bool {
        let residual: String = residual.iter().collect();
        residual
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.chars().any(char::is_alphabetic))
            .any(|word| !self.benign.contains(&word.to_lowercase()))
    }
}

/// Extract codes from already-normalized text.
pub fn extract_codes(normalized: &str) -> Vec<CodeToken> {
    let mut chars: Vec<char> = normalized.chars().collect();
    extract_masking(&mut chars)
}

/// Deduplicate by key, keeping the first occurrence.
pub fn dedup_tokens(tokens: impl IntoIterator<Item = CodeToken>) -> Vec<CodeToken> {
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|t| seen.insert(t.key.clone()))
        .collect()
}

fn extract_masking(chars: &mut [char]) -> Vec<CodeToken> {
    let original = chars.to_vec();

    let mut spans = segmented_spans(chars);
    mask(chars, &spans);

    let digit_spans = runs_where(chars, |run| {
        run.iter().all(char::is_ascii_digit) && in_range(run.len(), DIGIT_RUN)
    });
    mask(chars, &digit_spans);
    spans.extend(digit_spans);

    let alnum_spans = runs_where(chars, |run| {
        run.iter().any(char::is_ascii_digit) && in_range(run.len(), ALNUM_RUN)
    });
    mask(chars, &alnum_spans);
    spans.extend(alnum_spans);

    dedup_tokens(
        spans
            .iter()
            .map(|&(s, e)| CodeToken::new(&original[s..e].iter().collect::<String>())),
    )
}

fn mask(chars: &mut [char], spans: &[(usize, usize)]) {
    for &(s, e) in spans {
        chars[s..e].fill(' ');
    }
}

fn runs_where(chars: &[char], keep: impl Fn(&[char]) -> bool) -> Vec<(usize, usize)> {
    alnum_runs(chars)
        .into_iter()
        .filter(|&(s, e)| keep(&chars[s..e]))
        .collect()
}

fn in_range(len: usize, (min, max): (usize, usize)) -> bool {
    (min..=max).contains(&len)
}

/// Maximal `[A-Za-z0-9]+` runs as `(start, end)` char indices.
fn alnum_runs(chars: &[char]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_alphanumeric() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                i += 1;
            }
            runs.push((start, i));
        } else {
            i += 1;
        }
    }
    runs
}

/// Chains of alnum segments joined by short separator groups.
///
/// A separator group containing a space only joins when both neighbouring
/// segments carry a digit, so `12345-67890 please` stops before `please`.
fn segmented_spans(chars: &[char]) -> Vec<(usize, usize)> {
    let runs = alnum_runs(chars);
    let has_digit = |(s, e): (usize, usize)| chars[s..e].iter().any(char::is_ascii_digit);
    let joinable = |left: (usize, usize), right: (usize, usize)| {
        let gap = &chars[left.1..right.0];
        if gap.is_empty()
            || gap.len() > MAX_SEPARATOR_RUN
            || !gap.iter().all(|c| SEGMENT_SEPARATORS.contains(c))
        {
            return false;
        }
        !gap.contains(&' ') || (has_digit(left) && has_digit(right))
    };

    let mut spans = Vec::new();
    let mut i = 0;
    while i < runs.len() {
        let mut j = i;
        while j + 1 < runs.len() && joinable(runs[j], runs[j + 1]) {
            j += 1;
        }
        if j > i {
            let chain = &runs[i..=j];
            let alnum_len: usize = chain.iter().map(|(s, e)| e - s).sum();
            if alnum_len >= MIN_SEGMENTED_LEN && chain.iter().any(|&r| has_digit(r)) {
                spans.push((chain[0].0, chain[j - i].1));
            }
        }
        i = j + 1;
    }
    spans
}

/// Fold localized digits, dash variants, and odd spaces to ASCII and drop
/// invisible formatting characters.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '۰'..='۹' => char::from_digit(u32::from(c) - u32::from('۰'), 10),
            '٠'..='٩' => char::from_digit(u32::from(c) - u32::from('٠'), 10),
            '‐' | '‑' | '‒' | '–' | '—' | '⁃' | '−' | '﹘' | '﹣' | '－' => Some('-'),
            '\u{00A0}' | '\u{2007}' | '\u{2009}' | '\u{202F}' => Some(' '),
            c if is_format_char(c) => None,
            c => Some(c),
        })
        .collect()
}

/// Invisible format (Cf) characters common in chat text.
fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{061C}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
    )
}

static EXPORT_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*\[[^\]]+\]\s*[^:]{1,80}:\s*(.+)$").ok());

/// Remove a quoted-reply header line or a `[time] Name:` export prefix.
pub fn strip_quote_header(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    if lines.len() >= 2 {
        let first = lines[0].trim();
        if first.ends_with(':') || first.ends_with('…') || first.chars().count() <= 3 {
            return lines[1..].join("\n");
        }
        return raw.to_string();
    }

    if let Some(re) = EXPORT_LINE.as_ref()
        && let Some(body) = re.captures(raw).and_then(|c| c.get(1))
    {
        return body.as_str().to_string();
    }
    raw.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    fn texts(tokens: &[CodeToken]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn code_with_free_text_is_flagged() {
        let out = CodeExtractor::default().analyze("12345-67890 please confirm");
        assert_eq!(texts(&out.tokens), vec!["12345-67890"]);
        assert!(out.has_non_code);
        assert!(out.needs_escalation());
    }

    #[test]
    fn pure_digit_code_is_clean() {
        let out = CodeExtractor::default().analyze("1234567890");
        assert_eq!(texts(&out.tokens), vec!["1234567890"]);
        assert!(!out.has_non_code);
        assert!(!out.needs_escalation());
    }

    #[test]
    fn no_code_needs_escalation() {
        let out = CodeExtractor::default().analyze("hello, do you deliver to Shiraz?");
        assert!(out.tokens.is_empty());
        assert!(out.needs_escalation());
    }

    #[rstest]
    #[case("58101-2SA00", &["58101-2SA00"])]
    #[case("58101 2sa00", &["58101 2SA00"])]
    #[case("86511/2P000", &["86511/2P000"])]
    #[case("abc12345xyz", &["ABC12345XYZ"])]
    #[case("123456", &["123456"])]
    #[case("12345", &[])]
    #[case("1234567890123", &["1234567890123"])]
    #[case("123456789012345678901", &[])]
    #[case("e-mail me", &[])]
    #[case("v1.2", &[])]
    fn extraction_shapes(#[case] input: &str, #[case] expected: &[&str]) {
        assert_eq!(texts(&extract_codes(input)), expected);
    }

    #[test]
    fn heuristics_union_in_order_and_dedup() {
        let tokens = extract_codes("A1B2C3D4 then 12345-67890 and 1234567890 again 12345 67890");
        assert_eq!(texts(&tokens), vec!["12345-67890", "A1B2C3D4"]);
    }

    #[test]
    fn space_joins_only_digit_bearing_segments() {
        let tokens = extract_codes("part 12345-67890 price");
        assert_eq!(texts(&tokens), vec!["12345-67890"]);
    }

    #[test]
    fn trailing_punctuation_is_not_part_of_code() {
        assert_eq!(texts(&extract_codes("12345-67890.")), vec!["12345-67890"]);
    }

    #[test]
    fn persian_digits_and_dashes_are_folded() {
        let out = CodeExtractor::default().analyze("۵۸۱۰۱–۲۳۴۵۶");
        assert_eq!(texts(&out.tokens), vec!["58101-23456"]);
        assert!(!out.has_non_code);
    }

    #[test]
    fn invisible_characters_are_removed() {
        assert_eq!(normalize("123\u{200C}456\u{FEFF}"), "123456");
        assert_eq!(normalize("a\u{00A0}b"), "a b");
    }

    #[test]
    fn benign_qualifiers_are_not_free_text() {
        let ex = CodeExtractor::default();
        assert!(!ex.analyze("58101-2SA00 OEM").has_non_code);
        assert!(!ex.analyze("58101-2SA00 اصلی").has_non_code);
        assert!(ex.analyze("58101-2SA00 قیمت؟").has_non_code);
    }

    #[test]
    fn custom_benign_words_replace_defaults() {
        let ex = CodeExtractor::new(&["please"]);
        assert!(!ex.analyze("1234567890 please").has_non_code);
        assert!(ex.analyze("1234567890 oem").has_non_code);
    }

    #[test]
    fn mixed_message_with_two_words() {
        let out = CodeExtractor::default().analyze("need 58101-2SA00 urgently");
        assert_eq!(out.tokens.len(), 1);
        assert!(out.has_non_code);
    }

    #[rstest]
    #[case("Ali:\n1234567890", "1234567890")]
    #[case("Quoted message…\n1234567890", "1234567890")]
    #[case("re\n1234567890", "1234567890")]
    #[case("[10/05, 12:01] Ali Parts: 1234567890", "1234567890")]
    #[case("first line\nsecond line", "first line\nsecond line")]
    #[case("1234567890", "1234567890")]
    fn quote_headers_are_stripped(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(strip_quote_header(raw), expected);
    }

    #[test]
    fn quoted_header_words_do_not_escalate() {
        let out = CodeExtractor::default().analyze("Replying to Ali:\n1234567890");
        assert!(!out.has_non_code);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let tokens = dedup_tokens(vec![
            CodeToken::new("12345-67890"),
            CodeToken::new("1234567890"),
            CodeToken::new("ab123456"),
        ]);
        assert_eq!(texts(&tokens), vec!["12345-67890", "AB123456"]);
    }
}
