//! Splitting of delimited cell values into [`ParsedField`] tokens.
//!
//! A cell such as `"red:Bright Red | blue"` yields two fields: one with key
//! `red` and label `Bright Red`, one with no key and label `blue`.

use crate::app_config::ImportSettings;

/// One token from a delimited cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedField {
    /// Explicit key, present only when the token contained the key separator.
    pub key: Option<String>,
    /// Human-readable label; the whole token when there is no key.
    pub label: String,
    /// The whole token, trimmed and with inner whitespace collapsed.
    pub sanitized: String,
}

impl ParsedField {
    /// Parses a single token. Returns `None` for blank tokens.
    #[must_use]
    pub fn parse(token: &str, key_separator: &str) -> Option<Self> {
        let sanitized = collapse_whitespace(token);
        if sanitized.is_empty() {
            return None;
        }

        let (key, label) = match token.trim().split_once(key_separator) {
            Some((key, label)) => {
                let key = collapse_whitespace(key);
                let label = collapse_whitespace(label);
                match (key.is_empty(), label.is_empty()) {
                    (false, false) => (Some(key), label),
                    (false, true) => (None, key),
                    (true, _) => (None, label),
                }
            }
            None => (None, sanitized.clone()),
        };

        if label.is_empty() {
            return None;
        }

        Some(Self {
            key,
            label,
            sanitized,
        })
    }

    /// The key (if any) followed by the label; both are used for matching.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.key.as_deref().into_iter().chain(std::iter::once(self.label.as_str()))
    }

    /// Case-insensitive match of either candidate against any of `names`.
    #[must_use]
    pub fn matches_any(&self, names: &[&str]) -> bool {
        self.candidates()
            .any(|c| names.iter().any(|n| eq_ignore_case(n.trim(), c)))
    }
}

/// Splits cell values using the configured delimiters.
#[derive(Debug, Clone, Copy)]
pub struct FieldParser<'a> {
    item_delimiter: &'a str,
    key_separator: &'a str,
    taxon_separator: &'a str,
}

impl<'a> FieldParser<'a> {
    #[must_use]
    pub fn new(settings: &'a ImportSettings) -> Self {
        Self {
            item_delimiter: &settings.item_delimiter,
            key_separator: &settings.key_separator,
            taxon_separator: &settings.taxon_separator,
        }
    }

    /// Lazily yields the non-blank tokens of `raw`. Each call starts over.
    pub fn fields<'s>(&'s self, raw: &'s str) -> impl Iterator<Item = ParsedField> + 's {
        raw.split(self.item_delimiter)
            .filter_map(move |token| ParsedField::parse(token, self.key_separator))
    }

    /// Lazily yields the trimmed, non-blank items of `raw`. Inner text is
    /// kept as written, so file names with repeated spaces survive.
    pub fn items<'s>(&'s self, raw: &'s str) -> impl Iterator<Item = &'s str> + 's {
        raw.split(self.item_delimiter)
            .map(str::trim)
            .filter(|item| !item.is_empty())
    }

    /// Taxon names from a delimited list of taxonomy paths.
    ///
    /// `"Clothing > Shirts | Sale"` yields `["Shirts", "Sale"]`. Only the last
    /// segment of each path is kept; duplicates are dropped, first wins.
    #[must_use]
    pub fn taxon_names(&self, raw: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for path in raw.split(self.item_delimiter) {
            let Some(last) = path
                .split(self.taxon_separator)
                .map(collapse_whitespace)
                .filter(|segment| !segment.is_empty())
                .last()
            else {
                continue;
            };
            if !names.contains(&last) {
                names.push(last);
            }
        }
        names
    }
}

/// Case-insensitive comparison that also folds non-Latin scripts.
#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ImportSettings {
        ImportSettings::default()
    }

    #[test]
    fn parse_plain_token_has_no_key() {
        let field = ParsedField::parse("  Red  ", ":").unwrap();
        assert_eq!(field.key, None);
        assert_eq!(field.label, "Red");
        assert_eq!(field.sanitized, "Red");
    }

    #[test]
    fn parse_key_and_label() {
        let field = ParsedField::parse(" red : Bright   Red ", ":").unwrap();
        assert_eq!(field.key.as_deref(), Some("red"));
        assert_eq!(field.label, "Bright Red");
        assert_eq!(field.sanitized, "red : Bright Red");
    }

    #[test]
    fn parse_dangling_separator_keeps_text_as_label() {
        let field = ParsedField::parse("red:", ":").unwrap();
        assert_eq!(field.key, None);
        assert_eq!(field.label, "red");

        let field = ParsedField::parse(":Red", ":").unwrap();
        assert_eq!(field.key, None);
        assert_eq!(field.label, "Red");
    }

    #[test]
    fn parse_blank_token_is_none() {
        assert!(ParsedField::parse("   ", ":").is_none());
        assert!(ParsedField::parse(":", ":").is_none());
    }

    #[test]
    fn fields_skip_blank_items() {
        let s = settings();
        let parser = FieldParser::new(&s);
        let labels: Vec<String> = parser.fields("Red||Blue| ").map(|f| f.label).collect();
        assert_eq!(labels, vec!["Red", "Blue"]);
    }

    #[test]
    fn fields_iterator_is_restartable() {
        let s = settings();
        let parser = FieldParser::new(&s);
        let raw = "a|b|c";
        assert_eq!(parser.fields(raw).count(), 3);
        assert_eq!(parser.fields(raw).count(), 3);
    }

    #[test]
    fn candidates_include_key_then_label() {
        let field = ParsedField::parse("xl:Extra Large", ":").unwrap();
        let candidates: Vec<&str> = field.candidates().collect();
        assert_eq!(candidates, vec!["xl", "Extra Large"]);
    }

    #[test]
    fn matches_any_is_case_insensitive() {
        let field = ParsedField::parse("XL:Extra Large", ":").unwrap();
        assert!(field.matches_any(&["xl"]));
        assert!(field.matches_any(&["extra large"]));
        assert!(!field.matches_any(&["large"]));
    }

    #[test]
    fn matches_any_folds_cyrillic_case() {
        let field = ParsedField::parse("Синий", ":").unwrap();
        assert!(field.matches_any(&["синий"]));
    }

    #[test]
    fn whitespace_key_separator_splits_before_collapsing() {
        let field = ParsedField::parse("xl\tExtra  Large", "\t").unwrap();
        assert_eq!(field.key.as_deref(), Some("xl"));
        assert_eq!(field.label, "Extra Large");
    }

    #[test]
    fn items_keep_inner_whitespace() {
        let s = settings();
        let parser = FieldParser::new(&s);
        let items: Vec<&str> = parser.items(" summer  tee.jpg | |back.jpg ").collect();
        assert_eq!(items, vec!["summer  tee.jpg", "back.jpg"]);
    }

    #[test]
    fn taxon_names_take_last_segment_and_dedupe() {
        let s = settings();
        let parser = FieldParser::new(&s);
        let names = parser.taxon_names("Clothing > Shirts | Sale | Men > Shirts|  ");
        assert_eq!(names, vec!["Shirts", "Sale"]);
    }

    #[test]
    fn taxon_names_ignore_trailing_separator() {
        let s = settings();
        let parser = FieldParser::new(&s);
        assert_eq!(parser.taxon_names("Brands > Acme >"), vec!["Acme"]);
    }

    #[test]
    fn custom_delimiters_are_honored() {
        let s = ImportSettings {
            item_delimiter: ";".to_string(),
            key_separator: "=".to_string(),
            taxon_separator: "/".to_string(),
            ..ImportSettings::default()
        };
        let parser = FieldParser::new(&s);
        let fields: Vec<ParsedField> = parser.fields("s=Small;m=Medium").collect();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].key.as_deref(), Some("m"));
        assert_eq!(parser.taxon_names("A/B;C"), vec!["B", "C"]);
    }
}
