//! # Configuration
//!
//! Run settings for the report fixer: where reports are found and written,
//! which heuristics are enabled, and the locale the source reports use.
use crate::error::ReportError;
use regex::Regex;
use std::path::PathBuf;

/// Toggles for the optional parts of the segmentation pipeline.
///
/// Every option is on by default; switching all three off reproduces the
/// plain first-column layout without value post-processing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Locate the anchor column by probing the top-left 10×10 block; column 1 otherwise
    pub anchor_probe: bool,
    /// Parse locale-formatted numeric text into numbers
    pub numeric_coercion: bool,
    /// Reduce date-times in time-of-day columns to their time component
    pub time_column_fixup: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            anchor_probe: true,
            numeric_coercion: true,
            time_column_fixup: true,
        }
    }
}

/// Number formatting and vocabulary of the source reports.
#[derive(Clone, Debug)]
pub struct Locale {
    decimal_separator: char,
    group_separators: Vec<char>,
    number: Regex,
    page_break: Regex,
    time_word: String,
    date_word: String,
}

impl Locale {
    /// Builds a locale from its separators, page footer pattern and column vocabulary.
    pub fn new(
        decimal_separator: char,
        group_separators: &[char],
        page_break: &str,
        time_word: &str,
        date_word: &str,
    ) -> Result<Self, ReportError> {
        let groups: String = group_separators.iter().map(|c| regex::escape(&c.to_string())).collect();
        let decimal = regex::escape(&decimal_separator.to_string());
        let number = Regex::new(&format!(
            r"^[+-]?(?:\d[\d{groups}]*(?:{decimal}\d*)?|{decimal}\d+)$"
        ))?;
        Ok(Self {
            decimal_separator,
            group_separators: group_separators.to_vec(),
            number,
            page_break: Regex::new(page_break)?,
            time_word: time_word.to_lowercase(),
            date_word: date_word.to_lowercase(),
        })
    }

    /// Russian number formatting: `1 234,56`, footers like `3 из 12`.
    pub fn russian() -> Self {
        Self::new(',', &[' ', '\u{A0}', '\u{202F}'], r"\d+ из \d+", "время", "дата")
            .expect("Hardcode locale patterns")
    }

    /// English number formatting: `1,234.56`, footers like `3 of 12`.
    pub fn english() -> Self {
        Self::new('.', &[','], r"\d+ of \d+", "time", "date").expect("Hardcode locale patterns")
    }

    /// Looks a preset up by language tag (`ru`, `en`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "ru" | "ru-ru" | "russian" => Some(Self::russian()),
            "en" | "en-us" | "en-gb" | "english" => Some(Self::english()),
            _ => None,
        }
    }

    /// Replaces the page footer pattern.
    pub fn with_page_break(mut self, pattern: &str) -> Result<Self, ReportError> {
        self.page_break = Regex::new(pattern)?;
        Ok(self)
    }

    /// Parses locale-formatted numeric text; `None` when the text is not a number.
    pub fn parse_number(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        if !self.number.is_match(text) {
            return None;
        }
        let normalized: String = text
            .chars()
            .filter(|c| !self.group_separators.contains(c))
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect();
        normalized.parse::<f64>().ok()
    }

    /// True when the text contains a page footer such as `2 из 5`.
    pub fn is_page_break(&self, text: &str) -> bool {
        self.page_break.is_match(text)
    }

    /// True for column names that hold a time of day but not a date.
    pub fn is_time_column(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        name.contains(&self.time_word) && !name.contains(&self.date_word)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::russian()
    }
}

/// Settings of one processing run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory searched recursively for reports
    pub input_dir: PathBuf,
    /// Directory the fixed workbooks are written to
    pub output_dir: PathBuf,
    /// File name glob of source reports
    pub pattern: String,
    /// Suffix replacing the extension of output files
    pub output_suffix: String,
    pub options: Options,
    pub locale: Locale,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("fixed"),
            pattern: "broker-report-*.xlsx".to_owned(),
            output_suffix: "-fixed.xlsx".to_owned(),
            options: Options::default(),
            locale: Locale::default(),
        }
    }
}
