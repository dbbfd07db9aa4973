//! Core domain types: ranking records, prompt templates, and the run context.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RankPagesError, Result};

/// Names of the record fields available to prompt templates, in column order.
pub const FIELD_NAMES: [&str; 7] = [
    "date1",
    "date2",
    "change",
    "img",
    "language",
    "rating",
    "rating_change",
];

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One row of the ranking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// 0-based position of the row in the source table body.
    pub position: usize,
    /// Ranking date column (opaque).
    pub date1: String,
    /// Previous ranking date column (opaque).
    pub date2: String,
    /// Absolute URL of the "change" indicator image, or empty.
    pub change: String,
    /// Absolute URL of the entry icon, or empty.
    pub img: String,
    /// Entry name; used for display and as the page file key.
    pub language: String,
    /// Rating, kept as text.
    pub rating: String,
    /// Rating change, kept as text.
    pub rating_change: String,
}

/// Raw cell values for building a [`Record`].
#[derive(Debug, Clone, Default)]
pub struct RecordFields {
    pub date1: String,
    pub date2: String,
    pub change: String,
    pub img: String,
    pub language: String,
    pub rating: String,
    pub rating_change: String,
}

impl Record {
    /// Build a record, rejecting an empty name.
    pub fn new(position: usize, fields: RecordFields) -> Result<Self> {
        if fields.language.trim().is_empty() {
            return Err(RankPagesError::validation(format!(
                "row {position} has an empty name"
            )));
        }

        Ok(Self {
            position,
            date1: fields.date1,
            date2: fields.date2,
            change: fields.change,
            img: fields.img,
            language: fields.language,
            rating: fields.rating,
            rating_change: fields.rating_change,
        })
    }

    /// Look up a substitutable field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "date1" => &self.date1,
            "date2" => &self.date2,
            "change" => &self.change,
            "img" => &self.img,
            "language" => &self.language,
            "rating" => &self.rating,
            "rating_change" => &self.rating_change,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// All substitutable fields as `(name, value)` pairs in column order.
    pub fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("date1", self.date1.as_str()),
            ("date2", self.date2.as_str()),
            ("change", self.change.as_str()),
            ("img", self.img.as_str()),
            ("language", self.language.as_str()),
            ("rating", self.rating.as_str()),
            ("rating_change", self.rating_change.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// PromptTemplate
// ---------------------------------------------------------------------------

/// `{{`, `}}`, a `{name}` placeholder, or a stray brace.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").expect("valid regex")
});

/// A titled prompt; each one becomes a section of every generated page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Section heading in the generated page.
    pub title: String,
    /// Prompt text with `{field}` placeholders.
    pub template: String,
}

/// One lexical piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart<'a> {
    Literal(&'a str),
    Field(&'a str),
}

impl PromptTemplate {
    pub fn new(title: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            template: template.into(),
        }
    }

    /// Split the template into literal text and field references.
    ///
    /// `{{` and `}}` produce literal braces. An unmatched brace or a
    /// placeholder that is not a plain identifier is a
    /// [`RankPagesError::Template`] error.
    pub fn parts(&self) -> Result<Vec<TemplatePart<'_>>> {
        let mut parts = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER_RE.captures_iter(&self.template) {
            let Some(m) = caps.get(0) else { continue };
            if m.start() > last {
                parts.push(TemplatePart::Literal(&self.template[last..m.start()]));
            }
            match (caps.get(1), m.as_str()) {
                (Some(name), _) if is_field_name(name.as_str()) => {
                    parts.push(TemplatePart::Field(name.as_str()));
                }
                (Some(name), _) => return Err(self.template_error(name.as_str())),
                (None, raw @ ("{" | "}")) => return Err(self.template_error(raw)),
                (None, "{{") => parts.push(TemplatePart::Literal("{")),
                (None, _) => parts.push(TemplatePart::Literal("}")),
            }
            last = m.end();
        }

        if last < self.template.len() {
            parts.push(TemplatePart::Literal(&self.template[last..]));
        }
        Ok(parts)
    }

    /// Field names referenced by the template, in order of appearance.
    pub fn referenced_fields(&self) -> Result<Vec<&str>> {
        Ok(self
            .parts()?
            .into_iter()
            .filter_map(|part| match part {
                TemplatePart::Field(name) => Some(name),
                TemplatePart::Literal(_) => None,
            })
            .collect())
    }

    /// Check that the template is well formed and every referenced field
    /// exists on [`Record`].
    pub fn validate(&self) -> Result<()> {
        match self
            .referenced_fields()?
            .into_iter()
            .find(|name| !FIELD_NAMES.contains(name))
        {
            Some(field) => Err(self.template_error(field)),
            None => Ok(()),
        }
    }

    fn template_error(&self, field: &str) -> RankPagesError {
        RankPagesError::Template {
            template: self.template.clone(),
            field: field.to_string(),
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The prompt set used when the config does not define one.
pub fn default_prompts() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate::new(
            "Official website",
            "find link to official website of {language}",
        ),
        PromptTemplate::new("Static typing", "Is {language} statically typed?"),
        PromptTemplate::new(
            "Example code",
            "Write an algorithm in {language} that finds a value in a binary search tree.",
        ),
    ]
}

// ---------------------------------------------------------------------------
// RunContext + file naming
// ---------------------------------------------------------------------------

/// Immutable per-run values, captured once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    /// Date used to prefix every generated file name.
    pub date: NaiveDate,
}

impl RunContext {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    /// Context for a run starting now (local time).
    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }
}

/// Make a name safe to use as a single path component.
///
/// Path separators become `-`, NUL characters are removed.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '\0')
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect()
}

/// `<YYYY-MM-DD>-<sanitized name>`, the page file name without extension.
pub fn page_stem(ctx: &RunContext, name: &str) -> String {
    format!("{}-{}", ctx.date.format("%Y-%m-%d"), sanitize_name(name))
}

/// File name of the generated page for `name`.
pub fn page_file_name(ctx: &RunContext, name: &str) -> String {
    format!("{}.md", page_stem(ctx, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> RecordFields {
        RecordFields {
            date1: "Jan 2024".into(),
            date2: "Jan 2023".into(),
            change: String::new(),
            img: "http://x/icon.png".into(),
            language: name.into(),
            rating: "5.0%".into(),
            rating_change: "-0.5%".into(),
        }
    }

    fn ctx() -> RunContext {
        RunContext::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
    }

    #[test]
    fn record_rejects_empty_name() {
        assert!(Record::new(0, fields("  ")).is_err());
        assert!(Record::new(0, fields("Go")).is_ok());
    }

    #[test]
    fn record_field_lookup() {
        let record = Record::new(3, fields("Go")).unwrap();
        assert_eq!(record.field("language"), Some("Go"));
        assert_eq!(record.field("rating_change"), Some("-0.5%"));
        assert_eq!(record.field("position"), None);
        assert_eq!(record.field("nope"), None);

        let names: Vec<&str> = record.fields().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, FIELD_NAMES);
    }

    #[test]
    fn sanitize_replaces_separators_and_strips_nul() {
        assert_eq!(sanitize_name("C++/C"), "C++-C");
        assert_eq!(sanitize_name("a\\b/c"), "a-b-c");
        assert_eq!(sanitize_name("Go\0"), "Go");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for name in ["C++/C", "Delphi/Object Pascal", "plain", "a\0/b"] {
            let once = sanitize_name(name);
            assert_eq!(sanitize_name(&once), once);
            assert!(!once.contains('/'));
            assert!(!once.contains('\0'));
        }
    }

    #[test]
    fn page_names_are_date_prefixed() {
        assert_eq!(page_stem(&ctx(), "C++/C"), "2024-01-15-C++-C");
        assert_eq!(page_file_name(&ctx(), "Go"), "2024-01-15-Go.md");
    }

    #[test]
    fn template_parts_and_escapes() {
        let t = PromptTemplate::new("t", "Is {language} {{typed}}? {rating}");
        assert_eq!(
            t.parts().unwrap(),
            vec![
                TemplatePart::Literal("Is "),
                TemplatePart::Field("language"),
                TemplatePart::Literal(" "),
                TemplatePart::Literal("{"),
                TemplatePart::Literal("typed"),
                TemplatePart::Literal("}"),
                TemplatePart::Literal("? "),
                TemplatePart::Field("rating"),
            ]
        );
        assert_eq!(t.referenced_fields().unwrap(), vec!["language", "rating"]);
    }

    #[test]
    fn template_validation() {
        for prompt in default_prompts() {
            prompt.validate().unwrap();
        }

        let bad = PromptTemplate::new("t", "Tell me about {name}");
        match bad.validate() {
            Err(RankPagesError::Template { field, .. }) => assert_eq!(field, "name"),
            other => panic!("expected Template error, got {other:?}"),
        }
    }

    fn template_error_field(template: &str) -> String {
        match PromptTemplate::new("t", template).validate() {
            Err(RankPagesError::Template { field, .. }) => field,
            other => panic!("expected Template error for {template:?}, got {other:?}"),
        }
    }

    #[test]
    fn unbalanced_braces_are_rejected() {
        assert_eq!(template_error_field("Is {language statically typed?"), "{");
        assert_eq!(template_error_field("Is language} typed?"), "}");
        assert_eq!(template_error_field("{language} {{ok}} {"), "{");
    }

    #[test]
    fn placeholder_names_must_be_plain_identifiers() {
        assert_eq!(template_error_field("Is { language } typed?"), " language ");
        assert_eq!(template_error_field("Is {} typed?"), "");
        assert_eq!(template_error_field("Is {lang-uage} typed?"), "lang-uage");

        assert!(PromptTemplate::new("t", "{rating_change}").validate().is_ok());
    }
}
