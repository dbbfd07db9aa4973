//! Prompt rendering: `{field}` placeholders filled from a record.

use rankpages_shared::{PromptTemplate, RankPagesError, Record, Result, TemplatePart};

/// Substitute `record`'s fields into `template`.
///
/// An unknown placeholder or a stray brace is a [`RankPagesError::Template`]
/// error.
pub fn render_prompt(template: &PromptTemplate, record: &Record) -> Result<String> {
    let mut rendered = String::with_capacity(template.template.len() + record.language.len());

    for part in template.parts()? {
        match part {
            TemplatePart::Literal(text) => rendered.push_str(text),
            TemplatePart::Field(name) => {
                let value = record.field(name).ok_or_else(|| RankPagesError::Template {
                    template: template.template.clone(),
                    field: name.to_string(),
                })?;
                rendered.push_str(value);
            }
        }
    }

    Ok(rendered)
}

/// Check that `template` only references known record fields.
pub fn validate_template(template: &PromptTemplate) -> Result<()> {
    template.validate()
}

/// Check a whole prompt set before any work starts.
pub fn validate_prompts(prompts: &[PromptTemplate]) -> Result<()> {
    prompts.iter().try_for_each(validate_template)
}

#[cfg(test)]
mod tests {
    use rankpages_shared::{RecordFields, default_prompts};

    use super::*;

    fn go() -> Record {
        Record::new(
            0,
            RecordFields {
                date1: "Jan 2024".into(),
                date2: "Jan 2023".into(),
                language: "Go".into(),
                rating: "5.0%".into(),
                rating_change: "-0.5%".into(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn renders_default_prompts() {
        let rendered: Vec<String> = default_prompts()
            .iter()
            .map(|p| render_prompt(p, &go()).unwrap())
            .collect();

        assert_eq!(rendered[0], "find link to official website of Go");
        assert_eq!(rendered[1], "Is Go statically typed?");
        assert!(rendered[2].starts_with("Write an algorithm in Go"));
    }

    #[test]
    fn renders_multiple_fields_and_escapes() {
        let template = PromptTemplate::new(
            "t",
            "{language} moved from {date2} to {date1} ({rating}, {{delta}} {rating_change})",
        );
        assert_eq!(
            render_prompt(&template, &go()).unwrap(),
            "Go moved from Jan 2023 to Jan 2024 (5.0%, {delta} -0.5%)"
        );
    }

    #[test]
    fn unknown_field_is_a_template_error() {
        let template = PromptTemplate::new("t", "Describe {name}");
        match render_prompt(&template, &go()) {
            Err(RankPagesError::Template { field, .. }) => assert_eq!(field, "name"),
            other => panic!("expected Template error, got {other:?}"),
        }
    }

    #[test]
    fn validate_prompts_stops_at_first_bad_template() {
        let mut prompts = default_prompts();
        assert!(validate_prompts(&prompts).is_ok());

        prompts.push(PromptTemplate::new("bad", "{position}"));
        assert!(validate_prompts(&prompts).is_err());
    }

    #[test]
    fn malformed_templates_are_rejected_before_rendering() {
        for text in [
            "Is {language statically typed?",
            "Is language} statically typed?",
            "Is { language } statically typed?",
        ] {
            let template = PromptTemplate::new("Static typing", text);
            assert!(matches!(
                validate_template(&template),
                Err(RankPagesError::Template { .. })
            ));
            assert!(matches!(
                render_prompt(&template, &go()),
                Err(RankPagesError::Template { .. })
            ));
        }
    }
}
