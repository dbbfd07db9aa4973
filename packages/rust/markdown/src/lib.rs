//! Markdown output: per-record pages and the ranking index table.
//!
//! - [`PageBuilder`] assembles one record's page (front matter, heading,
//!   one section per prompt)
//! - [`render_index`] turns the record list into a pipe table linking
//!   every cell to its record's page
//! - [`write_page_atomic`] persists a finished document

mod index;
mod page;

pub use index::{INDEX_FILE_NAME, render_index, render_index_page};
pub use page::{PageBuilder, prepare_output_dir, write_page_atomic};

/// Build a YAML front-matter block, followed by a blank line.
pub fn render_front_matter(layout: &str, title: Option<&str>) -> String {
    let mut fm = String::from("---\n");
    fm.push_str(&format!("layout: {layout}\n"));
    if let Some(title) = title {
        fm.push_str(&format!("title: \"{}\"\n", escape_yaml_string(title)));
    }
    fm.push_str("---\n\n");
    fm
}

/// Escape special characters in a double-quoted YAML string value.
fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_matter_with_title() {
        assert_eq!(
            render_front_matter("page", Some("Go")),
            "---\nlayout: page\ntitle: \"Go\"\n---\n\n"
        );
    }

    #[test]
    fn front_matter_without_title() {
        assert_eq!(render_front_matter("home", None), "---\nlayout: home\n---\n\n");
    }

    #[test]
    fn yaml_title_is_escaped() {
        let fm = render_front_matter("page", Some(r#"Say "hi" \o/"#));
        assert!(fm.contains(r#"title: "Say \"hi\" \\o/""#));
    }
}
