//! Per-record page assembly and writing.

use std::path::{Path, PathBuf};

use tracing::debug;

use rankpages_shared::{RankPagesError, Record, Result};

use crate::render_front_matter;

/// Width of the icon in a page heading.
const ICON_WIDTH: u32 = 80;

/// Accumulates one record's page in memory.
///
/// ```text
/// ---
/// layout: page
/// title: "<name>"
/// ---
///
/// # <img src='<icon>' width='80'> <name>
/// # <section title>
///  <section body>
/// ```
#[derive(Debug, Clone)]
pub struct PageBuilder {
    content: String,
    sections: usize,
}

impl PageBuilder {
    /// Start a page with front matter and the record heading.
    pub fn new(layout: &str, record: &Record) -> Self {
        let mut content = render_front_matter(layout, Some(&record.language));
        content.push_str(&format!(
            "# <img src='{}' width='{ICON_WIDTH}'> {}\n",
            record.img, record.language
        ));

        Self {
            content,
            sections: 0,
        }
    }

    /// Append a titled section.
    pub fn push_section(&mut self, title: &str, body: &str) {
        self.content.push_str(&format!("# {title}\n"));
        self.content.push_str(&format!(" {body}\n"));
        self.sections += 1;
    }

    /// Number of sections added so far.
    pub fn section_count(&self) -> usize {
        self.sections
    }

    /// The complete document.
    pub fn finish(self) -> String {
        self.content
    }
}

/// Create the output directory if it does not exist yet.
pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| RankPagesError::io(dir, e))?;
        debug!(path = %dir.display(), "created output directory");
    }
    Ok(())
}

/// Write `content` to `dir/file_name` via a temp file and rename, so readers
/// never observe a half-written page.
pub fn write_page_atomic(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    let target = dir.join(file_name);
    let temp = dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| RankPagesError::io(&temp, e))?;
    if let Err(e) = std::fs::rename(&temp, &target) {
        let _ = std::fs::remove_file(&temp);
        return Err(RankPagesError::io(&target, e));
    }

    debug!(path = %target.display(), size = content.len(), "wrote page");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use rankpages_shared::RecordFields;

    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("rp-page-test-{}", uuid::Uuid::now_v7()))
    }

    fn go() -> Record {
        Record::new(
            17,
            RecordFields {
                date1: "Jan 2024".into(),
                date2: "Jan 2023".into(),
                change: String::new(),
                img: "http://x/icon.png".into(),
                language: "Go".into(),
                rating: "5.0%".into(),
                rating_change: "-0.5%".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn page_layout_matches_expected_document() {
        let mut page = PageBuilder::new("page", &go());
        page.push_section("Official website", "https://go.dev");
        page.push_section("Static typing", "Yes.");
        assert_eq!(page.section_count(), 2);

        assert_eq!(
            page.finish(),
            "---\nlayout: page\ntitle: \"Go\"\n---\n\n\
             # <img src='http://x/icon.png' width='80'> Go\n\
             # Official website\n https://go.dev\n\
             # Static typing\n Yes.\n"
        );
    }

    #[test]
    fn prepare_output_dir_is_idempotent() {
        let dir = temp_dir().join("nested").join("out");
        prepare_output_dir(&dir).unwrap();
        prepare_output_dir(&dir).unwrap();
        assert!(dir.is_dir());

        let _ = std::fs::remove_dir_all(dir.parent().unwrap().parent().unwrap());
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let dir = temp_dir();
        prepare_output_dir(&dir).unwrap();

        let path = write_page_atomic(&dir, "2024-01-15-Go.md", "first").unwrap();
        write_page_atomic(&dir, "2024-01-15-Go.md", "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["2024-01-15-Go.md".to_string()]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_into_missing_dir_is_an_io_error() {
        let dir = temp_dir().join("missing");
        let err = write_page_atomic(&dir, "x.md", "body").unwrap_err();
        assert!(matches!(err, RankPagesError::Io { .. }));
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = temp_dir();
        // A directory in the way makes the rename fail.
        std::fs::create_dir_all(dir.join("2024-01-15-Go.md")).unwrap();

        let err = write_page_atomic(&dir, "2024-01-15-Go.md", "body").unwrap_err();
        assert!(matches!(err, RankPagesError::Io { .. }));
        assert!(!dir.join(".2024-01-15-Go.md.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
