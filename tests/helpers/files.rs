use std::path::Path;

/// A changelog whose newest entry is `newest`, followed by one older entry.
pub fn changelog(newest: &str) -> String {
    format!(
        "# Product updates\n\n## Timeline\n\n#### {newest}\n\n- **New:** [docs](https://docs.test)\n\n---\n\n#### Jan 1\n\n- Something old\n"
    )
}

pub fn write_changelog(dir: &Path, newest: &str) {
    std::fs::write(dir.join("CHANGELOG.md"), changelog(newest)).unwrap();
}
