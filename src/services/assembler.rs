use crate::models::{AssembledDocument, ChapterContent};

/// Join chapter bodies, already in index order, with a blank line between them.
///
/// Headings come from the bodies themselves; nothing is added here.
pub fn assemble(contents: &[ChapterContent]) -> AssembledDocument {
    let text = contents
        .iter()
        .map(|c| c.body.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    AssembledDocument {
        text,
        sections: contents.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chapter_label;

    fn content(index: usize, body: &str) -> ChapterContent {
        ChapterContent {
            index,
            label: chapter_label(index),
            body: body.to_string(),
            degraded: false,
        }
    }

    #[test]
    fn test_bodies_joined_in_index_order() {
        let doc = assemble(&[content(1, "# One"), content(2, "# Two"), content(3, "# Three")]);
        assert_eq!(doc.as_str(), "# One\n\n# Two\n\n# Three");
        assert_eq!(doc.sections, 3);
    }

    #[test]
    fn test_single_chapter_has_no_separator() {
        assert_eq!(assemble(&[content(1, "only")]).as_str(), "only");
    }
}
