//! arXiv abstract-page scraper.

use super::{select_text, strip_label, EnrichError};
use crate::core::types::PaperMetadata;
use scraper::Html;

/// Extract title / abstract / authors from an `arxiv.org/abs/<id>` page.
pub(super) fn parse_abstract_page(html: &str, url: &str) -> Result<PaperMetadata, EnrichError> {
    let document = Html::parse_document(html);

    let title = select_text(&document, "h1.title")
        .map(|t| strip_label(&t, "Title:"))
        .ok_or(EnrichError::StructureMissing {
            url: url.to_string(),
            what: "h1.title",
        })?;

    let abstract_text = select_text(&document, "blockquote.abstract")
        .or_else(|| select_text(&document, "blockquote"))
        .map(|t| strip_label(&t, "Abstract:"))
        .ok_or(EnrichError::StructureMissing {
            url: url.to_string(),
            what: "abstract blockquote",
        })?;

    let authors = select_text(&document, "div.authors")
        .map(|t| strip_label(&t, "Authors:"))
        .ok_or(EnrichError::StructureMissing {
            url: url.to_string(),
            what: "div.authors",
        })?;
    let authors: Vec<String> = authors
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    Ok(PaperMetadata {
        title,
        abstract_text,
        authors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABS_PAGE: &str = r#"
<html><body>
  <div id="abs">
    <h1 class="title mathjax"><span class="descriptor">Title:</span>Attention Is All You Need</h1>
    <div class="authors"><span class="descriptor">Authors:</span>
      <a href="/a/vaswani_a_1">Ashish Vaswani</a>,
      <a href="/a/shazeer_n_1">Noam Shazeer</a>
    </div>
    <blockquote class="abstract mathjax">
      <span class="descriptor">Abstract:</span>
      The dominant sequence transduction models are based on complex recurrent networks.
    </blockquote>
  </div>
</body></html>"#;

    #[test]
    fn extracts_title_abstract_and_author_list() {
        let md = parse_abstract_page(ABS_PAGE, "https://arxiv.org/abs/1706.03762").unwrap();
        assert_eq!(md.title, "Attention Is All You Need");
        assert!(md
            .abstract_text
            .starts_with("The dominant sequence transduction models"));
        assert_eq!(md.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
    }

    #[test]
    fn missing_title_is_a_structure_mismatch() {
        let err = parse_abstract_page(
            "<html><body><p>nothing here</p></body></html>",
            "https://arxiv.org/abs/0000.00000",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EnrichError::StructureMissing { what: "h1.title", .. }
        ));
    }
}
