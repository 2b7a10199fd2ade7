//! Meta AI research publication-page scraper.
//!
//! These pages carry less rigid markup than arXiv: the title `h1` is the
//! one stable anchor (and therefore the layout-changed signal); abstract
//! and authors are collected best-effort.

use super::{select_text, EnrichError};
use crate::core::types::PaperMetadata;
use scraper::{Html, Selector};

pub(super) fn parse_publication_page(html: &str, url: &str) -> Result<PaperMetadata, EnrichError> {
    let document = Html::parse_document(html);

    let title = select_text(&document, "h1").ok_or(EnrichError::StructureMissing {
        url: url.to_string(),
        what: "h1 title",
    })?;

    let abstract_text = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| select_text(&document, "article p"))
        .unwrap_or_default();

    let mut authors: Vec<String> = Vec::new();
    if let Ok(selector) = Selector::parse(r#"a[href*="/people/"]"#) {
        for element in document.select(&selector) {
            let name = element.text().collect::<String>().trim().to_string();
            if !name.is_empty() && !authors.contains(&name) {
                authors.push(name);
            }
        }
    }

    Ok(PaperMetadata {
        title,
        abstract_text,
        authors,
    })
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let element = document.select(&selector).next()?;
    let content = element.value().attr("content")?.trim().to_string();
    if content.is_empty() {
        None
    } else {
        Some(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLICATION_PAGE: &str = r#"
<html><head>
  <meta property="og:description" content="We introduce a family of open foundation models." />
</head><body>
  <h1>Llama: Open and Efficient Foundation Language Models</h1>
  <div class="authors">
    <a href="/people/first-author/">First Author</a>
    <a href="/people/second-author/">Second Author</a>
    <a href="/people/first-author/">First Author</a>
  </div>
</body></html>"#;

    #[test]
    fn extracts_title_description_and_deduped_authors() {
        let md = parse_publication_page(
            PUBLICATION_PAGE,
            "https://ai.meta.com/research/publications/llama/",
        )
        .unwrap();
        assert_eq!(
            md.title,
            "Llama: Open and Efficient Foundation Language Models"
        );
        assert_eq!(
            md.abstract_text,
            "We introduce a family of open foundation models."
        );
        assert_eq!(md.authors, vec!["First Author", "Second Author"]);
    }

    #[test]
    fn missing_h1_is_a_structure_mismatch() {
        let err = parse_publication_page(
            "<html><body><p>redesigned page</p></body></html>",
            "https://ai.meta.com/research/publications/x/",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EnrichError::StructureMissing { what: "h1 title", .. }
        ));
    }
}
