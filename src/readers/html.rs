//! HTML helpers
//!
//! Deterministic transformations of a page already fetched: visible text,
//! lookup of elements by text or by id, table cells. The [`HtmlTag`] returned
//! is an owned copy, it doesn't borrow the parsed document.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Node, Selector};

/// An element found in a page.
#[derive(Clone, Debug, PartialEq)]
pub struct HtmlTag {
    /// The tag name, lowercase
    pub name: String,
    /// The attributes of the element
    pub attributes: BTreeMap<String, String>,
    /// The text of the element and its descendants
    pub text: String,
    /// The markup inside the element
    pub inner_html: String,
}

impl HtmlTag {
    /// Copies an element out of its document.
    pub fn from_element(element: ElementRef) -> Self {
        HtmlTag {
            name: element.value().name().to_string(),
            attributes: element
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: element.text().collect::<String>(),
            inner_html: element.inner_html(),
        }
    }

    /// The value of an attribute
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|v| v.as_str())
    }
}

/// Parses a response body. Invalid UTF-8 sequences are replaced.
pub fn parse(body: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(body))
}

/// Returns the visible text of a document.
///
/// Script and style contents are dropped, every line is trimmed and blank
/// lines are removed.
pub fn document_to_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.tree.root().descendants() {
        if let Node::Text(t) = node.value() {
            let hidden = node.ancestors().any(|a| match a.value() {
                Node::Element(e) => e.name() == "script" || e.name() == "style",
                _ => false,
            });
            if !hidden {
                text.push_str(&t.text);
            }
        }
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Returns the visible text of an HTML string.
///
/// # Examples
///
/// ```rust
/// let html = "<p>Stable Channel Update</p>\n<script>var a;</script>\n\n<p> 73.0.3683.75 </p>";
/// let text = advisory_parser::readers::html::html_to_text(html);
/// assert_eq!("Stable Channel Update\n73.0.3683.75", text);
/// ```
pub fn html_to_text(html: &str) -> String {
    document_to_text(&Html::parse_document(html))
}

/// Finds the first `tag` element whose trimmed text is exactly `text`.
pub fn find_tag_by_text(document: &Html, tag: &str, text: &str) -> Option<HtmlTag> {
    let selector = Selector::parse(tag).ok()?;
    document
        .select(&selector)
        .find(|e| e.text().collect::<String>().trim() == text)
        .map(HtmlTag::from_element)
}

/// Finds all the `tag` elements having the given id.
pub fn find_tags_by_id(document: &Html, tag: &str, tag_id: &str) -> Vec<HtmlTag> {
    let selector = match Selector::parse(tag) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    document
        .select(&selector)
        .filter(|e| e.value().id() == Some(tag_id))
        .map(HtmlTag::from_element)
        .collect()
}

/// Returns the cells of each row of a table, whitespace collapsed.
pub fn table_rows(table: ElementRef) -> Vec<Vec<String>> {
    // Both selectors are constants
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("th, td").unwrap();
    table
        .select(&row_selector)
        .map(|row| {
            row.select(&cell_selector)
                .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                .collect()
        })
        .collect()
}

/// Returns all the tables of a document.
pub fn tables(document: &Html) -> Vec<ElementRef<'_>> {
    let selector = Selector::parse("table").unwrap();
    document.select(&selector).collect()
}

/// Replaces every run of whitespace by a single space, and trims.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}
