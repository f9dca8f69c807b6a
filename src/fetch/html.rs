//! Readable-text extraction from HTML pages.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text never belongs to the article body.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "svg", "iframe",
    "button", "template",
];

/// Elements that start a new text block.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "article", "main", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5",
    "h6", "blockquote", "pre", "table", "tr", "td", "th", "figcaption", "br",
];

/// Extract readable text from an HTML page.
///
/// The root is the first `<article>`, else `<main>`, else `<body>`, else the
/// whole document. Blocks are whitespace-collapsed and separated by a blank line.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut blocks = Vec::new();
    let mut current = String::new();

    let root = pick_root(&document).unwrap_or_else(|| document.root_element());
    walk(root, &mut current, &mut blocks);
    flush(&mut current, &mut blocks);

    blocks.join("\n\n")
}

fn pick_root(document: &Html) -> Option<ElementRef<'_>> {
    for tag in ["article", "main", "body"] {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        let found = document.select(&selector).next();
        if found.is_some() {
            return found;
        }
    }
    None
}

fn walk(element: ElementRef<'_>, current: &mut String, blocks: &mut Vec<String>) {
    let name = element.value().name();
    if SKIPPED_ELEMENTS.contains(&name) {
        return;
    }

    let is_block = BLOCK_ELEMENTS.contains(&name);
    if is_block {
        flush(current, blocks);
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                current.push_str(text);
                current.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    walk(child_element, current, blocks);
                }
            }
            _ => {}
        }
    }

    if is_block {
        flush(current, blocks);
    }
}

fn flush(current: &mut String, blocks: &mut Vec<String>) {
    let collapsed = collapse_whitespace(current);
    if !collapsed.is_empty() {
        blocks.push(collapsed);
    }
    current.clear();
}

fn collapse_whitespace(input: &str) -> String {
    let mut buf = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space && !buf.is_empty() {
                buf.push(' ');
            }
            last_space = true;
        } else {
            buf.push(ch);
            last_space = false;
        }
    }
    buf.trim_end().to_string()
}
