use scraper::{ElementRef, Html, Selector};

const CONTENT_ROOTS: &[&str] = &["main", "article", "[role='main']", "#content", ".content"];
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside",
];
const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "td", "dt", "dd",
];

/// Projects a proxied HTML document into a title plus readable text for the
/// content pane. One line per block-level element, heading lines prefixed so
/// the pane can style them.
pub struct PageExtractor;

impl PageExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str) -> (String, String) {
        let document = Html::parse_document(html);
        (self.title(&document), self.body_text(&document))
    }

    fn title(&self, document: &Html) -> String {
        let selector = Selector::parse("title").expect("static selector");
        let title = document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();
        let title = collapse_whitespace(&title);
        if title.is_empty() {
            "Untitled".to_string()
        } else {
            title
        }
    }

    fn body_text(&self, document: &Html) -> String {
        for root in CONTENT_ROOTS {
            if let Ok(selector) = Selector::parse(root) {
                if let Some(element) = document.select(&selector).next() {
                    let text = self.blocks_under(element);
                    if !text.is_empty() {
                        return text;
                    }
                }
            }
        }

        let body = Selector::parse("body").expect("static selector");
        document
            .select(&body)
            .next()
            .map(|el| self.blocks_under(el))
            .unwrap_or_default()
    }

    fn blocks_under(&self, root: ElementRef) -> String {
        let mut blocks: Vec<String> = Vec::new();

        for descendant in root.descendants() {
            let Some(element) = descendant.value().as_element() else {
                continue;
            };
            let name = element.name();
            if !BLOCK_TAGS.contains(&name) {
                continue;
            }
            let Some(element_ref) = ElementRef::wrap(descendant) else {
                continue;
            };
            if inside_skipped(element_ref) {
                continue;
            }

            let text = collapse_whitespace(&element_ref.text().collect::<String>());
            if text.is_empty() {
                continue;
            }
            let line = match name {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => format!("# {}", text),
                "li" => format!("• {}", text),
                _ => text,
            };
            // Nested blocks (li inside li, p inside blockquote) repeat text.
            if blocks.last().map(String::as_str) != Some(line.as_str()) {
                blocks.push(line);
            }
        }

        blocks.join("\n")
    }
}

fn inside_skipped(element: ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(|node| node.value().as_element())
        .any(|el| SKIP_TAGS.contains(&el.name()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
