// HTML snapshot of agent message content
//
// Agent replies are markdown. The snapshot is what a UI shows in place of the
// raw text. Embedded HTML from the model is escaped rather than passed through,
// and single newlines become line breaks so numbered insight lists keep their
// shape.

use pulldown_cmark::{html, Event, Options, Parser};

/// Render markdown to sanitized HTML
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// True when a snapshot has nothing worth showing
pub fn is_blank_html(html: &str) -> bool {
    html.trim().is_empty() || html.trim() == "<p></p>"
}
