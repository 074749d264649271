//! Small helpers shared by the server-rendered pages.

use crate::notice::Notice;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes `text` and keeps its line breaks visible.
pub fn paragraphs(text: &str) -> String {
    escape(text).replace('\n', "<br>")
}

pub fn notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|n| {
            format!(
                r#"<div class="notice {}">{}</div>"#,
                n.level.css_class(),
                escape(&n.text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; display: flex; min-height: 100vh; }
aside { width: 16rem; padding: 1rem; background: #f3f3f3; }
main { flex: 1; padding: 1rem 2rem; max-width: 60rem; }
.card { border: 1px solid #ddd; border-radius: 6px; padding: 0.75rem 1rem; margin-bottom: 0.75rem; }
.caption, .stamp { color: grey; font-size: smaller; }
.stamp { float: right; }
.notice { padding: 0.5rem 1rem; border-radius: 4px; margin-bottom: 0.5rem; }
.notice-success { background: #e6f4ea; }
.notice-info { background: #e8f0fe; }
.notice-warning { background: #fef7e0; }
.notice-error { background: #fce8e6; }
.chat { max-height: 300px; overflow-y: auto; }
form.inline { display: inline; }
textarea { width: 100%; }
"#;

pub fn layout(title: &str, sidebar: Option<&str>, body: &str) -> String {
    let sidebar = sidebar
        .map(|s| format!("<aside>{}</aside>", s))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{}</title>
<style>{}</style>
</head>
<body>
{}
<main>
{}
</main>
</body>
</html>"#,
        escape(title),
        STYLE,
        sidebar,
        body
    )
}
