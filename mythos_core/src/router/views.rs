//! Built-in views that do not go through the renderer

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn loading() -> String {
    r#"<div class="view view-loading" aria-busy="true">Loading…</div>"#.to_string()
}

pub fn not_found(fragment: &str) -> String {
    format!(
        r##"<div class="view view-404"><h1>Page not found</h1><p>Nothing lives at <code>{}</code>.</p><a href="#/">Back to all mythologies</a></div>"##,
        escape_html(fragment)
    )
}

pub fn error(message: &str) -> String {
    format!(
        r#"<div class="view view-error" role="alert"><h1>Something went wrong</h1><p>{}</p></div>"#,
        escape_html(message)
    )
}

pub fn login_required() -> String {
    r#"<div class="view view-login"><h1>Sign in required</h1><p>Sign in to view this page.</p></div>"#
        .to_string()
}
