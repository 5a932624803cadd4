use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError,
    RenderErrorReason,
};

/// Characters kept by `excerpt` when no length is given
const DEFAULT_EXCERPT_CHARS: usize = 120;

/// Register custom Handlebars helpers
pub fn register_helpers(handlebars: &mut Handlebars) {
    handlebars.register_helper("uppercase", Box::new(uppercase_helper));
    handlebars.register_helper("excerpt", Box::new(excerpt_helper));
}

/// Convert string to uppercase
fn uppercase_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h.param(0).ok_or_else(|| {
        RenderError::from(RenderErrorReason::Other(
            "uppercase expects 1 parameter".into(),
        ))
    })?;

    let text = param.value().as_str().ok_or_else(|| {
        RenderError::from(RenderErrorReason::Other(
            "uppercase expects a string".into(),
        ))
    })?;

    out.write(&text.to_uppercase())?;
    Ok(())
}

/// Shorten text to a number of characters, appending an ellipsis
///
/// Output goes through the registry's escape function since helper output
/// is written raw.
fn excerpt_helper(
    h: &Helper,
    registry: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h.param(0).ok_or_else(|| {
        RenderError::from(RenderErrorReason::Other(
            "excerpt expects at least 1 parameter".into(),
        ))
    })?;

    let text = param.value().as_str().ok_or_else(|| {
        RenderError::from(RenderErrorReason::Other("excerpt expects a string".into()))
    })?;

    let max_chars = match h.param(1) {
        Some(limit) => limit.value().as_u64().ok_or_else(|| {
            RenderError::from(RenderErrorReason::Other(
                "excerpt length must be a number".into(),
            ))
        })? as usize,
        None => DEFAULT_EXCERPT_CHARS,
    };

    out.write(&registry.get_escape_fn()(&truncate(text, max_chars)))?;
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Handlebars<'static> {
        let mut handlebars = Handlebars::new();
        register_helpers(&mut handlebars);
        handlebars
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("Ásgarðr", 3), "Ásg...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_excerpt_escapes_output() {
        let rendered = registry()
            .render_template("{{excerpt text 4}}", &json!({"text": "<b>bold</b>"}))
            .unwrap();
        assert_eq!(rendered, "&lt;b&gt;b...");
    }

    #[test]
    fn test_uppercase() {
        let rendered = registry()
            .render_template("{{uppercase text}}", &json!({"text": "domain"}))
            .unwrap();
        assert_eq!(rendered, "DOMAIN");
    }
}
