//! Escaping of non-translatable spans
//!
//! Before text is sent out, spans that must survive translation untouched are
//! wrapped in service-specific sentinel tags, e.g.
//! `<lang_connector translate="no">[site:name]</lang_connector>`.
//! Returned translations are decoded (HTML entities first, then URL
//! encoding) and the sentinels are stripped again.

use regex::Regex;
use serde_json::Value;

/// A span of a text leaf that must not be translated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeSpan {
    /// Byte offset of the span in the source text
    pub position: usize,
    pub string: String,
}

impl EscapeSpan {
    pub fn new(position: usize, string: &str) -> Self {
        Self {
            position,
            string: string.to_string(),
        }
    }

    /// Read spans from a leaf's `#escape` property
    ///
    /// The property maps byte offsets to `{"string": ...}` objects. Entries
    /// with a non-numeric offset or no string are ignored.
    pub fn from_property(property: Option<&Value>) -> Vec<EscapeSpan> {
        let Some(Value::Object(map)) = property else {
            return Vec::new();
        };

        let mut spans: Vec<EscapeSpan> = map
            .iter()
            .filter_map(|(position, info)| {
                let position = position.parse::<usize>().ok()?;
                let string = info.get("string")?.as_str()?;
                Some(EscapeSpan::new(position, string))
            })
            .collect();
        spans.sort_by_key(|span| span.position);
        spans
    }
}

/// Wraps and unwraps non-translatable spans with a fixed pair of markers
#[derive(Debug, Clone)]
pub struct Escaper {
    start: String,
    end: String,
    pattern: Regex,
}

impl Escaper {
    pub fn new(start: &str, end: &str) -> Self {
        let pattern = Regex::new(&format!(
            "(?s){}(.+?){}",
            regex::escape(start),
            regex::escape(end)
        ))
        .expect("escaped markers always form a valid pattern");

        Self {
            start: start.to_string(),
            end: end.to_string(),
            pattern,
        }
    }

    pub fn lang_connector() -> Self {
        Self::new(r#"<lang_connector translate="no">"#, "</lang_connector>")
    }

    pub fn xtm_connect() -> Self {
        Self::new(r#"<xtm_connect translate="no">"#, "</xtm_connect>")
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Wrap the given spans of `text` in the markers
    ///
    /// Spans are applied from the end of the text backwards so earlier
    /// offsets stay valid. A span is skipped when it is empty or overlaps an
    /// already wrapped span. It is also skipped when its string is not found
    /// at its offset.
    pub fn escape(&self, text: &str, spans: &[EscapeSpan]) -> String {
        let mut ordered: Vec<&EscapeSpan> = spans.iter().collect();
        ordered.sort_by(|a, b| b.position.cmp(&a.position));

        let mut escaped = text.to_string();
        // Start of the leftmost span wrapped so far
        let mut limit = text.len();
        for span in ordered {
            let end = span.position + span.string.len();
            if span.string.is_empty() {
                continue;
            }
            if end > limit {
                tracing::debug!(
                    position = span.position,
                    "escape span overlaps another span, skipping"
                );
                continue;
            }
            if text.get(span.position..end) != Some(span.string.as_str()) {
                tracing::debug!(
                    position = span.position,
                    "escape span does not match the source text, skipping"
                );
                continue;
            }
            escaped.replace_range(
                span.position..end,
                &format!("{}{}{}", self.start, span.string, self.end),
            );
            limit = span.position;
        }
        escaped
    }

    /// Remove the markers, keeping the wrapped content
    pub fn unescape(&self, text: &str) -> String {
        self.pattern.replace_all(text, "$1").into_owned()
    }

    /// Decode a raw translation returned by the remote service
    pub fn decode_remote(&self, raw: &str) -> String {
        let entities_decoded = decode_html_entities(raw);
        let url_decoded = urlencoding::decode_binary(entities_decoded.as_bytes());
        self.unescape(&String::from_utf8_lossy(&url_decoded))
    }
}

/// Decode named and numeric HTML character references
///
/// Covers the full HTML5 named reference table. Unknown references are left
/// as they are.
pub fn decode_html_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_wraps_spans() {
        let escaper = Escaper::lang_connector();
        let spans = vec![EscapeSpan::new(6, "[site:name]")];
        assert_eq!(
            escaper.escape("Visit [site:name] today", &spans),
            r#"Visit <lang_connector translate="no">[site:name]</lang_connector> today"#
        );
    }

    #[test]
    fn test_escape_multiple_spans_keeps_offsets() {
        let escaper = Escaper::xtm_connect();
        let spans = vec![EscapeSpan::new(0, "A"), EscapeSpan::new(4, "B")];
        assert_eq!(
            escaper.escape("A + B", &spans),
            r#"<xtm_connect translate="no">A</xtm_connect> + <xtm_connect translate="no">B</xtm_connect>"#
        );
    }

    #[test]
    fn test_escape_skips_mismatched_span() {
        let escaper = Escaper::lang_connector();
        let spans = vec![EscapeSpan::new(2, "zzz"), EscapeSpan::new(40, "far")];
        assert_eq!(escaper.escape("Hello", &spans), "Hello");
    }

    #[test]
    fn test_unescape_escape_round_trip() {
        let escaper = Escaper::lang_connector();
        for (text, spans) in [
            ("plain text", vec![]),
            ("Visit [site:name] today", vec![EscapeSpan::new(6, "[site:name]")]),
            ("multi\nline [x]", vec![EscapeSpan::new(11, "[x]")]),
        ] {
            assert_eq!(escaper.unescape(&escaper.escape(text, &spans)), text);
        }
    }

    #[test]
    fn test_escape_skips_empty_span() {
        let escaper = Escaper::lang_connector();
        let spans = vec![EscapeSpan::new(1, "")];
        let escaped = escaper.escape("abc", &spans);
        assert_eq!(escaped, "abc");
        assert_eq!(escaper.unescape(&escaped), "abc");
    }

    #[test]
    fn test_escape_skips_overlapping_spans() {
        let escaper = Escaper::lang_connector();
        // "[a:b]" at 6 overlaps "b] c" at 9; the later span wins
        let spans = vec![EscapeSpan::new(6, "[a:b]"), EscapeSpan::new(9, "b] c")];
        let text = "Token [a:b] c";
        let escaped = escaper.escape(text, &spans);
        assert_eq!(
            escaped,
            r#"Token [a:<lang_connector translate="no">b] c</lang_connector>"#
        );
        assert_eq!(escaper.unescape(&escaped), text);
    }

    #[test]
    fn test_unescape_strips_every_marker_pair() {
        let escaper = Escaper::xtm_connect();
        let text = r#"<xtm_connect translate="no">a</xtm_connect> und <xtm_connect translate="no">b</xtm_connect>"#;
        assert_eq!(escaper.unescape(text), "a und b");
    }

    #[test]
    fn test_decode_remote_order() {
        let escaper = Escaper::lang_connector();
        let raw = r#"Caf%C3%A9 &amp; <lang_connector translate="no">X</lang_connector>"#;
        assert_eq!(escaper.decode_remote(raw), "Café & X");
    }

    #[test]
    fn test_decode_remote_entity_encoded_markers() {
        let escaper = Escaper::lang_connector();
        let raw = "&lt;lang_connector translate=&quot;no&quot;&gt;[token]&lt;/lang_connector&gt; ok";
        assert_eq!(escaper.decode_remote(raw), "[token] ok");
    }

    #[test]
    fn test_decode_remote_keeps_plus_and_stray_percent() {
        let escaper = Escaper::lang_connector();
        assert_eq!(escaper.decode_remote("1+1 = 100%"), "1+1 = 100%");
    }

    #[test]
    fn test_decode_html_entities() {
        assert_eq!(decode_html_entities("&lt;p&gt;"), "<p>");
        assert_eq!(decode_html_entities("&#39;&#x41;&#X42;"), "'AB");
        assert_eq!(decode_html_entities("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_decode_html_entities_accented_names() {
        assert_eq!(
            decode_html_entities("Caf&eacute; &uuml;ber Stra&szlig;e &Agrave; &ccedil;a &oelig;uvre"),
            "Café über Straße À ça œuvre"
        );
    }

    #[test]
    fn test_decode_remote_accented_entities() {
        let escaper = Escaper::lang_connector();
        assert_eq!(
            escaper.decode_remote("Caf&eacute; &uuml;ber &szlig;"),
            "Café über ß"
        );
    }

    #[test]
    fn test_spans_from_property() {
        let property = json!({ "10": { "string": "b" }, "2": { "string": "a" }, "x": { "string": "c" }, "5": {} });
        assert_eq!(
            EscapeSpan::from_property(Some(&property)),
            vec![EscapeSpan::new(2, "a"), EscapeSpan::new(10, "b")]
        );
        assert!(EscapeSpan::from_property(None).is_empty());
    }
}
