//! Gateway reply envelope: the XML wrapper the messaging gateway expects.

/// Wrap reply text in the gateway's reply envelope, escaping XML.
pub fn message_response(text: &str) -> String {
    format!(
        "<Response><Message>{}</Message></Response>",
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_text_in_envelope() {
        assert_eq!(
            message_response("Your order is on the way!"),
            "<Response><Message>Your order is on the way!</Message></Response>"
        );
    }

    #[test]
    fn escapes_xml_special_characters() {
        assert_eq!(
            message_response(r#"a < b & "c" > 'd'"#),
            "<Response><Message>a &lt; b &amp; &quot;c&quot; &gt; &apos;d&apos;</Message></Response>"
        );
    }

    #[test]
    fn empty_text_still_produces_envelope() {
        assert_eq!(message_response(""), "<Response><Message></Message></Response>");
    }
}
