//! Element lookup for the small, flat XML documents gateways send back.
//!
//! Matches on local names, so `<u:Foo>` and `<Foo>` are the same element.
//! Not a general parser: no CDATA, no nesting of same-named elements.

/// Bodies of every `name` element, in document order
pub fn elements<'a>(xml: &'a str, name: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(open) = xml[cursor..].find('<') {
        let tag_start = cursor + open + 1;
        let Some(tag_len) = xml[tag_start..].find('>') else {
            break;
        };
        let tag = &xml[tag_start..tag_start + tag_len];
        let body_start = tag_start + tag_len + 1;
        cursor = body_start;

        if tag.starts_with(['/', '?', '!']) {
            continue;
        }

        let qualified = tag
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default();
        let local = qualified.rsplit(':').next().unwrap_or(qualified);
        if local != name {
            continue;
        }

        if tag.ends_with('/') {
            found.push("");
            continue;
        }

        let close = format!("</{qualified}>");
        if let Some(body_len) = xml[body_start..].find(&close) {
            found.push(xml[body_start..body_start + body_len].trim());
            cursor = body_start + body_len + close.len();
        }
    }

    found
}

/// Body of the first `name` element
pub fn element<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    elements(xml, name).into_iter().next()
}

pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
