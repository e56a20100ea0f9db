//! `Accept` header negotiation
//!
//! Only answers one question: would this client take an HTML response?

/// Check whether an `Accept` header value admits `text/html`
///
/// A missing header accepts anything. Otherwise the most specific media range
/// matching `text/html` decides (`text/html` over `text/*` over `*/*`), and
/// HTML is acceptable when that range has a non-zero quality.
pub fn accepts_html(accept: Option<&str>) -> bool {
    let Some(header) = accept else {
        return true;
    };

    header
        .split(',')
        .filter_map(parse_media_range)
        .filter_map(|(range, q)| html_specificity(&range).map(|s| (s, q)))
        .max_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)))
        .is_some_and(|(_, q)| q > 0.0)
}

/// Split one media range into its lowercased type and its `q` value
fn parse_media_range(item: &str) -> Option<(String, f32)> {
    let mut parts = item.split(';');
    let range = parts.next()?.trim().to_ascii_lowercase();
    if range.is_empty() {
        return None;
    }

    let mut quality = 1.0;
    for param in parts {
        if let Some((key, value)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("q") {
                quality = value.trim().parse::<f32>().ok()?.clamp(0.0, 1.0);
            }
        }
    }
    Some((range, quality))
}

fn html_specificity(range: &str) -> Option<u8> {
    match range {
        "text/html" => Some(2),
        "text/*" => Some(1),
        "*/*" => Some(0),
        _ => None,
    }
}
