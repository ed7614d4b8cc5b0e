//! URL normalization shared by both conversion directions.
//!
//! Insomnia stores a URL as one string; Postman stores a raw string plus a
//! decomposition into protocol, host labels, port and path segments.
//!
//! - [`parse_url`] decomposes an Insomnia URL for Postman.
//! - [`reconstruct_url`] turns a Postman URL back into one Insomnia string.
//!
//! URLs that start with a template variable (`{{ … }}`) are not real URLs;
//! they are split on `/` instead of being handed to the URL parser.

use tracing::{debug, trace};

use crate::model::postman::Url;

/// Opening marker of a template variable in both tools.
pub const TEMPLATE_OPEN: &str = "{{";
/// Closing marker of a template variable in both tools.
pub const TEMPLATE_CLOSE: &str = "}}";

/// Decompose a URL string into Postman's structured form.
///
/// Never fails: a string the URL parser rejects (or one without a host)
/// degrades to a raw-only [`Url`]. The parser only decides validity; protocol,
/// host, port and path are copied from `raw` verbatim, so an explicit default
/// port or a `..` segment survives.
pub fn parse_url(raw: &str) -> Url {
    if raw.starts_with(TEMPLATE_OPEN) {
        return parse_templated(raw);
    }

    let parsed = match url::Url::parse(raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            debug!(raw, %error, "URL not parseable; keeping raw string only");
            return Url::raw_only(raw);
        }
    };
    if parsed.host().is_none() {
        debug!(raw, "URL has no host; keeping raw string only");
        return Url::raw_only(raw);
    }

    // Fields come from the text as written, not the parser's normalized view.
    let Some(parts) = RawParts::split(raw) else {
        debug!(raw, "URL has no authority; keeping raw string only");
        return Url::raw_only(raw);
    };

    let url = Url {
        raw: raw.to_string(),
        protocol: parts.scheme.to_string(),
        host: vec![parts.host.to_string()],
        port: parts.port.to_string(),
        path: parts
            .path
            .trim_matches('/')
            .split('/')
            .map(decode_segment)
            .collect(),
    };
    trace!(?url, "decomposed URL");
    url
}

/// Collapse a Postman URL into the single string Insomnia stores.
///
/// The raw string wins when present. A raw string beginning with a
/// `{{variable}}` has that variable rewritten into Insomnia's `{{ _.variable }}`
/// accessor form, with everything after it kept verbatim. Without a raw
/// string the URL is rebuilt from its parts; absent parts are omitted.
pub fn reconstruct_url(url: &Url) -> String {
    if !url.raw.is_empty() {
        if url.raw.starts_with(TEMPLATE_OPEN)
            && let Some(close) = url.raw.find(TEMPLATE_CLOSE)
        {
            let (token, rest) = url.raw.split_at(close + TEMPLATE_CLOSE.len());
            let rebuilt = format!("{}{rest}", insomnia_template(token));
            trace!(raw = url.raw, rebuilt, "rewrote templated URL");
            return rebuilt;
        }
        return url.raw.clone();
    }

    let mut out = String::new();
    if !url.protocol.is_empty() {
        out.push_str(&url.protocol);
        out.push_str("://");
    }
    out.push_str(&url.host.join("."));
    if !url.port.is_empty() {
        out.push(':');
        out.push_str(&url.port);
    }
    if !url.path.is_empty() {
        out.push('/');
        out.push_str(&url.path.join("/"));
    }
    out
}

/// Strip Insomnia's bracket accessor (`_['name']`) from a template token.
pub fn clean_template_var(token: &str) -> String {
    token.replace("_['", "").replace("']", "")
}

/// Express a template token as Insomnia's `{{ _.name }}` accessor.
///
/// Accepts `{{name}}`, `{{ _.name }}` and `{{ _['name'] }}` alike.
pub fn insomnia_template(token: &str) -> String {
    let inner = token.trim();
    let inner = inner.strip_prefix(TEMPLATE_OPEN).unwrap_or(inner);
    let inner = inner.strip_suffix(TEMPLATE_CLOSE).unwrap_or(inner);
    let cleaned = clean_template_var(inner.trim());
    let name = cleaned.strip_prefix("_.").unwrap_or(cleaned.as_str()).trim();
    format!("{TEMPLATE_OPEN} _.{name} {TEMPLATE_CLOSE}")
}

fn parse_templated(raw: &str) -> Url {
    let (token, rest) = match raw.split_once('/') {
        Some((token, rest)) => (token, Some(rest)),
        None => (raw, None),
    };
    let path = rest
        .map(|rest| rest.split('/').map(str::to_string).collect())
        .unwrap_or_default();

    Url {
        raw: raw.to_string(),
        host: vec![clean_template_var(token)],
        path,
        ..Url::default()
    }
}

/// Components of a literal URL as written, before any normalization.
#[derive(Debug, PartialEq, Eq)]
struct RawParts<'a> {
    scheme: &'a str,
    host: &'a str,
    port: &'a str,
    path: &'a str,
}

impl<'a> RawParts<'a> {
    /// Split `scheme://[userinfo@]host[:port][/path][?query][#fragment]`.
    fn split(raw: &'a str) -> Option<Self> {
        let (scheme, rest) = raw.split_once("://")?;
        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);
        let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
        let (host, port) = split_port(host_port);
        let path_end = tail.find(['?', '#']).unwrap_or(tail.len());
        Some(Self {
            scheme,
            host,
            port,
            path: &tail[..path_end],
        })
    }
}

/// Separate a trailing `:<digits>` port; IPv6 brackets are kept on the host.
fn split_port(host_port: &str) -> (&str, &str) {
    let search_from = host_port.rfind(']').map_or(0, |i| i + 1);
    match host_port[search_from..].rfind(':') {
        Some(offset) => {
            let colon = search_from + offset;
            let port = &host_port[colon + 1..];
            if port.bytes().all(|b| b.is_ascii_digit()) {
                (&host_port[..colon], port)
            } else {
                (host_port, "")
            }
        }
        None => (host_port, ""),
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
