use std::borrow::Cow;

mod parsers;
mod scanner;

pub use scanner::{Token, TokenKind, TokenScanner};

/// How a command resolves rewriting relative to the connection default.
///
/// # Examples
/// ```rust
/// use db2_middleware::prelude::*;
///
/// assert!(RewriteMode::ForceOn.resolve(false));
/// assert!(!RewriteMode::ConnectionDefault.resolve(false));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RewriteMode {
    /// Follow the connection's transport.
    #[default]
    ConnectionDefault,
    /// Always rewrite named markers to `?`.
    ForceOn,
    /// Leave command text as written.
    ForceOff,
}

impl RewriteMode {
    #[must_use]
    pub fn resolve(self, connection_default: bool) -> bool {
        match self {
            RewriteMode::ConnectionDefault => connection_default,
            RewriteMode::ForceOn => true,
            RewriteMode::ForceOff => false,
        }
    }
}

/// Rewrite `:name` and `@name` markers to positional `?`.
///
/// Markers inside `--` comments and single- or double-quoted text are left alone,
/// as are sigils not followed by a letter, digit or underscore. The output contains
/// no named markers, so rewriting twice gives the same text.
///
/// ```rust
/// use db2_middleware::prelude::*;
///
/// let sql = "SELECT TO_CHAR(TS, 'YYYY-MM-DD :Y') FROM T WHERE ID = :ID -- :NOT_ME";
/// assert_eq!(
///     rewrite_parameters(sql, true),
///     "SELECT TO_CHAR(TS, 'YYYY-MM-DD :Y') FROM T WHERE ID = ? -- :NOT_ME"
/// );
/// ```
///
/// Returns a borrowed `Cow` when nothing changes.
#[must_use]
pub fn rewrite_parameters(sql: &str, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(sql);
    }
    splice(sql, TokenScanner::new(sql), |_| Cow::Borrowed("?"))
}

/// Collapse `(:STEM1,:STEM2)` pairs into a single `:STEM` marker.
///
/// Each pair collapses on its own; pairs inside comments or quoted text are left alone.
#[must_use]
pub fn collapse_xml_pairs(sql: &str) -> Cow<'_, str> {
    let pairs = TokenScanner::new(sql)
        .with_xml_pairs()
        .filter(|t| matches!(t.kind, TokenKind::XmlPair { .. }));
    splice(sql, pairs, |token| match token.kind {
        TokenKind::XmlPair { stem } => Cow::Owned(format!(":{stem}")),
        _ => Cow::Borrowed(""),
    })
}

/// Replace each token's span with `replacement(token)`, copying everything between.
pub(crate) fn splice<'a, I, F>(sql: &'a str, tokens: I, mut replacement: F) -> Cow<'a, str>
where
    I: Iterator<Item = Token<'a>>,
    F: FnMut(&Token<'a>) -> Cow<'a, str>,
{
    let mut out: Option<String> = None;
    let mut copied = 0;
    for token in tokens {
        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
        buf.push_str(&sql[copied..token.start]);
        buf.push_str(&replacement(&token));
        copied = token.end;
    }
    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}
