//! Minimal XML document carrier: an optional declaration plus the serialized body.
//!
//! The declaration is interpreted and the body's tags are checked for balance. The body
//! itself is kept byte-for-byte so a document survives a round trip through the driver
//! unchanged.

use std::fmt;
use std::sync::LazyLock;

use encoding_rs::Encoding;
use regex::Regex;

use crate::error::Db2Error;

static PSEUDO_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<name>[A-Za-z_:][-\w.:]*)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("XML pseudo-attribute pattern is valid")
});

/// The `<?xml ...?>` header of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl XmlDeclaration {
    #[must_use]
    pub fn new(version: impl Into<String>, encoding: Option<&str>, standalone: Option<&str>) -> Self {
        Self {
            version: version.into(),
            encoding: encoding.map(str::to_string),
            standalone: standalone.map(str::to_string),
        }
    }

    /// Declaration attached to every XML value read back from the driver.
    #[must_use]
    pub fn utf16() -> Self {
        Self::new("1.0", Some("UTF-16"), None)
    }

    fn parse(inner: &str) -> Result<Self, Db2Error> {
        let mut decl = XmlDeclaration::new("", None, None);
        for caps in PSEUDO_ATTRIBUTE.captures_iter(inner) {
            let value = caps
                .name("dq")
                .or_else(|| caps.name("sq"))
                .map_or("", |m| m.as_str())
                .to_string();
            match &caps["name"] {
                "version" => decl.version = value,
                "encoding" => decl.encoding = Some(value),
                "standalone" => decl.standalone = Some(value),
                other => {
                    return Err(Db2Error::XmlError(format!(
                        "unexpected attribute '{other}' in XML declaration"
                    )));
                }
            }
        }
        if decl.version.is_empty() {
            return Err(Db2Error::XmlError(
                "XML declaration is missing its version".to_string(),
            ));
        }
        Ok(decl)
    }
}

impl fmt::Display for XmlDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<?xml version=\"{}\"", self.version)?;
        if let Some(encoding) = &self.encoding {
            write!(f, " encoding=\"{encoding}\"")?;
        }
        if let Some(standalone) = &self.standalone {
            write!(f, " standalone=\"{standalone}\"")?;
        }
        f.write_str("?>")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    declaration: Option<XmlDeclaration>,
    body: String,
}

impl XmlDocument {
    /// Parse serialized XML.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::XmlError` if the declaration is malformed, or if the body is not a
    /// single root element with balanced tags. Entities and DTDs are not checked.
    pub fn parse(text: &str) -> Result<Self, Db2Error> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let (declaration, body) = match text.strip_prefix("<?xml") {
            Some(rest) if rest.starts_with(|c: char| c.is_whitespace()) => {
                let end = rest.find("?>").ok_or_else(|| {
                    Db2Error::XmlError("unterminated XML declaration".to_string())
                })?;
                let decl = XmlDeclaration::parse(&rest[..end])?;
                (Some(decl), &rest[end + 2..])
            }
            _ => (None, text),
        };

        check_well_formed(body)?;

        Ok(Self {
            declaration,
            body: body.to_string(),
        })
    }

    #[must_use]
    pub fn declaration(&self) -> Option<&XmlDeclaration> {
        self.declaration.as_ref()
    }

    /// Everything after the declaration, untouched.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Encoding label named by the declaration; UTF-8 when absent.
    #[must_use]
    pub fn declared_encoding(&self) -> &str {
        self.declaration
            .as_ref()
            .and_then(|d| d.encoding.as_deref())
            .unwrap_or("UTF-8")
    }

    /// Replace the declaration, keeping the body.
    #[must_use]
    pub fn with_declaration(mut self, declaration: XmlDeclaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    #[must_use]
    pub fn outer_xml(&self) -> String {
        match &self.declaration {
            Some(decl) => format!("{decl}{}", self.body),
            None => self.body.clone(),
        }
    }

    /// Serialize the document in the encoding its declaration names.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::XmlError` for an unknown encoding label or unmappable characters.
    pub fn to_declared_bytes(&self) -> Result<Vec<u8>, Db2Error> {
        encode_in(&self.outer_xml(), self.declared_encoding())
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(decl) = &self.declaration {
            write!(f, "{decl}")?;
        }
        f.write_str(&self.body)
    }
}

fn malformed(reason: impl fmt::Display) -> Db2Error {
    Db2Error::XmlError(format!("document is not well-formed: {reason}"))
}

/// Byte offset of the `>` closing a markup run, skipping quoted attribute values and,
/// when `brackets` is set, a `[...]` internal subset.
fn markup_end(markup: &str, brackets: bool) -> Option<usize> {
    let mut quote = None;
    let mut depth = 0_usize;
    for (i, c) in markup.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') if brackets => depth += 1,
            (None, ']') if brackets => depth = depth.saturating_sub(1),
            (None, '>') if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn skip_past<'a>(rest: &'a str, terminator: &str, what: &str) -> Result<&'a str, Db2Error> {
    rest.find(terminator)
        .map(|end| &rest[end + terminator.len()..])
        .ok_or_else(|| malformed(format!("unterminated {what}")))
}

fn check_well_formed(body: &str) -> Result<(), Db2Error> {
    let mut open: Vec<&str> = Vec::new();
    let mut roots = 0;
    let mut rest = body;
    loop {
        let lt = rest.find('<').unwrap_or(rest.len());
        if open.is_empty() && !rest[..lt].trim().is_empty() {
            return Err(malformed("text outside the root element"));
        }
        if lt == rest.len() {
            break;
        }
        let markup = &rest[lt..];
        if let Some(after) = markup.strip_prefix("<!--") {
            rest = skip_past(after, "-->", "comment")?;
        } else if let Some(after) = markup.strip_prefix("<![CDATA[") {
            if open.is_empty() {
                return Err(malformed("CDATA outside the root element"));
            }
            rest = skip_past(after, "]]>", "CDATA section")?;
        } else if let Some(after) = markup.strip_prefix("<?") {
            rest = skip_past(after, "?>", "processing instruction")?;
        } else if let Some(after) = markup.strip_prefix("<!") {
            if roots > 0 {
                return Err(malformed("document type after the root element"));
            }
            let end = markup_end(after, true).ok_or_else(|| malformed("unterminated document type"))?;
            rest = &after[end + 1..];
        } else {
            let end = markup_end(markup, false).ok_or_else(|| malformed("unterminated tag"))?;
            let inner = &markup[1..end];
            rest = &markup[end + 1..];
            if let Some(closing) = inner.strip_prefix('/') {
                let name = closing.trim_end();
                match open.pop() {
                    Some(expected) if expected == name => {}
                    Some(expected) => {
                        return Err(malformed(format!("</{name}> closes <{expected}>")));
                    }
                    None => return Err(malformed(format!("</{name}> has no start tag"))),
                }
                continue;
            }
            let name_end = inner
                .find(|c: char| c.is_whitespace() || c == '/')
                .unwrap_or(inner.len());
            let name = &inner[..name_end];
            if !name.starts_with(|c: char| c.is_alphabetic() || c == '_' || c == ':') {
                return Err(malformed(format!("invalid tag <{inner}>")));
            }
            if open.is_empty() {
                roots += 1;
                if roots > 1 {
                    return Err(malformed("more than one root element"));
                }
            }
            if !inner.ends_with('/') {
                open.push(name);
            }
        }
    }
    if let Some(name) = open.last() {
        return Err(malformed(format!("<{name}> is never closed")));
    }
    if roots == 0 {
        return Err(Db2Error::XmlError("document has no root element".to_string()));
    }
    Ok(())
}

fn encode_in(text: &str, label: &str) -> Result<Vec<u8>, Db2Error> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| Db2Error::XmlError(format!("unknown XML encoding '{label}'")))?;

    // encoding_rs only decodes UTF-16; encode it by hand, without a byte order mark.
    if encoding == encoding_rs::UTF_16LE {
        return Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
    }
    if encoding == encoding_rs::UTF_16BE {
        return Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
    }

    let (bytes, _, unmappable) = encoding.encode(text);
    if unmappable {
        return Err(Db2Error::XmlError(format!(
            "document contains characters not representable in {label}"
        )));
    }
    Ok(bytes.into_owned())
}
