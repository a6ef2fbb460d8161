use super::parsers::{is_line_comment_start, match_xml_pair, scan_identifier};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
}

/// What a token in command text denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// `:name` or `@name`; `name` excludes the sigil.
    Named { sigil: char, name: &'a str },
    /// A bare `?`.
    Positional,
    /// `(:STEM1,:STEM2)`.
    XmlPair { stem: &'a str },
}

/// A token and its byte span in the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind<'a>,
}

/// Walks command text and yields parameter tokens outside comments and quoted text.
///
/// `--` comments run to the end of the line; `'...'` and `"..."` run to the next
/// matching quote with no escape handling.
#[derive(Debug, Clone)]
pub struct TokenScanner<'a> {
    sql: &'a str,
    idx: usize,
    state: State,
    positional: bool,
    xml_pairs: bool,
}

impl<'a> TokenScanner<'a> {
    /// Scanner for `:name` and `@name` tokens only.
    #[must_use]
    pub fn new(sql: &'a str) -> Self {
        Self {
            sql,
            idx: 0,
            state: State::Normal,
            positional: false,
            xml_pairs: false,
        }
    }

    /// Also yield bare `?` tokens.
    #[must_use]
    pub fn with_positional(mut self) -> Self {
        self.positional = true;
        self
    }

    /// Also yield `(:STEM1,:STEM2)` pairs.
    #[must_use]
    pub fn with_xml_pairs(mut self) -> Self {
        self.xml_pairs = true;
        self
    }
}

impl<'a> Iterator for TokenScanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let sql = self.sql;
        let bytes = sql.as_bytes();
        while self.idx < bytes.len() {
            let idx = self.idx;
            let b = bytes[idx];
            match self.state {
                State::Normal => match b {
                    b'\'' => self.state = State::SingleQuoted,
                    b'"' => self.state = State::DoubleQuoted,
                    _ if is_line_comment_start(bytes, idx) => {
                        self.state = State::LineComment;
                        self.idx += 1;
                    }
                    b':' | b'@' => {
                        if let Some(end) = scan_identifier(sql, idx + 1) {
                            self.idx = end;
                            return Some(Token {
                                start: idx,
                                end,
                                kind: TokenKind::Named {
                                    sigil: char::from(b),
                                    name: &sql[idx + 1..end],
                                },
                            });
                        }
                    }
                    b'?' if self.positional => {
                        self.idx = idx + 1;
                        return Some(Token {
                            start: idx,
                            end: idx + 1,
                            kind: TokenKind::Positional,
                        });
                    }
                    b'(' if self.xml_pairs => {
                        if let Some((end, stem)) = match_xml_pair(sql, idx) {
                            self.idx = end;
                            return Some(Token {
                                start: idx,
                                end,
                                kind: TokenKind::XmlPair { stem },
                            });
                        }
                    }
                    _ => {}
                },
                State::SingleQuoted => {
                    if b == b'\'' {
                        self.state = State::Normal;
                    }
                }
                State::DoubleQuoted => {
                    if b == b'"' {
                        self.state = State::Normal;
                    }
                }
                State::LineComment => {
                    if b == b'\n' {
                        self.state = State::Normal;
                    }
                }
            }
            self.idx += 1;
        }
        None
    }
}
