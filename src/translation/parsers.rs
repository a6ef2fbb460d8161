pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// End (exclusive) of the identifier run starting at `start`, if the run is non-empty.
pub(super) fn scan_identifier(sql: &str, start: usize) -> Option<usize> {
    let rest = sql.get(start..)?;
    let len = rest
        .char_indices()
        .find(|(_, c)| !is_identifier_char(*c))
        .map_or(rest.len(), |(i, _)| i);
    if len == 0 { None } else { Some(start + len) }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn eq_folded(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Match `(:STEM<digits>,:STEM<digits>)` at `idx`, returning the end offset and the stem.
///
/// The stem is the longest prefix of the first name that leaves a digit suffix and that
/// the second name extends with digits only.
pub(super) fn match_xml_pair(sql: &str, idx: usize) -> Option<(usize, &str)> {
    let bytes = sql.as_bytes();
    if bytes.get(idx) != Some(&b'(') || bytes.get(idx + 1) != Some(&b':') {
        return None;
    }
    let first_start = idx + 2;
    let first_end = scan_identifier(sql, first_start)?;
    if bytes.get(first_end) != Some(&b',') || bytes.get(first_end + 1) != Some(&b':') {
        return None;
    }
    let second_start = first_end + 2;
    let second_end = scan_identifier(sql, second_start)?;
    if bytes.get(second_end) != Some(&b')') {
        return None;
    }

    let first = &sql[first_start..first_end];
    let second = &sql[second_start..second_end];
    let stem = (1..first.len())
        .rev()
        .filter(|&split| first.is_char_boundary(split))
        .map(|split| (&first[..split], &first[split..]))
        .take_while(|(_, suffix)| is_digits(suffix))
        .find_map(|(stem, _)| {
            let head = second.get(..stem.len())?;
            let tail = &second[stem.len()..];
            (eq_folded(head, stem) && is_digits(tail)).then_some(stem)
        })?;
    Some((second_end + 1, stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_run_stops_at_punctuation() {
        assert_eq!(scan_identifier(":ABC,", 1), Some(4));
        assert_eq!(scan_identifier(":ПОЛЕ)", 1), Some(":ПОЛЕ".len()));
        assert_eq!(scan_identifier(": x", 1), None);
        assert_eq!(scan_identifier(":", 1), None);
    }

    #[test]
    fn xml_pair_takes_longest_stem() {
        assert_eq!(match_xml_pair("(:XML1,:XML1)", 0), Some((13, "XML")));
        assert_eq!(match_xml_pair("(:DOC12,:DOC13)", 0), Some((15, "DOC1")));
        assert_eq!(match_xml_pair("(:p1,:P2) tail", 0), Some((9, "p")));
    }

    #[test]
    fn xml_pair_rejects_mismatches() {
        assert_eq!(match_xml_pair("(:A1,:B1)", 0), None);
        assert_eq!(match_xml_pair("(:A,:A)", 0), None);
        assert_eq!(match_xml_pair("(:A1, :A2)", 0), None);
        assert_eq!(match_xml_pair("(:A1,:A2", 0), None);
        assert_eq!(match_xml_pair("(:1,:1)", 0), None);
    }
}
