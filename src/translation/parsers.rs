pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Recognise `$tag$` (or `$$`) at `start`; returns the tag and the offset of the closing `$`.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    if bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        // `$1` is a positional parameter, never a tag
        return None;
    }
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

/// True when the `$` at `idx` closes a block opened with `tag`.
pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let tag_start = idx + 1;
    let tag_end = tag_start + tag.len();
    bytes.get(idx) == Some(&b'$')
        && bytes.get(tag_start..tag_end) == Some(tag.as_bytes())
        && bytes.get(tag_end) == Some(&b'$')
}
