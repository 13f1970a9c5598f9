/// Stand-in for every character the document font cannot encode.
pub const PLACEHOLDER: char = '?';

const TAB_EXPANSION: &str = "    ";

/// Text restricted to characters that have a single-byte WinAnsi encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Latin1Text {
    pub text: String,
    /// Characters replaced by [`PLACEHOLDER`].
    pub replaced: usize,
}

fn is_encodable(ch: char) -> bool {
    matches!(ch, '\n' | ' '..='~' | '\u{a0}'..='\u{ff}')
}

/// Tabs expand to four spaces and carriage returns are dropped; any other
/// character outside printable ASCII and U+00A0..=U+00FF becomes
/// [`PLACEHOLDER`].
pub fn sanitize_latin1(input: &str) -> Latin1Text {
    let mut text = String::with_capacity(input.len());
    let mut replaced = 0;
    for ch in input.chars() {
        match ch {
            '\t' => text.push_str(TAB_EXPANSION),
            '\r' => {}
            ch if is_encodable(ch) => text.push(ch),
            _ => {
                text.push(PLACEHOLDER);
                replaced += 1;
            }
        }
    }
    Latin1Text { text, replaced }
}

/// Single-byte encoding of already sanitized text.
pub(crate) fn encode_line(line: &str) -> Vec<u8> {
    line.chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}
