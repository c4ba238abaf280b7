use unicode_normalization::UnicodeNormalization;

/// Normalizes a free-text value before it enters the document tree.
///
/// NFC keeps composed characters composed so both renderers see the same code
/// points. Control characters are dropped (Word packages reject most of them)
/// except for `\n` and `\t`; `\r\n` and lone `\r` become `\n`.
pub fn clean(s: &str) -> String {
    let s = if s.contains('\r') {
        s.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        s.to_string()
    };

    s.nfc()
        .filter(|&ch| ch == '\n' || ch == '\t' || !ch.is_control())
        .collect()
}

/// Splits on newlines and drops blank lines. Renderers emit one visual line
/// per entry.
pub fn lines(s: &str) -> impl Iterator<Item = &str> {
    s.split('\n').map(str::trim_end).filter(|l| !l.trim().is_empty())
}
