use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates `s` to at most `max_width` terminal columns, appending "..."
/// when text was cut.
///
/// Widths are measured with `unicode-width`, so CJK characters and emoji
/// count as two columns. At widths of three columns or fewer there is no
/// room for an ellipsis and the prefix that fits is returned as is.
///
/// Returns `Cow::Borrowed` whenever the input already fits.
///
/// # Examples
///
/// ```
/// use folio::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Dune", 10), "Dune");
/// assert_eq!(truncate_to_width("Foundation and Empire", 13), "Foundation...");
/// assert_eq!(truncate_to_width("三体問題", 7), "三体...");
/// assert_eq!(truncate_to_width("Emma", 2), "Em");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    let budget = if max_width <= ELLIPSIS_WIDTH {
        max_width
    } else {
        max_width - ELLIPSIS_WIDTH
    };

    let mut width = 0;
    // Byte offset of the longest prefix that fits in `budget`
    let mut cut = 0;

    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w <= budget {
            cut = idx + c.len_utf8();
        }
        width += w;
        if width > max_width {
            return if max_width <= ELLIPSIS_WIDTH {
                Cow::Owned(s[..cut].to_string())
            } else {
                Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
            };
        }
    }

    Cow::Borrowed(s)
}

/// SEC-001: Strips terminal control characters and ANSI escape sequences.
///
/// Catalog text (titles, summaries, author names) comes from remote servers
/// and is rendered straight into the terminal, so it must not be able to
/// move the cursor, recolor the screen or set the window title.
///
/// Removes C0 controls other than tab/newline/CR, DEL, CSI sequences
/// (`ESC [` ... final byte), OSC sequences (`ESC ]` ... BEL or `ESC \`) and
/// bare ESC bytes.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    fn is_control(b: u8) -> bool {
        b == 0x1b || b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
    }

    let bytes = s.as_bytes();
    if !bytes.iter().any(|&b| is_control(b)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == 0x1b {
            match bytes.get(i + 1) {
                Some(b'[') => {
                    i += 2;
                    while i < bytes.len() {
                        let c = bytes[i];
                        i += 1;
                        if (0x40..=0x7e).contains(&c) {
                            break;
                        }
                    }
                }
                Some(b']') => {
                    i += 2;
                    while i < bytes.len() {
                        if bytes[i] == 0x07 {
                            i += 1;
                            break;
                        }
                        if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                            i += 2;
                            break;
                        }
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        } else if is_control(b) {
            i += 1;
        } else {
            let start = i;
            while i < bytes.len() && !is_control(bytes[i]) {
                i += 1;
            }
            // Control bytes are ASCII, so they never split a UTF-8 sequence
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}
