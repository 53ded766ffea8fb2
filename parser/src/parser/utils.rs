use enquote::enquote;

#[inline]
fn is_first_ident_char(ch: char) -> bool {
    matches!(ch, 'A'..='Z' | 'a'..='z' | '_' | ':')
}

fn is_ident_char(ch: char) -> bool {
    matches!(ch, 'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | ':' | '.')
}

/// Escapes `s` so it can be written back as a metric or label identifier.
pub fn escape_ident(s: &str) -> String {
    let mut dst = String::with_capacity(s.len());
    for (i, ch) in s.chars().enumerate() {
        if !is_ident_char(ch) {
            dst.push('\\');
            dst.push(ch);
            continue;
        }
        if i == 0 && !is_first_ident_char(ch) {
            // hex escape the first char
            dst.push_str(&format!("\\x{:02x}", ch as u8));
        } else {
            dst.push(ch);
        }
    }
    dst
}

pub fn quote(str: &str) -> String {
    enquote('"', str)
}
