//! Single-token operand parsers.
//!
//! These know nothing about field widths: range checks belong to the
//! encoder, which knows which field a value is going into.

use crate::error::ErrorKind;

/// `R0`..`R7` (either case) to its register number.
pub fn parse_register(token: &str) -> Result<u8, ErrorKind> {
    match token.as_bytes() {
        [b'R' | b'r', d @ b'0'..=b'7'] => Ok(d - b'0'),
        _ => Err(ErrorKind::InvalidRegister(token.to_owned())),
    }
}

/// `#[-]<decimal>` or `x<hex>` / `X<hex>`.
///
/// Decimal literals are signed; hex literals are unsigned and take no
/// sign.
pub fn parse_literal(token: &str) -> Result<i32, ErrorKind> {
    let invalid = || ErrorKind::InvalidLiteral(token.to_owned());

    if let Some(dec) = token.strip_prefix('#') {
        let digits = dec.strip_prefix('-').unwrap_or(dec);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        dec.parse::<i32>().map_err(|_| invalid())
    } else if let Some(hex) = token.strip_prefix(['x', 'X']) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        u32::from_str_radix(hex, 16)
            .ok()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(invalid)
    } else {
        Err(invalid())
    }
}

/// Whether `token` is written like a literal, valid or not. Used to keep
/// literal-shaped words out of the label namespace.
pub fn looks_like_literal(token: &str) -> bool {
    parse_literal(token).is_ok() || token.starts_with('#')
}

/// Decode a quoted `.STRINGZ` operand into its characters.
pub fn decode_string(token: &str) -> Result<Vec<u16>, ErrorKind> {
    let inner = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| ErrorKind::DirectiveOperand {
            directive: ".STRINGZ",
            reason: format!("expected a quoted string, found `{token}`"),
        })?;

    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        let decoded = match c {
            '\\' => match chars.next() {
                Some('n') => '\n',
                Some('t') => '\t',
                Some('r') => '\r',
                Some('0') => '\0',
                Some('\\') => '\\',
                Some('"') => '"',
                Some(other) => return Err(ErrorKind::InvalidEscape(other)),
                None => return Err(ErrorKind::UnterminatedString),
            },
            // Only a comma-joined group can smuggle a bare quote in here.
            '"' => {
                return Err(ErrorKind::DirectiveOperand {
                    directive: ".STRINGZ",
                    reason: format!("expected a single quoted string, found `{token}`"),
                })
            }
            c => c,
        };
        let code = u16::try_from(u32::from(decoded)).map_err(|_| ErrorKind::DirectiveOperand {
            directive: ".STRINGZ",
            reason: format!("character `{decoded}` does not fit in a word"),
        })?;
        out.push(code);
    }
    Ok(out)
}
