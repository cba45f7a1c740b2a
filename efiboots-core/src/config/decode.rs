// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Decoder for the text `efibootmgr` prints for load option data.
//!
//! `efibootmgr` prints the optional data of a boot option byte by byte, replacing every unprintable byte with a
//! `.`. Since the data is usually UTF-16LE, an ASCII string such as `root=/dev/sda2` comes out as
//! `r.o.o.t.=./.d.e.v./.s.d.a.2.`, where every `.` at an odd byte offset used to be the zero high byte of a code
//! unit. Putting those zero bytes back and reading the result as UTF-16 recovers the original text.

use std::string::FromUtf16Error;

use log::warn;
use thiserror::Error;

/// A literal token that prefixes the data of Windows boot options, and is not part of the encoded payload.
const WINDOWS_PREFIX: &str = "WINDOWS";

/// The byte `efibootmgr` prints in place of a zero byte.
const ZERO_MARKER: u8 = b'.';

/// An `Error` that may result from decoding a string as UTF-16.
#[derive(Error, Debug)]
enum DecodeError {
    /// A UTF-16 string must be made out of whole code units.
    #[error("{0} bytes cannot be split into UTF-16 code units")]
    OddLength(usize),

    /// The code units did not form valid UTF-16.
    #[error("{0}")]
    InvalidUtf16(#[from] FromUtf16Error),
}

/// Decodes a load option string as printed by `efibootmgr`.
///
/// Strings without a `.`, or whose only `.` is the last character, are returned as is. A leading `WINDOWS` is kept
/// and only the remainder is decoded. If the string cannot be decoded, a warning is logged and the string is
/// returned unchanged, so that a single odd entry never breaks the parsing of the rest.
#[must_use = "Has no effect if the result is unused"]
pub fn decode_efibootmgr(code: &str) -> String {
    if !code.contains('.') {
        return code.to_owned();
    }

    if code.ends_with('.') && code.matches('.').count() == 1 {
        return code.to_owned();
    }

    if let Some(rest) = code.strip_prefix(WINDOWS_PREFIX) {
        return format!("{WINDOWS_PREFIX}{}", decode_efibootmgr(rest));
    }

    match decode_utf16_markers(code) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(target: "decode", "Could not decode '{code}': {e}");
            code.to_owned()
        }
    }
}

/// Puts back the zero high bytes and decodes the bytes of a string as UTF-16LE.
fn decode_utf16_markers(code: &str) -> Result<String, DecodeError> {
    let mut bytes = code.as_bytes().to_vec();
    for (i, byte) in bytes.iter_mut().enumerate() {
        if i % 2 == 1 && *byte == ZERO_MARKER {
            *byte = 0;
        }
    }

    if bytes.len() % 2 != 0 {
        return Err(DecodeError::OddLength(bytes.len()));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|x| u16::from_le_bytes([x[0], x[1]]))
        .collect();

    Ok(String::from_utf16(&units)?)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Encodes UTF-16 code units the way `efibootmgr` prints them.
    ///
    /// Only valid for units whose bytes are zero or printable ASCII.
    fn encode_units(units: &[u16]) -> String {
        units
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .map(|x| if x == 0 { '.' } else { char::from(x) })
            .collect()
    }

    /// Encodes an ASCII string the way `efibootmgr` prints it.
    fn encode(str: &str) -> String {
        encode_units(&str.encode_utf16().collect::<Vec<_>>())
    }

    #[test]
    fn test_plain_ascii() {
        assert_eq!(decode_efibootmgr("Linux Boot Manager"), "Linux Boot Manager");
        assert_eq!(decode_efibootmgr(""), "");
    }

    #[test]
    fn test_single_trailing_dot() {
        assert_eq!(decode_efibootmgr("foo."), "foo.");
    }

    #[test]
    fn test_utf16_params() {
        assert_eq!(
            decode_efibootmgr("r.o.o.t.=./.d.e.v./.s.d.a.2. .r.w."),
            "root=/dev/sda2 rw"
        );
    }

    #[test]
    fn test_terminator_is_kept_as_dot() {
        // a NUL terminator prints as "..", and only the odd one is a zero marker
        assert_eq!(decode_efibootmgr("q.u.i.e.t..."), "quiet.");
    }

    #[test]
    fn test_windows_prefix() {
        assert_eq!(decode_efibootmgr("WINDOWSx.B.C.D."), "WINDOWSxBCD");
    }

    #[test]
    fn test_non_ascii() {
        assert_eq!(encode("A\u{4e2d}"), "A.-N");
        assert_eq!(decode_efibootmgr("A.-N"), "A\u{4e2d}");
    }

    #[test]
    fn test_odd_length_is_kept() {
        assert_eq!(decode_efibootmgr("a.b"), "a.b");
    }

    #[test]
    fn test_unpaired_surrogate_is_kept() {
        let code = "a\u{620}.b.";
        assert_eq!(decode_efibootmgr(code), code);
    }

    /// A UTF-16 code unit whose bytes `efibootmgr` prints unambiguously.
    fn printable_unit() -> impl Strategy<Value = u16> {
        prop_oneof![
            0x21u16..0x7f,
            (0x21u16..0x7f, 0x21u16..0x7f)
                .prop_filter("high byte must not be a dot", |(_, high)| *high != 0x2e)
                .prop_map(|(low, high)| low | (high << 8)),
        ]
    }

    proptest! {
        #[test]
        fn doesnt_panic(x in any::<String>()) {
            let _ = decode_efibootmgr(&x);
        }

        #[test]
        fn ascii_round_trip(x in "[ -~]{2,64}") {
            prop_assert_eq!(decode_efibootmgr(&encode(&x)), x);
        }

        #[test]
        fn utf16_round_trip(units in prop::collection::vec(printable_unit(), 1..32)) {
            let encoded = encode_units(&units);
            prop_assume!(encoded.contains('.'));
            prop_assume!(!(encoded.ends_with('.') && encoded.matches('.').count() == 1));
            prop_assume!(!encoded.starts_with(WINDOWS_PREFIX));
            let original = String::from_utf16(&units).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(decode_efibootmgr(&encoded), original);
        }
    }
}
