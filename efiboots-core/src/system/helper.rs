// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Various helper functions for other modules.

use crate::config::types::PLACEHOLDER_PREFIX;

/// Tests if a boot number is valid.
///
/// Returns true if there is at least one character, and every character is a hex digit. Otherwise, will return
/// false.
#[must_use = "Has no effect if the result is unused"]
pub(crate) fn check_boot_num_valid(num: &str) -> bool {
    !num.is_empty() && num.chars().all(|x| x.is_ascii_hexdigit())
}

/// Tests if a placeholder boot number is valid.
///
/// Returns true if the string is the placeholder prefix (in any case) followed by at least one decimal digit.
#[must_use = "Has no effect if the result is unused"]
pub(crate) fn check_placeholder_valid(num: &str) -> bool {
    num.get(..PLACEHOLDER_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(PLACEHOLDER_PREFIX))
        && num.len() > PLACEHOLDER_PREFIX.len()
        && num[PLACEHOLDER_PREFIX.len()..]
            .chars()
            .all(|x| x.is_ascii_digit())
}

/// Quotes a string for a POSIX shell by wrapping it in single quotes.
///
/// Any single quote inside the string is closed, escaped, and reopened (`'` becomes `'\''`).
#[must_use = "Has no effect if the result is unused"]
pub fn shell_quote(str: &str) -> String {
    let mut quoted = String::with_capacity(str.len() + 2);
    quoted.push('\'');
    for char in str.chars() {
        if char == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(char);
        }
    }
    quoted.push('\'');
    quoted
}

/// Splits a line into words, the way a shell would without any expansion.
///
/// Words are separated by whitespace. Single or double quotes group whitespace into one word and may produce an empty
/// word. Backslashes are kept as they are, since they are the path separator of loader paths.
///
/// Returns [`None`] if a quote is left unclosed.
#[must_use = "Has no effect if the result is unused"]
pub fn split_words(line: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote = None;

    for char in line.chars() {
        match quote {
            Some(q) if char == q => quote = None,
            Some(_) => word.push(char),
            None if char == '\'' || char == '"' => {
                quote = Some(char);
                in_word = true;
            }
            None if char.is_whitespace() => {
                if in_word {
                    words.push(core::mem::take(&mut word));
                    in_word = false;
                }
            }
            None => {
                word.push(char);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return None;
    }
    if in_word {
        words.push(word);
    }
    Some(words)
}

/// Splits a string into its trailing decimal digits and everything before them.
///
/// Returns [`None`] if the string does not end in a digit.
#[must_use = "Has no effect if the result is unused"]
pub(crate) fn split_trailing_digits(str: &str) -> Option<(&str, &str)> {
    let idx = str.trim_end_matches(|x: char| x.is_ascii_digit()).len();
    if idx == str.len() {
        None
    } else {
        Some(str.split_at(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_boot_num_valid() {
        assert!(check_boot_num_valid("0001"));
        assert!(check_boot_num_valid("BEEF"));
        assert!(!check_boot_num_valid(""));
        assert!(!check_boot_num_valid("NEW0"));
        assert!(!check_boot_num_valid("00 1"));
    }

    #[test]
    fn test_check_placeholder_valid() {
        assert!(check_placeholder_valid("NEW0"));
        assert!(check_placeholder_valid("new12"));
        assert!(!check_placeholder_valid("NEW"));
        assert!(!check_placeholder_valid("NEWX"));
        assert!(!check_placeholder_valid("0001"));
        assert!(!check_placeholder_valid("NE"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("Linux"), "'Linux'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("\\EFI\\l.efi"), "'\\EFI\\l.efi'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_split_words() {
        assert_eq!(
            split_words("add 'Arch Linux' \\vmlinuz-linux \"root=/dev/sda2 rw\""),
            Some(vec![
                "add".to_owned(),
                "Arch Linux".to_owned(),
                "\\vmlinuz-linux".to_owned(),
                "root=/dev/sda2 rw".to_owned(),
            ])
        );
        assert_eq!(
            split_words("  add x ''  "),
            Some(vec!["add".to_owned(), "x".to_owned(), String::new()])
        );
        assert_eq!(split_words("it\"s\" one"), Some(vec!["its".to_owned(), "one".to_owned()]));
        assert_eq!(split_words("   "), Some(Vec::new()));
        assert_eq!(split_words("add 'unclosed"), None);
    }

    #[test]
    fn test_split_trailing_digits() {
        assert_eq!(split_trailing_digits("/dev/sda12"), Some(("/dev/sda", "12")));
        assert_eq!(split_trailing_digits("/dev/sda"), None);
        assert_eq!(split_trailing_digits("7"), Some(("", "7")));
    }
}
