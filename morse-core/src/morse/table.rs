//! International Morse table: 26 letters, 10 digits, `. , ? !`.

use super::MorseSymbol::{self, Dash, Dot};

/// Dot/dash pattern for `c`, case-insensitive. `None` for anything unmapped,
/// including the space character (handled as a word gap by the caller).
pub fn code_for(c: char) -> Option<&'static [MorseSymbol]> {
    let code: &'static [MorseSymbol] = match c.to_ascii_uppercase() {
        'A' => &[Dot, Dash],
        'B' => &[Dash, Dot, Dot, Dot],
        'C' => &[Dash, Dot, Dash, Dot],
        'D' => &[Dash, Dot, Dot],
        'E' => &[Dot],
        'F' => &[Dot, Dot, Dash, Dot],
        'G' => &[Dash, Dash, Dot],
        'H' => &[Dot, Dot, Dot, Dot],
        'I' => &[Dot, Dot],
        'J' => &[Dot, Dash, Dash, Dash],
        'K' => &[Dash, Dot, Dash],
        'L' => &[Dot, Dash, Dot, Dot],
        'M' => &[Dash, Dash],
        'N' => &[Dash, Dot],
        'O' => &[Dash, Dash, Dash],
        'P' => &[Dot, Dash, Dash, Dot],
        'Q' => &[Dash, Dash, Dot, Dash],
        'R' => &[Dot, Dash, Dot],
        'S' => &[Dot, Dot, Dot],
        'T' => &[Dash],
        'U' => &[Dot, Dot, Dash],
        'V' => &[Dot, Dot, Dot, Dash],
        'W' => &[Dot, Dash, Dash],
        'X' => &[Dash, Dot, Dot, Dash],
        'Y' => &[Dash, Dot, Dash, Dash],
        'Z' => &[Dash, Dash, Dot, Dot],
        '0' => &[Dash, Dash, Dash, Dash, Dash],
        '1' => &[Dot, Dash, Dash, Dash, Dash],
        '2' => &[Dot, Dot, Dash, Dash, Dash],
        '3' => &[Dot, Dot, Dot, Dash, Dash],
        '4' => &[Dot, Dot, Dot, Dot, Dash],
        '5' => &[Dot, Dot, Dot, Dot, Dot],
        '6' => &[Dash, Dot, Dot, Dot, Dot],
        '7' => &[Dash, Dash, Dot, Dot, Dot],
        '8' => &[Dash, Dash, Dash, Dot, Dot],
        '9' => &[Dash, Dash, Dash, Dash, Dot],
        '.' => &[Dot, Dash, Dot, Dash, Dot, Dash],
        ',' => &[Dash, Dash, Dot, Dot, Dash, Dash],
        '?' => &[Dot, Dot, Dash, Dash, Dot, Dot],
        '!' => &[Dash, Dot, Dash, Dot, Dash, Dash],
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_letters_digits_and_punctuation() {
        let mapped = ('A'..='Z')
            .chain('0'..='9')
            .chain(".,?!".chars())
            .filter(|c| code_for(*c).is_some())
            .count();
        assert_eq!(mapped, 40);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(code_for('k'), code_for('K'));
        assert_eq!(code_for('q'), Some(&[Dash, Dash, Dot, Dash][..]));
    }

    #[test]
    fn unmapped_characters_have_no_code() {
        for c in [' ', '@', '#', 'é', '\n'] {
            assert_eq!(code_for(c), None, "{c:?} should be unmapped");
        }
    }

    #[test]
    fn codes_contain_only_keyed_elements() {
        for c in ('A'..='Z').chain('0'..='9') {
            let code = code_for(c).unwrap_or_default();
            assert!(!code.is_empty());
            assert!(code.iter().all(|s| s.is_tone()));
        }
    }
}
