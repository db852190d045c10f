//! Luhn mod-10 checksum arithmetic
//!
//! Shared by candidate generation and validation. Operates on raw digit
//! slices so callers never round-trip through strings in the hot loop.

/// Compute the Luhn sum of a digit sequence, rightmost digit unweighted.
fn luhn_sum(digits: &[u8]) -> u32 {
    digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let d = u32::from(d);
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum()
}

/// Check whether a full digit sequence passes the Luhn test.
pub fn is_valid(digits: &[u8]) -> bool {
    !digits.is_empty() && luhn_sum(digits) % 10 == 0
}

/// Check whether a numeric string passes the Luhn test.
///
/// Returns `false` for empty input or any non-digit character.
pub fn is_valid_str(number: &str) -> bool {
    let digits: Option<Vec<u8>> = number
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect();

    match digits {
        Some(d) => is_valid(&d),
        None => false,
    }
}

/// Find the check digit that completes `partial` into a Luhn-valid number.
///
/// Tries values 0-9 in order and returns the first that satisfies the test.
/// Exactly one value satisfies it for any fixed partial number, so `None`
/// signals broken checksum arithmetic rather than unlucky input.
pub fn check_digit(partial: &[u8]) -> Option<u8> {
    (0..=9u8).find(|&candidate| {
        let mut digits = Vec::with_capacity(partial.len() + 1);
        digits.extend_from_slice(partial);
        digits.push(candidate);
        is_valid(&digits)
    })
}
