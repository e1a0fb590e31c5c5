//! Attendance code generation.

use rand::Rng;

use crate::CodeError;

/// The 36 symbols codes are drawn from: `A`–`Z` then `0`–`9`.
pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws a random code of `length` symbols that differs from `previous`.
///
/// Symbols are drawn uniformly from [`CODE_ALPHABET`] using the thread-local
/// CSPRNG (`rand::rng()`, ChaCha seeded from the OS). A predictable code
/// could be guessed without looking at the display, so a statistical PRNG
/// is not good enough here.
///
/// Only an immediate repeat is avoided: a code may come back later in the
/// same session.
///
/// # Errors
/// Returns [`CodeError::InvalidLength`] if `length` is 0.
pub fn generate_code(
    length: usize,
    previous: Option<&str>,
) -> Result<String, CodeError> {
    if length < 1 {
        return Err(CodeError::InvalidLength(length));
    }

    let mut rng = rand::rng();
    loop {
        let code: String = (0..length)
            .map(|_| {
                let idx = rng.random_range(0..CODE_ALPHABET.len());
                char::from(CODE_ALPHABET[idx])
            })
            .collect();

        if previous != Some(code.as_str()) {
            return Ok(code);
        }
    }
}
