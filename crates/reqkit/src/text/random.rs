use rand::Rng;

/// Characters drawn by [`random_string`].
const RANDOM_STRING_SOURCE: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_+";

/// Returns a string of exactly `length` characters drawn uniformly from a
/// fixed printable alphabet.
///
/// The output is not suitable as a secret; use it for file names and
/// other collision-avoidance tokens.
pub fn random_string(length: usize) -> String {
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| RANDOM_STRING_SOURCE[rng.gen_range(0..RANDOM_STRING_SOURCE.len())] as char)
        .collect()
}
