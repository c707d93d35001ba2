use rand::Rng;

/// URL-safe alphabet, 64 symbols (6 bits each).
const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub const CODE_LEN: usize = 12;

/// Generates a redemption code. Each call draws from the thread-local CSPRNG,
/// so concurrent requests never coordinate; uniqueness is left to the store.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
