//! Salted password hashing.
//!
//! Stored form: `blake3$<salt-hex>$<hash-hex>`. The per-password key is a
//! domain-separated BLAKE3 hash of the salt; the password is then run
//! through keyed BLAKE3 [`ROUNDS`] times.

const DOMAIN: &str = "kikubo-password-v1";
const SCHEME: &str = "blake3";
const SALT_LEN: usize = 16;
pub const ROUNDS: u32 = 10_000;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::Rng::fill(&mut rand::thread_rng(), &mut salt);
    let digest = derive(&salt, password);
    format!("{SCHEME}${}${}", hex::encode(salt), digest.to_hex())
}

/// Check a password against its stored form. Malformed or empty stored
/// values never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    match decode(encoded) {
        // blake3::Hash equality is constant time.
        Some((salt, expected)) => derive(&salt, password) == expected,
        None => false,
    }
}

fn derive(salt: &[u8], password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN.as_bytes());
    hasher.update(b":");
    hasher.update(salt);
    let key = *hasher.finalize().as_bytes();

    let mut digest = blake3::keyed_hash(&key, password.as_bytes());
    for _ in 1..ROUNDS {
        digest = blake3::keyed_hash(&key, digest.as_bytes());
    }
    digest
}

fn decode(encoded: &str) -> Option<(Vec<u8>, blake3::Hash)> {
    let mut parts = encoded.split('$');
    let scheme = parts.next()?;
    let salt = parts.next()?;
    let hash = parts.next()?;
    if scheme != SCHEME || parts.next().is_some() {
        return None;
    }
    let salt = hex::decode(salt).ok().filter(|s| s.len() == SALT_LEN)?;
    let hash = blake3::Hash::from_hex(hash).ok()?;
    Some((salt, hash))
}
