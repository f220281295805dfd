use sha2::{Digest, Sha256};

/// Hash da forma normalizada do texto — a chave de identidade de um
/// item salvo.
pub fn hash_norm(norm: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(norm.as_bytes());
    hex::encode(hasher.finalize())
}
