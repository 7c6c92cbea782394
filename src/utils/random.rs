use rand::{RngCore, rng};

/// Generate random filler bytes (C1 body)
pub fn generate_random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rng().fill_bytes(&mut bytes);
    bytes
}
