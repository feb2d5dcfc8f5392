use sha2::{Digest, Sha256};

/// Stable UID for a title: lowercase hex SHA-256 of its UTF-8 bytes.
pub fn create_uid_from_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_is_sha256_hex() {
        assert_eq!(
            create_uid_from_string("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(create_uid_from_string("").len(), 64);
    }

    #[test]
    fn test_uid_is_deterministic() {
        let title = "[PROD] CPU usage | platform";
        assert_eq!(create_uid_from_string(title), create_uid_from_string(title));
        assert_ne!(
            create_uid_from_string(title),
            create_uid_from_string("[STAGE] CPU usage | platform")
        );
    }
}
