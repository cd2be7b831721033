use sha2::{Digest, Sha256};

/// SHA-256 of a normalized PII value, hex-encoded.
///
/// Facebook and TikTok Advanced Matching both require values to be trimmed
/// and lowercased before hashing.
pub fn sha256_normalized(value: &str) -> String {
    let normalized = value.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_normalized_known_vector() {
        // sha256("test@example.com")
        assert_eq!(
            sha256_normalized("test@example.com"),
            "973dfe463ec85785f5f95af5ba3906eedb2d931c24e69824a89ea65dba4e813b"
        );
    }

    #[test]
    fn test_normalization_applies_before_hashing() {
        assert_eq!(
            sha256_normalized("  Test@Example.COM "),
            sha256_normalized("test@example.com")
        );
    }
}
