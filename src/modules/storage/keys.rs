use time::OffsetDateTime;

use crate::common::security::random_hex;

pub fn artifact_name() -> String {
    format!("{}.pdf", random_hex(16))
}

/// Millisecond timestamp, 128 random bits, then the name.
pub fn artifact_key(artifact_name: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    format!("{}-{}-{}", millis, random_hex(16), artifact_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::validate_key;
    use std::collections::HashSet;

    #[test]
    fn names_are_hex_pdfs() {
        let name = artifact_name();
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), 32 + 4);
    }

    #[test]
    fn keys_embed_the_name_and_are_valid_store_keys() {
        let key = artifact_key("abc.pdf");
        assert!(key.ends_with("-abc.pdf"));
        assert!(validate_key(&key).is_ok());
    }

    #[test]
    fn keys_do_not_repeat_for_the_same_name() {
        let keys: HashSet<_> = (0..500).map(|_| artifact_key("same.pdf")).collect();
        assert_eq!(keys.len(), 500);
    }
}
