//! Shared key generation for storage backends.
//!
//! Key format: `profile-images/{userId}-{unixMillis}-{random7}.{ext}`. The
//! millisecond timestamp plus a random suffix means a key is never reused,
//! so a replaced image never shadows its predecessor in caches.

use portrait_core::constants::{DEFAULT_IMAGE_EXTENSION, PROFILE_IMAGE_PREFIX};
use rand::Rng;
use uuid::Uuid;

use crate::{StorageError, StorageResult};

const TOKEN_LEN: usize = 7;
const MAX_EXTENSION_LEN: usize = 10;
const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate the storage key for a new profile image of `user_id`.
///
/// `original_ext` is the extension of the uploaded file name and is kept as
/// given, case included. Anything that is not a short alphanumeric extension
/// falls back to `jpg`.
pub fn generate_profile_image_key(user_id: Uuid, original_ext: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let ext = original_ext
        .filter(|e| is_safe_extension(e))
        .unwrap_or(DEFAULT_IMAGE_EXTENSION);

    format!(
        "{}/{}-{}-{}.{}",
        PROFILE_IMAGE_PREFIX,
        user_id,
        millis,
        random_token(),
        ext
    )
}

fn is_safe_extension(ext: &str) -> bool {
    !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Extension of a file name, if it has one (`"me.PNG"` gives `Some("PNG")`).
pub fn extension_from_filename(filename: &str) -> Option<&str> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

fn random_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Reject keys that are empty, could escape the storage root, or would not
/// survive a trip through a URL path unchanged (backslashes, dot segments).
pub(crate) fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.trim().is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    let dot_segment = storage_key.split('/').any(|s| s == "." || s == "..");
    if dot_segment || storage_key.contains('\\') || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_key(key: &str) -> (String, String, String, String) {
        let rest = key.strip_prefix("profile-images/").unwrap();
        let (name, ext) = rest.rsplit_once('.').unwrap();
        let (head, token) = name.rsplit_once('-').unwrap();
        let (user, millis) = head.rsplit_once('-').unwrap();
        (
            user.to_string(),
            millis.to_string(),
            token.to_string(),
            ext.to_string(),
        )
    }

    #[test]
    fn test_key_format() {
        let user_id = Uuid::new_v4();
        let key = generate_profile_image_key(user_id, Some("png"));
        let (user, millis, token, ext) = split_key(&key);

        assert_eq!(user, user_id.to_string());
        assert!(millis.parse::<i64>().unwrap() > 1_600_000_000_000);
        assert_eq!(token.len(), 7);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(ext, "png");
    }

    #[test]
    fn test_key_extension_fallback() {
        let user_id = Uuid::new_v4();
        assert!(generate_profile_image_key(user_id, None).ends_with(".jpg"));
        assert!(generate_profile_image_key(user_id, Some("")).ends_with(".jpg"));
        assert!(generate_profile_image_key(user_id, Some("j/pg")).ends_with(".jpg"));
        assert!(generate_profile_image_key(user_id, Some("p\\ng")).ends_with(".jpg"));
        assert!(generate_profile_image_key(user_id, Some("averyverylongext")).ends_with(".jpg"));
    }

    #[test]
    fn test_key_extension_keeps_original_case() {
        let user_id = Uuid::new_v4();
        assert!(generate_profile_image_key(user_id, Some("WEBP")).ends_with(".WEBP"));
        assert!(generate_profile_image_key(user_id, Some("Jpeg")).ends_with(".Jpeg"));
    }

    #[test]
    fn test_keys_are_unique() {
        let user_id = Uuid::new_v4();
        let a = generate_profile_image_key(user_id, None);
        let b = generate_profile_image_key(user_id, None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_extension_from_filename() {
        assert_eq!(extension_from_filename("cropped-1.jpg"), Some("jpg"));
        assert_eq!(extension_from_filename("archive.tar.gz"), Some("gz"));
        assert_eq!(extension_from_filename("noext"), None);
        assert_eq!(extension_from_filename(".hidden"), None);
        assert_eq!(extension_from_filename("trailing."), None);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("profile-images/a.jpg").is_ok());
        assert!(matches!(validate_key(""), Err(StorageError::InvalidKey(_))));
        assert!(matches!(
            validate_key("../etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            validate_key("/abs"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(validate_key("profile-images/a..b.jpg").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_keys_a_url_path_rewrites() {
        for key in [
            "profile-images/a\\b.jpg",
            "profile-images/./a.jpg",
            "profile-images/../a.jpg",
            "profile-images/a.jpg/.",
            "./a.jpg",
            "profile-images/..",
        ] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey(_))),
                "{}",
                key
            );
        }
    }
}
