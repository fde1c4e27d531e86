//! Shared key generation for storage backends.
//!
//! Each stored image pair is identified by one UUID: `posts/{id}.jpg` for
//! the full-size encoding, `posts/{id}_thumb.jpg` for the thumbnail.

use uuid::Uuid;

pub fn image_key(id: Uuid) -> String {
    format!("posts/{}.jpg", id)
}

pub fn thumbnail_key(id: Uuid) -> String {
    format!("posts/{}_thumb.jpg", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_shares_one_id() {
        let id = Uuid::new_v4();
        let image = image_key(id);
        let thumb = thumbnail_key(id);

        assert!(image.starts_with("posts/"));
        assert!(image.ends_with(".jpg"));
        assert!(thumb.ends_with("_thumb.jpg"));
        assert!(thumb.contains(&id.to_string()));
        assert!(image.contains(&id.to_string()));
    }
}
