//! Stable, URL-safe content digests (SHA-256, base64url without padding).

use std::path::Path;

use base64::Engine;
use ring::digest;

pub fn hash_bytes(data: &[u8]) -> String {
    let digest = digest::digest(&digest::SHA256, data);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_ref())
}

/// One-way hash of a string (used for stored passwords).
pub fn hash_string(value: &str) -> String {
    hash_bytes(value.as_bytes())
}

pub fn verify_hashed_string(value: &str, hashed: &str) -> bool {
    hash_string(value) == hashed
}

/// Hash a file's contents without loading it into memory at once.
pub async fn hash_file<P: AsRef<Path>>(path: P) -> Result<String, std::io::Error> {
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path).await?;
    let mut context = digest::Context::new(&digest::SHA256);
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        context.update(&buf[..read]);
    }

    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(context.finish().as_ref()))
}
