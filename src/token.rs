//! User token derivation and Telegram Mini App auth checks.

use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derive the stable anonymous user token for a Telegram id.
///
/// The token is hex HMAC-SHA256 over `"{tg_id}:v1"`, so it can be
/// recomputed from the id without storing a mapping.
pub fn derive_user_token(tg_id: i64, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(tg_id.to_string().as_bytes());
    mac.update(b":v1");
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a Telegram Mini App `initData` query string.
///
/// The check string is the sorted, URL-decoded `key=value` pairs minus
/// `hash`, joined with newlines; the secret key is
/// HMAC-SHA256("WebAppData", bot_token).
pub fn verify_init_data(init_data: &str, bot_token: &str) -> Result<bool> {
    let mut pairs: Vec<String> = Vec::new();
    let mut provided_hash = None;

    for pair in init_data.split('&') {
        if let Some(hash) = pair.strip_prefix("hash=") {
            provided_hash = Some(hash.to_string());
            continue;
        }
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("malformed initData pair"))?;
        let value = urlencoding::decode(value)?;
        pairs.push(format!("{key}={value}"));
    }

    let provided_hash = provided_hash.ok_or_else(|| anyhow!("hash not found in initData"))?;
    pairs.sort();
    let data_check_string = pairs.join("\n");

    let mut secret_hmac =
        HmacSha256::new_from_slice(b"WebAppData").expect("HMAC accepts any key length");
    secret_hmac.update(bot_token.as_bytes());
    let secret_key = secret_hmac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key).expect("HMAC accepts any key length");
    mac.update(data_check_string.as_bytes());
    let computed = hex::encode(mac.finalize().into_bytes());

    Ok(computed == provided_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_stable_and_hex() {
        let a = derive_user_token(12345, "secret");
        let b = derive_user_token(12345, "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_depends_on_id_and_secret() {
        let base = derive_user_token(1, "secret");
        assert_ne!(base, derive_user_token(2, "secret"));
        assert_ne!(base, derive_user_token(1, "other"));
    }

    fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> String {
        let mut pairs: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        let check = pairs.join("\n");

        let mut secret_hmac = HmacSha256::new_from_slice(b"WebAppData").unwrap();
        secret_hmac.update(bot_token.as_bytes());
        let secret_key = secret_hmac.finalize().into_bytes();
        let mut mac = HmacSha256::new_from_slice(&secret_key).unwrap();
        mac.update(check.as_bytes());
        let hash = hex::encode(mac.finalize().into_bytes());

        let mut query: Vec<String> = fields
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect();
        query.push(format!("hash={hash}"));
        query.join("&")
    }

    #[test]
    fn init_data_roundtrip_verifies() {
        let init = sign_init_data(&[("auth_date", "1700000000"), ("query_id", "AAE")], "42:TEST");
        assert!(verify_init_data(&init, "42:TEST").unwrap());
    }

    #[test]
    fn init_data_wrong_bot_token_fails() {
        let init = sign_init_data(&[("auth_date", "1700000000")], "42:TEST");
        assert!(!verify_init_data(&init, "43:OTHER").unwrap());
    }

    #[test]
    fn init_data_without_hash_is_error() {
        assert!(verify_init_data("auth_date=1", "42:TEST").is_err());
    }
}
