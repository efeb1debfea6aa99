use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

pub fn hmac_sha512_hex(secret: &str, data: &str) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn hmac_sha256_hex(secret: &str, data: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature (either case) over `data`.
pub fn verify_hmac_sha512(secret: &str, data: &str, provided_hex: &str) -> bool {
    let Ok(provided) = hex::decode(provided_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

pub fn verify_hmac_sha256(secret: &str, data: &str, provided_hex: &str) -> bool {
    let Ok(provided) = hex::decode(provided_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_then_verify() {
        let sig = hmac_sha256_hex("secret", "amount=200&orderId=abc");
        assert_eq!(sig.len(), 64);
        assert!(verify_hmac_sha256("secret", "amount=200&orderId=abc", &sig));
        assert!(verify_hmac_sha256("secret", "amount=200&orderId=abc", &sig.to_uppercase()));
        assert!(!verify_hmac_sha256("secret", "amount=201&orderId=abc", &sig));
        assert!(!verify_hmac_sha256("other", "amount=200&orderId=abc", &sig));
    }

    #[test]
    fn test_sha512_rejects_garbage() {
        let sig = hmac_sha512_hex("secret", "vnp_Amount=20000");
        assert_eq!(sig.len(), 128);
        assert!(verify_hmac_sha512("secret", "vnp_Amount=20000", &sig));
        assert!(!verify_hmac_sha512("secret", "vnp_Amount=20000", "not-hex"));
        assert!(!verify_hmac_sha512("secret", "vnp_Amount=20000", ""));
    }
}
