//! HMAC-SHA256 signing and verification of metering samples.
//!
//! The digest is taken over every `(key, value)` pair of the sample, sorted by
//! key and with `message_signature` itself left out. Nested objects are
//! flattened into `parent:child` keys. Strings contribute their raw text,
//! every other value its JSON rendering.

use hex;
use hmac::{Hmac, Mac};
use sample::{Sample, SIGNATURE_FIELD};
use serde_json::{Map, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keypairs<'a>(
    prefix: Option<&str>,
    map: &'a Map<String, Value>,
    out: &mut Vec<(String, &'a Value)>,
) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (k, v) in entries {
        let name = match prefix {
            Some(p) => format!("{}:{}", p, k),
            None => k.clone(),
        };
        match *v {
            Value::Object(ref inner) => keypairs(Some(name.as_str()), inner, out),
            _ => out.push((name, v)),
        }
    }
}

fn mac(sample: &Sample, secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!(),
    };
    let mut pairs = Vec::with_capacity(sample.fields().len());
    keypairs(None, sample.fields(), &mut pairs);
    for (name, value) in pairs {
        if name == SIGNATURE_FIELD {
            continue;
        }
        mac.update(name.as_bytes());
        match *value {
            Value::String(ref s) => mac.update(s.as_bytes()),
            ref other => mac.update(other.to_string().as_bytes()),
        }
    }
    mac
}

/// Compute the lowercase hex signature of `sample` under `secret`.
pub fn compute_signature(sample: &Sample, secret: &str) -> String {
    hex::encode(mac(sample, secret).finalize().into_bytes())
}

/// Compute and attach a signature to `sample`.
pub fn sign(mut sample: Sample, secret: &str) -> Sample {
    let sig = compute_signature(&sample, secret);
    sample.insert(SIGNATURE_FIELD, sig);
    sample
}

/// Check the signature carried by `sample` against `secret`.
///
/// An empty secret disables verification. A missing or malformed signature
/// never verifies, and neither does one written in uppercase hex. The comparison is constant time.
pub fn verify_signature(sample: &Sample, secret: &str) -> bool {
    if secret.is_empty() {
        return true;
    }
    let claimed = match sample.signature() {
        // digests are compared as lowercase hex text
        Some(sig) if !sig.bytes().any(|b| b.is_ascii_uppercase()) => match hex::decode(sig) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        },
        _ => return false,
    };
    mac(sample, secret).verify_slice(&claimed).is_ok()
}
