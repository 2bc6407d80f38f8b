//! Minimal AWS Signature Version 4 signer for the S3 adapter.
//!
//! A narrowed port of `sorng-aws`'s `signing.rs`: only what the S3 adapter
//! needs (sign a single GET/PUT request against a virtual-hosted-style
//! bucket URL), operating on binary bodies instead of UTF-8 strings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Debug, Clone)]
pub struct SigV4Signer {
    access_key_id: String,
    secret_access_key: String,
    region: String,
    service: String,
}

pub struct SignedRequest {
    pub headers: BTreeMap<String, String>,
}

impl SigV4Signer {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            service: "s3".to_string(),
        }
    }

    /// Signs a request, returning the full header set (including
    /// `Authorization`) to attach to it. `headers` must already contain
    /// `host`; this adds `x-amz-date` and `x-amz-content-sha256`.
    pub fn sign(
        &self,
        method: &str,
        canonical_uri: &str,
        headers: &BTreeMap<String, String>,
        body: &[u8],
        timestamp: DateTime<Utc>,
    ) -> SignedRequest {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

        let mut signed_headers = headers.clone();
        signed_headers.insert("x-amz-date".to_string(), amz_date.clone());
        let payload_hash = sha256_hex_bytes(body);
        signed_headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());

        let canonical_request = self.canonical_request(method, canonical_uri, &signed_headers, &payload_hash);

        let credential_scope = format!("{date_stamp}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
            sha256_hex(&canonical_request)
        );

        let signing_key = self.derive_signing_key(&date_stamp);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let signed_header_names = self.signed_header_names(&signed_headers);
        let authorization = format!(
            "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_header_names}, Signature={signature}",
            self.access_key_id
        );
        signed_headers.insert("authorization".to_string(), authorization);

        SignedRequest {
            headers: signed_headers,
        }
    }

    fn canonical_request(
        &self,
        method: &str,
        canonical_uri: &str,
        headers: &BTreeMap<String, String>,
        payload_hash: &str,
    ) -> String {
        format!(
            "{method}\n{canonical_uri}\n\n{}\n{}\n{payload_hash}",
            self.canonical_headers(headers),
            self.signed_header_names(headers)
        )
    }

    fn canonical_headers(&self, headers: &BTreeMap<String, String>) -> String {
        let mut sorted: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted.iter().map(|(k, v)| format!("{k}:{v}\n")).collect()
    }

    fn signed_header_names(&self, headers: &BTreeMap<String, String>) -> String {
        let mut names: Vec<String> = headers.keys().map(|k| k.to_lowercase()).collect();
        names.sort();
        names.join(";")
    }

    fn derive_signing_key(&self, date_stamp: &str) -> Vec<u8> {
        let k_secret = format!("AWS4{}", self.secret_access_key);
        let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, self.service.as_bytes());
        hmac_sha256(&k_service, b"aws4_request")
    }
}

fn sha256_hex(data: &str) -> String {
    sha256_hex_bytes(data.as_bytes())
}

fn sha256_hex_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Percent-encodes a path segment per the SigV4 spec (RFC 3986 unreserved
/// characters preserved, everything else encoded).
pub fn uri_encode(input: &str) -> String {
    const AWS_ENCODE_SET: &AsciiSet = &CONTROLS
        .add(b' ')
        .add(b'"')
        .add(b'#')
        .add(b'%')
        .add(b'&')
        .add(b'\'')
        .add(b'+')
        .add(b',')
        .add(b':')
        .add(b';')
        .add(b'<')
        .add(b'=')
        .add(b'>')
        .add(b'?')
        .add(b'@')
        .add(b'[')
        .add(b'\\')
        .add(b']')
        .add(b'^')
        .add(b'`')
        .add(b'{')
        .add(b'|')
        .add(b'}');
    utf8_percent_encode(input, AWS_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_produces_an_authorization_header() {
        let signer = SigV4Signer::new("AKIDEXAMPLE", "secret", "us-east-1");
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "corncob-team.s3.us-east-1.amazonaws.com".to_string());
        let timestamp = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let signed = signer.sign("PUT", "/L-abc.yaml", &headers, b"hello", timestamp);
        let auth = signed.headers.get("authorization").unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240101/us-east-1/s3/aws4_request"));
    }

    #[test]
    fn uri_encode_preserves_unreserved_characters() {
        assert_eq!(uri_encode("B-abc123.bundle"), "B-abc123.bundle");
        assert_eq!(uri_encode("a b"), "a%20b");
    }
}
