//! Two-legged OAuth 1.0a request signing (HMAC-SHA1)

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const NONCE_LEN: usize = 32;

/// Signs requests with the consumer key/secret; no token is involved
#[derive(Clone)]
pub struct OAuthSigner {
    consumer_key: String,
    consumer_secret: String,
}

impl OAuthSigner {
    pub fn new(consumer_key: &str, consumer_secret: &str) -> Self {
        Self {
            consumer_key: consumer_key.to_string(),
            consumer_secret: consumer_secret.to_string(),
        }
    }

    /// `Authorization` header value for a request with a fresh nonce and timestamp
    pub fn authorization(&self, method: &str, base_url: &str, query: &[(String, String)]) -> String {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.authorization_with(method, base_url, query, &nonce, &timestamp)
    }

    pub(crate) fn authorization_with(
        &self,
        method: &str,
        base_url: &str,
        query: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> String {
        let mut oauth_params = self.oauth_params(nonce, timestamp);
        let signature = self.signature(method, base_url, query, &oauth_params);
        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params.sort();

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        format!("OAuth {}", fields.join(", "))
    }

    fn oauth_params(&self, nonce: &str, timestamp: &str) -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ]
    }

    fn signature(
        &self,
        method: &str,
        base_url: &str,
        query: &[(String, String)],
        oauth_params: &[(String, String)],
    ) -> String {
        let base = signature_base_string(method, base_url, query.iter().chain(oauth_params));
        let key = format!("{}&", encode(&self.consumer_secret));

        let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
        mac.update(base.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }
}

/// `METHOD&enc(url)&enc(sorted, encoded parameters)`
pub(crate) fn signature_base_string<'a>(
    method: &str,
    base_url: &str,
    params: impl Iterator<Item = &'a (String, String)>,
) -> String {
    let mut pairs: Vec<(String, String)> = params.map(|(k, v)| (encode(k), encode(v))).collect();
    pairs.sort();
    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(base_url),
        encode(&normalized)
    )
}

/// RFC 3986 percent-encoding (unreserved characters kept)
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}
