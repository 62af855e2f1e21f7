//! AWS Signature Version 4 request signing.
//!
//! Only what a JSON `POST` to a regional service needs is implemented: the
//! caller passes the headers to sign, the query string must already be in
//! canonical form.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::Credentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// A request to be signed.
pub struct SignableRequest<'a> {
    pub method: &'a str,
    /// Path as sent on the wire, with each segment percent-encoded once.
    pub path: &'a str,
    pub query: &'a str,
    /// Headers to sign. `host` must be among them.
    pub headers: Vec<(String, String)>,
    pub body: &'a [u8],
}

/// Headers to attach to the outgoing request.
#[derive(Debug, PartialEq, Eq)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
    pub security_token: Option<String>,
}

pub fn sign(
    req: &SignableRequest<'_>,
    credentials: &Credentials,
    region: &str,
    service: &str,
    time: DateTime<Utc>,
) -> SignedHeaders {
    let amz_date = time.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = time.format("%Y%m%d").to_string();

    let mut headers = req.headers.clone();
    headers.push(("x-amz-date".to_owned(), amz_date.clone()));
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token".to_owned(), token.clone()));
    }

    let (canonical, signed_headers) = canonical_request(req, &headers);
    let scope = format!("{date_stamp}/{region}/{service}/aws4_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical.as_bytes()))
    );

    let key = signing_key(
        &credentials.secret_access_key,
        &date_stamp,
        region,
        service,
    );
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));

    SignedHeaders {
        amz_date,
        authorization: format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id
        ),
        security_token: credentials.session_token.clone(),
    }
}

/// Builds the canonical request, returning it with the signed header list.
fn canonical_request(
    req: &SignableRequest<'_>,
    headers: &[(String, String)],
) -> (String, String) {
    let mut headers: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            (name.to_ascii_lowercase(), value)
        })
        .collect();
    headers.sort();

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    // Services other than S3 expect every segment encoded a second time.
    let canonical_uri = req
        .path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    let canonical = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        req.method,
        canonical_uri,
        req.query,
        canonical_headers,
        signed_headers,
        hex::encode(Sha256::digest(req.body)),
    );
    (canonical, signed_headers)
}

fn signing_key(
    secret: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("hmac takes keys of any size"));
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    // The worked example from the AWS SigV4 documentation (IAM ListUsers).
    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn example_request() -> SignableRequest<'static> {
        SignableRequest {
            method: "GET",
            path: "/",
            query: "Action=ListUsers&Version=2010-05-08",
            headers: vec![
                (
                    "Content-Type".to_owned(),
                    "application/x-www-form-urlencoded; charset=utf-8"
                        .to_owned(),
                ),
                ("Host".to_owned(), "iam.amazonaws.com".to_owned()),
            ],
            body: b"",
        }
    }

    #[test]
    fn test_signing_key() {
        let key = signing_key(SECRET, "20150830", "us-east-1", "iam");
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn test_documented_example() {
        let credentials = Credentials::new("AKIDEXAMPLE", SECRET);
        let time = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        let signed =
            sign(&example_request(), &credentials, "us-east-1", "iam", time);
        assert_eq!(signed.amz_date, "20150830T123600Z");
        assert_eq!(
            signed.authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, \
             Signature=5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
        );
        assert_eq!(signed.security_token, None);
    }

    #[test]
    fn test_canonical_uri_double_encoding() {
        let req = SignableRequest {
            method: "POST",
            path: "/model/anthropic.claude-v2%3A1/invoke-with-response-stream",
            query: "",
            headers: vec![("host".to_owned(), "example.com".to_owned())],
            body: b"{}",
        };
        let (canonical, signed_headers) = canonical_request(&req, &req.headers);
        assert!(canonical.starts_with(
            "POST\n/model/anthropic.claude-v2%253A1/invoke-with-response-stream\n\n"
        ));
        assert_eq!(signed_headers, "host");
    }

    #[test]
    fn test_session_token_is_signed() {
        let credentials =
            Credentials::new("AKIDEXAMPLE", SECRET).with_session_token("tok");
        let time = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        let signed =
            sign(&example_request(), &credentials, "us-east-1", "iam", time);
        assert!(signed.authorization.contains(
            "SignedHeaders=content-type;host;x-amz-date;x-amz-security-token,"
        ));
        assert_eq!(signed.security_token.as_deref(), Some("tok"));
    }
}
