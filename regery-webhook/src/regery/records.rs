//! Regery record management
//!
//! Challenge records are created with `POST {api}/domains/{zone}/records`
//! and removed with `DELETE` on the same URL. Both take a `records` array
//! in the body.

use super::credentials::Credentials;
use super::error::SolverError;
use crate::defaults::CHALLENGE_RECORD_TTL;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;

/// Strip a single trailing dot from a DNS name.
pub fn normalize_name(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Record name relative to the zone.
///
/// `_acme-challenge.example.com` in zone `example.com` yields
/// `_acme-challenge`, the zone apex yields an empty label. An FQDN outside
/// the zone is returned whole.
pub fn record_label(fqdn: &str, zone: &str) -> String {
    let fqdn = normalize_name(fqdn);
    let zone = normalize_name(zone);

    match fqdn.strip_suffix(zone) {
        Some(label) => normalize_name(label).to_string(),
        None => fqdn.to_string(),
    }
}

/// Whether `record_label` will fall back to the whole FQDN.
pub fn is_outside_zone(fqdn: &str, zone: &str) -> bool {
    !normalize_name(fqdn).ends_with(normalize_name(zone))
}

pub fn records_url(api_url: &str, zone: &str) -> String {
    format!("{}/domains/{}/records", api_url, normalize_name(zone))
}

/// Body of a records create or delete call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordsPayload<'a> {
    pub records: Vec<TxtRecord<'a>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxtRecord<'a> {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub name: &'a str,
    pub value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<&'static str>,
}

impl<'a> RecordsPayload<'a> {
    pub fn create(name: &'a str, value: &'a str) -> Self {
        Self::single(TxtRecord {
            record_type: "TXT",
            name,
            value,
            ttl: Some(CHALLENGE_RECORD_TTL),
        })
    }

    pub fn delete(name: &'a str, value: &'a str) -> Self {
        Self::single(TxtRecord {
            record_type: "TXT",
            name,
            value,
            ttl: None,
        })
    }

    fn single(record: TxtRecord<'a>) -> Self {
        Self {
            records: vec![record],
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Thin HTTP client for the records endpoint
#[derive(Debug, Clone, Default)]
pub struct RecordsClient {
    client: Client,
}

impl RecordsClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send one records request. Only `200 OK` counts as success; the
    /// response body is never read.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        payload: &RecordsPayload<'_>,
        credentials: &Credentials,
    ) -> Result<(), SolverError> {
        let body = payload.to_json().map_err(SolverError::PayloadEncode)?;

        let response = self
            .client
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, credentials.authorization())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        Err(SolverError::ApiRequest {
            status,
            url: url.to_string(),
            method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_strips_zone() {
        assert_eq!(
            record_label("_acme-challenge.example.com", "example.com"),
            "_acme-challenge"
        );
        assert_eq!(record_label("a.b.example.com", "example.com"), "a.b");
    }

    #[test]
    fn test_label_for_zone_apex_is_empty() {
        assert_eq!(record_label("example.com", "example.com"), "");
        assert_eq!(record_label("example.com.", "example.com"), "");
    }

    #[test]
    fn test_label_ignores_trailing_dots() {
        let expected = record_label("a.example.com", "example.com");
        assert_eq!(record_label("a.example.com.", "example.com."), expected);
        assert_eq!(record_label("a.example.com.", "example.com"), expected);
        assert_eq!(record_label("a.example.com", "example.com."), expected);
        assert_eq!(expected, "a");
    }

    #[test]
    fn test_label_outside_zone_is_full_fqdn() {
        assert_eq!(
            record_label("_acme-challenge.example.org.", "example.com."),
            "_acme-challenge.example.org"
        );
        assert!(is_outside_zone("_acme-challenge.example.org", "example.com"));
        assert!(!is_outside_zone("_acme-challenge.example.com.", "example.com"));
    }

    #[test]
    fn test_label_uses_plain_suffix_match() {
        // Suffix match is textual, not label-aware.
        assert_eq!(record_label("myexample.com", "example.com"), "my");
    }

    #[test]
    fn test_label_matches_constructed_fqdns() {
        for zone in ["example.com", "sub.example.co.uk", "a"] {
            for label in ["_acme-challenge", "x", "deep.nested._acme-challenge"] {
                let fqdn = format!("{}.{}", label, zone);
                assert_eq!(record_label(&fqdn, zone), label, "fqdn {}", fqdn);
                assert_eq!(record_label(&format!("{}.", fqdn), &format!("{}.", zone)), label);
            }
        }
    }

    #[test]
    fn test_records_url() {
        assert_eq!(
            records_url("https://api.regery.com/v1", "example.com."),
            "https://api.regery.com/v1/domains/example.com/records"
        );
    }

    #[test]
    fn test_create_payload_includes_ttl() {
        let json =
            serde_json::to_value(RecordsPayload::create("_acme-challenge", "abc123")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "records": [{
                    "type": "TXT",
                    "name": "_acme-challenge",
                    "value": "abc123",
                    "ttl": "60"
                }]
            })
        );
    }

    #[test]
    fn test_delete_payload_omits_ttl() {
        let json =
            serde_json::to_value(RecordsPayload::delete("_acme-challenge", "abc123")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "records": [{
                    "type": "TXT",
                    "name": "_acme-challenge",
                    "value": "abc123"
                }]
            })
        );
    }
}
