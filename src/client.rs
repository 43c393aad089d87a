// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the Technitium DNS server management API.
//!
//! One client exists per configured server. Each operation performs a single
//! round-trip authenticated by the server's API token as a query parameter.
//! Successful responses are envelopes whose `status` field equals `"ok"`;
//! anything else (non-2xx, malformed JSON, transport error, non-`ok`
//! status) surfaces as an [`ApiError`] for the engine to catch at the unit
//! of work that issued the call.
//!
//! The engine talks to the fleet through the [`DnsApi`] trait so the
//! reconciliation logic can be exercised against an in-process fake.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::Server;
use crate::constants::{API_REQUEST_TIMEOUT_SECS, ZONE_TYPE_PRIMARY};
use crate::errors::ApiError;
use crate::record::DnsRecord;

/// A zone as reported by `zones/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneInfo {
    /// Zone apex name
    pub name: String,

    /// Zone type as reported by the server (e.g. "Primary", "Internal")
    #[serde(rename = "type")]
    pub zone_type: Option<String>,
}

/// A DHCP scope as reported by `dhcp/scopes/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhcpScope {
    /// Scope name
    pub name: String,
    /// Scope network address (e.g. "10.0.0.0")
    pub network_address: String,
    /// Scope subnet mask (e.g. "255.255.255.0")
    pub subnet_mask: String,
}

/// Operations the reconciliation engine consumes from a managed server.
///
/// Implemented by [`TechnitiumClient`] for real servers and by in-process
/// fakes in the engine tests.
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// List every zone hosted on the server.
    async fn get_zones(&self) -> Result<Vec<ZoneInfo>, ApiError>;

    /// List every record in `zone`.
    async fn get_records(&self, zone: &str) -> Result<Vec<DnsRecord>, ApiError>;

    /// Add `record` to `zone`.
    async fn add_record(&self, zone: &str, record: &DnsRecord) -> Result<(), ApiError>;

    /// Replace the record matching `old_rdata` in `zone` with `record`.
    async fn update_record(
        &self,
        zone: &str,
        record: &DnsRecord,
        old_rdata: &BTreeMap<String, String>,
    ) -> Result<(), ApiError>;

    /// Delete `record` from `zone`.
    async fn delete_record(&self, zone: &str, record: &DnsRecord) -> Result<(), ApiError>;

    /// Create `zone` as a primary zone.
    async fn create_zone(&self, zone: &str) -> Result<(), ApiError>;

    /// List the server's DHCP scopes.
    async fn get_dhcp_scopes(&self) -> Result<Vec<DhcpScope>, ApiError>;
}

/// The response envelope every Technitium endpoint returns.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
    response: Option<Value>,
}

/// HTTP client for one Technitium server.
#[derive(Debug)]
pub struct TechnitiumClient {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
}

impl TechnitiumClient {
    /// Build a client for `server`.
    ///
    /// TLS certificate verification follows the server's `verify_ssl` flag,
    /// defaulting to off for compatibility with self-signed deployments.
    ///
    /// # Errors
    ///
    /// Returns an error when the server URL does not parse or the HTTP
    /// client cannot be constructed.
    pub fn new(server: &Server) -> Result<Self, ApiError> {
        let base_url = Url::parse(server.url.trim_end_matches('/')).map_err(|source| {
            ApiError::InvalidUrl {
                url: server.url.clone(),
                source,
            }
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(API_REQUEST_TIMEOUT_SECS))
            .danger_accept_invalid_certs(!server.verify_ssl)
            .build()
            .map_err(|source| ApiError::Http {
                endpoint: server.url.clone(),
                source,
            })?;

        Ok(Self {
            base_url,
            api_key: server.api_key.clone(),
            http,
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Perform a GET round-trip and unwrap the `"ok"` envelope.
    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        let url = self.endpoint_url(endpoint);
        debug!(endpoint, "GET request");
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| ApiError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Self::unwrap_envelope(endpoint, response).await
    }

    /// Perform a form-encoded POST round-trip and unwrap the `"ok"` envelope.
    async fn post(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value, ApiError> {
        let url = self.endpoint_url(endpoint);
        debug!(endpoint, "POST request");
        let mut form: Vec<(String, String)> = params.to_vec();
        form.push(("token".to_string(), self.api_key.clone()));
        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| ApiError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Self::unwrap_envelope(endpoint, response).await
    }

    async fn unwrap_envelope(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<Value, ApiError> {
        let envelope: ApiEnvelope =
            response
                .json()
                .await
                .map_err(|source| ApiError::MalformedResponse {
                    endpoint: endpoint.to_string(),
                    reason: source.to_string(),
                })?;

        if envelope.status != "ok" {
            return Err(ApiError::Api {
                endpoint: endpoint.to_string(),
                message: envelope
                    .error_message
                    .unwrap_or_else(|| format!("status '{}'", envelope.status)),
            });
        }
        Ok(envelope.response.unwrap_or(Value::Null))
    }

    /// Decode a named array out of an envelope's `response` object.
    fn response_array(
        endpoint: &str,
        response: &Value,
        field: &str,
    ) -> Result<Vec<Value>, ApiError> {
        response
            .get(field)
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| ApiError::MalformedResponse {
                endpoint: endpoint.to_string(),
                reason: format!("missing '{field}' array"),
            })
    }
}

#[async_trait]
impl DnsApi for TechnitiumClient {
    async fn get_zones(&self) -> Result<Vec<ZoneInfo>, ApiError> {
        let endpoint = "/api/zones/list";
        let response = self.get(endpoint, &[]).await?;
        let zones = TechnitiumClient::response_array(endpoint, &response, "zones")?
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        Ok(zones)
    }

    async fn get_records(&self, zone: &str) -> Result<Vec<DnsRecord>, ApiError> {
        let endpoint = "/api/zones/records/get";
        let response = self
            .get(endpoint, &[("domain", zone), ("listZone", "true")])
            .await?;
        let mut records = Vec::new();
        for value in TechnitiumClient::response_array(endpoint, &response, "records")? {
            match serde_json::from_value::<DnsRecord>(value) {
                Ok(record) => records.push(record),
                Err(error) => warn!(zone, %error, "skipping undecodable record entry"),
            }
        }
        Ok(records)
    }

    async fn add_record(&self, zone: &str, record: &DnsRecord) -> Result<(), ApiError> {
        let mut params = vec![
            ("domain".to_string(), wire_name(&record.name, zone)),
            ("zone".to_string(), zone.to_string()),
            ("type".to_string(), record.record_type.clone()),
            ("ttl".to_string(), record.ttl.to_string()),
        ];
        params.extend(format_rdata(&record.record_type, &record.rdata, ""));
        self.post("/api/zones/records/add", &params).await?;
        Ok(())
    }

    async fn update_record(
        &self,
        zone: &str,
        record: &DnsRecord,
        old_rdata: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        let mut params = vec![
            ("domain".to_string(), wire_name(&record.name, zone)),
            ("zone".to_string(), zone.to_string()),
            ("type".to_string(), record.record_type.clone()),
        ];
        params.extend(format_rdata(&record.record_type, old_rdata, ""));
        params.extend(format_rdata(&record.record_type, &record.rdata, "new"));
        self.post("/api/zones/records/update", &params).await?;
        Ok(())
    }

    async fn delete_record(&self, zone: &str, record: &DnsRecord) -> Result<(), ApiError> {
        let mut params = vec![
            ("domain".to_string(), wire_name(&record.name, zone)),
            ("zone".to_string(), zone.to_string()),
            ("type".to_string(), record.record_type.clone()),
        ];
        params.extend(format_rdata(&record.record_type, &record.rdata, ""));
        self.post("/api/zones/records/delete", &params).await?;
        Ok(())
    }

    async fn create_zone(&self, zone: &str) -> Result<(), ApiError> {
        let params = vec![
            ("domain".to_string(), zone.to_string()),
            ("type".to_string(), ZONE_TYPE_PRIMARY.to_string()),
        ];
        self.post("/api/zones/create", &params).await?;
        Ok(())
    }

    async fn get_dhcp_scopes(&self) -> Result<Vec<DhcpScope>, ApiError> {
        let endpoint = "/api/dhcp/scopes/list";
        let response = self.get(endpoint, &[]).await?;
        let scopes = TechnitiumClient::response_array(endpoint, &response, "scopes")?
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        Ok(scopes)
    }
}

/// The `domain` parameter for a record operation: the apex marker `@` maps
/// to the zone itself, any other name is sent as stored.
fn wire_name(name: &str, zone: &str) -> String {
    if name == "@" {
        zone.to_string()
    } else {
        name.to_string()
    }
}

/// The wire field names each record type's rdata carries. Types outside the
/// table have their rdata pairs passed through verbatim.
fn rdata_fields(record_type: &str) -> Option<&'static [&'static str]> {
    match record_type {
        "A" | "AAAA" => Some(&["ipAddress"]),
        "CNAME" => Some(&["cname"]),
        "MX" => Some(&["preference", "exchange"]),
        "NS" => Some(&["nameServer"]),
        "TXT" => Some(&["text"]),
        "SOA" => Some(&[
            "primaryNameServer",
            "responsiblePerson",
            "serial",
            "refresh",
            "retry",
            "expire",
            "minimum",
        ]),
        "PTR" => Some(&["ptrName"]),
        _ => None,
    }
}

/// Flatten an rdata map into wire parameters, optionally prefixing each
/// field name (the update endpoint takes the new rdata `new`-prefixed).
fn format_rdata(
    record_type: &str,
    rdata: &BTreeMap<String, String>,
    prefix: &str,
) -> Vec<(String, String)> {
    let prefixed = |field: &str| {
        if prefix.is_empty() {
            field.to_string()
        } else {
            // The upstream capitalizes the first letter after the prefix:
            // ipAddress becomes newIpAddress.
            let mut chars = field.chars();
            match chars.next() {
                Some(first) => format!("{prefix}{}{}", first.to_uppercase(), chars.as_str()),
                None => prefix.to_string(),
            }
        }
    };

    match rdata_fields(record_type) {
        Some(fields) => fields
            .iter()
            .filter_map(|field| rdata.get(*field).map(|value| (prefixed(field), value.clone())))
            .collect(),
        None => rdata
            .iter()
            .map(|(field, value)| (prefixed(field), value.clone()))
            .collect(),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
