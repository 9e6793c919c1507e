// Copyright (c) 2025 - Cowboy AI, Inc.

//! BlueCat Address Manager client
//!
//! Speaks the legacy REST API (`/Services/REST/v1/<method>`), whose methods
//! mirror the SOAP API one to one:
//!
//! ```text
//! login             GET   ?username&password          -> "Session Token-> BAMAuthToken: ... <- ..."
//! getEntities       GET   ?parentId&type&start&count  -> [Entity]
//! getEntityByName   GET   ?parentId&name&type         -> Entity (id 0 when absent)
//! getIPRangedByIP   GET   ?containerId&type&address   -> Entity (id 0 when absent)
//! addDeviceType     POST  ?name&properties            -> id
//! addDeviceSubtype  POST  ?parentId&name&properties   -> id
//! addIP4BlockByCIDR POST  ?parentId&CIDR&properties   -> id
//! addIP4Network     POST  ?blockId&CIDR&properties    -> id
//! addDevice         POST  ?configurationId&name&deviceTypeId&deviceSubtypeId&ip4Addresses&ip6Addresses&properties -> id
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use bam_device_import::config::BamConfig;
//! use bam_device_import::directory::{BamClient, DirectoryService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BamConfig {
//!         base_url: "http://10.255.255.50".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let mut client = BamClient::new(config)?;
//!     client.login("api-user", "api-password").await?;
//!     for configuration in client.list_configurations().await? {
//!         println!("{:?}", configuration.name);
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{DirectoryError, DirectoryResult, DirectoryService, Entity, EntityKind};
use crate::config::BamConfig;
use crate::domain::EntityId;

const API_PATH: &str = "Services/REST/v1";
const TOKEN_MARKER: &str = "BAMAuthToken:";

/// Page size used when listing configurations
const CONFIGURATION_PAGE: u32 = 1000;

/// Address Manager REST client implementing [`DirectoryService`]
pub struct BamClient {
    config: BamConfig,
    client: Client,
    token: Option<HeaderValue>,
}

impl BamClient {
    /// Build the HTTP client. No request is made until [`login`](DirectoryService::login).
    pub fn new(config: BamConfig) -> DirectoryResult<Self> {
        info!("Using address manager at {}", config.base_url);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DirectoryError::Unavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            client,
            token: None,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            API_PATH,
            method
        )
    }

    /// Issue one API call
    ///
    /// Transport failures are retried `config.retries` times. API faults are
    /// returned at once; a fault that reports an existing object becomes
    /// [`DirectoryError::AlreadyExists`] when `creating` names the entity.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        api_method: &str,
        query: &[(&str, String)],
        creating: Option<(EntityKind, &str)>,
    ) -> DirectoryResult<T> {
        let url = self.endpoint(api_method);
        let mut attempt = 0;

        let response = loop {
            let mut request = self.client.request(method.clone(), &url).query(query);
            if let Some(token) = &self.token {
                request = request.header(AUTHORIZATION, token.clone());
            }

            match request.send().await {
                Ok(response) => break response,
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.config.retries => {
                    attempt += 1;
                    warn!(
                        "{} failed ({}), retrying ({}/{})",
                        api_method, e, attempt, self.config.retries
                    );
                }
                Err(e) => {
                    return Err(DirectoryError::Unavailable(format!(
                        "{} request failed: {}",
                        api_method, e
                    )))
                }
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("{} returned {}", api_method, status);
            return response.json::<T>().await.map_err(|e| {
                DirectoryError::Deserialization(format!("{}: {}", api_method, e))
            });
        }

        match response.text().await {
            Ok(body) => Err(classify_fault(api_method, status, &body, creating)),
            Err(e) => Err(DirectoryError::Api(format!(
                "{} returned {} (failed to read body: {})",
                api_method, status, e
            ))),
        }
    }

    async fn create(
        &self,
        api_method: &str,
        query: &[(&str, String)],
        kind: EntityKind,
        name: &str,
    ) -> DirectoryResult<Entity> {
        let id: EntityId = self
            .call(Method::POST, api_method, query, Some((kind, name)))
            .await?;
        Ok(Entity::new(id, name, kind))
    }

    fn require_session(&self) -> DirectoryResult<()> {
        if self.token.is_some() {
            Ok(())
        } else {
            Err(DirectoryError::NotAuthenticated)
        }
    }
}

/// Map a non-success response to a directory error
fn classify_fault(
    api_method: &str,
    status: StatusCode,
    body: &str,
    creating: Option<(EntityKind, &str)>,
) -> DirectoryError {
    if status == StatusCode::UNAUTHORIZED {
        return DirectoryError::Authentication(body.trim().to_string());
    }

    if let Some((kind, name)) = creating {
        if is_duplicate_fault(body) {
            return DirectoryError::AlreadyExists {
                kind,
                name: name.to_string(),
            };
        }
    }

    DirectoryError::Api(format!("{} returned {}: {}", api_method, status, body.trim()))
}

fn is_duplicate_fault(body: &str) -> bool {
    let body = body.to_ascii_lowercase();
    body.contains("already exists") || body.contains("duplicate")
}

/// Pull the `BAMAuthToken: <token>` part out of the login response
fn parse_token(login_response: &str) -> Option<String> {
    let start = login_response.find(TOKEN_MARKER)?;
    let rest = &login_response[start + TOKEN_MARKER.len()..];
    let token = rest.split("<-").next()?.trim();

    if token.is_empty() {
        None
    } else {
        Some(format!("{} {}", TOKEN_MARKER, token))
    }
}

fn found(entity: Entity) -> Option<Entity> {
    entity.exists().then_some(entity)
}

#[async_trait]
impl DirectoryService for BamClient {
    async fn login(&mut self, username: &str, password: &str) -> DirectoryResult<()> {
        self.token = None;

        let response: String = self
            .call(
                Method::GET,
                "login",
                &[("username", username.to_string()), ("password", password.to_string())],
                None,
            )
            .await?;

        let token = parse_token(&response).ok_or_else(|| {
            DirectoryError::Authentication(format!("No session token in login response: {}", response))
        })?;
        let header = HeaderValue::from_str(&token)
            .map_err(|e| DirectoryError::Authentication(format!("Invalid session token: {}", e)))?;

        self.token = Some(header);
        info!("Logged in to address manager as {}", username);
        Ok(())
    }

    async fn list_configurations(&self) -> DirectoryResult<Vec<Entity>> {
        self.require_session()?;
        self.call(
            Method::GET,
            "getEntities",
            &[
                ("parentId", "0".to_string()),
                ("type", EntityKind::Configuration.as_str().to_string()),
                ("start", "0".to_string()),
                ("count", CONFIGURATION_PAGE.to_string()),
            ],
            None,
        )
        .await
    }

    async fn get_entity_by_name(
        &self,
        parent_id: EntityId,
        name: &str,
        kind: EntityKind,
    ) -> DirectoryResult<Option<Entity>> {
        self.require_session()?;
        let entity: Entity = self
            .call(
                Method::GET,
                "getEntityByName",
                &[
                    ("parentId", parent_id.to_string()),
                    ("name", name.to_string()),
                    ("type", kind.as_str().to_string()),
                ],
                None,
            )
            .await?;
        Ok(found(entity))
    }

    async fn add_device_type(&self, name: &str) -> DirectoryResult<Entity> {
        self.require_session()?;
        self.create(
            "addDeviceType",
            &[("name", name.to_string()), ("properties", String::new())],
            EntityKind::DeviceType,
            name,
        )
        .await
    }

    async fn add_device_subtype(&self, parent_id: EntityId, name: &str) -> DirectoryResult<Entity> {
        self.require_session()?;
        self.create(
            "addDeviceSubtype",
            &[
                ("parentId", parent_id.to_string()),
                ("name", name.to_string()),
                ("properties", String::new()),
            ],
            EntityKind::DeviceSubtype,
            name,
        )
        .await
    }

    async fn get_ip_ranged_by_ip(
        &self,
        configuration_id: EntityId,
        kind: EntityKind,
        ip: Ipv4Addr,
    ) -> DirectoryResult<Option<Entity>> {
        self.require_session()?;
        let entity: Entity = self
            .call(
                Method::GET,
                "getIPRangedByIP",
                &[
                    ("containerId", configuration_id.to_string()),
                    ("type", kind.as_str().to_string()),
                    ("address", ip.to_string()),
                ],
                None,
            )
            .await?;
        Ok(found(entity))
    }

    async fn add_ip4_block_by_cidr(
        &self,
        configuration_id: EntityId,
        cidr: &str,
    ) -> DirectoryResult<Entity> {
        self.require_session()?;
        self.create(
            "addIP4BlockByCIDR",
            &[
                ("parentId", configuration_id.to_string()),
                ("CIDR", cidr.to_string()),
                ("properties", String::new()),
            ],
            EntityKind::IP4Block,
            cidr,
        )
        .await
    }

    async fn add_ip4_network(&self, block_id: EntityId, cidr: &str) -> DirectoryResult<Entity> {
        self.require_session()?;
        self.create(
            "addIP4Network",
            &[
                ("blockId", block_id.to_string()),
                ("CIDR", cidr.to_string()),
                ("properties", String::new()),
            ],
            EntityKind::IP4Network,
            cidr,
        )
        .await
    }

    async fn add_device(
        &self,
        configuration_id: EntityId,
        name: &str,
        type_id: EntityId,
        subtype_id: EntityId,
        addresses: &str,
    ) -> DirectoryResult<Entity> {
        self.require_session()?;
        self.create(
            "addDevice",
            &[
                ("configurationId", configuration_id.to_string()),
                ("name", name.to_string()),
                ("deviceTypeId", type_id.to_string()),
                ("deviceSubtypeId", subtype_id.to_string()),
                ("ip4Addresses", addresses.to_string()),
                ("ip6Addresses", String::new()),
                ("properties", String::new()),
            ],
            EntityKind::Device,
            name,
        )
        .await
    }
}
