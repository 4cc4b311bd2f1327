//! Provider capability used by the scanner, and its EC2-backed implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::config::{Credentials, Region};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::Client;
use tokio::sync::Mutex;
use tracing::debug;

use crate::credentials::{AccessKeyPair, CredentialSource};
use crate::error::{CloudError, CredentialError};

/// A key/value label attached to a provider resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VpcInfo {
    pub vpc_id: String,
    pub cidr_block: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubnetInfo {
    pub subnet_id: String,
    pub cidr_block: String,
    pub tags: Vec<Tag>,
}

/// The three provider calls a scan needs.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Regions enabled for the account, asked of `base_region`'s endpoint.
    async fn list_regions(&self, base_region: &str) -> Result<Vec<String>, CloudError>;

    /// Every VPC in `region`, in provider order.
    async fn list_vpcs(&self, region: &str) -> Result<Vec<VpcInfo>, CloudError>;

    /// Subnets of `vpc_id` in `region`, in provider order.
    async fn list_subnets(&self, region: &str, vpc_id: &str)
        -> Result<Vec<SubnetInfo>, CloudError>;
}

/// Builds a fresh [`CloudApi`] for each scan.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn CloudApi>, CredentialError>;
}

/// Reads credentials on every `connect`, so a rotated settings file is picked up.
pub struct Ec2Connector {
    credentials: Arc<dyn CredentialSource>,
}

impl Ec2Connector {
    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self { credentials }
    }
}

impl Connector for Ec2Connector {
    fn connect(&self) -> Result<Arc<dyn CloudApi>, CredentialError> {
        let keys = self.credentials.get()?;
        Ok(Arc::new(Ec2Api::new(keys)))
    }
}

/// [`CloudApi`] over `aws-sdk-ec2`, one client per region.
pub struct Ec2Api {
    keys: AccessKeyPair,
    clients: Mutex<HashMap<String, Client>>,
}

impl Ec2Api {
    pub fn new(keys: AccessKeyPair) -> Self {
        Self {
            keys,
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self, region: &str) -> Client {
        if let Some(client) = self.clients.lock().await.get(region) {
            return client.clone();
        }

        // Config loading is slow; build outside the lock so regions load in parallel.
        let credentials = Credentials::new(
            self.keys.access_key_id.clone(),
            self.keys.secret_access_key.clone(),
            None,
            None,
            "vpc-inventory",
        );
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .load()
            .await;
        let client = Client::new(&config);

        self.clients
            .lock()
            .await
            .entry(region.to_string())
            .or_insert(client)
            .clone()
    }

    #[cfg(test)]
    async fn cached_regions(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[async_trait]
impl CloudApi for Ec2Api {
    async fn list_regions(&self, base_region: &str) -> Result<Vec<String>, CloudError> {
        let client = self.client(base_region).await;
        let resp = client.describe_regions().send().await.map_err(classify)?;
        Ok(resp
            .regions()
            .iter()
            .filter_map(|r| r.region_name().map(str::to_string))
            .collect())
    }

    async fn list_vpcs(&self, region: &str) -> Result<Vec<VpcInfo>, CloudError> {
        let client = self.client(region).await;
        let mut vpcs = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let resp = client
                .describe_vpcs()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(classify)?;

            vpcs.extend(resp.vpcs().iter().map(|vpc| VpcInfo {
                vpc_id: vpc.vpc_id().unwrap_or_default().to_string(),
                cidr_block: vpc.cidr_block().unwrap_or_default().to_string(),
                tags: convert_tags(vpc.tags()),
            }));

            match resp.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(region, count = vpcs.len(), "described VPCs");
        Ok(vpcs)
    }

    async fn list_subnets(
        &self,
        region: &str,
        vpc_id: &str,
    ) -> Result<Vec<SubnetInfo>, CloudError> {
        let client = self.client(region).await;
        let mut subnets = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let resp = client
                .describe_subnets()
                .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(classify)?;

            subnets.extend(resp.subnets().iter().map(|subnet| SubnetInfo {
                subnet_id: subnet.subnet_id().unwrap_or_default().to_string(),
                cidr_block: subnet.cidr_block().unwrap_or_default().to_string(),
                tags: convert_tags(subnet.tags()),
            }));

            match resp.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(subnets)
    }
}

fn convert_tags(tags: &[aws_sdk_ec2::types::Tag]) -> Vec<Tag> {
    tags.iter()
        .filter_map(|t| match (t.key(), t.value()) {
            (Some(key), value) => Some(Tag::new(key, value.unwrap_or_default())),
            _ => None,
        })
        .collect()
}

fn classify<E, R>(err: SdkError<E, R>) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.code() {
        Some(code) => classify_code(code, err.message().unwrap_or_default()),
        None => CloudError::Transport(DisplayErrorContext(&err).to_string()),
    }
}

/// Map a provider error code onto [`CloudError`].
pub fn classify_code(code: &str, message: &str) -> CloudError {
    let unauthorized = matches!(code, "UnauthorizedOperation" | "AuthFailure")
        || code.starts_with("AccessDenied");
    if unauthorized {
        CloudError::Unauthorized(format!("{code}: {message}"))
    } else {
        CloudError::Api {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}
