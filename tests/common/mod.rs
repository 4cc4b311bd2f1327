#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vpc_inventory::cloud::{CloudApi, Connector, SubnetInfo, Tag, VpcInfo};
use vpc_inventory::error::{CloudError, CredentialError};

/// In-memory provider with per-region delays and failures.
#[derive(Default, Clone)]
pub struct FakeCloud {
    pub regions: Option<Result<Vec<String>, CloudError>>,
    pub vpcs: HashMap<String, Result<Vec<VpcInfo>, CloudError>>,
    pub subnets: HashMap<(String, String), Vec<SubnetInfo>>,
    pub delays: HashMap<String, Duration>,
    pub subnet_failures: HashMap<(String, String), CloudError>,
    pub discovery_delay: Option<Duration>,
}

impl FakeCloud {
    pub fn with_regions(regions: &[&str]) -> Self {
        Self {
            regions: Some(Ok(regions.iter().map(|r| r.to_string()).collect())),
            ..Default::default()
        }
    }

    pub fn vpc(mut self, region: &str, id: &str, name: Option<&str>, cidr: &str) -> Self {
        let entry = self
            .vpcs
            .entry(region.to_string())
            .or_insert_with(|| Ok(Vec::new()));
        if let Ok(list) = entry {
            list.push(VpcInfo {
                vpc_id: id.to_string(),
                cidr_block: cidr.to_string(),
                tags: name_tags(name),
            });
        }
        self
    }

    pub fn subnet(mut self, region: &str, vpc: &str, id: &str, name: Option<&str>, cidr: &str) -> Self {
        self.subnets
            .entry((region.to_string(), vpc.to_string()))
            .or_default()
            .push(SubnetInfo {
                subnet_id: id.to_string(),
                cidr_block: cidr.to_string(),
                tags: name_tags(name),
            });
        self
    }

    pub fn failing_region(mut self, region: &str, err: CloudError) -> Self {
        self.vpcs.insert(region.to_string(), Err(err));
        self
    }

    pub fn failing_subnets(mut self, region: &str, vpc: &str, err: CloudError) -> Self {
        self.subnet_failures
            .insert((region.to_string(), vpc.to_string()), err);
        self
    }

    pub fn slow_discovery(mut self, d: Duration) -> Self {
        self.discovery_delay = Some(d);
        self
    }

    pub fn delay(mut self, region: &str, d: Duration) -> Self {
        self.delays.insert(region.to_string(), d);
        self
    }
}

fn name_tags(name: Option<&str>) -> Vec<Tag> {
    let mut tags = vec![Tag::new("env", "test")];
    if let Some(n) = name {
        tags.push(Tag::new("Name", n));
    }
    tags
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn list_regions(&self, _base_region: &str) -> Result<Vec<String>, CloudError> {
        if let Some(d) = self.discovery_delay {
            tokio::time::sleep(d).await;
        }
        self.regions.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_vpcs(&self, region: &str) -> Result<Vec<VpcInfo>, CloudError> {
        if let Some(d) = self.delays.get(region) {
            tokio::time::sleep(*d).await;
        }
        self.vpcs.get(region).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_subnets(&self, region: &str, vpc_id: &str) -> Result<Vec<SubnetInfo>, CloudError> {
        let key = (region.to_string(), vpc_id.to_string());
        if let Some(err) = self.subnet_failures.get(&key) {
            return Err(err.clone());
        }
        Ok(self
            .subnets
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Hands out the same fake on every connect, or a credential failure.
pub struct FakeConnector(pub Option<FakeCloud>);

impl Connector for FakeConnector {
    fn connect(&self) -> Result<Arc<dyn CloudApi>, CredentialError> {
        match &self.0 {
            Some(cloud) => Ok(Arc::new(cloud.clone())),
            None => Err(CredentialError::Invalid("no credentials configured".into())),
        }
    }
}

/// Region "a": one VPC with two subnets. Region "b": one VPC without subnets.
pub fn two_region_fixture() -> FakeCloud {
    FakeCloud::with_regions(&["a", "b"])
        .vpc("a", "vpc-a1", Some("main"), "10.0.0.0/16")
        .subnet("a", "vpc-a1", "subnet-a1", Some("public"), "10.0.1.0/24")
        .subnet("a", "vpc-a1", "subnet-a2", None, "10.0.2.0/24")
        .vpc("b", "vpc-b1", None, "10.1.0.0/16")
}
