//! Vespa deployer
//!
//! Ships application packages to the config server as gzipped tar
//! archives through the prepare-and-activate API, and reads the current
//! schema back for merges.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::Client;
use tracing::info;

use quarry_domain::constants::HEALTH_TIMEOUT;
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{ApplicationPackage, DeployOutcome, VespaDeployer};

/// Deploys take longer than regular queries
const DEPLOY_TIMEOUT_SECS: u64 = 120;

pub struct HttpVespaDeployer {
    /// Config server endpoint (the :19071 surface)
    config_endpoint: String,
    /// Query endpoint, used for cluster info after activation
    search_endpoint: String,
    http_client: Client,
}

impl HttpVespaDeployer {
    pub fn new(config_endpoint: impl Into<String>, search_endpoint: impl Into<String>) -> Self {
        Self {
            config_endpoint: config_endpoint.into(),
            search_endpoint: search_endpoint.into(),
            http_client: Client::builder()
                .timeout(Duration::from_secs(DEPLOY_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    fn application_url(&self, suffix: &str) -> String {
        format!(
            "{}/application/v2/tenant/default/application/default{}",
            self.config_endpoint.trim_end_matches('/'),
            suffix
        )
    }

    /// Pack services.xml and the schema into a gzipped tar
    fn build_archive(package: &ApplicationPackage) -> Result<Vec<u8>> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

        let mut add = |path: &str, content: &str| -> Result<()> {
            let bytes = content.as_bytes();
            let mut header = tar::Header::new_gnu();
            header.set_size(bytes.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, bytes)
                .map_err(|e| Error::internal(format!("package archive failed: {}", e)))
        };
        add("services.xml", &package.services_xml)?;
        add("schemas/chunk.sd", &package.schema)?;

        builder
            .into_inner()
            .and_then(|gz| gz.finish())
            .map_err(|e| Error::internal(format!("package archive failed: {}", e)))
    }
}

#[async_trait]
impl VespaDeployer for HttpVespaDeployer {
    async fn current_schema(&self) -> Result<Option<String>> {
        let response = self
            .http_client
            .get(self.application_url("/content/schemas/chunk.sd"))
            .send()
            .await
            .map_err(|e| Error::retryable_with_source("config server unreachable", e))?;
        match response.status().as_u16() {
            200 => Ok(Some(response.text().await.unwrap_or_default())),
            404 => Ok(None),
            status if (500..600).contains(&status) => Err(Error::retryable(format!(
                "config server returned {}",
                status
            ))),
            status => Err(Error::invalid_input(format!(
                "config server returned {}",
                status
            ))),
        }
    }

    async fn deploy(&self, package: &ApplicationPackage) -> Result<DeployOutcome> {
        let archive = Self::build_archive(package)?;
        let response = self
            .http_client
            .post(self.application_url("/prepareandactivate"))
            .header("Content-Type", "application/x-gzip")
            .body(archive)
            .send()
            .await
            .map_err(|e| Error::retryable_with_source("deploy request failed", e))?;

        let status = response.status();
        let data: serde_json::Value = response.json().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::invalid_input(format!(
                "deploy rejected with {}: {}",
                status, data["message"].as_str().unwrap_or("")
            )));
        }

        let schema_version = data["session-id"]
            .as_str()
            .and_then(|s| s.parse::<u32>().ok())
            .or_else(|| data["session-id"].as_u64().map(|v| v as u32))
            .unwrap_or(1);
        info!(schema_version, "application package activated");

        // Cluster info is best effort; activation already succeeded
        let cluster_info = match self
            .http_client
            .get(format!(
                "{}/state/v1/health",
                self.search_endpoint.trim_end_matches('/')
            ))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.json::<serde_json::Value>().await.ok(),
            Err(_) => None,
        };

        Ok(DeployOutcome {
            schema_version,
            cluster_info,
        })
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .http_client
            .get(format!(
                "{}/state/v1/health",
                self.config_endpoint.trim_end_matches('/')
            ))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|_| Error::service_unavailable("vespa config server"))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::service_unavailable("vespa config server"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    #[test]
    fn archive_contains_services_and_schema() {
        let package = ApplicationPackage {
            services_xml: "<services/>".into(),
            schema: "schema chunk { document chunk {} }".into(),
        };
        let archive = HttpVespaDeployer::build_archive(&package).unwrap();

        let mut names = Vec::new();
        let mut tar = tar::Archive::new(GzDecoder::new(&archive[..]));
        for entry in tar.entries().unwrap() {
            names.push(entry.unwrap().path().unwrap().display().to_string());
        }
        names.sort();
        assert_eq!(names, vec!["schemas/chunk.sd", "services.xml"]);
    }
}
