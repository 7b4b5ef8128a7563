//! Loader for the grouped site list

use crate::errors::{MonitorError, Result};
use crate::models::Endpoint;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SiteGroup {
    #[serde(default)]
    name: Option<String>,
    sites: Vec<Endpoint>,
}

/// Read and flatten the site list at `path`
pub fn load_endpoints(path: &Path) -> Result<Vec<Endpoint>> {
    if !path.exists() {
        return Err(MonitorError::Config(format!(
            "Websites configuration file not found: {}",
            path.display()
        )));
    }

    let raw = std::fs::read_to_string(path)?;
    let endpoints = parse_endpoints(&raw)?;

    info!("Loaded {} endpoints from {}", endpoints.len(), path.display());
    Ok(endpoints)
}

/// Parse a JSON array of `{name?, sites: [...]}` groups, keeping file order
pub fn parse_endpoints(raw: &str) -> Result<Vec<Endpoint>> {
    let groups: Vec<SiteGroup> = serde_json::from_str(raw)
        .map_err(|e| MonitorError::Config(format!("Invalid websites configuration format: {}", e)))?;

    let mut seen = HashSet::new();
    let mut endpoints = Vec::new();

    for group in groups {
        debug!(
            "Site group {} has {} sites",
            group.name.as_deref().unwrap_or("<unnamed>"),
            group.sites.len()
        );

        for site in group.sites {
            if site.url.trim().is_empty() {
                return Err(MonitorError::Config(format!("site '{}' has an empty url", site.name)));
            }

            if !seen.insert(site.url.clone()) {
                return Err(MonitorError::Config(format!("duplicate site url: {}", site.url)));
            }

            endpoints.push(site);
        }
    }

    if endpoints.is_empty() {
        return Err(MonitorError::Config("no sites configured".to_string()));
    }

    Ok(endpoints)
}
