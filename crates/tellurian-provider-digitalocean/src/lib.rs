// # DigitalOcean Providers
//
// This crate provides the DigitalOcean implementations of `ResourceProvider`
// for the Tellurian reconciler:
//
// - `DomainProvider`: DNS zones (`DO_DOMAIN`)
// - `DnsRecordProvider`: A, AAAA and CNAME records (`DO_DNS_RECORD`)
// - `DropletProvider`: virtual machines (`DO_DROPLET`)
//
// All three share one `DigitalOceanClient`, which owns the bearer token and
// maps HTTP statuses to errors.
//
// ## Responsibilities
//
// Providers answer one question per call (exists? create! delete!) and
// return. They never touch the state store, never retry and never decide
// ordering; the reconciler and teardown own that.
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - API token is read from the environment by the CLI only
// - An empty token fails construction
//
// ## API Reference
//
// - DigitalOcean API v2: https://docs.digitalocean.com/reference/api/
// - Domains: `/domains`, `/domains/{name}`
// - Records: `/domains/{name}/records`, `/domains/{name}/records/{id}`
// - Droplets: `/droplets`, `/droplets/{id}`, `/droplets/{id}/actions`
// - Actions: `/actions/{id}`

pub mod client;
pub mod dns;
pub mod domain;
pub mod droplet;
pub mod wire;

pub use client::{ClientError, DigitalOceanClient};
pub use dns::DnsRecordProvider;
pub use domain::DomainProvider;
pub use droplet::DropletProvider;

use std::sync::Arc;
use tellurian_core::config::ProviderConfig;
use tellurian_core::{OperationTracker, ProviderRegistry, Result};

/// Name reported by every provider in this crate
pub const PROVIDER_NAME: &str = "digitalocean";

/// Register the DigitalOcean providers for every resource kind
///
/// The tracker is used by the droplet provider to wait for creation.
///
/// # Errors
///
/// Fails when the provider configuration is invalid or the HTTP client
/// cannot be built.
pub fn register(
    registry: &mut ProviderRegistry,
    config: &ProviderConfig,
    tracker: OperationTracker,
) -> Result<()> {
    config.validate()?;
    let client = DigitalOceanClient::new(config)?;

    tracing::debug!("Registering DigitalOcean providers for {}", client.base_url());
    registry.register(Arc::new(DomainProvider::new(client.clone())));
    registry.register(Arc::new(DnsRecordProvider::new(client.clone())));
    registry.register(Arc::new(DropletProvider::new(client, tracker)));
    Ok(())
}
