//! Configuration discovery.
//!
//! Tenants are searched through their own resource resolver only. The host
//! is searched in `<home>/conf`. In both cases the order is the structured
//! form, then the key-value form, then TOML.

use crate::loader::{ConfigFormat, ConfigSource, ExplicitSource};
use crate::tenant::resources::{DirectoryResolver, HostPaths, ResourceResolver};
use crate::tenant::{Tenant, TenantIdentity};

use super::RegistryError;

/// Find a tenant's configuration. No resource yields [`ConfigSource::Absent`].
pub fn discover_tenant(tenant: &Tenant, config_name: &str) -> Result<ConfigSource, RegistryError> {
    let found = search(tenant.resources(), &tenant.identity(), config_name)?;
    if found.is_none() {
        tracing::debug!(tenant = %tenant.id(), config_name, "No tenant logging configuration found");
    }
    Ok(found.map_or(ConfigSource::Absent, ConfigSource::Explicit))
}

/// Find the host configuration in `<home>/conf`. The host has no fallback.
pub fn discover_host(host: &dyn HostPaths, config_name: &str) -> Result<ConfigSource, RegistryError> {
    let conf_dir = host.conf_directory();
    let resolver = DirectoryResolver::new(&conf_dir);

    match search(&resolver, &TenantIdentity::Host, config_name)? {
        Some(source) => Ok(ConfigSource::Explicit(source)),
        None => Err(RegistryError::HostConfigMissing {
            conf_dir,
            expected: ConfigFormat::ALL
                .iter()
                .map(|f| f.resource_name(config_name))
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

fn search(
    resolver: &dyn ResourceResolver,
    identity: &TenantIdentity,
    config_name: &str,
) -> Result<Option<ExplicitSource>, RegistryError> {
    for format in ConfigFormat::ALL {
        let name = format.resource_name(config_name);
        let Some(url) = resolver.find_resource(&name)? else {
            continue;
        };

        tracing::debug!(identity = %identity, resource = %url, "Found logging configuration");
        let source = ExplicitSource::resolve(url, format, resolver).map_err(|source| {
            RegistryError::Load {
                identity: identity.clone(),
                source,
            }
        })?;
        return Ok(Some(source));
    }
    Ok(None)
}
