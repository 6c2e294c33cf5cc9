//! Lookups against Fasit, the NAV resource registry.

use log::{info, warn};

use crate::naisd::{FasitEnvironment, UsedResource, Zone};

mod client;
mod error;
pub mod exposed;
mod resource;

pub use client::FasitClient;
pub use error::FasitError;
pub use resource::{
    default_resource_requests, generate_scope, resource_requests, FasitResource, Ingress, NaisResource,
    ResourceRequest, Scope, APPLICATION_PROPERTIES, CERTIFICATE, LOAD_BALANCER_CONFIG, NAV_TRUSTSTORE_ALIAS,
};

/// Resolves the truststore and every used resource, then adds load balancer ingresses if Fasit has any.
pub async fn fetch_resources(
    client: &FasitClient,
    application: &str,
    environment: &FasitEnvironment,
    zone: Zone,
    used: &[UsedResource],
) -> Result<Vec<NaisResource>, FasitError> {
    let requests = resource_requests(used);
    let mut resources = client
        .get_scoped_resources(&requests, environment, application, zone)
        .await?;

    match client.get_load_balancer_config(application, environment).await {
        Ok(Some(load_balancer)) => {
            info!("Found {} load balancer ingresses", load_balancer.ingresses.len());
            resources.push(load_balancer);
        }
        Ok(None) => {}
        Err(err) => warn!(
            "failed getting loadbalancer config for application {} in fasit environment {}: {}",
            application, environment, err
        ),
    }

    Ok(resources)
}
