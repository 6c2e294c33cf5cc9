//! Conversion from naisd manifests to naiserator applications.

use std::collections::BTreeMap;

use log::{info, warn};

use crate::fasit::{NaisResource, CERTIFICATE};
use crate::naisd::{self, Deploy, EnvironmentClass, NaisManifest, Zone};
use crate::naiserator::{self, Application, ApplicationSpec, EnvVar, ObjectMeta};

fn domain(zone: Zone, class: EnvironmentClass) -> &'static str {
    match (zone, class) {
        (Zone::Fss, EnvironmentClass::P) => "adeo.no",
        (Zone::Fss, _) => "preprod.local",
        (Zone::Sbs, EnvironmentClass::P) => "oera.no",
        (Zone::Sbs, _) => "oera-q.local",
    }
}

fn auto_ingress(deploy: &Deploy) -> String {
    format!("https://{}.nais.{}", deploy.application, domain(deploy.zone, deploy.environment.class()))
}

fn fasit_ingresses(resources: &[NaisResource]) -> impl Iterator<Item = String> + '_ {
    resources
        .iter()
        .flat_map(|resource| &resource.ingresses)
        .map(|ingress| {
            let separator = if ingress.path.is_empty() || ingress.path.starts_with('/') { "" } else { "/" };
            format!("https://{}{}{}", ingress.host, separator, ingress.path)
        })
}

fn ingresses(manifest: &NaisManifest, deploy: &Deploy, resources: &[NaisResource]) -> Vec<String> {
    if manifest.ingress.disabled {
        return Vec::new();
    }
    let mut ingresses = vec![auto_ingress(deploy)];
    ingresses.extend(fasit_ingresses(resources));
    ingresses
}

fn environment(resources: &[NaisResource]) -> Vec<EnvVar> {
    let mut env = Vec::new();
    for resource in resources {
        if resource.resource_type == CERTIFICATE {
            info!("Skipping certificate resource '{}', certificates are not migrated", resource.name);
            continue;
        }
        if resource.secret.is_some() {
            warn!("Skipping resource '{}' holding a secret, secrets must be moved to Vault", resource.name);
            continue;
        }
        env.extend(resource.properties.iter().map(|(key, value)| EnvVar {
            name: resource.environment_variable(key),
            value: value.clone(),
            value_from: None,
        }));
    }
    env
}

fn probe(manifest: &NaisManifest, probe: &naisd::Probe) -> naiserator::Probe {
    naiserator::Probe {
        path: probe.path.clone(),
        port: manifest.port,
        initial_delay: probe.initial_delay,
        period_seconds: probe.period_seconds,
        failure_threshold: probe.failure_threshold,
        timeout: probe.timeout,
    }
}

fn prometheus(config: &naisd::PrometheusConfig) -> naiserator::PrometheusConfig {
    naiserator::PrometheusConfig {
        enabled: config.enabled,
        port: config.port.clone(),
        path: config.path.clone(),
    }
}

fn replicas(replicas: &naisd::Replicas) -> naiserator::Replicas {
    naiserator::Replicas {
        min: replicas.min,
        max: replicas.max,
        cpu_threshold_percentage: replicas.cpu_threshold_percentage,
    }
}

fn resource_spec(list: &naisd::ResourceList) -> naiserator::ResourceSpec {
    naiserator::ResourceSpec {
        cpu: list.cpu.clone(),
        memory: list.memory.clone(),
    }
}

fn report_unmigrated(manifest: &NaisManifest) {
    if manifest.redis.enabled {
        warn!("Redis is enabled, it must be deployed as a separate application");
    }
    if !manifest.alerts.is_empty() {
        warn!("{} alert(s) found, alerts must be migrated to an Alert resource", manifest.alerts.len());
    }
    if manifest.istio.enabled {
        info!("Istio is enabled in the manifest, naiserator decides on sidecar injection per namespace");
    }
    for exposed in &manifest.fasit_resources.exposed {
        warn!("Exposed resource '{}' ({}) is not registered in Fasit by this tool", exposed.alias, exposed.resource_type);
    }
}

/// Converts a naisd manifest into a naiserator application. Never fails.
pub fn convert(manifest: &NaisManifest, deploy: &Deploy, resources: &[NaisResource]) -> Application {
    report_unmigrated(manifest);

    let mut labels = BTreeMap::new();
    labels.insert("team".to_owned(), manifest.team.clone());

    let metadata = ObjectMeta {
        name: deploy.application.clone(),
        namespace: deploy.namespace.clone(),
        labels,
        annotations: BTreeMap::new(),
    };

    let spec = ApplicationSpec {
        image: manifest.image.clone(),
        port: manifest.port,
        strategy: naiserator::Strategy {
            kind: manifest.deployment_strategy.clone(),
        },
        liveness: probe(manifest, &manifest.healthcheck.liveness),
        readiness: probe(manifest, &manifest.healthcheck.readiness),
        pre_stop_hook_path: manifest.pre_stop_hook_path.clone(),
        prometheus: prometheus(&manifest.prometheus),
        replicas: replicas(&manifest.replicas),
        ingresses: ingresses(manifest, deploy, resources),
        resources: naiserator::ResourceRequirements {
            limits: resource_spec(&manifest.resources.limits),
            requests: resource_spec(&manifest.resources.requests),
        },
        env: environment(resources),
        leader_election: manifest.leader_election,
        logformat: manifest.logformat.clone(),
        logtransform: manifest.logtransform.clone(),
        vault: naiserator::Vault {
            enabled: manifest.secrets,
            sidecar: manifest.vault.sidecar,
            mounts: Vec::new(),
        },
        web_proxy: manifest.webproxy,
        ..Default::default()
    };

    Application::new(metadata, spec)
}
