use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const KIND: &str = "Application";
pub const API_VERSION: &str = "nais.io/v1alpha1";

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ObjectMeta {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A naiserator `Application` resource.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub kind: String,
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: ApplicationSpec,
}

impl Application {
    pub fn new(metadata: ObjectMeta, spec: ApplicationSpec) -> Application {
        Application {
            kind: KIND.to_owned(),
            api_version: API_VERSION.to_owned(),
            metadata,
            spec,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplicationSpec {
    pub image: String,
    #[serde(skip_serializing_if = "is_default")]
    pub port: u16,
    #[serde(skip_serializing_if = "is_default")]
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "is_default")]
    pub liveness: Probe,
    #[serde(skip_serializing_if = "is_default")]
    pub readiness: Probe,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pre_stop_hook_path: String,
    #[serde(skip_serializing_if = "is_default")]
    pub prometheus: PrometheusConfig,
    #[serde(skip_serializing_if = "is_default")]
    pub replicas: Replicas,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ingresses: Vec<String>,
    #[serde(skip_serializing_if = "is_default")]
    pub resources: ResourceRequirements,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(skip_serializing_if = "is_default")]
    pub leader_election: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub logformat: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub logtransform: String,
    #[serde(skip_serializing_if = "is_default")]
    pub vault: Vault,
    #[serde(rename = "webproxy", skip_serializing_if = "is_default")]
    pub web_proxy: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub secure_logs: SecureLogs,
    #[serde(skip_serializing_if = "is_default")]
    pub skip_ca_bundle: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Strategy {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Liveness and readiness probes.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Probe {
    pub path: String,
    #[serde(skip_serializing_if = "is_default")]
    pub port: u16,
    #[serde(skip_serializing_if = "is_default")]
    pub initial_delay: u32,
    #[serde(skip_serializing_if = "is_default")]
    pub period_seconds: u32,
    #[serde(skip_serializing_if = "is_default")]
    pub failure_threshold: u32,
    #[serde(skip_serializing_if = "is_default")]
    pub timeout: u32,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PrometheusConfig {
    #[serde(skip_serializing_if = "is_default")]
    pub enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Replicas {
    /// The minimum amount of replicas acceptable for a successful deployment.
    #[serde(skip_serializing_if = "is_default")]
    pub min: u32,
    /// The pod autoscaler will scale deployments on demand until this maximum has been reached.
    #[serde(skip_serializing_if = "is_default")]
    pub max: u32,
    /// Amount of CPU usage before the autoscaler kicks in.
    #[serde(skip_serializing_if = "is_default")]
    pub cpu_threshold_percentage: u32,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ResourceSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cpu: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub memory: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ResourceRequirements {
    #[serde(skip_serializing_if = "is_default")]
    pub limits: ResourceSpec,
    #[serde(skip_serializing_if = "is_default")]
    pub requests: ResourceSpec,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFieldSelector {
    pub field_path: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    pub field_ref: ObjectFieldSelector,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretPath {
    pub mount_path: String,
    pub kv_path: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Vault {
    #[serde(skip_serializing_if = "is_default")]
    pub enabled: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub sidecar: bool,
    #[serde(rename = "paths", skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<SecretPath>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SecureLogs {
    /// Whether or not to enable a sidecar container for secure logging.
    pub enabled: bool,
}
