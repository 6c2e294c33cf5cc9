use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use failure::Fail;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static ENVIRONMENT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[pqtu][0-9]*$").unwrap());

#[derive(Debug, Fail, PartialEq)]
pub enum ParseError {
    #[fail(display = "unknown zone '{}', expected one of fss, sbs", _0)]
    Zone(String),
    #[fail(display = "invalid fasit environment '{}', expected [pqtu][0-9]*", _0)]
    Environment(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    Fss,
    Sbs,
}

impl FromStr for Zone {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fss" => Ok(Zone::Fss),
            "sbs" => Ok(Zone::Sbs),
            _ => Err(ParseError::Zone(s.to_owned())),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Zone::Fss => "fss",
            Zone::Sbs => "sbs",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvironmentClass {
    P,
    Q,
    T,
    U,
}

impl fmt::Display for EnvironmentClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            EnvironmentClass::P => "p",
            EnvironmentClass::Q => "q",
            EnvironmentClass::T => "t",
            EnvironmentClass::U => "u",
        })
    }
}

/// A Fasit environment name such as `p`, `q1` or `t4`. The leading letter is the environment class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FasitEnvironment {
    name: String,
    class: EnvironmentClass,
}

impl FasitEnvironment {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> EnvironmentClass {
        self.class
    }
}

impl FromStr for FasitEnvironment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_ascii_lowercase();
        if !ENVIRONMENT_NAME.is_match(&name) {
            return Err(ParseError::Environment(s.to_owned()));
        }
        let class = match name.as_bytes()[0] {
            b'p' => EnvironmentClass::P,
            b'q' => EnvironmentClass::Q,
            b't' => EnvironmentClass::T,
            _ => EnvironmentClass::U,
        };
        Ok(FasitEnvironment { name, class })
    }
}

impl fmt::Display for FasitEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Who and where we are deploying to.
#[derive(Clone, Debug, PartialEq)]
pub struct Deploy {
    pub application: String,
    pub namespace: String,
    pub zone: Zone,
    pub environment: FasitEnvironment,
    pub fasit_username: String,
    pub fasit_password: String,
}

impl Deploy {
    pub fn fasit_enabled(&self) -> bool {
        !self.fasit_username.is_empty()
    }
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Probe {
    pub path: String,
    pub initial_delay: u32,
    pub period_seconds: u32,
    pub failure_threshold: u32,
    pub timeout: u32,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Healthcheck {
    pub liveness: Probe,
    pub readiness: Probe,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ResourceList {
    pub cpu: String,
    pub memory: String,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ResourceRequirements {
    pub limits: ResourceList,
    pub requests: ResourceList,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PrometheusConfig {
    pub enabled: bool,
    pub port: String,
    pub path: String,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct IstioConfig {
    pub enabled: bool,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Vault {
    pub enabled: bool,
    pub sidecar: bool,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Ingress {
    pub disabled: bool,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Replicas {
    pub min: u32,
    pub max: u32,
    pub cpu_threshold_percentage: u32,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct FasitResources {
    pub used: Vec<UsedResource>,
    pub exposed: Vec<ExposedResource>,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UsedResource {
    pub alias: String,
    pub resource_type: String,
    pub property_map: BTreeMap<String, String>,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ExposedResource {
    pub alias: String,
    pub resource_type: String,
    pub path: String,
    pub description: String,
    pub wsdl_group_id: String,
    pub wsdl_artifact_id: String,
    pub wsdl_version: String,
    pub security_token: String,
    pub all_zones: bool,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Redis {
    pub enabled: bool,
    pub image: String,
    pub limits: ResourceList,
    pub requests: ResourceList,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PrometheusAlertRule {
    pub alert: String,
    pub expr: String,
    pub r#for: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// The naisd manifest, better known as `nais.yaml`.
#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NaisManifest {
    pub team: String,
    pub image: String,
    pub port: u16,
    #[serde(alias = "deploymentstrategy")]
    pub deployment_strategy: String,
    pub healthcheck: Healthcheck,
    pub pre_stop_hook_path: String,
    pub prometheus: PrometheusConfig,
    pub istio: IstioConfig,
    pub replicas: Replicas,
    pub ingress: Ingress,
    pub resources: ResourceRequirements,
    pub fasit_resources: FasitResources,
    pub leader_election: bool,
    pub redis: Redis,
    pub alerts: Vec<PrometheusAlertRule>,
    pub logformat: String,
    pub logtransform: String,
    pub secrets: bool,
    pub vault: Vault,
    pub webproxy: bool,
}
