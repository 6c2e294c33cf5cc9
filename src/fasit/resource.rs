use std::collections::BTreeMap;

use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::naisd::{EnvironmentClass, ExposedResource, FasitEnvironment, UsedResource, Zone};

pub const NAV_TRUSTSTORE_ALIAS: &str = "nav_truststore";
pub const APPLICATION_PROPERTIES: &str = "applicationproperties";
pub const CERTIFICATE: &str = "certificate";
pub const LOAD_BALANCER_CONFIG: &str = "LoadBalancerConfig";

const APPLICATION_PROPERTIES_KEY: &str = "applicationProperties";

static PROPERTY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{L}\d_.:-]+=.+").unwrap());

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Scope {
    #[serde(rename = "environmentclass")]
    pub environment_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// A resource as Fasit returns it from `/api/v2/scopedresource`.
#[derive(Clone, Deserialize, Debug, Default)]
#[serde(default)]
pub struct FasitResource {
    pub id: i64,
    pub alias: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub scope: Scope,
    #[serde(deserialize_with = "null_as_default")]
    pub properties: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub secrets: BTreeMap<String, BTreeMap<String, String>>,
    pub files: serde_json::Value,
}

/// Fasit sends `null` for empty maps.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ingress {
    pub host: String,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResourceRequest {
    pub alias: String,
    pub resource_type: String,
    pub property_map: BTreeMap<String, String>,
}

impl From<&UsedResource> for ResourceRequest {
    fn from(used: &UsedResource) -> ResourceRequest {
        ResourceRequest {
            alias: used.alias.clone(),
            resource_type: used.resource_type.clone(),
            property_map: used.property_map.clone(),
        }
    }
}

pub fn default_resource_requests() -> Vec<ResourceRequest> {
    let mut property_map = BTreeMap::new();
    property_map.insert("keystore".to_owned(), "NAV_TRUSTSTORE_PATH".to_owned());
    vec![ResourceRequest {
        alias: NAV_TRUSTSTORE_ALIAS.to_owned(),
        resource_type: CERTIFICATE.to_owned(),
        property_map,
    }]
}

/// The truststore request followed by one request per used resource.
pub fn resource_requests(used: &[UsedResource]) -> Vec<ResourceRequest> {
    let mut requests = default_resource_requests();
    requests.extend(used.iter().map(ResourceRequest::from));
    requests
}

/// A resolved Fasit resource, ready to be turned into environment variables and ingresses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NaisResource {
    pub id: i64,
    pub name: String,
    pub resource_type: String,
    pub scope: Scope,
    pub properties: BTreeMap<String, String>,
    pub property_map: BTreeMap<String, String>,
    pub secret: Option<String>,
    pub certificates: BTreeMap<String, Vec<u8>>,
    pub ingresses: Vec<Ingress>,
}

impl NaisResource {
    pub fn from_fasit(resource: FasitResource, property_map: BTreeMap<String, String>) -> NaisResource {
        NaisResource {
            id: resource.id,
            name: resource.alias,
            resource_type: resource.resource_type,
            scope: resource.scope,
            properties: resource.properties,
            property_map,
            ..Default::default()
        }
    }

    pub fn environment_variable(&self, property: &str) -> String {
        self.resource_variable(property).to_uppercase()
    }

    pub fn resource_variable(&self, property: &str) -> String {
        let name = if let Some(mapped) = self.property_map.get(property) {
            mapped.to_owned()
        } else if self.resource_type != APPLICATION_PROPERTIES {
            format!("{}_{}", self.name, property)
        } else {
            property.to_owned()
        };

        normalize_property_name(&name).to_lowercase()
    }

    /// Explodes the `applicationProperties` blob into one property per `key=value` line.
    /// Returns the non-blank lines that could not be parsed.
    pub fn parse_application_properties(&mut self) -> Vec<String> {
        let blob = match self.properties.remove(APPLICATION_PROPERTIES_KEY) {
            Some(blob) => blob,
            None => return Vec::new(),
        };

        let mut rejected = Vec::new();
        for line in blob.lines().map(str::trim) {
            if PROPERTY_LINE.is_match(line) {
                let mut parts = line.splitn(2, '=');
                if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                    self.properties.insert(key.to_owned(), value.to_owned());
                }
            } else if !line.is_empty() {
                info!("the following string did not match our regex: {}", line);
                rejected.push(line.to_owned());
            }
        }
        rejected
    }
}

fn normalize_property_name(name: &str) -> String {
    name.replace(|c: char| c == '.' || c == ':' || c == '-', "_")
}

/// Picks the scope to register an exposed resource under.
pub fn generate_scope(
    resource: &ExposedResource,
    existing: Option<&NaisResource>,
    class: EnvironmentClass,
    environment: &FasitEnvironment,
    zone: Zone,
) -> Scope {
    if resource.all_zones {
        return Scope {
            environment_class: class.to_string(),
            environment: None,
            zone: None,
        };
    }
    if let Some(existing) = existing.filter(|existing| existing.id > 0) {
        return existing.scope.clone();
    }
    Scope {
        environment_class: class.to_string(),
        environment: Some(environment.to_string()),
        zone: Some(zone.to_string()),
    }
}
