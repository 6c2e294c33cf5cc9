//! Payload builders for registering exposed resources and application instances in Fasit.
//! Library API only; the migrator binary does not register anything.

use serde::Serialize;
use url::Url;

use super::resource::{generate_scope, NaisResource, Scope, LOAD_BALANCER_CONFIG};
use crate::naisd::{Deploy, EnvironmentClass, ExposedResource, FasitEnvironment, Zone};

const WSDL_REDIRECT_URL: &str = "http://maven.adeo.no/nexus/service/local/artifact/maven/redirect";

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct RestProperties {
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebserviceProperties {
    pub endpoint_url: String,
    pub wsdl_url: String,
    pub security_token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Body for creating or updating an exposed resource in Fasit.
#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum ResourcePayload {
    Rest {
        alias: String,
        scope: Scope,
        #[serde(rename = "type")]
        resource_type: String,
        properties: RestProperties,
    },
    Webservice {
        alias: String,
        scope: Scope,
        #[serde(rename = "type")]
        resource_type: String,
        properties: WebserviceProperties,
    },
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct ResourceId {
    pub id: i64,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct ApplicationInstancePayload {
    pub application: String,
    pub environment: String,
    pub version: String,
    #[serde(rename = "exposedresources")]
    pub exposed_resources: Vec<ResourceId>,
    #[serde(rename = "usedresources")]
    pub used_resources: Vec<ResourceId>,
    #[serde(rename = "clustername")]
    pub cluster_name: String,
    pub domain: String,
}

pub fn build_resource_payload(
    resource: &ExposedResource,
    existing: Option<&NaisResource>,
    class: EnvironmentClass,
    environment: &FasitEnvironment,
    zone: Zone,
    hostname: &str,
) -> Option<ResourcePayload> {
    let scope = || generate_scope(resource, existing, class, environment, zone);
    let endpoint = format!("https://{}{}", hostname, resource.path);

    if resource.resource_type.eq_ignore_ascii_case("restservice") {
        Some(ResourcePayload::Rest {
            alias: resource.alias.clone(),
            scope: scope(),
            resource_type: "RestService".to_owned(),
            properties: RestProperties {
                url: endpoint,
                description: resource.description.clone(),
            },
        })
    } else if resource.resource_type.eq_ignore_ascii_case("WebserviceEndpoint")
        || resource.resource_type.eq_ignore_ascii_case("SoapService")
    {
        Some(ResourcePayload::Webservice {
            alias: resource.alias.clone(),
            scope: scope(),
            resource_type: resource.resource_type.clone(),
            properties: WebserviceProperties {
                endpoint_url: endpoint,
                wsdl_url: wsdl_url(resource),
                security_token: resource.security_token.clone(),
                description: resource.description.clone(),
            },
        })
    } else {
        None
    }
}

fn wsdl_url(resource: &ExposedResource) -> String {
    let mut url = match Url::parse(WSDL_REDIRECT_URL) {
        Ok(url) => url,
        Err(_) => return WSDL_REDIRECT_URL.to_owned(),
    };
    url.query_pairs_mut()
        .append_pair("r", "m2internal")
        .append_pair("g", &resource.wsdl_group_id)
        .append_pair("a", &resource.wsdl_artifact_id)
        .append_pair("v", &resource.wsdl_version)
        .append_pair("e", "zip");
    url.to_string()
}

pub fn build_application_instance_payload(
    deploy: &Deploy,
    version: &str,
    subdomain: &str,
    exposed_ids: &[i64],
    used_ids: &[i64],
) -> ApplicationInstancePayload {
    let domain = subdomain.splitn(2, '.').nth(1).unwrap_or("").to_owned();
    ApplicationInstancePayload {
        application: deploy.application.clone(),
        environment: deploy.environment.to_string(),
        version: version.to_owned(),
        exposed_resources: exposed_ids.iter().map(|&id| ResourceId { id }).collect(),
        used_resources: used_ids.iter().map(|&id| ResourceId { id }).collect(),
        cluster_name: "nais".to_owned(),
        domain,
    }
}

/// Ids of the resources an application instance uses. Load balancer configs are not registered.
pub fn used_resource_ids(resources: &[NaisResource]) -> Vec<i64> {
    resources
        .iter()
        .filter(|resource| resource.resource_type != LOAD_BALANCER_CONFIG)
        .map(|resource| resource.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deploy() -> Deploy {
        Deploy {
            application: "app1".to_owned(),
            namespace: "default".to_owned(),
            zone: Zone::Fss,
            environment: "q1".parse().unwrap(),
            fasit_username: String::new(),
            fasit_password: String::new(),
        }
    }

    #[test]
    fn builds_rest_service_payload() {
        let exposed = ExposedResource {
            alias: "app1_api".to_owned(),
            resource_type: "RESTService".to_owned(),
            path: "/api".to_owned(),
            ..Default::default()
        };
        let deploy = deploy();

        let payload = build_resource_payload(&exposed, None, EnvironmentClass::Q, &deploy.environment, Zone::Fss, "app1.nais.preprod.local").unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], "RestService");
        assert_eq!(json["properties"]["url"], "https://app1.nais.preprod.local/api");
        assert_eq!(json["scope"]["zone"], "fss");
        assert!(json["properties"].get("description").is_none());
    }

    #[test]
    fn builds_webservice_payload() {
        let exposed = ExposedResource {
            alias: "app1_ws".to_owned(),
            resource_type: "SoapService".to_owned(),
            path: "/ws".to_owned(),
            wsdl_group_id: "no.nav".to_owned(),
            wsdl_artifact_id: "app1-wsdl".to_owned(),
            wsdl_version: "1.0".to_owned(),
            security_token: "SAML".to_owned(),
            ..Default::default()
        };
        let deploy = deploy();

        let payload = build_resource_payload(&exposed, None, EnvironmentClass::Q, &deploy.environment, Zone::Fss, "app1.nais.preprod.local").unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], "SoapService");
        assert_eq!(json["properties"]["endpointUrl"], "https://app1.nais.preprod.local/ws");
        assert_eq!(json["properties"]["securityToken"], "SAML");
        assert_eq!(
            json["properties"]["wsdlUrl"],
            "http://maven.adeo.no/nexus/service/local/artifact/maven/redirect?r=m2internal&g=no.nav&a=app1-wsdl&v=1.0&e=zip"
        );
    }

    #[test]
    fn ignores_unsupported_resource_types() {
        let exposed = ExposedResource {
            resource_type: "datasource".to_owned(),
            ..Default::default()
        };
        let deploy = deploy();

        assert_eq!(build_resource_payload(&exposed, None, EnvironmentClass::Q, &deploy.environment, Zone::Fss, "host"), None);
    }

    #[test]
    fn application_instance_lists_serialize_empty() {
        let payload = build_application_instance_payload(&deploy(), "1.2.3", "app1.nais.preprod.local", &[], &[3]);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["domain"], "nais.preprod.local");
        assert_eq!(json["clustername"], "nais");
        assert_eq!(json["environment"], "q1");
        assert_eq!(json["exposedresources"], serde_json::json!([]));
        assert_eq!(json["usedresources"], serde_json::json!([{"id": 3}]));
    }

    #[test]
    fn skips_load_balancer_ids() {
        let resources = vec![
            NaisResource { id: 1, resource_type: "restservice".to_owned(), ..Default::default() },
            NaisResource { id: 0, resource_type: LOAD_BALANCER_CONFIG.to_owned(), ..Default::default() },
        ];
        assert_eq!(used_resource_ids(&resources), vec![1]);
    }
}
