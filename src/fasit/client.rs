use std::collections::BTreeMap;

use base64::Engine;
use hyper::body::Bytes;
use hyper::client::HttpConnector;
use hyper::header::{AUTHORIZATION, HOST};
use hyper::{Body, Client, Method, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use log::{debug, error, warn};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::error::FasitError;
use super::resource::{
    FasitResource, Ingress, NaisResource, ResourceRequest, APPLICATION_PROPERTIES, CERTIFICATE,
    LOAD_BALANCER_CONFIG,
};
use crate::naisd::{FasitEnvironment, Zone};

/// Read-only client for the Fasit v2 REST API.
pub struct FasitClient {
    url: String,
    username: String,
    password: String,
    http: Client<HttpsConnector<HttpConnector>>,
}

impl FasitClient {
    pub fn new(url: &str, username: &str, password: &str) -> FasitClient {
        FasitClient {
            url: url.trim_end_matches('/').to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
            http: Client::builder().build(https_connector()),
        }
    }

    fn build_uri(&self, path: &str, query: &[(&str, &str)]) -> Result<Uri, FasitError> {
        let mut url = Url::parse(&format!("{}{}", self.url, path))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        to_uri(&url)
    }

    async fn do_request(&self, request: Request<Body>) -> Result<Bytes, FasitError> {
        debug!("{} {}", request.method(), request.uri());
        let response = self.http.request(request).await?;
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(FasitError::NotFound { body: lossy(&body) });
        }
        if !status.is_success() {
            return Err(FasitError::Server { status: status.as_u16(), body: lossy(&body) });
        }
        Ok(body)
    }

    async fn get(&self, uri: Uri) -> Result<Bytes, FasitError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())?;
        self.do_request(request).await
    }

    pub async fn get_scoped_resource(
        &self,
        request: &ResourceRequest,
        environment: &FasitEnvironment,
        application: &str,
        zone: Zone,
    ) -> Result<NaisResource, FasitError> {
        let environment = environment.to_string();
        let zone = zone.to_string();
        let uri = self.build_uri("/api/v2/scopedresource", &[
            ("alias", request.alias.as_str()),
            ("type", request.resource_type.as_str()),
            ("environment", environment.as_str()),
            ("application", application),
            ("zone", zone.as_str()),
        ])?;

        let body = self.get(uri).await?;
        let resource: FasitResource = serde_json::from_slice(&body)?;
        self.map_to_nais_resource(resource, request.property_map.clone()).await
    }

    /// Resolves every request in order. The first failure aborts the rest.
    pub async fn get_scoped_resources(
        &self,
        requests: &[ResourceRequest],
        environment: &FasitEnvironment,
        application: &str,
        zone: Zone,
    ) -> Result<Vec<NaisResource>, FasitError> {
        let mut resources = Vec::with_capacity(requests.len());
        for request in requests {
            let resource = self
                .get_scoped_resource(request, environment, application, zone)
                .await
                .map_err(|err| FasitError::Resource {
                    alias: request.alias.clone(),
                    resource_type: request.resource_type.clone(),
                    inner: Box::new(err),
                })?;
            resources.push(resource);
        }
        Ok(resources)
    }

    pub async fn get_load_balancer_config(
        &self,
        application: &str,
        environment: &FasitEnvironment,
    ) -> Result<Option<NaisResource>, FasitError> {
        let environment = environment.to_string();
        let uri = self.build_uri("/api/v2/resources", &[
            ("environment", environment.as_str()),
            ("application", application),
            ("type", LOAD_BALANCER_CONFIG),
        ])?;

        let body = self.get(uri).await?;
        let ingresses = match parse_load_balancer_config(&body)? {
            Some(ingresses) => ingresses,
            None => return Ok(None),
        };

        Ok(Some(NaisResource {
            resource_type: LOAD_BALANCER_CONFIG.to_owned(),
            ingresses,
            ..Default::default()
        }))
    }

    /// Fetches the value behind a secret reference using basic auth.
    ///
    /// Fasit hands out one reference per resource in practice. Should there be more, the
    /// alphabetically first one is used.
    pub async fn resolve_secret(
        &self,
        secrets: &BTreeMap<String, BTreeMap<String, String>>,
        username: &str,
        password: &str,
    ) -> Result<String, FasitError> {
        let reference = secrets
            .values()
            .next()
            .and_then(|secret| secret.get("ref"))
            .ok_or_else(|| FasitError::MissingField { field: "secrets.ref".to_owned() })?;
        let uri = to_uri(&Url::parse(reference)?)?;

        let credentials = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(AUTHORIZATION, format!("Basic {}", credentials))
            .body(Body::empty())?;
        let dump = redacted_dump(&request);

        let response = self.http.request(request).await?;
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await?;

        if !status.is_success() {
            error!("Fasit request: {}", dump);
            return Err(FasitError::Secret { status: status.as_u16(), body: lossy(&body) });
        }
        Ok(lossy(&body))
    }

    /// Downloads the keystore file a certificate resource points at.
    pub async fn resolve_certificates(&self, files: &Value) -> Result<BTreeMap<String, Vec<u8>>, FasitError> {
        let file_name = files
            .pointer("/keystore/filename")
            .and_then(Value::as_str)
            .ok_or_else(|| FasitError::MissingField { field: "keystore.filename".to_owned() })?;
        let file_url = files
            .pointer("/keystore/ref")
            .and_then(Value::as_str)
            .ok_or_else(|| FasitError::MissingField { field: "keystore.ref".to_owned() })?;

        let body = self.get(to_uri(&Url::parse(file_url)?)?).await?;

        let mut certificates = BTreeMap::new();
        certificates.insert(file_name.to_owned(), body.to_vec());
        Ok(certificates)
    }

    /// Library API; the migrator binary takes the class from `--fasit-environment`.
    pub async fn get_environment_class(&self, environment: &str) -> Result<String, FasitError> {
        #[derive(Deserialize)]
        struct Environment {
            #[serde(rename = "environmentclass")]
            environment_class: String,
        }

        let uri = self.build_uri(&format!("/api/v2/environments/{}", environment), &[])?;
        let body = self.get(uri).await?;
        let environment: Environment = serde_json::from_slice(&body)?;
        Ok(environment.environment_class)
    }

    /// Succeeds when Fasit knows the application. Library API, not used by the binary.
    pub async fn get_application(&self, application: &str) -> Result<(), FasitError> {
        let uri = self.build_uri(&format!("/api/v2/applications/{}", application), &[])?;
        self.get(uri).await.map(|_| ())
    }

    async fn map_to_nais_resource(
        &self,
        fasit_resource: FasitResource,
        property_map: BTreeMap<String, String>,
    ) -> Result<NaisResource, FasitError> {
        let secrets = fasit_resource.secrets.clone();
        let files = fasit_resource.files.clone();
        let mut resource = NaisResource::from_fasit(fasit_resource, property_map);

        if !secrets.is_empty() {
            resource.secret = Some(self.resolve_secret(&secrets, &self.username, &self.password).await?);
        }

        let has_files = files.as_object().map_or(false, |files| !files.is_empty());
        if resource.resource_type == CERTIFICATE && has_files {
            resource.certificates = self.resolve_certificates(&files).await?;
        } else if resource.resource_type == APPLICATION_PROPERTIES {
            resource.parse_application_properties();
        }

        Ok(resource)
    }
}

/// Turns a Fasit `LoadBalancerConfig` search result into ingresses, one per host and context root.
/// Entries without a usable `properties.url` are skipped.
fn parse_load_balancer_config(body: &[u8]) -> Result<Option<Vec<Ingress>>, FasitError> {
    let configs: Vec<Value> = serde_json::from_slice(body).map_err(|_| FasitError::LoadBalancer {
        message: format!("error parsing load balancer config: {}", lossy(body)),
    })?;
    if configs.is_empty() {
        return Ok(None);
    }

    let mut ingresses = Vec::new();
    for config in &configs {
        let host = match config.pointer("/properties/url").and_then(Value::as_str) {
            Some(host) => host,
            None => {
                warn!("no host found for loadbalancer config");
                continue;
            }
        };
        let context_roots = config
            .pointer("/properties/contextRoots")
            .and_then(Value::as_str)
            .unwrap_or_default();
        for path in context_roots.split(',') {
            ingresses.push(Ingress { host: host.to_owned(), path: path.trim().to_owned() });
        }
    }

    if ingresses.is_empty() {
        return Err(FasitError::LoadBalancer {
            message: format!("no loadbalancer config found for: {}", lossy(body)),
        });
    }
    Ok(Some(ingresses))
}

fn https_connector() -> HttpsConnector<HttpConnector> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let mut tls = rustls::ClientConfig::new();
    tls.root_store.add_server_trust_anchors(&webpki_roots::TLS_SERVER_ROOTS);
    HttpsConnector::from((http, tls))
}

fn to_uri(url: &Url) -> Result<Uri, FasitError> {
    url.as_str()
        .parse()
        .map_err(|err: hyper::http::uri::InvalidUri| FasitError::Request(err.into()))
}

fn lossy(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

fn redacted_dump(request: &Request<Body>) -> String {
    let uri = request.uri();
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let mut dump = format!("{} {} {:?}\r\n", request.method(), path, request.version());
    if let Some(host) = uri.authority() {
        dump.push_str(&format!("{}: {}\r\n", HOST, host));
    }
    for (name, value) in request.headers() {
        if *name == AUTHORIZATION {
            dump.push_str(&format!("{}: <redacted>\r\n", name));
        } else {
            dump.push_str(&format!("{}: {}\r\n", name, value.to_str().unwrap_or("<binary>")));
        }
    }
    dump
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::net::SocketAddr;

    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Response, Server};

    use super::*;

    async fn serve<F>(handler: F) -> String
    where
        F: Fn(Request<Body>) -> Response<Body> + Clone + Send + Sync + 'static,
    {
        let service = make_service_fn(move |_| {
            let handler = handler.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let response = handler(req);
                    async move { Ok::<_, Infallible>(response) }
                }))
            }
        });
        let address: SocketAddr = ([127, 0, 0, 1], 0).into();
        let server = Server::bind(&address).serve(service);
        let url = format!("http://{}", server.local_addr());
        tokio::spawn(server);
        url
    }

    fn respond(status: u16, body: &str) -> Response<Body> {
        Response::builder()
            .status(status)
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn query(req: &Request<Body>) -> BTreeMap<String, String> {
        url::form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
            .into_owned()
            .collect()
    }

    fn request(alias: &str, resource_type: &str) -> ResourceRequest {
        ResourceRequest {
            alias: alias.to_owned(),
            resource_type: resource_type.to_owned(),
            property_map: BTreeMap::new(),
        }
    }

    fn q1() -> FasitEnvironment {
        "q1".parse().unwrap()
    }

    #[tokio::test]
    async fn resolves_scoped_resource() {
        let url = serve(|req| {
            let query = query(&req);
            if req.uri().path() != "/api/v2/scopedresource"
                || query["alias"] != "some_api"
                || query["environment"] != "q1"
                || query["zone"] != "fss"
                || query["application"] != "app1"
            {
                return respond(400, "unexpected request");
            }
            respond(200, r#"{
                "id": 7,
                "alias": "some_api",
                "type": "restservice",
                "scope": {"environmentclass": "q", "environment": "q1", "zone": "fss"},
                "properties": {"url": "https://api.example/"}
            }"#)
        }).await;
        let client = FasitClient::new(&url, "user", "pass");

        let resource = client
            .get_scoped_resource(&request("some_api", "restservice"), &q1(), "app1", Zone::Fss)
            .await
            .unwrap();

        assert_eq!(resource.id, 7);
        assert_eq!(resource.name, "some_api");
        assert_eq!(resource.scope.zone.as_deref(), Some("fss"));
        assert_eq!(resource.properties["url"], "https://api.example/");
        assert_eq!(resource.secret, None);
    }

    #[tokio::test]
    async fn null_secrets_and_files_need_no_lookups() {
        let url = serve(|req| {
            if req.uri().path() != "/api/v2/scopedresource" {
                return respond(500, "unexpected lookup");
            }
            respond(200, r#"{
                "id": 3,
                "alias": "some_db",
                "type": "datasource",
                "scope": null,
                "properties": {"url": "jdbc:oracle:thin:@db"},
                "secrets": null,
                "files": null
            }"#)
        }).await;
        let client = FasitClient::new(&url, "user", "pass");

        let resource = client
            .get_scoped_resource(&request("some_db", "datasource"), &q1(), "app1", Zone::Fss)
            .await
            .unwrap();

        assert_eq!(resource.properties["url"], "jdbc:oracle:thin:@db");
        assert_eq!(resource.secret, None);
        assert!(resource.certificates.is_empty());
    }

    #[tokio::test]
    async fn not_found_is_classified() {
        let url = serve(|_| respond(404, "no such resource")).await;
        let client = FasitClient::new(&url, "user", "pass");

        let err = client
            .get_scoped_resources(&[request("missing", "restservice")], &q1(), "app1", Zone::Fss)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.code(), 404);
    }

    #[tokio::test]
    async fn server_error_carries_body() {
        let url = serve(|_| respond(500, "fasit is down")).await;
        let client = FasitClient::new(&url, "user", "pass");

        let err = client
            .get_scoped_resources(&[request("some_api", "restservice")], &q1(), "app1", Zone::Fss)
            .await
            .unwrap_err();

        assert!(!err.is_not_found());
        assert_eq!(err.code(), 500);
        match err.root() {
            FasitError::Server { status, body } => {
                assert_eq!(*status, 500);
                assert_eq!(body, "fasit is down");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn first_failure_aborts_the_rest() {
        let url = serve(|req| match query(&req)["alias"].as_str() {
            "first" => respond(200, r#"{"alias": "first", "type": "restservice"}"#),
            "second" => respond(404, "gone"),
            _ => respond(500, "should never be asked for"),
        }).await;
        let client = FasitClient::new(&url, "user", "pass");

        let requests = vec![
            request("first", "restservice"),
            request("second", "restservice"),
            request("third", "restservice"),
        ];
        let err = client
            .get_scoped_resources(&requests, &q1(), "app1", Zone::Fss)
            .await
            .unwrap_err();

        match &err {
            FasitError::Resource { alias, .. } => assert_eq!(alias, "second"),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn resolves_secret_with_basic_auth() {
        let url = serve(|req| {
            let host = req.headers()[HOST].to_str().unwrap().to_owned();
            match req.uri().path() {
                "/api/v2/scopedresource" => respond(200, &format!(r#"{{
                    "alias": "srvuser",
                    "type": "credential",
                    "properties": {{"username": "srvapp"}},
                    "secrets": {{"password": {{"ref": "http://{}/api/v2/secrets/1"}}}}
                }}"#, host)),
                "/api/v2/secrets/1" => match req.headers().get(AUTHORIZATION) {
                    Some(auth) if auth == "Basic dXNlcjpwYXNz" => respond(200, "hunter2"),
                    _ => respond(401, "unauthorized"),
                },
                _ => respond(400, "unexpected request"),
            }
        }).await;

        let client = FasitClient::new(&url, "user", "pass");
        let resource = client
            .get_scoped_resource(&request("srvuser", "credential"), &q1(), "app1", Zone::Fss)
            .await
            .unwrap();
        assert_eq!(resource.secret.as_deref(), Some("hunter2"));
        assert_eq!(resource.properties["username"], "srvapp");

        let client = FasitClient::new(&url, "user", "wrong");
        let err = client
            .get_scoped_resource(&request("srvuser", "credential"), &q1(), "app1", Zone::Fss)
            .await
            .unwrap_err();
        match err {
            FasitError::Secret { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn downloads_certificates() {
        let url = serve(|req| {
            let host = req.headers()[HOST].to_str().unwrap().to_owned();
            match req.uri().path() {
                "/api/v2/scopedresource" => respond(200, &format!(r#"{{
                    "alias": "nav_truststore",
                    "type": "certificate",
                    "properties": {{"keystorealias": "app-key"}},
                    "files": {{"keystore": {{"filename": "truststore.jts", "ref": "http://{}/files/1"}}}}
                }}"#, host)),
                "/files/1" => respond(200, "binary"),
                _ => respond(400, "unexpected request"),
            }
        }).await;
        let client = FasitClient::new(&url, "user", "pass");

        let resource = client
            .get_scoped_resource(&request("nav_truststore", CERTIFICATE), &q1(), "app1", Zone::Fss)
            .await
            .unwrap();

        assert_eq!(resource.certificates["truststore.jts"], b"binary".to_vec());
    }

    #[tokio::test]
    async fn parses_application_properties_from_fasit() {
        let url = serve(|_| respond(200, r#"{
            "alias": "app_props",
            "type": "applicationproperties",
            "properties": {"applicationProperties": "a.b=1\nbad line\nc-d:e=2"}
        }"#)).await;
        let client = FasitClient::new(&url, "user", "pass");

        let resource = client
            .get_scoped_resource(&request("app_props", APPLICATION_PROPERTIES), &q1(), "app1", Zone::Fss)
            .await
            .unwrap();

        assert_eq!(resource.properties.len(), 2);
        assert_eq!(resource.properties["a.b"], "1");
        assert_eq!(resource.properties["c-d:e"], "2");
    }

    #[tokio::test]
    async fn load_balancer_config_crosses_hosts_and_paths() {
        let url = serve(|req| {
            if query(&req)["type"] != LOAD_BALANCER_CONFIG {
                return respond(400, "unexpected request");
            }
            respond(200, r#"[
                {"properties": {"url": "app.adeo.no", "contextRoots": "/app,/app-api"}},
                {"properties": {"contextRoots": "/ignored"}}
            ]"#)
        }).await;
        let client = FasitClient::new(&url, "user", "pass");

        let resource = client.get_load_balancer_config("app1", &q1()).await.unwrap().unwrap();

        assert_eq!(resource.resource_type, LOAD_BALANCER_CONFIG);
        assert_eq!(resource.ingresses, vec![
            Ingress { host: "app.adeo.no".to_owned(), path: "/app".to_owned() },
            Ingress { host: "app.adeo.no".to_owned(), path: "/app-api".to_owned() },
        ]);
    }

    #[test]
    fn malformed_load_balancer_entries_are_skipped() {
        let ingresses = parse_load_balancer_config(br#"[
            {"properties": {"url": 42, "contextRoots": "/broken"}},
            {"properties": {"url": "app.adeo.no", "contextRoots": ["/not", "/a/string"]}},
            {"properties": {"url": "app.nav.no", "contextRoots": "/app"}}
        ]"#)
        .unwrap()
        .unwrap();

        assert_eq!(ingresses, vec![
            Ingress { host: "app.adeo.no".to_owned(), path: "".to_owned() },
            Ingress { host: "app.nav.no".to_owned(), path: "/app".to_owned() },
        ]);
    }

    #[test]
    fn context_roots_are_trimmed() {
        let ingresses = parse_load_balancer_config(br#"[{"properties": {"url": "app.adeo.no", "contextRoots": "/a, /b"}}]"#)
            .unwrap()
            .unwrap();

        assert_eq!(ingresses, vec![
            Ingress { host: "app.adeo.no".to_owned(), path: "/a".to_owned() },
            Ingress { host: "app.adeo.no".to_owned(), path: "/b".to_owned() },
        ]);
    }

    #[test]
    fn empty_load_balancer_search_is_none() {
        assert_eq!(parse_load_balancer_config(b"[]").unwrap(), None);
    }

    #[test]
    fn load_balancer_config_without_hosts_is_an_error() {
        let err = parse_load_balancer_config(br#"[{"properties": {"contextRoots": "/app"}}]"#).unwrap_err();
        match err {
            FasitError::LoadBalancer { .. } => {}
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn looks_up_environment_class_and_application() {
        let url = serve(|req| match req.uri().path() {
            "/api/v2/environments/q1" => respond(200, r#"{"name": "q1", "environmentclass": "q"}"#),
            "/api/v2/applications/app1" => respond(200, r#"{"name": "app1"}"#),
            _ => respond(404, "not found"),
        }).await;
        let client = FasitClient::new(&url, "user", "pass");

        assert_eq!(client.get_environment_class("q1").await.unwrap(), "q");
        assert!(client.get_application("app1").await.is_ok());
        assert!(client.get_application("other").await.unwrap_err().is_not_found());
    }

    #[test]
    fn dump_hides_credentials() {
        let request = Request::builder()
            .uri("http://fasit.example/api/v2/secrets/1")
            .header(AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let dump = redacted_dump(&request);

        assert!(dump.starts_with("GET /api/v2/secrets/1 HTTP/1.1\r\n"));
        assert!(dump.contains("host: fasit.example\r\n"));
        assert!(dump.contains("authorization: <redacted>"));
        assert!(!dump.contains("dXNlcjpwYXNz"));
    }
}
