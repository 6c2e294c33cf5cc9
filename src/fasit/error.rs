use failure::Fail;

#[derive(Debug, Fail)]
pub enum FasitError {
    #[fail(display = "item not found in Fasit: {} (404)", body)]
    NotFound { body: String },

    #[fail(display = "error contacting Fasit: {} ({})", body, status)]
    Server { status: u16, body: String },

    #[fail(display = "Fasit gave error message when resolving secret: {} (HTTP {})", body, status)]
    Secret { status: u16, body: String },

    #[fail(display = "Error contacting Fasit: {}", _0)]
    Transport(#[cause] hyper::Error),

    #[fail(display = "could not unmarshal body: {}", _0)]
    Decode(#[cause] serde_json::Error),

    #[fail(display = "could not create request: {}", _0)]
    Url(#[cause] url::ParseError),

    #[fail(display = "could not create request: {}", _0)]
    Request(#[cause] hyper::http::Error),

    #[fail(display = "error parsing Fasit json, {} not found", field)]
    MissingField { field: String },

    #[fail(display = "{}", message)]
    LoadBalancer { message: String },

    #[fail(display = "unable to get resource {} ({}). {}", alias, resource_type, inner)]
    Resource {
        alias: String,
        resource_type: String,
        inner: Box<FasitError>,
    },
}

impl FasitError {
    /// HTTP-status-like code for the failure.
    pub fn code(&self) -> u16 {
        match self {
            FasitError::NotFound { .. } => 404,
            FasitError::Server { status, .. } | FasitError::Secret { status, .. } => *status,
            FasitError::Resource { inner, .. } => inner.code(),
            _ => 500,
        }
    }

    /// The underlying failure, with any per-resource wrapping removed.
    pub fn root(&self) -> &FasitError {
        match self {
            FasitError::Resource { inner, .. } => inner.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self.root() {
            FasitError::NotFound { .. } => true,
            _ => false,
        }
    }
}

impl From<hyper::Error> for FasitError {
    fn from(err: hyper::Error) -> Self {
        FasitError::Transport(err)
    }
}

impl From<serde_json::Error> for FasitError {
    fn from(err: serde_json::Error) -> Self {
        FasitError::Decode(err)
    }
}

impl From<url::ParseError> for FasitError {
    fn from(err: url::ParseError) -> Self {
        FasitError::Url(err)
    }
}

impl From<hyper::http::Error> for FasitError {
    fn from(err: hyper::http::Error) -> Self {
        FasitError::Request(err)
    }
}
