// Transport layer: the one place that talks HTTP. Everything above it
// works against the `Transport` trait so it can be driven by a scripted
// backend in tests.

use reqwest::blocking::{multipart, Client};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Performs one request against the backend and returns the parsed JSON
/// body. An empty body comes back as `{}`.
pub trait Transport {
    fn send(&self, request: Request) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Extra headers, sent after the auth header.
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(Value),
    Multipart(Upload),
}

/// A multipart form: plain text fields plus one file sent as `file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub fields: Vec<(String, String)>,
    pub file: PathBuf,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Request {
            method: Method::GET,
            path: path.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self> {
        let body = serde_json::to_value(body).map_err(Error::Encode)?;
        Ok(Request {
            method: Method::POST,
            path: path.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: Body::Json(body),
        })
    }

    pub fn post_multipart(path: impl Into<String>, upload: Upload) -> Self {
        Request {
            method: Method::POST,
            path: path.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: Body::Multipart(upload),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }
}

/// Blocking reqwest transport. One request at a time, bounded by the
/// configured timeout.
pub struct HttpTransport {
    client: Client,
    config: Config,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Request)?;
        Ok(HttpTransport {
            client,
            config: config.clone(),
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(password) = &self.config.password {
            let val = HeaderValue::from_str(&format!("Bearer {}", password)).map_err(|_| {
                Error::Configuration("password contains characters not allowed in a header".into())
            })?;
            headers.insert(AUTHORIZATION, val);
        }
        Ok(headers)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: Request) -> Result<Value> {
        let url = self.config.endpoint(&request.path);
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(self.auth_headers()?);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(body) => builder.json(&body),
            Body::Multipart(upload) => builder.multipart(upload_form(upload)?),
        };

        let res = builder.send().map_err(|e| {
            warn!(method = %request.method, %url, error = %e, "request failed");
            Error::Request(e)
        })?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            warn!(method = %request.method, %url, status = status.as_u16(), "backend returned an error");
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = res.bytes().map_err(Error::Request)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_slice(&bytes).map_err(|source| Error::Decode {
            what: "JSON",
            source,
        })
    }
}

fn upload_form(upload: Upload) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for (name, value) in upload.fields {
        form = form.text(name, value);
    }
    form.file("file", &upload.file).map_err(|source| Error::Io {
        path: upload.file.clone(),
        source,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn transport(server: &MockServer, password: Option<&str>) -> HttpTransport {
        let cfg = Config::new(&server.base_url(), password.map(str::to_string));
        HttpTransport::new(&cfg).unwrap()
    }

    #[test]
    fn attaches_bearer_header_and_api_prefix() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/notebooks")
                .header("authorization", "Bearer s3cret");
            then.status(200).json_body(json!([{"id": "n1", "name": "Research"}]));
        });

        let v = transport(&server, Some("s3cret"))
            .send(Request::get("/notebooks"))
            .unwrap();
        assert_eq!(v, json!([{"id": "n1", "name": "Research"}]));
        mock.assert();
    }

    #[test]
    fn empty_body_is_an_empty_mapping() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/notes");
            then.status(201);
        });

        let req = Request::post("/notes", &json!({"content": "x"})).unwrap();
        let v = transport(&server, None).send(req).unwrap();
        assert_eq!(v, json!({}));
    }

    #[test]
    fn non_success_is_a_status_error_with_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/commands/missing");
            then.status(404).body("command not found");
        });

        let err = transport(&server, None)
            .send(Request::get("/commands/missing"))
            .unwrap_err();
        match err {
            Error::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "command not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn connection_failure_is_a_request_error() {
        let cfg = Config::new("http://127.0.0.1:1", None);
        let err = HttpTransport::new(&cfg)
            .unwrap()
            .send(Request::get("/notebooks"))
            .unwrap_err();
        assert!(matches!(err, Error::Request(_)), "{err:?}");
    }

    #[test]
    fn extra_headers_are_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/models")
                .header("x-request-source", "cli");
            then.status(200).json_body(json!([]));
        });

        transport(&server, None)
            .send(Request::get("/models").header("x-request-source", "cli"))
            .unwrap();
        mock.assert();
    }

    #[test]
    fn query_params_are_encoded() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/notes")
                .query_param("notebook_id", "notebook:1");
            then.status(200).json_body(json!([]));
        });

        transport(&server, None)
            .send(Request::get("/notes").query("notebook_id", "notebook:1"))
            .unwrap();
        mock.assert();
    }

    #[test]
    fn multipart_upload_sends_fields_and_file() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/sources")
                .body_contains("name=\"type\"")
                .body_contains("paper body")
                .body_contains("filename=\"paper.txt\"");
            then.status(200).json_body(json!({"id": "source:1"}));
        });

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("paper.txt");
        std::fs::write(&file, "paper body").unwrap();
        let upload = Upload {
            fields: vec![("type".into(), "file".into())],
            file,
        };
        let v = transport(&server, None)
            .send(Request::post_multipart("/sources", upload))
            .unwrap();
        assert_eq!(v["id"], "source:1");
        mock.assert();
    }
}
