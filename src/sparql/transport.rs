//! The transport seam: anything that can answer a SELECT query with bindings.
//!
//! [`HttpTransport`] speaks the SPARQL 1.1 protocol over HTTP POST using
//! `ureq`. Requests are bounded by the configured timeout; a non-200 answer
//! or a network failure is surfaced as a [`TransportError`] and never retried
//! here.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{TransportError, TransportResult};

use super::{Binding, SparqlResults};

const ACCEPT: &str = "application/sparql-results+json";
const CONTENT_TYPE: &str = "application/sparql-query; charset=UTF-8";

/// Number of characters of an error body kept in [`TransportError::Status`].
const ERROR_BODY_PREVIEW: usize = 200;

/// Executes SELECT queries.
pub trait SparqlTransport: Send + Sync {
    /// Run `query` and return the solution rows.
    fn select(&self, query: &str) -> TransportResult<Vec<Binding>>;
}

impl<T: SparqlTransport + ?Sized> SparqlTransport for Box<T> {
    fn select(&self, query: &str) -> TransportResult<Vec<Binding>> {
        (**self).select(query)
    }
}

impl<T: SparqlTransport + ?Sized> SparqlTransport for Arc<T> {
    fn select(&self, query: &str) -> TransportResult<Vec<Binding>> {
        (**self).select(query)
    }
}

/// SPARQL-over-HTTP client for a single endpoint.
pub struct HttpTransport {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Create a transport whose requests fail after `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn network_error(&self, message: impl ToString) -> TransportError {
        TransportError::Network {
            endpoint: self.endpoint.clone(),
            message: message.to_string(),
        }
    }
}

impl SparqlTransport for HttpTransport {
    fn select(&self, query: &str) -> TransportResult<Vec<Binding>> {
        debug!(endpoint = %self.endpoint, len = query.len(), "posting SPARQL query");

        let response = match self
            .agent
            .post(&self.endpoint)
            .set("Accept", ACCEPT)
            .set("Content-Type", CONTENT_TYPE)
            .send_bytes(query.as_bytes())
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(TransportError::Status {
                    status,
                    body: preview(&body),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(self.network_error(transport));
            }
        };

        // ureq only errors on 4xx/5xx; anything else that is not 200 is still a failure.
        let status = response.status();
        if status != 200 {
            let body = response.into_string().unwrap_or_default();
            return Err(TransportError::Status {
                status,
                body: preview(&body),
            });
        }

        let bindings = SparqlResults::from_reader(response.into_reader())?.into_bindings();
        debug!(rows = bindings.len(), "SPARQL query answered");
        Ok(bindings)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serve exactly one HTTP response, returning the raw request it received.
    fn serve_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/query", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "{status_line}\r\nContent-Type: application/sparql-results+json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (url, handle)
    }

    #[test]
    fn posts_query_with_negotiation_headers() {
        let body = r#"{"results": {"bindings": [
            {"muni": {"type": "uri", "value": "https://ld.admin.ch/municipality/351"},
             "label": {"type": "literal", "value": "Bern"}}
        ]}}"#
            .to_string();
        let (url, server) = serve_once("HTTP/1.1 200 OK", body);

        let transport = HttpTransport::new(url, Duration::from_secs(5));
        let rows = transport.select("SELECT * WHERE { ?s ?p ?o }").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["label"].value(), "Bern");

        let request = server.join().unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("POST /query"));
        assert!(lower.contains("accept: application/sparql-results+json"));
        assert!(lower.contains("content-type: application/sparql-query; charset=utf-8"));
        assert!(request.ends_with("SELECT * WHERE { ?s ?p ?o }"));
    }

    #[test]
    fn non_200_is_a_status_error_with_truncated_body() {
        let (url, server) = serve_once("HTTP/1.1 503 Service Unavailable", "x".repeat(500));

        let transport = HttpTransport::new(url, Duration::from_secs(5));
        let err = transport.select("ASK {}").unwrap_err();
        server.join().unwrap();

        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body.len(), ERROR_BODY_PREVIEW);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn connection_refused_is_a_network_error() {
        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let transport = HttpTransport::new(
            format!("http://127.0.0.1:{port}/query"),
            Duration::from_secs(2),
        );
        let err = transport.select("ASK {}").unwrap_err();
        assert!(matches!(err, TransportError::Network { .. }));
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", "<html>maintenance</html>".into());
        let transport = HttpTransport::new(url, Duration::from_secs(5));
        let err = transport.select("ASK {}").unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, TransportError::Decode { .. }));
    }
}
