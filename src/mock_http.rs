//! A `wiremock` server driven from synchronous tests.
//!
//! The clients under test use blocking reqwest, which must not run inside an
//! async context. The server gets its own runtime and only mounting and
//! inspection go through `block_on`; requests are sent from the test thread.

use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer, Request};

pub struct MockHttp {
    server: MockServer,
    rt: Runtime,
}

impl MockHttp {
    pub fn start() -> Self {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        MockHttp { server, rt }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }

    /// Received requests whose path is exactly `path`.
    pub fn requests_to(&self, path: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.path() == path)
            .collect()
    }
}
