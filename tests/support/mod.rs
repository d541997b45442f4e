//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use myrient_dl::FileDescriptor;
use myrient_dl::download::{DownloadError, ProgressObserver, Sleeper};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records requested backoff delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Cancels the run as soon as a backoff starts, then never wakes up.
#[derive(Debug)]
pub struct CancellingSleeper {
    pub token: CancellationToken,
}

#[async_trait]
impl Sleeper for CancellingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.token.cancel();
        std::future::pending::<()>().await;
    }
}

/// Observer that records every event as a line of text.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_start(&self, file: &FileDescriptor, current: usize, total: usize) {
        self.push(format!("start {} {current}/{total}", file.name));
    }

    fn on_skip(&self, file: &FileDescriptor) {
        self.push(format!("skip {}", file.name));
    }

    fn on_size_mismatch(&self, file: &FileDescriptor, local: u64, remote: u64) {
        self.push(format!("mismatch {} {local} {remote}", file.name));
    }

    fn on_retry(&self, file: &FileDescriptor, attempt: u32, _delay: Duration, _error: &DownloadError) {
        self.push(format!("retry {} {attempt}", file.name));
    }
}

/// Descriptor for `/files/{name}` on `server`.
pub fn descriptor(server: &MockServer, name: &str) -> FileDescriptor {
    FileDescriptor::new(name, format!("{}/files/{name}", server.uri()), 0)
}

/// Mounts HEAD and GET mocks serving `body` at `/files/{name}`.
pub async fn mount_file(server: &MockServer, name: &str, body: &[u8]) {
    Mock::given(method("HEAD"))
        .and(path(format!("/files/{name}")))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Content-Length", body.len().to_string()),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/files/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Mounts a HEAD mock answering `status` at `/files/{name}`.
pub async fn mount_head_status(server: &MockServer, name: &str, status: u16) {
    Mock::given(method("HEAD"))
        .and(path(format!("/files/{name}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Apache-style listing page for `(name, size)` rows.
pub fn listing_html(rows: &[(&str, &str)]) -> String {
    let mut html = String::from(
        "<html><body><h1>Index of /files</h1>\n<table id=\"list\">\n\
         <tr><th><a href=\"?C=N;O=D\">Name</a></th><th><a href=\"?C=S;O=A\">Size</a></th></tr>\n\
         <tr><td><a href=\"../\">Parent Directory</a></td><td>-</td></tr>\n",
    );
    for (name, size) in rows {
        let href = urlencoding::encode(name);
        html.push_str(&format!(
            "<tr><td><a href=\"{href}\">{name}</a></td><td>{size}</td></tr>\n"
        ));
    }
    html.push_str("</table></body></html>");
    html
}
