//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use sysextctl::http::{HttpClient, HttpRequest, HttpResponse};
use sysextctl::SysextResult;

/// In-memory bakery: canned responses by URL, every request recorded.
#[derive(Default)]
pub struct FakeBakery {
    responses: HashMap<String, (u16, Vec<u8>)>,
    requests: Mutex<Vec<String>>,
}

impl FakeBakery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.to_string(), (200, body.into()));
        self
    }

    pub fn fail(mut self, url: &str, status: u16) -> Self {
        self.responses
            .insert(url.to_string(), (status, b"unavailable".to_vec()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| *u == url).count()
    }
}

impl HttpClient for FakeBakery {
    fn send(&self, request: &HttpRequest) -> SysextResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.url.clone());
        Ok(match self.responses.get(&request.url) {
            Some((status, body)) => HttpResponse::from_bytes(*status, body.clone()),
            None => HttpResponse::from_bytes(404, "Not Found"),
        })
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// A manifest line in bakery format.
pub fn manifest_line(data: &[u8], filename: &str) -> String {
    format!("{}  {}\n", sha256(data), filename)
}
