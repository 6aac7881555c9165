//! Shared fixtures for the release feed integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use openmower_cli::config::ReleaseConfig;
use openmower_cli::update::ReleaseFeed;
use serde_json::{Value, json};
use std::io::Write;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

pub const REPO: &str = "ClemensElflein/openmower-cli";

/// A feed pointed at `server` that creates scratch dirs under `scratch_root`.
pub fn feed(server: &MockServer, scratch_root: &Path) -> ReleaseFeed {
    ReleaseFeed::new(&ReleaseConfig {
        api_base: server.uri(),
        scratch_root: Some(scratch_root.to_owned()),
        ..Default::default()
    })
}

/// Build an in-memory zip archive.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Release JSON with one asset per name, each served from `/download/<name>`.
pub fn release_json(server: &MockServer, tag: &str, asset_names: &[&str]) -> Value {
    let assets: Vec<Value> = asset_names
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "browser_download_url": format!("{}/download/{name}", server.uri()),
            })
        })
        .collect();
    json!({ "tag_name": tag, "assets": assets })
}

/// Serve `body` as the latest release of `repo`.
pub async fn mount_latest(server: &MockServer, repo: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{repo}/releases/latest")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serve `bytes` at `/download/<name>`.
pub async fn mount_asset(server: &MockServer, name: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(server)
        .await;
}

/// Entries left in a directory.
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
