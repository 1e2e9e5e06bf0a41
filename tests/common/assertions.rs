//! Custom assertions for integration tests

use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use wiremock::MockServer;

/// Relative paths of all files under `root`, sorted
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Assert that `root` contains exactly `expected` (relative path, content)
pub fn assert_tree(root: &Path, expected: &[(&str, &[u8])]) {
    let mut expected_paths: Vec<PathBuf> = expected.iter().map(|(p, _)| PathBuf::from(p)).collect();
    expected_paths.sort();
    assert_eq!(files_under(root), expected_paths);

    for (relative, content) in expected {
        let actual = std::fs::read(root.join(relative)).unwrap();
        assert_eq!(&actual, content, "content mismatch for {}", relative);
    }
}

/// Number of received requests whose query has `key=value`
pub async fn count_requests_with(server: &MockServer, key: &str, value: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.query_pairs().any(|(k, v)| k == key && v == value))
        .count()
}

/// Assert that every received request carried `secret` as its api_key parameter
pub async fn assert_every_request_carries_key(server: &MockServer, secret: &str) {
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(!requests.is_empty());
    for request in requests {
        let key = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "api_key")
            .map(|(_, v)| v.into_owned());
        assert_eq!(key.as_deref(), Some(secret), "missing key on {}", request.url);
    }
}
