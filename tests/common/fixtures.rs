//! Service responses and client setup for integration tests

use qblast::{ClientConfig, JobClient, ManualClock, PollConfig};
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

/// Path the mock service answers on
pub const ENDPOINT_PATH: &str = "/Blast.cgi";

/// Render an HTML page carrying a status envelope with `fields`
pub fn qblast_page(fields: &[(&str, &str)]) -> String {
    let mut lines = String::new();
    for (key, value) in fields {
        lines.push_str(&format!("    {} = {}\n", key, value));
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>NCBI Blast</title></head>\n<body>\n\
         <!--QBlastInfoBegin\n{lines}QBlastInfoEnd\n-->\n\
         <p id=\"msg\">Request processed</p>\n</body>\n</html>\n"
    )
}

/// Build an in-memory ZIP archive with the given entries
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Client configuration pointing at `server`, with the default poll schedule
pub fn test_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        endpoint: url::Url::parse(&format!("{}{}", server.uri(), ENDPOINT_PATH)).unwrap(),
        poll: PollConfig {
            interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(10),
            deadline: None,
        },
        ..Default::default()
    }
}

/// Client against `server` driven by a virtual clock
pub fn manual_client(config: ClientConfig) -> (JobClient, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let client = JobClient::with_clock(config, clock.clone()).unwrap();
    (client, clock)
}

/// Matcher for submission requests
pub fn submit_request() -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(ENDPOINT_PATH))
        .and(query_param("CMD", "Put"))
}

/// Matcher for status checks of `rid`
pub fn status_request(rid: &str) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(ENDPOINT_PATH))
        .and(query_param("CMD", "Get"))
        .and(query_param("FORMAT_OBJECT", "SearchInfo"))
        .and(query_param("RID", rid))
}

/// Matcher for result downloads of `rid` in protocol format `token`
pub fn download_request(rid: &str, token: &str) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(ENDPOINT_PATH))
        .and(query_param("CMD", "Get"))
        .and(query_param("FORMAT_TYPE", token))
        .and(query_param("RID", rid))
}

/// 200 response whose body is a status page with `fields`
pub fn page(fields: &[(&str, &str)]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(qblast_page(fields))
}

/// Mount the submit response assigning `rid` with an estimated wait of `rtoe` seconds
pub async fn mount_submit(server: &MockServer, rid: &str, rtoe: &str) {
    submit_request()
        .respond_with(page(&[("RID", rid), ("RTOE", rtoe)]))
        .expect(1)
        .mount(server)
        .await;
}
