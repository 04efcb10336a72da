// Executor tests against a local HTTP server.

use std::io::Cursor;
use std::time::Duration;

use httptest::{matchers::*, responders::*, Expectation, Server};

use super::*;
use crate::collector::{MemoryCollector, RunReport};
use crate::config::parse_site;
use crate::initialization::init_client;

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .expect("encode jpeg");
    buf.into_inner()
}

async fn run(server: &Server, body: &str) -> RunReport {
    let doc = format!("host: http://{}\n{}", server.addr(), body);
    let site = parse_site(&doc).expect("valid site document");
    let client = init_client(site.timeout).expect("client");

    let mut collector = MemoryCollector::new();
    CheckExecutor::new(client, &mut collector).execute(&site).await;
    collector.into_report()
}

fn passed(report: &RunReport) -> Vec<String> {
    report
        .requests()
        .flat_map(|(_, r)| r.validations.iter())
        .filter(|v| v.passed)
        .map(|v| v.check.clone())
        .collect()
}

fn failed(report: &RunReport) -> Vec<String> {
    report
        .requests()
        .flat_map(|(_, r)| r.validations.iter())
        .filter(|v| !v.passed)
        .map(|v| v.check.clone())
        .collect()
}

#[tokio::test]
async fn test_reader_fans_out_to_extracted_image() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/"))
            .times(1)
            .respond_with(
                status_code(200)
                    .insert_header("Content-Type", "text/html; charset=utf-8")
                    .body(r#"<html><head><meta property="og:image" content="/image.jpg"></head><body></body></html>"#),
            ),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/image.jpg"))
            .times(1)
            .respond_with(
                status_code(200)
                    .insert_header("Content-Type", "image/jpeg")
                    .body(jpeg(120, 120)),
            ),
    );

    let report = run(
        &server,
        r#"
checks:
  - request: /
    response:
      - ValidResponse
      - validator: HasHeaders
        headers:
          content-type: text/html
      - reader: ParseHTML
        query:
          selector: 'meta[property="og:image"]'
          action: ReadProperty
          property: content
          checks:
            - response:
                - ValidResponse
                - validator: ValidImage
                  min_size: 100x100
"#,
    )
    .await;

    assert!(!report.has_errors);
    assert_eq!(report.requests().count(), 2);
    assert_eq!(passed(&report).len(), 5);

    let records: Vec<_> = report.requests().map(|(_, r)| r).collect();
    assert!(records[0].extracted[0].ends_with("/image.jpg"));
    assert!(records[1].url.ends_with("/image.jpg"));
}

#[tokio::test]
async fn test_failure_stops_node_and_skips_nested_checks() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/"))
            .times(1)
            .respond_with(status_code(500).body("<a href='/x'>x</a>")),
    );

    let report = run(
        &server,
        r#"
checks:
  - request: /
    response:
      - ValidResponse
      - reader: ParseHTML
        query: {selector: a, action: ReadProperty, property: href, checks: [{response: [ValidResponse]}]}
    checks:
      - request: /never
"#,
    )
    .await;

    assert!(report.has_errors);
    assert_eq!(report.requests().count(), 1);
    assert_eq!(failed(&report), vec!["ValidResponse"]);
    assert!(passed(&report).is_empty());
}

#[tokio::test]
async fn test_optional_selector_without_match_passes() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/"))
            .respond_with(status_code(200).body("<p>no icons here</p>")),
    );

    let report = run(
        &server,
        r#"
checks:
  - response:
      - reader: ParseHTML
        query: {selector: "link[rel=icon]", action: ReadProperty, property: href, optional: true, checks: [{response: [ValidFavicon]}]}
"#,
    )
    .await;

    assert!(!report.has_errors);
    assert_eq!(report.requests().count(), 1);
    assert_eq!(passed(&report), vec![r#"ParseHTML("link[rel=icon]")"#]);
}

#[tokio::test]
async fn test_invalid_branch_reported_and_siblings_run() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/ok"))
            .times(1)
            .respond_with(status_code(200)),
    );

    let report = run(
        &server,
        r#"
checks:
  - request: /broken
    response: [ValidNothing]
  - request: /ok
    response: [ValidResponse]
"#,
    )
    .await;

    assert!(report.has_errors);
    let site = &report.configs[0].sites[0];
    assert_eq!(site.errors.len(), 1);
    assert_eq!(site.requests.len(), 1);
    assert_eq!(passed(&report), vec!["ValidResponse"]);
}

#[tokio::test]
async fn test_node_checks_inherit_method_and_headers() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/docs/"),
            request::headers(contains(("x-team", "web"))),
        ])
        .times(1)
        .respond_with(status_code(200)),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/docs/intro.html"),
            request::headers(contains(("x-team", "web"))),
        ])
        .times(1)
        .respond_with(status_code(200)),
    );

    let report = run(
        &server,
        r#"
headers:
  X-Team: web
checks:
  - request: /docs/
    response: [ValidResponse]
    checks:
      - request: intro.html
        response: [ValidResponse]
"#,
    )
    .await;

    assert!(!report.has_errors);
    assert_eq!(passed(&report).len(), 2);
}

#[tokio::test]
async fn test_timeout_is_reported_as_transport_error() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/slow")).respond_with(
            delay_and_then(Duration::from_secs(3), status_code(200)),
        ),
    );

    let report = run(
        &server,
        "timeout: 0.3\nchecks:\n  - request: /slow\n    response: [ValidResponse]\n",
    )
    .await;

    assert!(report.has_errors);
    let record = report.requests().next().map(|(_, r)| r).unwrap();
    assert!(record.transport_error.is_some());
    assert!(record.validations.is_empty());
    assert_eq!(
        record.observation(),
        Some(crate::collector::Observation::Failure)
    );
}

#[tokio::test]
async fn test_ungzip_feeds_following_reader() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let sitemap = format!(
        "<urlset><url><loc>http://{}/page</loc></url></urlset>",
        "127.0.0.1"
    );
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(sitemap.as_bytes()).unwrap();
    let gz = encoder.finish().unwrap();

    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/sitemap.xml.gz")).respond_with(
            status_code(200)
                .insert_header("Content-Type", "application/octet-stream")
                .body(gz),
        ),
    );

    let report = run(
        &server,
        r#"
checks:
  - request: /sitemap.xml.gz
    response:
      - UnGzip
      - reader: ParseXML
        query: {selector: loc, action: ReadContent}
"#,
    )
    .await;

    assert!(!report.has_errors);
    let record = report.requests().next().map(|(_, r)| r).unwrap();
    assert_eq!(record.extracted, vec!["http://127.0.0.1/page"]);
}
