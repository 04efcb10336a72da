//! HTML run reports.

use anyhow::Context;
use handlebars::Handlebars;
use serde_json::json;

use crate::collector::RunReport;

const REPORT_TEMPLATE: &str = "report";

const REPORT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Site monitor report</title>
<style>
  body { font-family: sans-serif; font-size: 14px; }
  table { border-collapse: collapse; margin-bottom: 1em; }
  td, th { border: 1px solid #ccc; padding: 2px 6px; text-align: left; }
  .error { color: #b00; }
  .ok { color: #080; }
</style>
</head>
<body>
<h1>Site monitor report from {{hostname}}</h1>
<p>Run started {{report.started}}{{#if report.has_errors}}, <span class="error">errors found</span>{{else}}, <span class="ok">all checks passed</span>{{/if}}.</p>
{{#each report.configs}}
<h2>{{path}}</h2>
{{#each errors}}
<p class="error">{{message}}</p>
{{/each}}
{{#each sites}}
<h3>{{#if title}}{{title}} ({{url}}){{else}}{{url}}{{/if}}</h3>
{{#each errors}}
<p class="error">{{#if request}}Request {{request}}: {{/if}}{{message}}</p>
{{/each}}
<table>
<tr><th>Request</th><th>Status</th><th>Time</th><th>Checks</th></tr>
{{#each requests}}
<tr>
<td>{{#if title}}<b>{{title}}</b><br>{{/if}}{{method}} {{url}}</td>
<td>{{#if status}}{{status}}{{else}}-{{/if}}</td>
<td>{{#if elapsed_ms}}{{elapsed_ms}} ms{{/if}}</td>
<td>
{{#if transport_error}}<span class="error">{{transport_error}}</span><br>{{/if}}
{{#each validations}}
{{#if passed}}<span class="ok">&#10003; {{check}}</span>{{else}}<span class="error">&#10007; {{check}}: {{message}}</span>{{/if}}<br>
{{/each}}
</td>
</tr>
{{#if failed}}
<tr><td colspan="4"><small>
{{#each headers}}{{@key}}: {{this}}<br>{{/each}}
{{#each response_headers}}{{name}}: {{value}}<br>{{/each}}
</small></td></tr>
{{/if}}
{{/each}}
</table>
{{/each}}
{{/each}}
</body>
</html>
"#;

fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown host".to_string())
}

/// Renders the run as an HTML document.
///
/// Failed requests are listed with their request and response headers so the
/// report is enough to start debugging from.
pub fn render_report(report: &RunReport) -> anyhow::Result<String> {
    let mut registry = Handlebars::new();
    registry
        .register_template_string(REPORT_TEMPLATE, REPORT_HTML)
        .context("registering report template")?;

    let data = json!({
        "hostname": local_hostname(),
        "report": report,
    });
    registry
        .render(REPORT_TEMPLATE, &data)
        .context("rendering report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{EventCollector, MemoryCollector};
    use crate::error_handling::{ConfigError, ValidationFailure};
    use crate::fetch::{CheckRequest, Headers, HttpMethod, RequestId, ResponseContext};
    use reqwest::header::HeaderMap;
    use std::time::Duration;
    use url::Url;

    #[test]
    fn test_report_lists_failures_and_escapes() {
        let mut collector = MemoryCollector::new();
        collector.open_config("/data/<shop>.yml");
        collector.check_error("\"/x\"", &ConfigError::UnknownOperation("ValidNothing".into()));

        let request = CheckRequest {
            id: RequestId(1),
            url: Url::parse("https://example.com/cart").unwrap(),
            method: HttpMethod::Get,
            headers: Headers::from([("accept".to_string(), "text/html".to_string())]),
            danger: 1,
            title: Some("Cart".into()),
        };
        let response = ResponseContext::new(request.url.clone(), 502, HeaderMap::new(), Vec::new());
        collector.open_url(&request);
        collector.url_response(&request, Duration::from_millis(40), &response);
        collector.check_failure(
            &request,
            "ValidResponse",
            &ValidationFailure::new("Invalid response status: 502"),
            &response,
        );

        let html = render_report(collector.report()).unwrap();
        assert!(html.contains("/data/&lt;shop&gt;.yml"));
        assert!(html.contains("Invalid response processor: ValidNothing"));
        assert!(html.contains("https://example.com/cart"));
        assert!(html.contains("Invalid response status: 502"));
        assert!(html.contains("accept: text/html"));
        assert!(html.contains("errors found"));
    }

    #[test]
    fn test_clean_report() {
        let report = RunReport::new();
        let html = render_report(&report).unwrap();
        assert!(html.contains("all checks passed"));
    }
}
