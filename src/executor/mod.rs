//! Recursive check execution.
//!
//! Walks a site's check tree depth-first. For every check the request spec is
//! resolved against the current [`Scope`], the request performed, and the
//! node's operations run in order on the response. The first failing
//! operation stops the node. Nested checks (those of reader queries, once per
//! extracted URL, and the node's own `checks`) run only after the whole
//! pipeline passed, each rooted at its new base URL.

use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use url::Url;

use crate::collector::EventCollector;
use crate::config::{CheckNode, CheckSlot, SiteConfig};
use crate::fetch::{
    self, join_url, resolve_requests, CheckRequest, RequestId, ResolvedRequest, ResponseContext,
    Scope,
};
use crate::error_handling::ValidationFailure;
use crate::operations::Operation;

/// Checks to run after a node's pipeline passed.
struct Descent<'n> {
    base_url: Url,
    checks: &'n [CheckSlot],
    under_reader: bool,
}

/// Runs check trees, reporting every event to a collector.
pub struct CheckExecutor<'c> {
    client: reqwest::Client,
    collector: &'c mut dyn EventCollector,
    next_id: u64,
}

impl<'c> CheckExecutor<'c> {
    pub fn new(client: reqwest::Client, collector: &'c mut dyn EventCollector) -> Self {
        Self {
            client,
            collector,
            next_id: 0,
        }
    }

    /// Runs all checks of a site.
    pub async fn execute(&mut self, site: &SiteConfig) {
        self.collector.start_site(site);
        let scope = Scope::new(site.base_url.clone(), site.method, site.headers.clone());
        self.process_checks(scope, &site.checks).await;
    }

    fn process_checks<'a>(&'a mut self, scope: Scope, checks: &'a [CheckSlot]) -> BoxFuture<'a, ()> {
        async move {
            for slot in checks {
                match slot {
                    CheckSlot::Valid(node) => self.process_node(&scope, node).await,
                    CheckSlot::Invalid { request, error } => {
                        self.collector.check_error(request, error)
                    }
                }
            }
        }
        .boxed()
    }

    async fn process_node(&mut self, scope: &Scope, node: &CheckNode) {
        let requests = match resolve_requests(&node.request, scope) {
            Ok(requests) => requests,
            Err(e) => {
                self.collector.check_error(&node.request.to_string(), &e);
                return;
            }
        };

        for resolved in requests {
            let request = self.prepare(resolved, node);
            self.collector.start_check(&request);

            let Some(mut response) = self.call_url(&request).await else {
                continue;
            };
            let Some(descents) = self.run_pipeline(&request, node, &mut response) else {
                continue;
            };
            // the response body is not needed below this point
            drop(response);

            for descent in descents {
                let child = scope.descend(descent.base_url, descent.under_reader);
                self.process_checks(child, descent.checks).await;
            }
        }
    }

    fn prepare(&mut self, resolved: ResolvedRequest, node: &CheckNode) -> CheckRequest {
        self.next_id += 1;
        CheckRequest {
            id: RequestId(self.next_id),
            url: resolved.url,
            method: resolved.method,
            headers: resolved.headers,
            danger: node.danger,
            title: node.title.clone(),
        }
    }

    async fn call_url(&mut self, request: &CheckRequest) -> Option<ResponseContext> {
        self.collector.open_url(request);
        let start = Instant::now();
        match fetch::perform(&self.client, request).await {
            Ok(response) => {
                self.collector.url_response(request, start.elapsed(), &response);
                Some(response)
            }
            Err(e) => {
                log::debug!("{} {} failed: {}", request.method, request.url, e);
                self.collector.url_error(request, start.elapsed(), &e);
                None
            }
        }
    }

    /// Runs the node's operations; `None` when one of them failed.
    fn run_pipeline<'n>(
        &mut self,
        request: &CheckRequest,
        node: &'n CheckNode,
        response: &mut ResponseContext,
    ) -> Option<Vec<Descent<'n>>> {
        let mut descents = Vec::new();

        for operation in &node.response {
            let name = operation.name();
            let outcome = match operation {
                Operation::Validate(validator) => validator.validate(response),
                Operation::Read(reader) => self.read(request, reader, &name, response, &mut descents),
            };

            match outcome {
                Ok(()) => self.collector.check_success(request, &name),
                Err(failure) => {
                    self.collector.check_failure(request, &name, &failure, response);
                    return None;
                }
            }
        }

        if !node.checks.is_empty() {
            descents.push(Descent {
                base_url: response.url.clone(),
                checks: &node.checks,
                under_reader: false,
            });
        }
        Some(descents)
    }

    fn read<'n>(
        &mut self,
        request: &CheckRequest,
        reader: &'n crate::operations::Reader,
        name: &str,
        response: &ResponseContext,
        descents: &mut Vec<Descent<'n>>,
    ) -> Result<(), ValidationFailure> {
        let extractions = reader.extract(&response.content)?;

        // resolve everything first so a bad value fails the reader before any event
        let mut found = Vec::new();
        for extraction in extractions {
            for value in &extraction.values {
                let url = join_url(&response.url, value).map_err(|e| {
                    ValidationFailure::new(format!("Extracted value is not a URL: {e}"))
                })?;
                found.push((url, extraction.query));
            }
        }

        for (url, query) in found {
            self.collector.extracted(request, name, &url);
            if !query.checks.is_empty() {
                descents.push(Descent {
                    base_url: url,
                    checks: &query.checks,
                    under_reader: true,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
