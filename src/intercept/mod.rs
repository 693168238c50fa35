//! Scenario-driven response interception
//!
//! The automation driver hands every outgoing call to [`Interceptor::handle`].
//! Calls no rule matches are continued by the driver untouched. For a match
//! the real response is fetched, and the scenario's override fields are
//! merged into the rule's target when the guard allows it.
//!
//! ```text
//! page ──request──▶ Interceptor ──no match──▶ Continue
//!                        │
//!                        └─match─▶ Upstream::fetch ─▶ rule.rewrite ─▶ Fulfill
//! ```

mod pattern;
mod rule;
mod upstream;

pub use pattern::UrlPattern;
pub use rule::{Guard, InterceptionRule, RejectReason, Rewrite, TargetPath};
pub use upstream::{HttpUpstream, InterceptedRequest, Upstream, UpstreamResponse};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::Result;
use crate::scenario::Scenario;

/// What happened to a matched response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The scenario was applied to the target
    Mutated { fields: Vec<String> },
    /// Original bytes re-emitted
    PassedThrough(RejectReason),
}

/// A response ready to be fulfilled back to the page
#[derive(Debug, Clone)]
pub struct InterceptOutcome {
    pub rule: String,
    pub response: UpstreamResponse,
    pub disposition: Disposition,
}

/// Decision handed back to the driver for one request
#[derive(Debug, Clone)]
pub enum RouteDecision {
    /// Let the request go to the network as-is
    Continue,
    /// Answer the request with this response
    Fulfill(InterceptOutcome),
}

/// Per-interceptor counters
#[derive(Debug, Default)]
pub struct InterceptStats {
    matched: AtomicUsize,
    mutated: AtomicUsize,
    passed_through: AtomicUsize,
}

impl InterceptStats {
    pub fn matched(&self) -> usize {
        self.matched.load(Ordering::Relaxed)
    }

    pub fn mutated(&self) -> usize {
        self.mutated.load(Ordering::Relaxed)
    }

    pub fn passed_through(&self) -> usize {
        self.passed_through.load(Ordering::Relaxed)
    }
}

/// Rule set bound to one scenario
///
/// Cheap to clone; clones share rules and counters.
#[derive(Clone)]
pub struct Interceptor {
    rules: Arc<Vec<InterceptionRule>>,
    scenario: Arc<Scenario>,
    stats: Arc<InterceptStats>,
}

impl Interceptor {
    pub fn new(rules: Arc<Vec<InterceptionRule>>, scenario: Arc<Scenario>) -> Self {
        Self {
            rules,
            scenario,
            stats: Arc::new(InterceptStats::default()),
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn stats(&self) -> &InterceptStats {
        &self.stats
    }

    /// First rule, in declaration order, covering this request
    pub fn route(&self, request: &InterceptedRequest) -> Option<&InterceptionRule> {
        self.rules
            .iter()
            .find(|rule| rule.matches(&request.method, &request.url))
    }

    /// Decide how the driver should answer `request`
    ///
    /// Upstream failures are returned as errors unchanged; no response is
    /// synthesized in their place.
    pub async fn handle(
        &self,
        request: &InterceptedRequest,
        upstream: &dyn Upstream,
    ) -> Result<RouteDecision> {
        let Some(rule) = self.route(request) else {
            return Ok(RouteDecision::Continue);
        };
        self.stats.matched.fetch_add(1, Ordering::Relaxed);

        let response = upstream.fetch(request).await.map_err(|e| {
            tracing::warn!(rule = rule.name(), url = %request.url, error = %e, "Upstream fetch failed");
            e
        })?;

        Ok(RouteDecision::Fulfill(self.apply(rule, response)))
    }

    /// Apply one rule to an already fetched response
    pub fn apply(&self, rule: &InterceptionRule, response: UpstreamResponse) -> InterceptOutcome {
        match rule.rewrite(&response.body, &self.scenario) {
            Rewrite::Mutated { body, fields } => {
                self.stats.mutated.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    rule = rule.name(),
                    target = %rule.target(),
                    scenario = %self.scenario.label(),
                    ?fields,
                    "Response mutated"
                );
                InterceptOutcome {
                    rule: rule.name().to_string(),
                    response: response.with_body(body),
                    disposition: Disposition::Mutated { fields },
                }
            }
            Rewrite::Untouched(reason) => {
                self.stats.passed_through.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    rule = rule.name(),
                    target = %rule.target(),
                    %reason,
                    "Response passed through"
                );
                InterceptOutcome {
                    rule: rule.name().to_string(),
                    response,
                    disposition: Disposition::PassedThrough(reason),
                }
            }
        }
    }
}
