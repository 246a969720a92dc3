//! Access decision engine: the single authorization decision point.

use std::sync::Arc;

use crate::{Actor, Decision, DenyReason, PermissionFlags, RuleStore, StoreError, Verb};

/// Decides whether an actor may perform a verb on a business element.
///
/// Holds no state besides the injected store handle; every call reads the
/// store afresh, so rule changes take effect on the next evaluation.
#[derive(Clone)]
pub struct AccessEngine {
    store: Arc<dyn RuleStore>,
}

impl AccessEngine {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    /// Evaluate `verb` on the element named `resource_tag`.
    ///
    /// An empty tag means the caller declared no element, which is denied.
    /// Only a failing store surfaces as `Err`; every absence is a deny.
    pub async fn evaluate(
        &self,
        actor: &Actor,
        resource_tag: &str,
        verb: Verb,
    ) -> Result<Decision, StoreError> {
        self.evaluate_action(actor, resource_tag, Some(verb)).await
    }

    /// Evaluate a raw HTTP method. Methods without a verb are forbidden
    /// (after the authentication check, like every other denial).
    pub async fn evaluate_method(
        &self,
        actor: &Actor,
        resource_tag: &str,
        method: &str,
    ) -> Result<Decision, StoreError> {
        self.evaluate_action(actor, resource_tag, Verb::from_method(method))
            .await
    }

    async fn evaluate_action(
        &self,
        actor: &Actor,
        resource_tag: &str,
        verb: Option<Verb>,
    ) -> Result<Decision, StoreError> {
        if !actor.is_authenticated() {
            return Ok(denied(resource_tag, verb, DenyReason::Unauthenticated));
        }

        let role = match actor.role() {
            Some(role) if !resource_tag.is_empty() => role,
            _ => return Ok(denied(resource_tag, verb, DenyReason::Forbidden)),
        };

        let rule = match self.store.lookup_rule(role, resource_tag).await {
            Ok(Some(rule)) => rule,
            Ok(None) => return Ok(denied(resource_tag, verb, DenyReason::Forbidden)),
            Err(e) => {
                tracing::error!(resource = resource_tag, error = %e, "rule lookup failed");
                return Err(e);
            }
        };

        let decision = decide(&rule.flags, verb);
        match decision {
            Decision::Allow(grant) => tracing::debug!(
                resource = resource_tag,
                verb = %grant.verb,
                own = grant.own,
                all = grant.all,
                "access allowed"
            ),
            Decision::Deny { reason } => log_denial(resource_tag, verb, reason),
        }
        Ok(decision)
    }
}

/// Apply the verb → flag table to a rule's flags.
///
/// Pure: the engine calls this once the rule has been resolved.
pub fn decide(flags: &PermissionFlags, verb: Option<Verb>) -> Decision {
    verb.and_then(|verb| flags.grant_for(verb))
        .map(Decision::Allow)
        .unwrap_or_else(Decision::forbidden)
}

fn denied(resource_tag: &str, verb: Option<Verb>, reason: DenyReason) -> Decision {
    log_denial(resource_tag, verb, reason);
    Decision::deny(reason)
}

fn log_denial(resource_tag: &str, verb: Option<Verb>, reason: DenyReason) {
    tracing::info!(
        resource = resource_tag,
        verb = verb.map(|v| v.as_str()).unwrap_or("none"),
        reason = %reason,
        "access denied"
    );
}
