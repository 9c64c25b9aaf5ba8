//! Validation of signed multi-statement assertions.
//!
//! Checks run in a fixed order and the first failure is returned:
//! 1. the assertion is signed
//! 2. time conditions hold, widened by the clock skew
//! 3. the signing credential is resolved
//! 4. a sub-authenticator accepts the signing credential
//! 5. one policy per statement is built, issued by the signer
//! 6. audience restrictions are satisfied when required
//! 7. the assertion id has not been seen before from the same issuer, when
//!    replay detection is on

use std::borrow::Cow;
use std::sync::Arc;

use sectoken_claims::{
    AuthorizationPolicy, Claim, ClaimSet, ValidityWindow, claim_types,
};
use time::{Duration, OffsetDateTime};
use url::Url;

use token_auth_sdk::platform::Clock;
use token_auth_sdk::{
    Assertion, AudienceFailure, AudienceMode, KeyResolver, SecurityToken, SignerReference,
    Statement, TimeViolation, TokenAuthenticator, ValidationError,
};

use crate::domain::pending::PendingOperation;
use crate::domain::replay::ReplayCache;

struct AllowedAudience {
    raw: String,
    normalized: Option<Url>,
}

impl AllowedAudience {
    fn new(raw: String) -> Self {
        let normalized = absolute_url(&raw);
        Self { raw, normalized }
    }

    fn matches(&self, candidate: &str) -> bool {
        if self.raw == candidate {
            return true;
        }
        match (&self.normalized, absolute_url(candidate)) {
            (Some(allowed), Some(candidate)) => *allowed == candidate,
            _ => false,
        }
    }
}

fn absolute_url(raw: &str) -> Option<Url> {
    Url::parse(raw).ok().filter(|url| !url.cannot_be_a_base())
}

/// Composite authenticator for signed assertions.
pub struct AssertionValidator {
    sub_authenticators: Arc<[Arc<dyn TokenAuthenticator>]>,
    resolver: Arc<dyn KeyResolver>,
    clock: Arc<dyn Clock>,
    audience_mode: AudienceMode,
    allowed_audiences: Vec<AllowedAudience>,
    max_clock_skew: Duration,
    replay_cache: Option<ReplayCache>,
}

impl AssertionValidator {
    /// Validator with the default audience mode (`Always`), no allowed
    /// audiences, zero skew and no replay detection.
    #[must_use]
    pub fn new(
        sub_authenticators: Arc<[Arc<dyn TokenAuthenticator>]>,
        resolver: Arc<dyn KeyResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sub_authenticators,
            resolver,
            clock,
            audience_mode: AudienceMode::default(),
            allowed_audiences: Vec::new(),
            max_clock_skew: Duration::ZERO,
            replay_cache: None,
        }
    }

    #[must_use]
    pub fn with_audiences(mut self, mode: AudienceMode, allowed: Vec<String>) -> Self {
        self.audience_mode = mode;
        self.allowed_audiences = allowed.into_iter().map(AllowedAudience::new).collect();
        self
    }

    #[must_use]
    pub fn with_max_clock_skew(mut self, skew: Duration) -> Self {
        self.max_clock_skew = skew;
        self
    }

    #[must_use]
    pub fn with_replay_detection(mut self, capacity: usize) -> Self {
        self.replay_cache = Some(ReplayCache::new(capacity));
        self
    }

    /// [`TokenAuthenticator::validate`] on the blocking pool.
    pub fn validate_async(
        self: &Arc<Self>,
        token: SecurityToken,
    ) -> PendingOperation<Vec<AuthorizationPolicy>, ValidationError> {
        let validator = Arc::clone(self);
        PendingOperation::spawn(move || validator.validate(&token))
    }

    fn check_time(&self, assertion: &Assertion, now: OffsetDateTime) -> Result<(), ValidationError> {
        let Some(conditions) = &assertion.conditions else {
            return Ok(());
        };
        let skew = self.max_clock_skew;

        let violation = if let Some(not_before) = conditions.not_before
            && now.saturating_add(skew) < not_before
        {
            TimeViolation::NotYetValid { not_before, now }
        } else if let Some(not_on_or_after) = conditions.not_on_or_after
            && now.saturating_sub(skew) >= not_on_or_after
        {
            TimeViolation::Expired {
                expired_at: not_on_or_after,
                now,
            }
        } else {
            return Ok(());
        };

        Err(ValidationError::TimeInvalid {
            subject: format!("assertion '{}'", assertion.id),
            violation,
        })
    }

    fn signer_claim_set(&self, signer: &SignerReference) -> Result<Arc<ClaimSet>, ValidationError> {
        let credential: Cow<'_, SecurityToken> = match signer {
            SignerReference::Embedded(token) => Cow::Borrowed(token.as_ref()),
            SignerReference::Reference(reference) => Cow::Owned(
                self.resolver
                    .resolve_token(reference)
                    .map_err(|e| ValidationError::UntrustedSigner {
                        reason: format!("signing credential {reference} could not be resolved"),
                        source: Some(Box::new(e.into())),
                    })?,
            ),
        };

        let authenticator = self
            .sub_authenticators
            .iter()
            .find(|a| a.can_validate(&credential))
            .ok_or_else(|| ValidationError::UntrustedSigner {
                reason: format!("no authenticator accepts {} signing credentials", credential.kind()),
                source: None,
            })?;

        let policies = authenticator.validate(&credential).map_err(|e| {
            ValidationError::UntrustedSigner {
                reason: format!("signing credential rejected by '{}'", authenticator.name()),
                source: Some(Box::new(e)),
            }
        })?;

        Ok(policies
            .first()
            .and_then(AuthorizationPolicy::primary_claim_set)
            .cloned()
            .unwrap_or_else(ClaimSet::anonymous))
    }

    fn check_audience(&self, assertion: &Assertion) -> Result<(), AudienceFailure> {
        let required = match self.audience_mode {
            AudienceMode::Never => false,
            AudienceMode::Always => true,
            AudienceMode::BearerKeyOnly => assertion.is_bearer(),
        };
        if !required {
            return Ok(());
        }
        if self.allowed_audiences.is_empty() {
            return Err(AudienceFailure::NoAllowedAudiences);
        }

        let restrictions = assertion
            .conditions
            .as_ref()
            .map(|c| c.audience_restrictions.as_slice())
            .unwrap_or_default();
        if restrictions.is_empty() {
            return Err(AudienceFailure::NoAudienceRestriction);
        }

        for restriction in restrictions {
            let matched = restriction
                .audiences
                .iter()
                .any(|aud| self.allowed_audiences.iter().any(|allowed| allowed.matches(aud)));
            if !matched {
                return Err(AudienceFailure::NoMatch {
                    audiences: restriction.audiences.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_replay(&self, assertion: &Assertion, now: OffsetDateTime) -> Result<(), ValidationError> {
        let Some(cache) = &self.replay_cache else {
            return Ok(());
        };
        if assertion.id.is_empty() {
            return Err(ValidationError::MissingAssertionId {
                issuer: assertion.issuer.clone(),
            });
        }
        let expires_at = assertion
            .conditions
            .as_ref()
            .and_then(|c| c.not_on_or_after)
            .map_or(ValidityWindow::MAX, |t| t.saturating_add(self.max_clock_skew));

        if cache.try_insert(&assertion.issuer, &assertion.id, expires_at, now) {
            Ok(())
        } else {
            Err(ValidationError::ReplayDetected {
                assertion_id: assertion.id.clone(),
            })
        }
    }

    fn run_checks(&self, assertion: &Assertion) -> Result<Vec<AuthorizationPolicy>, ValidationError> {
        let signature = assertion
            .signature
            .as_ref()
            .ok_or_else(|| ValidationError::MissingSignature {
                assertion_id: assertion.id.clone(),
            })?;

        let now = self.clock.now();
        self.check_time(assertion, now)?;

        let signer = self.signer_claim_set(&signature.signer)?;

        let conditions = assertion.conditions.as_ref();
        let window = ValidityWindow::from_bounds(
            conditions.and_then(|c| c.not_before),
            conditions.and_then(|c| c.not_on_or_after),
        )
        .map_err(|e| ValidationError::TimeInvalid {
            subject: format!("assertion '{}'", assertion.id),
            violation: TimeViolation::Expired {
                expired_at: e.valid_to,
                now,
            },
        })?;

        let policies = assertion
            .statements
            .iter()
            .map(|statement| {
                AuthorizationPolicy::single(
                    Arc::new(ClaimSet::issued_by(statement_claims(statement), Arc::clone(&signer))),
                    window,
                )
            })
            .collect();

        self.check_audience(assertion)
            .map_err(ValidationError::AudienceMismatch)?;
        self.check_replay(assertion, now)?;
        Ok(policies)
    }
}

impl TokenAuthenticator for AssertionValidator {
    fn name(&self) -> &'static str {
        "assertion"
    }

    fn can_validate(&self, token: &SecurityToken) -> bool {
        matches!(token, SecurityToken::Assertion(_))
    }

    #[tracing::instrument(skip_all, fields(authenticator = "assertion", assertion_id = token.id()))]
    fn validate_token(
        &self,
        token: &SecurityToken,
    ) -> Result<Vec<AuthorizationPolicy>, ValidationError> {
        let SecurityToken::Assertion(assertion) = token else {
            return Err(ValidationError::UnsupportedCredential {
                authenticator: self.name(),
                kind: token.kind(),
            });
        };

        match self.run_checks(assertion) {
            Ok(policies) => {
                tracing::debug!(
                    issuer = %assertion.issuer,
                    statements = policies.len(),
                    "assertion accepted"
                );
                Ok(policies)
            }
            Err(e) => {
                tracing::warn!(issuer = %assertion.issuer, error = %e, "assertion rejected");
                Err(e)
            }
        }
    }
}

/// Claims carried by one statement.
fn statement_claims(statement: &Statement) -> Vec<Claim> {
    let subject = statement.subject();
    let mut claims = Vec::new();
    if let Some(name) = &subject.name {
        claims.push(Claim::identity(claim_types::NAME_IDENTIFIER, name.as_str()));
        claims.push(Claim::possess(claim_types::NAME_IDENTIFIER, name.as_str()));
    }

    match statement {
        Statement::Attribute { attributes, .. } => {
            for attribute in attributes {
                let claim_type = if attribute.namespace.is_empty() {
                    attribute.name.clone()
                } else {
                    format!(
                        "{}/{}",
                        attribute.namespace.trim_end_matches('/'),
                        attribute.name
                    )
                };
                claims.extend(
                    attribute
                        .values
                        .iter()
                        .map(|value| Claim::possess(claim_type.as_str(), value.as_str())),
                );
            }
        }
        Statement::Authentication {
            method, instant, ..
        } => {
            claims.push(Claim::possess(
                claim_types::AUTHENTICATION_METHOD,
                method.as_str(),
            ));
            claims.push(Claim::possess(claim_types::AUTHENTICATION_INSTANT, *instant));
        }
        Statement::AuthorizationDecision {
            resource,
            decision,
            actions,
            ..
        } => {
            if actions.is_empty() {
                claims.push(Claim::possess(
                    claim_types::AUTHORIZATION_DECISION,
                    format!("{} {resource}", decision.as_str()),
                ));
            }
            claims.extend(actions.iter().map(|action| {
                Claim::possess(
                    claim_types::AUTHORIZATION_DECISION,
                    format!("{} {action} {resource}", decision.as_str()),
                )
            }));
        }
    }
    claims
}
