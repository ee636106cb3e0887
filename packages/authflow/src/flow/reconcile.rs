//! Reconciliation: pick the next outstanding requirement by comparing
//! the identity provider's authoritative view against the cached
//! directory record.
//!
//! The record can lag a just-completed verification (propagation
//! delay) or still carry creation-time defaults, so two checks consult
//! the provider directly and heal the record when the provider is
//! ahead of it.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::model::UserRecord;
use crate::providers::FlowDeps;
use crate::step::Step;

/// Ordered decision chain, short-circuiting at the first unmet
/// requirement. Healing updates re-run the chain with the updated
/// record, so a second run with no changes in between lands on the
/// same step (idempotent).
pub async fn next_requirement(
    deps: &FlowDeps,
    user: UserRecord,
) -> Result<(Step, UserRecord), AuthError> {
    let mut user = user;
    loop {
        if !user.email_verified {
            // The record may not have caught up with a verification
            // the provider already knows about.
            if deps.identity.email_verified(&user.email).await? {
                debug!(email = %user.email, "provider reports email verified, healing record");
                user.email_verified = true;
                user = persist(deps, user).await?;
                continue;
            }
            return Ok((Step::EmailVerify, user));
        }

        if user.phone_number.is_empty() || !user.phone_verified {
            return Ok((Step::PhoneSetup, user));
        }

        if !user.mfa_enabled || !user.mfa_setup_complete {
            let status = deps.identity.mfa_status(&user.email).await?;
            if status.is_configured() {
                debug!(email = %user.email, "provider reports MFA configured, healing record");
                user.mfa_enabled = true;
                user.mfa_setup_complete = true;
                user = persist(deps, user).await?;
                continue;
            }
            return Ok((Step::MfaSetup, user));
        }

        if !user.has_name() {
            return Ok((Step::NameSetup, user));
        }

        info!(user_id = %user.user_id, "all requirements met");
        return Ok((Step::Complete, user));
    }
}

/// Write a healed record back. Provisional records have no directory
/// row to write to; they heal in memory only and the next full
/// resume re-syncs them.
async fn persist(deps: &FlowDeps, user: UserRecord) -> Result<UserRecord, AuthError> {
    if user.is_provisional() {
        return Ok(user);
    }
    deps.directory.update(user).await
}

/// Bounded confirmation that provider-side MFA enrollment has
/// propagated. Enabling MFA is asynchronous on the provider side, so
/// an immediate status check cannot be trusted. Instead:
///
/// 1. a no-op timestamp touch on the record forces any downstream
///    consistency trigger,
/// 2. session-refresh probes run at increasing delays (default
///    1s/2s/4s, so checks land ~1s/3s/7s after the touch), each
///    outcome ignored,
/// 3. exactly one final authoritative status check runs, and the flow
///    proceeds regardless.
///
/// The fixed worst-case latency (~7-8s) is the accepted price for
/// avoiding both a tight poll loop and an indefinite hang.
///
/// Returns `None` when cancelled mid-sequence; a torn-down flow must
/// not receive further state updates.
pub async fn confirm_mfa_setup(
    deps: &FlowDeps,
    user: UserRecord,
    cancel: &CancellationToken,
) -> Result<Option<UserRecord>, AuthError> {
    // (a) timestamp touch
    let mut user = persist(deps, user).await?;

    // (b) delayed probes, sequential, each raced against teardown
    for (i, delay) in deps.mfa_confirm_delays.iter().enumerate() {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(probe = i, "MFA confirmation cancelled");
                return Ok(None);
            }
            _ = tokio::time::sleep(*delay) => {}
        }
        if let Err(e) = deps.identity.session_refresh().await {
            warn!(probe = i, error = %e, "session refresh probe failed, continuing");
        }
    }

    if cancel.is_cancelled() {
        return Ok(None);
    }

    // (c) one final authoritative check, then proceed either way
    match deps.identity.mfa_status(&user.email).await {
        Ok(status) if status.is_configured() => {
            user.mfa_enabled = true;
            user.mfa_setup_complete = true;
            user = persist(deps, user).await?;
            info!(user_id = %user.user_id, "MFA enrollment confirmed");
        }
        Ok(_) => {
            warn!(user_id = %user.user_id, "MFA still not reported configured after confirmation window");
        }
        Err(e) => {
            warn!(user_id = %user.user_id, error = %e, "final MFA status check failed, proceeding");
        }
    }

    Ok(Some(user))
}
