//! Expiration policy: pure functions gating every resource access.

use carebridge_core::{AppError, AppResult};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccessType, Application, DataAccessGrant};

/// Number of months a thirteen-month grant stays valid.
const THIRTEEN_MONTHS: u32 = 13;

/// Feature switches affecting access decisions.
///
/// Sourced once per request or job at the boundary and passed explicitly;
/// there is no global mutable settings object.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PolicySwitches {
    /// When off, dated expiration is not enforced for any access type.
    pub limit_data_access: bool,
}

/// Computes the dated expiry for a grant created (or repaired from) `start`.
///
/// Only [`AccessType::ThirteenMonth`] produces one; other access types have
/// no dated expiry of their own.
pub fn compute_expiration(
    access_type: AccessType,
    start: DateTime<Utc>,
) -> AppResult<Option<DateTime<Utc>>> {
    match access_type {
        AccessType::ThirteenMonth => start
            .checked_add_months(Months::new(THIRTEEN_MONTHS))
            .map(Some)
            .ok_or_else(|| {
                AppError::Validation(format!("expiration overflows starting from {start}"))
            }),
        AccessType::OneTime | AccessType::ResearchStudy => Ok(None),
    }
}

/// Whether a grant's access window has lapsed.
///
/// Pure and read-only; safe to call from concurrent read paths.
///
/// - `OneTime`: never expires by date; absence of the grant row is the
///   revocation signal.
/// - `ThirteenMonth`: `now > expiration_date` while the limit switch is on;
///   a missing expiration date is repair-needing data, not "not expired".
/// - `ResearchStudy`: `now > application.end_date` while the switch is on,
///   ignoring `grant.expiration_date`.
pub fn is_expired(
    application: &Application,
    grant: &DataAccessGrant,
    switches: PolicySwitches,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    if !switches.limit_data_access {
        return Ok(false);
    }

    match application.access_type {
        AccessType::OneTime => Ok(false),
        AccessType::ThirteenMonth => match grant.expiration_date {
            Some(expiration_date) => Ok(now > expiration_date),
            None => Err(AppError::Validation(format!(
                "grant {} has no expiration date and needs repair",
                grant.id
            ))),
        },
        AccessType::ResearchStudy => Ok(application
            .end_date
            .is_some_and(|end_date| now > end_date)),
    }
}

/// Per-request gate combining the active flag and the expiration policy.
pub fn check_access(
    application: &Application,
    grant: &DataAccessGrant,
    switches: PolicySwitches,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !application.active {
        return Err(AppError::Inactive(format!(
            "application '{}' is disabled",
            application.name
        )));
    }

    if is_expired(application, grant, switches, now)? {
        return Err(AppError::Expired(format!(
            "grant {} for application '{}' has expired",
            grant.id, application.name
        )));
    }

    Ok(())
}
