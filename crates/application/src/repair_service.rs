//! Offline repair of historical grants missing an expiration date.
//!
//! Pre-policy rows carry a null `expiration_date`; these batch commands
//! backfill them. They run offline over a closed, past time range,
//! process records independently, and converge when re-run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use carebridge_core::{AppError, AppResult};
use carebridge_domain::{Application, DataAccessGrant, compute_expiration};

use crate::access_ports::GrantRepository;


/// A closed creation-time range, validated to lie entirely in the past.
///
/// Grants still being created live must never be repaired mid-flight, so a
/// range reaching into the present or future is rejected before any row is
/// read.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RepairRange {
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl RepairRange {
    /// Validates a closed past range against `now`.
    pub fn closed(
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        if begin > end {
            return Err(AppError::RepairRange(format!(
                "range begin {begin} is after end {end}"
            )));
        }

        if end >= now {
            return Err(AppError::RepairRange(format!(
                "range end {end} reaches into the present (now {now})"
            )));
        }

        Ok(Self { begin, end })
    }

    /// Range start, inclusive.
    #[must_use]
    pub fn begin(&self) -> DateTime<Utc> {
        self.begin
    }

    /// Range end, inclusive.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Per-batch outcome counts.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RepairSummary {
    /// Grants examined (null expiration, in range).
    pub examined: usize,
    /// Grants whose expiration was set (or would be, in a dry run).
    pub repaired: usize,
    /// Grants skipped because their access type carries no dated expiry.
    pub skipped: usize,
    /// Grants that failed individually; the batch continued past them.
    pub failed: usize,
    /// Whether this run performed no writes.
    pub dry_run: bool,
}

/// Batch repair commands over the grant store.
#[derive(Clone)]
pub struct RepairService {
    grants: Arc<dyn GrantRepository>,
}

impl RepairService {
    /// Creates a new repair service.
    #[must_use]
    pub fn new(grants: Arc<dyn GrantRepository>) -> Self {
        Self { grants }
    }

    /// Backfills missing expiration dates for grants created in `range`,
    /// anchored to the date the limit switch was turned on.
    ///
    /// Grants created on or before `turn_on_date` are expired relative to
    /// the turn-on date rather than their own creation, so beneficiaries
    /// authorized long before the policy existed get the full window from
    /// when enforcement began. Idempotent: re-running after a partial
    /// failure converges to the same end state.
    pub async fn bulk_repair(
        &self,
        application: &Application,
        range: RepairRange,
        turn_on_date: DateTime<Utc>,
        dry_run: bool,
    ) -> AppResult<RepairSummary> {
        self.repair(application, range, Some(turn_on_date), dry_run)
            .await
    }

    /// Narrower variant: backfills from each grant's own creation date,
    /// with no turn-on-date anchoring.
    pub async fn set_missing_expiration(
        &self,
        application: &Application,
        range: RepairRange,
        dry_run: bool,
    ) -> AppResult<RepairSummary> {
        self.repair(application, range, None, dry_run).await
    }

    async fn repair(
        &self,
        application: &Application,
        range: RepairRange,
        turn_on_date: Option<DateTime<Utc>>,
        dry_run: bool,
    ) -> AppResult<RepairSummary> {
        let rows = self
            .grants
            .list_missing_expiration(application.id, range.begin, range.end)
            .await?;

        let mut summary = RepairSummary {
            examined: rows.len(),
            dry_run,
            ..RepairSummary::default()
        };

        for grant in rows {
            match self.repair_one(application, &grant, turn_on_date, dry_run).await {
                Ok(true) => summary.repaired += 1,
                Ok(false) => summary.skipped += 1,
                Err(error) => {
                    summary.failed += 1;
                    tracing::warn!(
                        grant = %grant.id,
                        application = %application.id,
                        %error,
                        "failed to repair grant, continuing batch",
                    );
                }
            }
        }

        tracing::info!(
            application = %application.id,
            examined = summary.examined,
            repaired = summary.repaired,
            skipped = summary.skipped,
            failed = summary.failed,
            dry_run,
            "repair batch finished",
        );

        Ok(summary)
    }

    async fn repair_one(
        &self,
        application: &Application,
        grant: &DataAccessGrant,
        turn_on_date: Option<DateTime<Utc>>,
        dry_run: bool,
    ) -> AppResult<bool> {
        let start = match turn_on_date {
            Some(turn_on) if grant.created_at <= turn_on => turn_on,
            _ => grant.created_at,
        };

        let Some(expiration) = compute_expiration(application.access_type, start)? else {
            return Ok(false);
        };

        if !dry_run {
            self.grants.set_expiration(grant.id, expiration).await?;
        }

        Ok(true)
    }
}
