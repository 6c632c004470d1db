//! Grant lifecycle exercised end to end over the in-memory adapters.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use carebridge_application::{
    ConsentService, GrantRepository, GrantService, RepairRange, RepairService, TokenStore,
};
use carebridge_core::AppError;
use carebridge_domain::{
    AccessType, Application, ApplicationId, BeneficiaryId, DataAccessGrant, GrantId,
    PolicySwitches, ScopePolicy, ScopeSet, TokenId, TokenKind, TokenRecord,
};

use crate::{InMemoryArchiveWriter, InMemoryGrantRepository, InMemoryTokenStore};

fn application(access_type: AccessType) -> Application {
    Application {
        id: ApplicationId::new(),
        name: "sample-app".to_owned(),
        access_type,
        active: true,
        end_date: None,
        requires_demographic_scopes: true,
        created_at: Utc::now(),
    }
}

fn scopes(values: &[&str]) -> ScopeSet {
    match ScopeSet::parse(values.iter().map(|value| (*value).to_owned())) {
        Ok(set) => set,
        Err(error) => panic!("invalid test scopes: {error}"),
    }
}

fn token(
    beneficiary_id: BeneficiaryId,
    application_id: ApplicationId,
    kind: TokenKind,
    granted: &ScopeSet,
) -> TokenRecord {
    TokenRecord {
        id: TokenId::new(),
        beneficiary_id,
        application_id,
        kind,
        scopes: granted.clone(),
        expires_at: None,
    }
}

struct Harness {
    grants: Arc<InMemoryGrantRepository>,
    tokens: Arc<InMemoryTokenStore>,
    archive: Arc<InMemoryArchiveWriter>,
    grant_service: GrantService,
    consent_service: ConsentService,
}

fn harness() -> Harness {
    let grants = Arc::new(InMemoryGrantRepository::new());
    let tokens = Arc::new(InMemoryTokenStore::new());
    let archive = Arc::new(InMemoryArchiveWriter::new());

    let grant_service = GrantService::new(grants.clone(), tokens.clone(), archive.clone());
    let consent_service = ConsentService::new(
        grant_service.clone(),
        tokens.clone(),
        ScopePolicy::new(scopes(&["patient/patient.read", "profile"])),
    );

    Harness {
        grants,
        tokens,
        archive,
        grant_service,
        consent_service,
    }
}

#[tokio::test]
async fn ensure_grant_is_idempotent_over_the_store() {
    let harness = harness();
    let app = application(AccessType::ThirteenMonth);
    let beneficiary = BeneficiaryId::new();

    let first = harness.grant_service.ensure_grant(beneficiary, &app).await;
    let second = harness.grant_service.ensure_grant(beneficiary, &app).await;

    let first = match first {
        Ok(grant) => grant,
        Err(error) => panic!("first ensure failed: {error}"),
    };
    let second = match second {
        Ok(grant) => grant,
        Err(error) => panic!("second ensure failed: {error}"),
    };

    assert_eq!(first.id, second.id);
    assert!(first.expiration_date.is_some());
}

#[tokio::test]
async fn duplicate_pair_insert_is_rejected_by_the_store() {
    let harness = harness();
    let beneficiary = BeneficiaryId::new();
    let application_id = ApplicationId::new();

    let template = DataAccessGrant {
        id: GrantId::new(),
        beneficiary_id: beneficiary,
        application_id,
        created_at: Utc::now(),
        expiration_date: None,
    };
    let rival = DataAccessGrant {
        id: GrantId::new(),
        ..template.clone()
    };

    assert!(harness.grants.insert(&template).await.is_ok());
    let result = harness.grants.insert(&rival).await;
    assert!(matches!(result, Err(AppError::DuplicateGrant(_))));
}

#[tokio::test]
async fn revocation_cascades_through_tokens_and_archive() {
    let harness = harness();
    let app = application(AccessType::OneTime);
    let beneficiary = BeneficiaryId::new();
    let granted = scopes(&["patient/coverage.read"]);

    let ensured = harness.grant_service.ensure_grant(beneficiary, &app).await;
    assert!(ensured.is_ok());

    harness
        .tokens
        .issue(token(beneficiary, app.id, TokenKind::Access, &granted))
        .await;
    harness
        .tokens
        .issue(token(beneficiary, app.id, TokenKind::Refresh, &granted))
        .await;

    let revoked = harness.grant_service.revoke(beneficiary, app.id).await;
    assert!(revoked.is_ok());

    let remaining = harness.tokens.list_active(beneficiary, app.id).await;
    assert_eq!(remaining.map(|tokens| tokens.len()).ok(), Some(0));
    assert_eq!(harness.archive.archived_tokens().await.len(), 2);
    assert_eq!(harness.archive.archived_grants().await.len(), 1);

    let gate = harness
        .grant_service
        .check_access(&app, beneficiary, PolicySwitches::default(), Utc::now())
        .await;
    assert!(matches!(gate, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn empty_reconciliation_fully_revokes_the_grant() {
    let harness = harness();
    let app = application(AccessType::ThirteenMonth);
    let beneficiary = BeneficiaryId::new();

    let ensured = harness.grant_service.ensure_grant(beneficiary, &app).await;
    assert!(ensured.is_ok());
    harness
        .tokens
        .issue(token(beneficiary, app.id, TokenKind::Access, &scopes(&["profile"])))
        .await;

    // Declining demographic sharing leaves nothing grantable.
    let result = harness
        .consent_service
        .reconcile_scopes(beneficiary, &app, &scopes(&["profile"]), false)
        .await;

    assert!(matches!(result, Err(AppError::ScopeExhausted(_))));
    let gate = harness
        .grant_service
        .check_access(&app, beneficiary, PolicySwitches::default(), Utc::now())
        .await;
    assert!(matches!(gate, Err(AppError::NotFound(_))));
    assert_eq!(harness.archive.archived_grants().await.len(), 1);
}

#[tokio::test]
async fn consent_change_revokes_stale_tokens_but_keeps_the_grant() {
    let harness = harness();
    let app = application(AccessType::ThirteenMonth);
    let beneficiary = BeneficiaryId::new();
    let requested = scopes(&["patient/coverage.read", "profile"]);

    let ensured = harness.grant_service.ensure_grant(beneficiary, &app).await;
    assert!(ensured.is_ok());
    harness
        .tokens
        .issue(token(beneficiary, app.id, TokenKind::Access, &requested))
        .await;

    // Re-authorization without demographic sharing narrows the scopes.
    let granted = harness
        .consent_service
        .reconcile_scopes(beneficiary, &app, &requested, false)
        .await;
    assert_eq!(granted.ok(), Some(scopes(&["patient/coverage.read"])));

    let remaining = harness.tokens.list_active(beneficiary, app.id).await;
    assert_eq!(remaining.map(|tokens| tokens.len()).ok(), Some(0));

    let gate = harness
        .grant_service
        .check_access(&app, beneficiary, PolicySwitches::default(), Utc::now())
        .await;
    assert!(gate.is_ok());
}

#[tokio::test]
async fn repair_backfills_missing_expirations_over_the_store() {
    let harness = harness();
    let app = application(AccessType::ThirteenMonth);
    let created_at = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).single();
    let created_at = match created_at {
        Some(timestamp) => timestamp,
        None => panic!("invalid test timestamp"),
    };

    let legacy = DataAccessGrant {
        id: GrantId::new(),
        beneficiary_id: BeneficiaryId::new(),
        application_id: app.id,
        created_at,
        expiration_date: None,
    };
    assert!(harness.grants.insert(&legacy).await.is_ok());

    let range = RepairRange::closed(
        created_at - chrono::Duration::days(1),
        created_at + chrono::Duration::days(1),
        Utc::now(),
    );
    let range = match range {
        Ok(range) => range,
        Err(error) => panic!("invalid test range: {error}"),
    };

    let repair = RepairService::new(harness.grants.clone());
    let summary = repair.set_missing_expiration(&app, range, false).await;
    let summary = match summary {
        Ok(summary) => summary,
        Err(error) => panic!("repair failed: {error}"),
    };

    assert_eq!(summary.examined, 1);
    assert_eq!(summary.repaired, 1);

    let repaired = harness.grants.find(legacy.beneficiary_id, app.id).await;
    let expiration = repaired
        .ok()
        .flatten()
        .and_then(|grant| grant.expiration_date);
    let expected = Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).single();
    assert_eq!(expiration, expected);
}
