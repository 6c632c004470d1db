use std::sync::Arc;
use std::sync::atomic::Ordering;

use carebridge_core::AppError;
use carebridge_domain::{AccessType, BeneficiaryId, GrantId, TokenId, TokenKind};

use crate::test_support::{FakeArchive, FakeGrants, FakeTokens, application, scopes, utc};

use super::*;

fn service(
    grants: &Arc<FakeGrants>,
    tokens: &Arc<FakeTokens>,
    archive: &Arc<FakeArchive>,
) -> GrantService {
    GrantService::new(grants.clone(), tokens.clone(), archive.clone())
}

fn token(
    beneficiary_id: BeneficiaryId,
    application_id: ApplicationId,
    kind: TokenKind,
) -> TokenRecord {
    TokenRecord {
        id: TokenId::new(),
        beneficiary_id,
        application_id,
        kind,
        scopes: scopes(&["patient/coverage.read"]),
        expires_at: None,
    }
}

#[tokio::test]
async fn ensure_grant_creates_with_computed_expiration() {
    let grants = Arc::new(FakeGrants::default());
    let tokens = Arc::new(FakeTokens::default());
    let archive = Arc::new(FakeArchive::default());
    let service = service(&grants, &tokens, &archive);

    let app = application(AccessType::ThirteenMonth);
    let beneficiary = BeneficiaryId::new();

    let grant = match service.ensure_grant(beneficiary, &app).await {
        Ok(grant) => grant,
        Err(error) => panic!("ensure_grant failed: {error}"),
    };

    assert_eq!(grant.beneficiary_id, beneficiary);
    assert_eq!(grant.application_id, app.id);
    assert!(grant.expiration_date.is_some());
    assert_eq!(grants.len().await, 1);
}

#[tokio::test]
async fn ensure_grant_for_one_time_app_has_no_expiration() {
    let grants = Arc::new(FakeGrants::default());
    let tokens = Arc::new(FakeTokens::default());
    let archive = Arc::new(FakeArchive::default());
    let service = service(&grants, &tokens, &archive);

    let app = application(AccessType::OneTime);
    let grant = service.ensure_grant(BeneficiaryId::new(), &app).await;

    assert_eq!(grant.ok().and_then(|g| g.expiration_date), None);
}

#[tokio::test]
async fn ensure_grant_is_idempotent() {
    let grants = Arc::new(FakeGrants::default());
    let tokens = Arc::new(FakeTokens::default());
    let archive = Arc::new(FakeArchive::default());
    let service = service(&grants, &tokens, &archive);

    let app = application(AccessType::ThirteenMonth);
    let beneficiary = BeneficiaryId::new();

    let first = service.ensure_grant(beneficiary, &app).await;
    let second = service.ensure_grant(beneficiary, &app).await;

    let first_id = first.ok().map(|g| g.id);
    let second_id = second.ok().map(|g| g.id);
    assert!(first_id.is_some());
    assert_eq!(first_id, second_id);
    assert_eq!(grants.len().await, 1);
}

#[tokio::test]
async fn ensure_grant_recovers_a_lost_uniqueness_race() {
    let grants = Arc::new(FakeGrants::default());
    let tokens = Arc::new(FakeTokens::default());
    let archive = Arc::new(FakeArchive::default());
    let service = service(&grants, &tokens, &archive);

    grants.race_once.store(true, Ordering::SeqCst);

    let app = application(AccessType::ThirteenMonth);
    let beneficiary = BeneficiaryId::new();

    let result = service.ensure_grant(beneficiary, &app).await;

    // The duplicate error never escapes, the winner's row comes back, and
    // exactly one live grant exists for the pair.
    assert!(result.is_ok());
    assert_eq!(grants.len().await, 1);
}

#[tokio::test]
async fn revoke_archives_the_grant_and_revokes_all_tokens() {
    let grants = Arc::new(FakeGrants::default());
    let tokens = Arc::new(FakeTokens::default());
    let archive = Arc::new(FakeArchive::default());
    let service = service(&grants, &tokens, &archive);

    let app = application(AccessType::ThirteenMonth);
    let beneficiary = BeneficiaryId::new();
    let grant = match service.ensure_grant(beneficiary, &app).await {
        Ok(grant) => grant,
        Err(error) => panic!("ensure_grant failed: {error}"),
    };

    tokens.seed(token(beneficiary, app.id, TokenKind::Access)).await;
    tokens.seed(token(beneficiary, app.id, TokenKind::Refresh)).await;

    assert!(service.revoke(beneficiary, app.id).await.is_ok());

    assert_eq!(grants.len().await, 0);
    assert_eq!(tokens.len().await, 0);
    assert_eq!(archive.tokens.read().await.len(), 2);

    let archived_grants = archive.grants.read().await;
    assert_eq!(archived_grants.len(), 1);
    assert_eq!(archived_grants[0].beneficiary_id, beneficiary);
    assert_eq!(archived_grants[0].application_id, app.id);
    assert_eq!(archived_grants[0].created_at, grant.created_at);
}

#[tokio::test]
async fn revoke_of_absent_grant_is_not_found() {
    let grants = Arc::new(FakeGrants::default());
    let tokens = Arc::new(FakeTokens::default());
    let archive = Arc::new(FakeArchive::default());
    let service = service(&grants, &tokens, &archive);

    let result = service.revoke(BeneficiaryId::new(), ApplicationId::new()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn archival_failure_does_not_roll_back_the_revocation() {
    let grants = Arc::new(FakeGrants::default());
    let tokens = Arc::new(FakeTokens::default());
    let archive = Arc::new(FakeArchive::default());
    let service = service(&grants, &tokens, &archive);

    let app = application(AccessType::OneTime);
    let beneficiary = BeneficiaryId::new();
    assert!(service.ensure_grant(beneficiary, &app).await.is_ok());

    archive.fail_grants.store(true, Ordering::SeqCst);

    assert!(service.revoke(beneficiary, app.id).await.is_ok());
    assert_eq!(grants.len().await, 0);
}

#[tokio::test]
async fn check_access_without_grant_is_not_found() {
    let grants = Arc::new(FakeGrants::default());
    let tokens = Arc::new(FakeTokens::default());
    let archive = Arc::new(FakeArchive::default());
    let service = service(&grants, &tokens, &archive);

    let app = application(AccessType::ThirteenMonth);
    let switches = PolicySwitches {
        limit_data_access: true,
    };

    let result = service
        .check_access(&app, BeneficiaryId::new(), switches, Utc::now())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn check_access_rejects_expired_and_inactive() {
    let grants = Arc::new(FakeGrants::default());
    let tokens = Arc::new(FakeTokens::default());
    let archive = Arc::new(FakeArchive::default());
    let service = service(&grants, &tokens, &archive);

    let beneficiary = BeneficiaryId::new();
    let mut app = application(AccessType::ThirteenMonth);
    let created_at = utc(2024, 1, 10);
    let expiration = match compute_expiration(AccessType::ThirteenMonth, created_at) {
        Ok(value) => value,
        Err(error) => panic!("compute_expiration failed: {error}"),
    };
    grants
        .seed(DataAccessGrant {
            id: GrantId::new(),
            beneficiary_id: beneficiary,
            application_id: app.id,
            created_at,
            expiration_date: expiration,
        })
        .await;

    let switches = PolicySwitches {
        limit_data_access: true,
    };

    let expired = service
        .check_access(&app, beneficiary, switches, utc(2025, 3, 1))
        .await;
    assert!(matches!(expired, Err(AppError::Expired(_))));

    app.active = false;
    let inactive = service
        .check_access(&app, beneficiary, switches, utc(2024, 6, 1))
        .await;
    assert!(matches!(inactive, Err(AppError::Inactive(_))));
}
