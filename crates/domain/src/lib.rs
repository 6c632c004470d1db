//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod application;
mod beneficiary;
mod crosswalk;
mod grant;
mod policy;
mod scopes;
mod token;

pub use application::{AccessType, Application, ApplicationId};
pub use beneficiary::BeneficiaryId;
pub use crosswalk::{
    ArchivedCrosswalk, AuthoritativeIdentity, ChangedHashFields, Crosswalk, ExternalRecordId,
    IdentityHash,
};
pub use grant::{ArchivedDataAccessGrant, DataAccessGrant, GrantId};
pub use policy::{PolicySwitches, check_access, compute_expiration, is_expired};
pub use scopes::{Scope, ScopePolicy, ScopeSet};
pub use token::{ArchivedToken, TokenId, TokenKind, TokenRecord};
