//! Application services and ports.

#![forbid(unsafe_code)]

mod access_ports;
mod consent_service;
mod grant_service;
mod identity_ports;
mod identity_service;
mod repair_service;
#[cfg(test)]
mod test_support;

pub use access_ports::{ApplicationRepository, ArchiveWriter, GrantRepository, TokenStore};
pub use consent_service::ConsentService;
pub use grant_service::GrantService;
pub use identity_ports::{CrosswalkRepository, RecordLocator};
pub use identity_service::{
    IdentityHasher, IdentityService, Resolution, UpstreamClaims, normalize_claim,
};
pub use repair_service::{RepairRange, RepairService, RepairSummary};
