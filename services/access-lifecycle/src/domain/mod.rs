//! 领域层

pub mod clock;
pub mod journal;
pub mod permission;
pub mod provisioning;

pub use clock::{Clock, SystemClock};
pub use journal::{EventJournal, JournalEntry, PendingExpiry, pending_expiries};
pub use permission::{
    ApplicationPermission, History, PermissionLedger, PermissionState, PermissionStatus,
    PermissionTable, SignalEvent, SignalKind,
};
pub use provisioning::ProvisioningService;
