//! Tenant selection and client-credentials token management.

pub mod tenant;
pub mod token;

pub use tenant::{
    CookieMarker, FileMarker, MarkerStore, MemoryMarker, TenantId, TenantRegistry, TenantResolver,
    TenantSwitch,
};
pub use token::{AccessToken, Clock, ManualClock, SystemClock, TokenProvider};
