pub mod client;
pub mod materializer;
pub mod models;
pub mod oauth;
pub mod time;
pub mod token;

pub use client::{CalendarApi, CalendarClient};
pub use materializer::{build_payload, EventMaterializer};
pub use models::{CreatedEvent, EventDateTime, EventPayload};
pub use oauth::{GoogleOAuth, OAuthFlow};
pub use time::{FixedTimezone, HostTimezone, TimezoneSource};
pub use token::{Credential, CredentialStatus, StoredToken, TokenManager, TokenStore};
