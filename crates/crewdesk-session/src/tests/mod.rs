//! Session orchestration tests.
//!
//! - `harness.rs`       - in-memory fakes (clock, token endpoint, directory)
//! - `token_refresh.rs` - expiry threshold and primary token refresh
//! - `login.rs`         - interactive login and partial-failure degradation
//! - `check_status.rs`  - restoring a persisted session, fetch-if-absent
//! - `roster.rs`        - roster refresh while signed in
//! - `ordering.rs`      - logout racing an in-flight bootstrap
//! - `http.rs`          - HTTP clients against a loopback stub server

pub(crate) mod harness;
