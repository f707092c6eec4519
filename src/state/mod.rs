//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `SessionState`: known ids, URLs seen this session, and the no-new-page streak
//! - `PageVerdict`: the decision taken after each listing page
//! - `preload_known_ids`: seeds the known ids from the store

mod session;

pub use session::{preload_known_ids, PageVerdict, SessionState};
