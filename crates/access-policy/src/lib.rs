//! # access-policy
//!
//! Decides whether an application may be used. An injected [`RuleStore`]
//! holds the explicitly blocked application identifiers; the
//! [`AccessPolicyEngine`] ORs store membership with a hardcoded browser
//! override and any pattern overrides loaded from a policy file.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use access_policy::{AccessPolicyEngine, RuleStore};
//!
//! let engine = AccessPolicyEngine::new(Arc::new(RuleStore::new()));
//! engine.block("com.example.game");
//! assert!(engine.is_blocked("com.example.game"));
//! assert!(engine.is_blocked("com.android.chrome"));
//! ```

mod decision;
mod evaluator;
pub mod loader;
pub mod matcher;
pub mod rule;
mod schema;
mod store;

// Re-export primary public API at crate root.
pub use decision::{AccessDecision, RuleKind, RuleMatch, Verdict};
pub use evaluator::{AccessPolicyEngine, DecisionObserver, RuleChange, TracingObserver};
pub use rule::{AccessRule, BROWSER_OVERRIDE_ID};
pub use schema::{OverrideRule, PolicyConfig};
pub use store::RuleStore;
