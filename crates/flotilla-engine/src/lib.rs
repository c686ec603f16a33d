//! flotilla-engine — the autoscaling decision engine.
//!
//! Given one immutable `FleetSnapshot` and a declarative `RuleSet`, the
//! engine computes the next action (none / scale-up / scale-down /
//! kill-one) together with its justification text.
//!
//! # Decision order
//!
//! ```text
//! snapshot ──► aggregate ──► { per-container views, fleet average }
//!                                 │
//!   1. hard min/max bounds        │  (always win, ignore cooldown)
//!   2. kill rule  (ALL)  ─────────┤  against the candidate's metrics
//!   3. cooldown gate              │  scaling_in_flight ⇒ None
//!   4. add rule   (ANY)  ─────────┤  against the fleet average
//!   5. reduce rule (ALL) ─────────┘  against the session-adjusted average
//! ```
//!
//! Evaluation is synchronous, performs no I/O, and always terminates with
//! exactly one `Action`.

pub mod aggregate;
pub mod engine;
pub mod kill;
pub mod rules;

pub use aggregate::ContainerView;
pub use engine::Engine;
pub use rules::{CombineMode, PredicateMatch, RuleOutcome};
