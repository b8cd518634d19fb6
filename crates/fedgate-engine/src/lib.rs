//! # Translation Profile Engine
//!
//! Rule evaluation for the fedgate identity federation broker.
//!
//! An administrator authors, per identity provider, a *translation
//! profile*: an ordered list of rules, each pairing a boolean condition
//! with a parameterized action. When a remote assertion arrives, the
//! engine builds a read-only binding context from it, walks the rules in
//! order, and accumulates every fired action's effects into a single
//! [`TranslationResult`] which the identity store then applies. Symmetric
//! output profiles run over local entity state to produce outbound
//! assertions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │  Protocol    │────►│ BindingContext  │────►│  Profile rules   │
//! │  endpoint    │     │  (per run)      │     │  (in order)      │
//! └──────────────┘     └─────────────────┘     └────────┬─────────┘
//!                                                       │ condition? action!
//!                      ┌─────────────────┐     ┌────────▼─────────┐
//!                      │ Identity store  │◄────│ TranslationResult│
//!                      └─────────────────┘     └──────────────────┘
//! ```
//!
//! Profiles, compiled rules and the action registries are immutable after
//! construction and safely shared across concurrent runs; each run owns
//! its context and result exclusively.

pub mod action;
pub mod actions;
pub mod condition;
pub mod context;
pub mod document;
pub mod error;
pub mod expr;
pub mod migration;
pub mod profile;
pub mod registry;
pub mod result;
pub mod runner;

// Re-exports for convenience
pub use action::{
    ActionEnvironment, ActionFactory, ActionOutcome, ParameterKind, ParameterSpec,
    TranslationAction,
};
pub use condition::TranslationCondition;
pub use context::BindingContext;
pub use document::{
    ActionDocument, ConditionDocument, ProfileDocument, RuleDocument, PROFILE_FORMAT_VERSION,
};
pub use error::{EvalError, EvalResult, LoadError, LoadResult};
pub use expr::{CompiledExpression, ExpressionConfig, ExpressionEngine};
pub use migration::{migrate_document, MigrationOutcome, MigrationWarning};
pub use profile::{ProfileLoader, ProfileMode, TranslationProfile, TranslationRule};
pub use registry::{ActionRegistry, ProfileDirection};
pub use result::{
    AutomaticRequestAction, EntityStatusOperation, IdentityEffectMode, IdentityMapping,
    MappedAttribute, MappedGroup, ScheduledEntityChange, TranslationResult,
};
