//! Intentions controller core
//!
//! An intention allows or denies connections from a source service to a destination service.
//! Both ends are `(namespace, name)` tuples where either part may be the wildcard `*`, so a
//! single connection may be covered by several intentions. This crate holds the pure model:
//!
//! - validation of intentions before they are accepted by a store;
//! - the precedence assigned from the specificity of each tuple;
//! - the content hash compared during replication;
//! - exact, match and check queries over a snapshot of intentions, ordered canonically;
//! - the read/write gate consulted with an external authorizer.
//!
//! Nothing here performs I/O or holds shared state; callers hand in owned or borrowed snapshots.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod authz;
mod hash;
pub mod identifier;
mod intention;
pub mod matching;
mod precedence;
pub mod request;
mod validation;

pub use self::{
    authz::{AccessDecision, Authorizer, AuthorizerContext},
    hash::{ContentHash, InvalidHash},
    identifier::{Exactness, ServiceName, DEFAULT_NAMESPACE, WILDCARD},
    intention::{Action, Intention, LogIndex, SourceType},
    matching::{
        precedence_cmp, sort_by_precedence, CheckQuery, ExactQuery, MatchEntry, MatchQuery,
        MatchType, QueryError,
    },
    precedence::precedence,
    validation::{
        Field, ValidationErrors, Violation, META_KEY_MAX_LENGTH, META_MAX_KEY_PAIRS,
        META_VALUE_MAX_LENGTH,
    },
};
