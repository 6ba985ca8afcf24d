//! A multi-valued B+Tree index for Rust.
//!
//! [`BPlusTree`] maps each key to a *bucket* of values instead of a single value, which
//! makes it a natural secondary index: many rows can share one key, and a range scan
//! returns every value whose key falls inside the range.
//!
//! # Example
//!
//! ```
//! use bucket_tree::{BPlusTree, Order, RangeOptions};
//!
//! // Index users by age.
//! let mut by_age = BPlusTree::with_branching_factor(4)?;
//! by_age.insert(31, "carol");
//! by_age.insert(25, "bob");
//! by_age.insert(31, "alice");
//! by_age.insert(40, "dave");
//!
//! // Every user aged 31, in value order.
//! assert_eq!(by_age.get(&31), &["alice", "carol"]);
//!
//! // Users in [25, 40), youngest first.
//! assert_eq!(by_age.get_range(&25, &40, RangeOptions::new()), [&"bob", &"alice", &"carol"]);
//!
//! // Everyone, oldest first.
//! assert_eq!(by_age.get_all(Order::Descending), [&"dave", &"carol", &"alice", &"bob"]);
//! # Ok::<(), bucket_tree::ConfigError>(())
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Ordered buckets** - Values under one key are kept sorted; duplicates are allowed
//! - **Linked leaves** - Full and range scans walk the leaf chain without revisiting internal nodes
//! - **Configurable fanout** - The branching factor is chosen per tree (see [`Config`])
//!
//! # Implementation
//!
//! Nodes live in an arena and refer to each other by index, so parent links and the
//! doubly linked leaf chain need no shared ownership. Splits and merges are logged at
//! `trace` level and changes in tree height at `debug` level through [`tracing`].

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod config;
mod error;
mod raw;
mod tree;

pub mod dump;
pub mod search;

pub use config::{Config, DEFAULT_BRANCHING_FACTOR, MIN_BRANCHING_FACTOR};
pub use dump::{NodeDump, NodeId};
pub use error::ConfigError;
pub use tree::{BPlusTree, Iter, Order, RangeOptions};
