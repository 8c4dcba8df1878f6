//! QueryLens Query
//!
//! Everything needed to turn a structured rule tree into query text and to
//! pull reusable clauses back out of query text:
//!
//! - [`rules`]: the rule-tree model, shaped like the visual builder's JSON export
//! - [`processor`]: per-operator rendering with static overrides
//! - [`compile`]: depth-first WHERE-clause compilation
//! - [`fragments`]: SELECT / ORDER BY / LIMIT extraction
//! - [`assemble`]: laying out a complete query from its parts
//! - [`fields`]: the field registry and rule-tree validation
//! - [`defaults`]: first-launch query and rule tree
//!
//! Nothing here performs I/O.

pub mod assemble;
pub mod compile;
pub mod defaults;
pub mod error;
pub mod fields;
pub mod fragments;
pub mod processor;
pub mod rules;

pub use assemble::{assemble, dataset_ref, QueryParts};
pub use compile::{compile, RuleCompiler};
pub use defaults::{default_query, default_rule_tree, DEFAULT_DATASET_KEY};
pub use error::{QueryError, ValidationIssue};
pub use fields::{FieldDescriptor, FieldRegistry, ValueEditor};
pub use fragments::QueryFragments;
pub use processor::{FormatOptions, RuleProcessor};
pub use rules::{Combinator, Operator, Rule, RuleGroup, RuleNode, ValueSource};
