//! Position mappings: the positional effect of one or more document transactions.

mod changeset;
mod types;


pub use changeset::ChangeSet;
pub use types::{Bias, Change, Mapped, Operation};
