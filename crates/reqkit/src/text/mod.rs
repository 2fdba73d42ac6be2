//! Stateless text helpers: random tokens and slugs.

mod random;
mod slug;

pub use random::random_string;
pub use slug::slugify;
