//! Domain records shared by the matcher, the stores and the REST layer

pub mod connection;
pub mod insight;
pub mod journal;

pub use connection::{Connection, ConnectionState, NewConnection};
pub use insight::{Candidate, Insight, UserId};
pub use journal::{JournalSummary, User};
