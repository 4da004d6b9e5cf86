//! External bibliographic search APIs.

pub mod pubmed;

pub use pubmed::{PubMedClient, PubMedRecord};
