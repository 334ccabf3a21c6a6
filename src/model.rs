//! Request and response models exchanged with the authorization server.
//!
//! Models own their wire representation: requests render themselves as query parameters, form
//! fields, or JSON documents, and responses build themselves from a parsed response document
//! plus the request that produced it.

pub mod authorization;
pub mod configuration;
pub mod registration;
pub mod token;

pub use authorization::*;
pub use configuration::*;
pub use registration::*;
pub use token::*;
