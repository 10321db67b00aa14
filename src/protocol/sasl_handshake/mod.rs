//! Announce a SASL mechanism before the token exchange.

pub mod request;
pub mod response;
