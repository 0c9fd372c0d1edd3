//! Identity primitives.
//!
//! - [`jwt`] -- validation of bearer access tokens issued by the identity provider.

pub mod jwt;
