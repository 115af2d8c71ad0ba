//! Nameserver-policy matching and proxy address substitution
//!
//! Implements the Clash `dns.nameserver-policy` semantics: per proxy
//! hostname, the first policy pattern that matches (in document order)
//! selects the DNS server used to resolve that hostname, and the proxy's
//! `server` field is replaced with the first resolved IPv4 address.
//!
//! - [`glob`]: wildcard pattern translation and glob matching
//! - [`rewrite`]: the substitution driver over a YAML document
//! - [`error`]: `PolicyError` with the validation/resolution split

pub mod error;
pub mod glob;
pub mod rewrite;

pub use error::{PolicyError, PolicyResult};
pub use glob::{glob_match, pattern_matches, translate_pattern};
pub use rewrite::apply_policy;
