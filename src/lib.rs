// Script showcase library deriving bitcoin output scripts and addresses
// by LNP/BP Association (https://lnp-bp.org)
// Written in 2020-2022 by
//     Dr. Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the Apache-2.0 License
// along with this software.
// If not, see <https://opensource.org/licenses/Apache-2.0>.

//! Derivation of bitcoin output scripts, taproot script trees and addresses
//! from keys, exposed as a hex-in, hex-out API and as explicit showcase
//! requests rendered into plain strings.

// Coding conventions
#![recursion_limit = "256"]
#![deny(unsafe_code)]
#![warn(dead_code, missing_docs)]

#[macro_use]
extern crate amplify;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde_crate as serde;

pub extern crate bitcoin_ecdh as ecdh;
pub extern crate bitcoin_templates as templates;

mod api;
mod error;
pub mod request;

pub use api::{
    build_leaves, build_script, build_taproot_tree, derive_shared_key, encode_address, parse_hex,
    ScriptRequest,
};
pub use error::Error;
pub use request::{Section, SectionKind, SectionRequest, ShowcaseRequest};
