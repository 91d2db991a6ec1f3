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

//! Output script templates (P2PKH, P2WPKH, bare multisig, P2SH, P2WSH,
//! P2TR), threshold tapscript leaves, weight-balanced taproot script trees
//! with control blocks and address encoding for all of them.
//!
//! General workflow:
//! ```text
//! Keys -> Template / Leaves -> TapTree -> scriptPubkey -> Address
//! ```

// Coding conventions
#![recursion_limit = "256"]
#![deny(unsafe_code)]
#![warn(dead_code, missing_docs)]

#[macro_use]
extern crate amplify;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde_crate as serde;

pub mod address;
mod category;
mod error;
mod keys;
pub mod taptree;
pub mod templates;
mod threshold;
mod unspendable;

pub use address::{
    decode_address, encode_address, AddressError, AddressFormat, AddressNetwork, AddressParams,
    AddressPayload,
};
pub use category::{Category, SignatureScheme};
pub use error::{KeyKind, TemplateError};
pub use keys::{compressed_key_from_slice, secret_key_from_slice, x_only_key_from_slice};
pub use taptree::{ControlBlock, LeafVersion, TapLeaf, TapTree, TaprootSpend, TAPROOT_MAX_LEAVES};
pub use templates::{
    p2ms, p2pkh, p2sh, p2tr, p2tr_pk, p2wpkh, p2wsh, ScriptTemplate, ScriptTemplateResult,
    TemplateTag,
};
pub use threshold::{
    decode_leaf, p2tr_ms, p2tr_ns, Combinations, LeafKind, LeafPolicy, PolicyKey, ThresholdPolicy,
    MAX_POLICY_KEYS,
};
pub use unspendable::UnspendableKey;
