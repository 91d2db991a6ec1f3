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

//! Additive key derivation from an ECDH shared secret.
//!
//! Two parties `A` and `B` holding key pairs `(a, A = a·G)` and
//! `(b, B = b·G)` compute the same shared point `S = a·B = b·A`. The x
//! coordinate of `S` is used as a scalar `s`, which is added to the base key:
//! the derived pair is `(a + s, A + s·G)`. `B` can compute `A + s·G` knowing
//! only `b` and `A`, so both parties agree on the derived public key while no
//! private key leaves its owner.
//!
//! This is not BIP-32: there are no chain codes or derivation paths.

// Coding conventions
#![recursion_limit = "256"]
#![deny(unsafe_code)]
#![warn(dead_code, missing_docs)]

#[macro_use]
extern crate amplify;

use bitcoin_templates::{compressed_key_from_slice, secret_key_from_slice, KeyKind, TemplateError};
use secp256k1::ecdh::shared_secret_point;
use secp256k1::{PublicKey, Scalar, SecretKey, SECP256K1};

/// Errors deriving shared keys.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
pub enum DeriveError {
    /// invalid {0} key encoding.
    InvalidKeyEncoding(KeyKind),

    /// base public key does not correspond to the base private key.
    KeyPairMismatch,

    /// elliptic curve operation produced a zero scalar or a point at infinity.
    CurveEdgeCase,
}

impl From<TemplateError> for DeriveError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::InvalidKeyEncoding(kind) => DeriveError::InvalidKeyEncoding(kind),
            _ => DeriveError::CurveEdgeCase,
        }
    }
}

/// Key pair derived from a base key and a counterparty public key.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DerivedKey {
    /// Derived private key `base_priv + s`.
    pub secret_key: SecretKey,

    /// Derived public key `base_pub + s·G`.
    pub public_key: PublicKey,
}

/// Computes ECDH point `own_priv · counterparty_pub` and returns its x
/// coordinate as a curve scalar.
///
/// # Errors
///
/// [`DeriveError::CurveEdgeCase`] if the coordinate is zero or does not fit
/// into the curve order.
pub fn shared_scalar(
    own_priv: &SecretKey,
    counterparty_pub: &PublicKey,
) -> Result<Scalar, DeriveError> {
    let point = shared_secret_point(counterparty_pub, own_priv);
    let mut x = [0u8; 32];
    x.copy_from_slice(&point[..32]);
    if x == [0u8; 32] {
        return Err(DeriveError::CurveEdgeCase);
    }
    Scalar::from_be_bytes(x).map_err(|_| DeriveError::CurveEdgeCase)
}

/// Derives key pair from own base key pair and counterparty base public key.
///
/// # Errors
///
/// - [`DeriveError::KeyPairMismatch`] if `base_pub != base_priv·G`;
/// - [`DeriveError::CurveEdgeCase`] if the shared scalar is invalid or the
///   derived private key is zero.
pub fn derive_shared_key(
    base_priv: &SecretKey,
    base_pub: &PublicKey,
    counterparty_pub: &PublicKey,
) -> Result<DerivedKey, DeriveError> {
    if PublicKey::from_secret_key(SECP256K1, base_priv) != *base_pub {
        return Err(DeriveError::KeyPairMismatch);
    }
    let tweak = shared_scalar(base_priv, counterparty_pub)?;
    let secret_key = base_priv.add_tweak(&tweak).map_err(|_| DeriveError::CurveEdgeCase)?;
    let public_key = base_pub
        .add_exp_tweak(SECP256K1, &tweak)
        .map_err(|_| DeriveError::CurveEdgeCase)?;
    Ok(DerivedKey {
        secret_key,
        public_key,
    })
}

/// Computes public key which the counterparty derives with
/// [`derive_shared_key`], using own private key and counterparty base
/// public key only.
pub fn derive_counterparty_pubkey(
    own_priv: &SecretKey,
    counterparty_base_pub: &PublicKey,
) -> Result<PublicKey, DeriveError> {
    let tweak = shared_scalar(own_priv, counterparty_base_pub)?;
    counterparty_base_pub
        .add_exp_tweak(SECP256K1, &tweak)
        .map_err(|_| DeriveError::CurveEdgeCase)
}

/// Same as [`derive_shared_key`], but takes raw keys: 32-byte private key and
/// 33-byte compressed public keys.
pub fn derive_shared_key_from_slices(
    base_priv: &[u8],
    base_pub: &[u8],
    counterparty_pub: &[u8],
) -> Result<DerivedKey, DeriveError> {
    let base_priv = secret_key_from_slice(base_priv)?;
    let base_pub = compressed_key_from_slice(base_pub)?;
    let counterparty_pub = compressed_key_from_slice(counterparty_pub)?;
    derive_shared_key(&base_priv, &base_pub, &counterparty_pub)
}
