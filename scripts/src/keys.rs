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

//! Strict parsing of raw key material. Length and prefix are checked before
//! the data reach the curve library, so that any malformed encoding is
//! reported as [`TemplateError::InvalidKeyEncoding`].

use secp256k1::{PublicKey, SecretKey, XOnlyPublicKey};

use crate::{KeyKind, TemplateError};

/// Parses 33-byte compressed public key with `02` or `03` prefix.
pub fn compressed_key_from_slice(data: &[u8]) -> Result<PublicKey, TemplateError> {
    match data {
        [0x02 | 0x03, ..] if data.len() == 33 => PublicKey::from_slice(data)
            .map_err(|_| TemplateError::InvalidKeyEncoding(KeyKind::Compressed)),
        _ => Err(TemplateError::InvalidKeyEncoding(KeyKind::Compressed)),
    }
}

/// Parses 32-byte x-only (BIP-340) public key.
pub fn x_only_key_from_slice(data: &[u8]) -> Result<XOnlyPublicKey, TemplateError> {
    if data.len() != 32 {
        return Err(TemplateError::InvalidKeyEncoding(KeyKind::XOnly));
    }
    XOnlyPublicKey::from_slice(data).map_err(|_| TemplateError::InvalidKeyEncoding(KeyKind::XOnly))
}

/// Parses 32-byte big-endian secret key, which must lie in `[1, n-1]`.
pub fn secret_key_from_slice(data: &[u8]) -> Result<SecretKey, TemplateError> {
    if data.len() != 32 {
        return Err(TemplateError::InvalidKeyEncoding(KeyKind::Private));
    }
    SecretKey::from_slice(data).map_err(|_| TemplateError::InvalidKeyEncoding(KeyKind::Private))
}
