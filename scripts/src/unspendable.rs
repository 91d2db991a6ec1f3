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

use bitcoin::hashes::{sha256, Hash};
use secp256k1::{PublicKey, XOnlyPublicKey, SECP256K1};

/// Extension trait for types containing EC keys, which can be made provably
/// unspendable
pub trait UnspendableKey {
    /// Generates provably unspendable key version
    fn unspendable_key() -> Self;
}

impl UnspendableKey for XOnlyPublicKey {
    /// BIP-341 "nothing up my sleeve" point `H`, which x coordinate is the
    /// SHA256 of the uncompressed secp256k1 generator. Nobody knows its
    /// discrete logarithm, so the taproot key path can't be used.
    fn unspendable_key() -> Self {
        let generator = PublicKey::from_secret_key(SECP256K1, &secp256k1::ONE_KEY);
        let hash = sha256::Hash::hash(&generator.serialize_uncompressed());
        XOnlyPublicKey::from_slice(&hash[..]).expect("BIP-341 NUMS point must be on the curve")
    }
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::hex::ToHex;

    use super::*;

    #[test]
    fn nums_point() {
        assert_eq!(
            XOnlyPublicKey::unspendable_key().serialize().to_hex(),
            "50929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0"
        );
    }
}
