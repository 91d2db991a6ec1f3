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

use crate::{AddressFormat, TemplateTag};

/// Output category specifies way how the `scriptPubkey` is structured
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "lowercase")
)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Display, Hash)]
#[repr(u8)]
pub enum Category {
    /// Hash-based outputs: **P2PKH** for public key hashes and BIP-16 **P2SH**
    /// for scripts.
    ///
    /// We hash public key or script and use non-SegWit `scriptPubkey`
    /// encoding, with the original public key or redeem script revealed in
    /// `sigScript` of the spending input.
    #[display("hashed")]
    Hashed,

    /// Native SegWit v0 outputs: **P2WPKH** for public keys and **P2WSH** for
    /// scripts.
    ///
    /// The public key or witness script is revealed in witness of the
    /// spending input.
    #[display("segwit")]
    SegWit,

    /// Taproot (SegWit v1) outputs, spendable by key path or by one of
    /// script tree leaves.
    #[display("taproot")]
    Taproot,
}

impl From<AddressFormat> for Category {
    fn from(format: AddressFormat) -> Self {
        match format {
            AddressFormat::P2pkh | AddressFormat::P2sh => Category::Hashed,
            AddressFormat::P2wpkh | AddressFormat::P2wsh => Category::SegWit,
            AddressFormat::P2tr => Category::Taproot,
        }
    }
}

impl From<TemplateTag> for Category {
    fn from(tag: TemplateTag) -> Self {
        match tag {
            TemplateTag::Pkh | TemplateTag::Sh => Category::Hashed,
            TemplateTag::Wpkh | TemplateTag::Wsh => Category::SegWit,
            TemplateTag::TrKey | TemplateTag::TrScript => Category::Taproot,
        }
    }
}

impl Category {
    /// Whether outputs of this category are spent with witness data.
    pub fn is_witness(self) -> bool { !matches!(self, Category::Hashed) }

    /// Signature algorithm used to spend outputs of this category.
    pub fn signature_scheme(self) -> SignatureScheme {
        match self {
            Category::Hashed | Category::SegWit => SignatureScheme::Ecdsa,
            Category::Taproot => SignatureScheme::Schnorr,
        }
    }
}

/// Signature algorithm required by an output
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "lowercase")
)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Display, Hash)]
pub enum SignatureScheme {
    /// ECDSA signatures over compressed public keys
    #[display("ECDSA")]
    Ecdsa,

    /// BIP-340 Schnorr signatures over x-only public keys
    #[display("Schnorr")]
    Schnorr,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(Category::from(AddressFormat::P2sh), Category::Hashed);
        assert_eq!(Category::from(TemplateTag::Wsh), Category::SegWit);
        assert_eq!(Category::from(TemplateTag::TrScript), Category::Taproot);
        assert!(!Category::Hashed.is_witness());
        assert!(Category::Taproot.is_witness());
        assert_eq!(Category::SegWit.signature_scheme().to_string(), "ECDSA");
        assert_eq!(Category::Taproot.signature_scheme().to_string(), "Schnorr");
        assert_eq!(Category::Taproot.to_string(), "taproot");
    }
}
