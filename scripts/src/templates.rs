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

//! Canonical output script templates.

use bitcoin::blockdata::opcodes::all::{
    OP_CHECKMULTISIG, OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160,
};
use bitcoin::blockdata::script::Builder;
use bitcoin::hashes::{hash160, sha256, Hash};
use bitcoin::Script;
use secp256k1::{PublicKey, XOnlyPublicKey};

use crate::taptree::{TapLeaf, TapTree, TaprootSpend};
use crate::threshold::{all_of_script, ThresholdPolicy};
use crate::{encode_address, AddressParams, Category, TemplateError, UnspendableKey};

/// Pay-to-public-key-hash:
/// `OP_DUP OP_HASH160 <hash160(pubkey)> OP_EQUALVERIFY OP_CHECKSIG`.
pub fn p2pkh(pubkey: &PublicKey) -> Script {
    let hash = hash160::Hash::hash(&pubkey.serialize());
    Builder::new()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(&hash[..])
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

/// Pay-to-witness-public-key-hash: `OP_0 <hash160(pubkey)>`.
pub fn p2wpkh(pubkey: &PublicKey) -> Script {
    let hash = hash160::Hash::hash(&pubkey.serialize());
    Builder::new().push_int(0).push_slice(&hash[..]).into_script()
}

/// Bare multisig: `OP_k <key_1> ... <key_n> OP_n OP_CHECKMULTISIG`, keys in
/// the order provided.
pub fn p2ms(threshold: usize, keys: &[PublicKey]) -> Result<Script, TemplateError> {
    let policy = ThresholdPolicy::new(threshold, keys.iter().copied())?;
    let builder = policy
        .keys()
        .iter()
        .fold(Builder::new().push_int(policy.threshold() as i64), |builder, key| {
            builder.push_slice(&key.serialize())
        });
    Ok(builder
        .push_int(policy.keys().len() as i64)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script())
}

/// Pay-to-script-hash: `OP_HASH160 <hash160(inner)> OP_EQUAL`.
pub fn p2sh(inner: &Script) -> Script {
    let hash = hash160::Hash::hash(inner.as_bytes());
    Builder::new()
        .push_opcode(OP_HASH160)
        .push_slice(&hash[..])
        .push_opcode(OP_EQUAL)
        .into_script()
}

/// Pay-to-witness-script-hash: `OP_0 <sha256(inner)>`.
pub fn p2wsh(inner: &Script) -> Script {
    let hash = sha256::Hash::hash(inner.as_bytes());
    Builder::new().push_int(0).push_slice(&hash[..]).into_script()
}

/// Pay-to-taproot output. With no script tree the key is tweaked with an
/// empty merkle root; with no internal key the unspendable BIP-341 point is
/// used, so the output can be spent through the script path only.
pub fn p2tr(
    internal_key: Option<XOnlyPublicKey>,
    tree: Option<TapTree>,
) -> Result<TaprootSpend, TemplateError> {
    match (internal_key, tree) {
        (None, None) => Err(TemplateError::AmbiguousTaprootSpec),
        (Some(internal_key), None) => TaprootSpend::with_key(internal_key),
        (internal_key, Some(tree)) => {
            tree.finalize(internal_key.unwrap_or_else(XOnlyPublicKey::unspendable_key))
        }
    }
}

/// Single-key tapscript leaf `<xkey> OP_CHECKSIG`.
pub fn p2tr_pk(key: XOnlyPublicKey) -> TapLeaf { TapLeaf::tapscript(all_of_script(&[key])) }

/// Kind of the template which produced an output.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "kebab-case")
)]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
pub enum TemplateTag {
    /// Classic public key hash.
    #[display("pkh")]
    Pkh,

    /// Classic script hash.
    #[display("sh")]
    Sh,

    /// Witness public key hash.
    #[display("wpkh")]
    Wpkh,

    /// Witness script hash.
    #[display("wsh")]
    Wsh,

    /// Taproot spendable by the key path only.
    #[display("tr-key")]
    TrKey,

    /// Taproot committing to a script tree.
    #[display("tr-script")]
    TrScript,
}

/// Script intent, which can be turned into `scriptPubkey` and an address.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ScriptTemplate {
    /// Public key hash output.
    Pkh(PublicKey),

    /// Witness v0 public key hash output.
    Wpkh(PublicKey),

    /// Script hash output wrapping redeem script.
    Sh(Script),

    /// Witness v0 script hash output wrapping witness script.
    Wsh(Script),

    /// Taproot output.
    Tr {
        /// Internal key; the unspendable point is used if absent.
        internal_key: Option<XOnlyPublicKey>,
        /// Leaf scripts; key-path only output if empty.
        leaves: Vec<TapLeaf>,
    },
}

impl ScriptTemplate {
    /// Tag of the output this template produces.
    pub fn tag(&self) -> TemplateTag {
        match self {
            ScriptTemplate::Pkh(_) => TemplateTag::Pkh,
            ScriptTemplate::Wpkh(_) => TemplateTag::Wpkh,
            ScriptTemplate::Sh(_) => TemplateTag::Sh,
            ScriptTemplate::Wsh(_) => TemplateTag::Wsh,
            ScriptTemplate::Tr { leaves, .. } if leaves.is_empty() => TemplateTag::TrKey,
            ScriptTemplate::Tr { .. } => TemplateTag::TrScript,
        }
    }

    /// Builds `scriptPubkey` and encodes its address.
    pub fn build(self, params: &AddressParams) -> Result<ScriptTemplateResult, TemplateError> {
        let tag = self.tag();
        let (script, inner_script, taproot) = match self {
            ScriptTemplate::Pkh(key) => (p2pkh(&key), None, None),
            ScriptTemplate::Wpkh(key) => (p2wpkh(&key), None, None),
            ScriptTemplate::Sh(inner) => (p2sh(&inner), Some(inner), None),
            ScriptTemplate::Wsh(inner) => (p2wsh(&inner), Some(inner), None),
            ScriptTemplate::Tr {
                internal_key,
                leaves,
            } => {
                let tree = if leaves.is_empty() {
                    None
                } else {
                    Some(TapTree::with_leaves(leaves)?)
                };
                let spend = p2tr(internal_key, tree)?;
                (spend.script_pubkey(), None, Some(spend))
            }
        };
        let address = encode_address(&script, params)?;
        Ok(ScriptTemplateResult {
            tag,
            script,
            inner_script,
            address,
            taproot,
        })
    }
}

/// Output produced from a [`ScriptTemplate`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ScriptTemplateResult {
    /// Template which produced the output.
    pub tag: TemplateTag,

    /// Output `scriptPubkey`.
    pub script: Script,

    /// Redeem or witness script hashed into the output, if any.
    pub inner_script: Option<Script>,

    /// Address of the output.
    pub address: String,

    /// Taproot output and script tree data.
    pub taproot: Option<TaprootSpend>,
}

impl ScriptTemplateResult {
    /// Output category.
    #[inline]
    pub fn category(&self) -> Category { self.tag.into() }
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::hex::ToHex;
    use bitcoin::{Address, Network};
    use secp256k1::SECP256K1;

    use super::*;
    use crate::test_keys::{compressed_keys, x_only_keys};
    use crate::AddressNetwork;

    #[test]
    fn generator_pkh() {
        let key = compressed_keys(1)[0];
        let script = p2pkh(&key);
        assert_eq!(script.len(), 25);
        assert_eq!(
            script.as_bytes().to_hex(),
            "76a914751e76e8199196d454941c45d1b3a323f1433bd688ac"
        );
        assert_eq!(
            script,
            Script::new_p2pkh(&bitcoin::PublicKey::new(key).pubkey_hash())
        );
        assert_eq!(
            p2wpkh(&key).as_bytes().to_hex(),
            "0014751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn script_hashes() {
        let inner = p2ms(2, &compressed_keys(3)).unwrap();
        assert_eq!(p2sh(&inner), Script::new_p2sh(&inner.script_hash()));
        assert_eq!(p2wsh(&inner), Script::new_v0_p2wsh(&inner.wscript_hash()));
        assert_eq!(p2wsh(&inner).len(), 34);
    }

    #[test]
    fn multisig_layout() {
        let keys = compressed_keys(3);
        let script = p2ms(2, &keys).unwrap();
        let bytes = script.as_bytes();
        assert_eq!(bytes.len(), 1 + 3 * 34 + 2);
        assert_eq!(bytes[0], 0x52);
        assert_eq!(bytes[1], 0x21);
        assert_eq!(&bytes[2..35], &keys[0].serialize()[..]);
        assert_eq!(&bytes[70..103], &keys[2].serialize()[..]);
        assert_eq!(bytes[103], 0x53);
        assert_eq!(bytes[104], 0xae);
    }

    #[test]
    fn multisig_bounds() {
        let keys = compressed_keys(3);
        assert_eq!(p2ms(0, &keys), Err(TemplateError::InvalidThreshold {
            threshold: 0,
            keys: 3
        }));
        assert_eq!(p2ms(4, &keys), Err(TemplateError::InvalidThreshold {
            threshold: 4,
            keys: 3
        }));
        assert_eq!(p2ms(1, &[]), Err(TemplateError::EmptyInput));
        assert_eq!(p2ms(1, &compressed_keys(17)), Err(TemplateError::TooManyKeys(17)));
        assert!(p2ms(16, &compressed_keys(16)).is_ok());
        assert!(matches!(
            p2ms(1, &[keys[0], keys[0]]),
            Err(TemplateError::DuplicateKey(_))
        ));
    }

    #[test]
    fn taproot_outputs() {
        assert_eq!(p2tr(None, None), Err(TemplateError::AmbiguousTaprootSpec));

        let internal_key = x_only_keys(1)[0];
        let spend = p2tr(Some(internal_key), None).unwrap();
        let address = Address::p2tr(SECP256K1, internal_key, None, Network::Bitcoin);
        assert_eq!(spend.script_pubkey(), address.script_pubkey());

        let leaf = p2tr_pk(x_only_keys(2)[1]);
        assert_eq!(leaf.script.len(), 34);
        let tree = TapTree::with_leaves(vec![leaf]).unwrap();
        let root = tree.merkle_root();
        let spend = p2tr(None, Some(tree)).unwrap();
        assert_eq!(spend.internal_key(), XOnlyPublicKey::unspendable_key());
        let address = Address::p2tr(
            SECP256K1,
            XOnlyPublicKey::unspendable_key(),
            Some(root),
            Network::Bitcoin,
        );
        assert_eq!(spend.script_pubkey(), address.script_pubkey());
    }

    #[test]
    fn template_results() {
        let params = AddressParams::from(AddressNetwork::Mainnet);
        let key = compressed_keys(1)[0];

        let result = ScriptTemplate::Pkh(key).build(&params).unwrap();
        assert_eq!(result.tag, TemplateTag::Pkh);
        assert_eq!(result.address, "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
        assert_eq!(result.category(), Category::Hashed);

        let result = ScriptTemplate::Wpkh(key).build(&params).unwrap();
        assert_eq!(result.address, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");

        let inner = p2ms(2, &compressed_keys(3)).unwrap();
        let result = ScriptTemplate::Wsh(inner.clone()).build(&params).unwrap();
        assert_eq!(result.inner_script, Some(inner));
        assert!(result.address.starts_with("bc1q"));
        assert_eq!(result.tag.to_string(), "wsh");

        let result = ScriptTemplate::Tr {
            internal_key: Some(x_only_keys(1)[0]),
            leaves: vec![],
        }
        .build(&params)
        .unwrap();
        assert_eq!(result.tag, TemplateTag::TrKey);
        assert!(result.address.starts_with("bc1p"));

        let result = ScriptTemplate::Tr {
            internal_key: None,
            leaves: vec![p2tr_pk(x_only_keys(1)[0])],
        }
        .build(&params)
        .unwrap();
        assert_eq!(result.tag, TemplateTag::TrScript);
        assert_eq!(result.category(), Category::Taproot);
        assert_eq!(result.taproot.unwrap().control_blocks().len(), 1);

        assert_eq!(
            ScriptTemplate::Tr {
                internal_key: None,
                leaves: vec![]
            }
            .build(&params),
            Err(TemplateError::AmbiguousTaprootSpec)
        );
    }
}
