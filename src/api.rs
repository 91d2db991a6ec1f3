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

//! Functional API working with hex-encoded keys and scripts.

use bitcoin::hashes::hex::{FromHex, ToHex};
use bitcoin::Script;
use secp256k1::{PublicKey, XOnlyPublicKey};
use templates::{
    compressed_key_from_slice, p2ms, p2tr, p2tr_ms, p2tr_ns, x_only_key_from_slice, AddressParams,
    LeafKind, ScriptTemplate, ScriptTemplateResult, TapLeaf, TapTree, TaprootSpend,
};

use crate::Error;

/// Parses lowercase even-length hex string without `0x` prefix.
pub fn parse_hex(s: &str) -> Result<Vec<u8>, Error> {
    if s.len() % 2 != 0 || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(Error::Hex(s.to_owned()));
    }
    Vec::from_hex(s).map_err(|_| Error::Hex(s.to_owned()))
}

pub(crate) fn parse_compressed_key(s: &str) -> Result<PublicKey, Error> {
    Ok(compressed_key_from_slice(&parse_hex(s)?)?)
}

pub(crate) fn parse_x_only_key(s: &str) -> Result<XOnlyPublicKey, Error> {
    Ok(x_only_key_from_slice(&parse_hex(s)?)?)
}

fn parse_compressed_keys(keys: &[String]) -> Result<Vec<PublicKey>, Error> {
    keys.iter().map(String::as_str).map(parse_compressed_key).collect()
}

/// Request for a single output script, with all keys and scripts in hex.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", tag = "type", rename_all = "kebab-case")
)]
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ScriptRequest {
    /// Public key hash of a compressed key.
    Pkh {
        /// Compressed public key.
        key: String,
    },

    /// Witness public key hash of a compressed key.
    Wpkh {
        /// Compressed public key.
        key: String,
    },

    /// Script hash of a custom redeem script.
    Sh {
        /// Redeem script.
        script: String,
    },

    /// Witness script hash of a custom witness script.
    Wsh {
        /// Witness script.
        script: String,
    },

    /// Script hash of a bare `k`-of-`n` multisig.
    ShMulti {
        /// Number of required signatures.
        threshold: usize,
        /// Compressed public keys.
        keys: Vec<String>,
    },

    /// Witness script hash of a bare `k`-of-`n` multisig.
    WshMulti {
        /// Number of required signatures.
        threshold: usize,
        /// Compressed public keys.
        keys: Vec<String>,
    },

    /// Taproot output.
    Tr {
        /// X-only internal key.
        internal_key: Option<String>,
        /// Tapscript leaf scripts.
        leaves: Vec<String>,
    },
}

impl ScriptRequest {
    /// Parses hex data into a script template.
    pub fn to_template(&self) -> Result<ScriptTemplate, Error> {
        Ok(match self {
            ScriptRequest::Pkh { key } => ScriptTemplate::Pkh(parse_compressed_key(key)?),
            ScriptRequest::Wpkh { key } => ScriptTemplate::Wpkh(parse_compressed_key(key)?),
            ScriptRequest::Sh { script } => ScriptTemplate::Sh(Script::from(parse_hex(script)?)),
            ScriptRequest::Wsh { script } => ScriptTemplate::Wsh(Script::from(parse_hex(script)?)),
            ScriptRequest::ShMulti { threshold, keys } => {
                ScriptTemplate::Sh(p2ms(*threshold, &parse_compressed_keys(keys)?)?)
            }
            ScriptRequest::WshMulti { threshold, keys } => {
                ScriptTemplate::Wsh(p2ms(*threshold, &parse_compressed_keys(keys)?)?)
            }
            ScriptRequest::Tr {
                internal_key,
                leaves,
            } => ScriptTemplate::Tr {
                internal_key: internal_key.as_deref().map(parse_x_only_key).transpose()?,
                leaves: leaves
                    .iter()
                    .map(|script| parse_hex(script).map(Script::from).map(TapLeaf::tapscript))
                    .collect::<Result<_, _>>()?,
            },
        })
    }
}

/// Builds output script and address for the request.
pub fn build_script(
    request: &ScriptRequest,
    params: &AddressParams,
) -> Result<ScriptTemplateResult, Error> {
    Ok(request.to_template()?.build(params)?)
}

/// Builds `k`-of-`n` threshold tapscript leaves from hex x-only keys.
pub fn build_leaves(
    kind: LeafKind,
    threshold: usize,
    keys: &[String],
) -> Result<Vec<TapLeaf>, Error> {
    let keys = keys
        .iter()
        .map(String::as_str)
        .map(parse_x_only_key)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match kind {
        LeafKind::Ns => p2tr_ns(threshold, &keys)?,
        LeafKind::Ms => vec![p2tr_ms(threshold, &keys)?],
    })
}

/// Assembles leaves into taproot script tree and commits it to the internal
/// key (or to the unspendable key, if none is given).
pub fn build_taproot_tree(
    leaves: Vec<TapLeaf>,
    internal_key: Option<&str>,
) -> Result<TaprootSpend, Error> {
    let internal_key = internal_key.map(parse_x_only_key).transpose()?;
    let tree = TapTree::with_leaves(leaves)?;
    Ok(p2tr(internal_key, Some(tree))?)
}

/// Encodes hex `scriptPubkey` as an address.
pub fn encode_address(script: &str, params: &AddressParams) -> Result<String, Error> {
    let script = Script::from(parse_hex(script)?);
    Ok(templates::encode_address(&script, params)?)
}

/// Derives shared key pair from hex private key, matching compressed public
/// key and counterparty compressed public key. Returns hex derived private
/// and compressed public keys.
pub fn derive_shared_key(
    base_priv: &str,
    base_pub: &str,
    counterparty_pub: &str,
) -> Result<(String, String), Error> {
    let derived = ecdh::derive_shared_key_from_slices(
        &parse_hex(base_priv)?,
        &parse_hex(base_pub)?,
        &parse_hex(counterparty_pub)?,
    )?;
    Ok((
        derived.secret_key.display_secret().to_string(),
        derived.public_key.serialize().to_hex(),
    ))
}

#[cfg(test)]
mod test {
    use templates::{AddressNetwork, TemplateError, TemplateTag};

    use super::*;

    const PUB1: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const PUB2: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";
    const PUB3: &str = "02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";
    const PRIV1: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    const PRIV2: &str = "0000000000000000000000000000000000000000000000000000000000000002";

    fn mainnet() -> AddressParams { AddressNetwork::Mainnet.into() }

    fn x_only(key: &str) -> String { key[2..].to_owned() }

    #[test]
    fn hex_rules() {
        assert_eq!(parse_hex("00ff").unwrap(), vec![0, 0xff]);
        assert_eq!(parse_hex("00FF"), Err(Error::Hex(s!("00FF"))));
        assert_eq!(parse_hex("0x00"), Err(Error::Hex(s!("0x00"))));
        assert_eq!(parse_hex("abc"), Err(Error::Hex(s!("abc"))));
    }

    #[test]
    fn pkh_request() {
        let request = ScriptRequest::Pkh {
            key: PUB1.to_owned(),
        };
        let result = build_script(&request, &mainnet()).unwrap();
        assert_eq!(result.tag, TemplateTag::Pkh);
        assert_eq!(
            result.script.as_bytes().to_hex(),
            "76a914751e76e8199196d454941c45d1b3a323f1433bd688ac"
        );
        assert_eq!(result.address, "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
        assert_eq!(
            encode_address("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac", &mainnet())
                .unwrap(),
            result.address
        );

        assert_eq!(
            build_script(&ScriptRequest::Pkh { key: x_only(PUB1) }, &mainnet()),
            Err(Error::Template(TemplateError::InvalidKeyEncoding(
                templates::KeyKind::Compressed
            )))
        );
    }

    #[test]
    fn multisig_requests() {
        let keys = vec![PUB1.to_owned(), PUB2.to_owned(), PUB3.to_owned()];
        let sh = build_script(
            &ScriptRequest::ShMulti {
                threshold: 2,
                keys: keys.clone(),
            },
            &mainnet(),
        )
        .unwrap();
        assert_eq!(sh.tag, TemplateTag::Sh);
        assert!(sh.address.starts_with('3'));
        let inner = sh.inner_script.unwrap();

        let wsh = build_script(&ScriptRequest::WshMulti { threshold: 2, keys }, &mainnet())
            .unwrap();
        assert_eq!(wsh.inner_script, Some(inner.clone()));

        let custom = build_script(
            &ScriptRequest::Wsh {
                script: inner.as_bytes().to_hex(),
            },
            &mainnet(),
        )
        .unwrap();
        assert_eq!(custom.address, wsh.address);

        assert_eq!(
            build_script(
                &ScriptRequest::ShMulti {
                    threshold: 1,
                    keys: vec![]
                },
                &mainnet()
            ),
            Err(Error::Template(TemplateError::EmptyInput))
        );
    }

    #[test]
    fn taproot_requests() {
        let keys = vec![x_only(PUB1), x_only(PUB2), x_only(PUB3)];
        let leaves = build_leaves(LeafKind::Ns, 2, &keys).unwrap();
        assert_eq!(leaves.len(), 3);
        let single = build_leaves(LeafKind::Ms, 2, &keys).unwrap();
        assert_eq!(single.len(), 1);

        let spend = build_taproot_tree(leaves.clone(), None).unwrap();
        for (leaf, control_block) in leaves.iter().zip(spend.control_blocks()) {
            assert!(spend.verify(&control_block, &leaf.script));
        }

        let result = build_script(
            &ScriptRequest::Tr {
                internal_key: None,
                leaves: leaves.iter().map(|leaf| leaf.script.as_bytes().to_hex()).collect(),
            },
            &mainnet(),
        )
        .unwrap();
        assert_eq!(result.script, spend.script_pubkey());
        assert!(result.address.starts_with("bc1p"));

        assert_eq!(
            build_script(
                &ScriptRequest::Tr {
                    internal_key: None,
                    leaves: vec![]
                },
                &mainnet()
            ),
            Err(Error::Template(TemplateError::AmbiguousTaprootSpec))
        );
        assert_eq!(
            build_leaves(LeafKind::Ns, 4, &keys),
            Err(Error::Template(TemplateError::InvalidThreshold {
                threshold: 4,
                keys: 3
            }))
        );
    }

    #[test]
    fn shared_key() {
        let (derived_priv, derived_pub) = derive_shared_key(PRIV1, PUB1, PUB2).unwrap();
        assert_eq!(
            derived_priv,
            "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee6"
        );
        let expected = PublicKey::from_secret_key(
            secp256k1::SECP256K1,
            &secp256k1::SecretKey::from_slice(&parse_hex(&derived_priv).unwrap()).unwrap(),
        );
        assert_eq!(derived_pub, expected.serialize().to_hex());

        assert_eq!(
            derive_shared_key(PRIV2, PUB1, PUB2),
            Err(Error::Derive(ecdh::DeriveError::KeyPairMismatch))
        );
    }
}
