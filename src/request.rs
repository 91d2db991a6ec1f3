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

//! Showcase requests: explicit list of keys and of output sections built from
//! them, rendered into plain string records.

use std::fmt::{self, Display, Formatter};

use bitcoin::hashes::hex::ToHex;
use secp256k1::rand::thread_rng;
use secp256k1::{PublicKey, SecretKey, XOnlyPublicKey, SECP256K1};
use templates::{
    p2ms, p2tr_ms, p2tr_ns, secret_key_from_slice, AddressParams, Category, ScriptTemplate,
    ScriptTemplateResult, SignatureScheme,
};

use crate::api::parse_hex;
use crate::Error;

/// Kind of output shown in a section. Key references are indexes in
/// [`ShowcaseRequest::keys`].
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", tag = "type", rename_all = "kebab-case")
)]
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum SectionKind {
    /// Classic public key hash of a single key.
    Pkh {
        /// Key index.
        key: usize,
    },

    /// Witness public key hash of a single key.
    Wpkh {
        /// Key index.
        key: usize,
    },

    /// Classic script hash of a `k`-of-`n` multisig.
    ShMulti {
        /// Number of required signatures.
        threshold: usize,
        /// Key indexes.
        keys: Vec<usize>,
    },

    /// Witness script hash of a `k`-of-`n` multisig.
    WshMulti {
        /// Number of required signatures.
        threshold: usize,
        /// Key indexes.
        keys: Vec<usize>,
    },

    /// Taproot output spendable with a single key.
    TrKey {
        /// Key index.
        key: usize,
    },

    /// Taproot output with a leaf per each `k`-subset of keys.
    TrNs {
        /// Number of required signatures.
        threshold: usize,
        /// Key indexes.
        keys: Vec<usize>,
    },

    /// Taproot output with a single `OP_CHECKSIGADD` leaf.
    TrMs {
        /// Number of required signatures.
        threshold: usize,
        /// Key indexes.
        keys: Vec<usize>,
    },

    /// Taproot output with leaves requiring all signatures of the listed key
    /// groups, i.e. `A or (B & C)` for `[[0], [1, 2]]`.
    TrAnyOf {
        /// Key index groups, one per leaf.
        groups: Vec<Vec<usize>>,
    },

    /// Classic public key hash of a key derived from the ECDH shared secret
    /// of two keys.
    SharedPkh {
        /// Own key index.
        key: usize,
        /// Counterparty key index.
        counterparty: usize,
    },
}

/// Single showcase section request.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SectionRequest {
    /// Section title.
    pub title: String,

    /// Output to build.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: SectionKind,
}

/// Explicit showcase request: hex private keys and sections using them.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct ShowcaseRequest {
    /// Hex-encoded private keys.
    pub keys: Vec<String>,

    /// Sections to render.
    pub sections: Vec<SectionRequest>,
}

/// Rendered showcase section. Contains only strings and can be displayed
/// as-is.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Section {
    /// Section title.
    pub title: String,

    /// Output category.
    pub category: Category,

    /// Signature scheme of the keys.
    pub pub_key_type: SignatureScheme,

    /// Hex private keys used in the section.
    pub private_keys: Vec<String>,

    /// Hex public keys; compressed for ECDSA and x-only for Schnorr.
    pub public_keys: Vec<String>,

    /// Hex tapscript leaf scripts.
    pub leaf_scripts: Vec<String>,

    /// Hex control blocks, one per leaf script.
    pub control_blocks: Vec<String>,

    /// Hex script: redeem or witness script for hashed scripts, output
    /// `scriptPubkey` otherwise.
    pub script: String,

    /// Hex `scriptPubkey` committing to the script hash, if any.
    pub script_hash: Option<String>,

    /// Output address.
    pub address: String,
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fn plural(len: usize) -> &'static str {
            if len > 1 {
                "s"
            } else {
                ""
            }
        }

        writeln!(f, "{}", self.title)?;
        writeln!(f, "Private Key{}:", plural(self.private_keys.len()))?;
        for key in &self.private_keys {
            writeln!(f, "  {}", key)?;
        }
        writeln!(f, "{} Public Key{}:", self.pub_key_type, plural(self.public_keys.len()))?;
        for key in &self.public_keys {
            writeln!(f, "  {}", key)?;
        }
        if !self.leaf_scripts.is_empty() {
            writeln!(f, "Leaf Scripts:")?;
            for (script, control_block) in self.leaf_scripts.iter().zip(&self.control_blocks) {
                writeln!(f, "  {}", script)?;
                writeln!(f, "    control block {}", control_block)?;
            }
        }
        writeln!(f, "Script:\n  {}", self.script)?;
        if let Some(script_hash) = &self.script_hash {
            writeln!(f, "Script Hash:\n  {}", script_hash)?;
        }
        writeln!(f, "Address:\n  {}", self.address)
    }
}

struct KeySet {
    secret_key: SecretKey,
    public_key: PublicKey,
    x_only: XOnlyPublicKey,
}

impl KeySet {
    fn with(secret_key: SecretKey) -> KeySet {
        let public_key = PublicKey::from_secret_key(SECP256K1, &secret_key);
        KeySet {
            secret_key,
            public_key,
            x_only: XOnlyPublicKey::from(public_key),
        }
    }
}

impl ShowcaseRequest {
    /// Sections exercising every template kind over secret keys `1`, `2` and
    /// `3`.
    pub fn demo() -> ShowcaseRequest {
        let keys = (1..=3u8).map(|no| format!("{:064x}", no)).collect();
        let section = |title: &str, kind| SectionRequest {
            title: title.to_owned(),
            kind,
        };
        ShowcaseRequest {
            keys,
            sections: vec![
                section("Classic Public Key Hash", SectionKind::Pkh { key: 0 }),
                section("Classic Script Hash: 2 of {A, B, C}", SectionKind::ShMulti {
                    threshold: 2,
                    keys: vec![0, 1, 2],
                }),
                section("Witness Public Key Hash", SectionKind::Wpkh { key: 0 }),
                section("Witness Script Hash: 2 of {A, B, C}", SectionKind::WshMulti {
                    threshold: 2,
                    keys: vec![0, 1, 2],
                }),
                section("Taproot: Single Public Key", SectionKind::TrKey { key: 0 }),
                section("Taproot Multi-Leaf: (A&B) or (A&C) or (B&C)", SectionKind::TrNs {
                    threshold: 2,
                    keys: vec![0, 1, 2],
                }),
                section("Taproot Single-Leaf: 2 of {A, B, C}", SectionKind::TrMs {
                    threshold: 2,
                    keys: vec![0, 1, 2],
                }),
                section("Taproot Multi-Leaf: A or (B&C)", SectionKind::TrAnyOf {
                    groups: vec![vec![0], vec![1, 2]],
                }),
                section("Shared Public Key Hash: A with B", SectionKind::SharedPkh {
                    key: 0,
                    counterparty: 1,
                }),
            ],
        }
    }

    /// Demo sections over `count` private keys generated from the operating
    /// system random number generator. Sections refer to the first three
    /// keys, so at least three keys are required to render them.
    pub fn random(count: usize) -> ShowcaseRequest {
        ShowcaseRequest {
            keys: random_keys(count),
            ..ShowcaseRequest::demo()
        }
    }

    /// Replaces every key with a freshly generated one, keeping the number of
    /// keys and the sections.
    pub fn randomize_keys(&mut self) { self.keys = random_keys(self.keys.len()); }

    fn key_sets(&self) -> Result<Vec<KeySet>, Error> {
        self.keys
            .iter()
            .map(|key| Ok(KeySet::with(secret_key_from_slice(&parse_hex(key)?)?)))
            .collect()
    }

    /// Builds all sections.
    pub fn render(&self, params: &AddressParams) -> Result<Vec<Section>, Error> {
        let key_sets = self.key_sets()?;
        self.sections
            .iter()
            .map(|section| section.render(&key_sets, params))
            .collect()
    }
}

fn random_keys(count: usize) -> Vec<String> {
    let mut rng = thread_rng();
    (0..count)
        .map(|_| SECP256K1.generate_keypair(&mut rng).0.secret_bytes().to_hex())
        .collect()
}

impl SectionRequest {
    fn render(&self, key_sets: &[KeySet], params: &AddressParams) -> Result<Section, Error> {
        let pick = |indexes: &[usize]| -> Result<Vec<&KeySet>, Error> {
            indexes
                .iter()
                .map(|index| key_sets.get(*index).ok_or(Error::UnknownKey(*index)))
                .collect()
        };
        let compressed =
            |sets: &[&KeySet]| sets.iter().map(|set| set.public_key).collect::<Vec<_>>();
        let x_only = |sets: &[&KeySet]| sets.iter().map(|set| set.x_only).collect::<Vec<_>>();

        let (used, template) = match &self.kind {
            SectionKind::Pkh { key } => {
                let used = pick(&[*key])?;
                let template = ScriptTemplate::Pkh(used[0].public_key);
                (used, template)
            }
            SectionKind::Wpkh { key } => {
                let used = pick(&[*key])?;
                let template = ScriptTemplate::Wpkh(used[0].public_key);
                (used, template)
            }
            SectionKind::ShMulti { threshold, keys } => {
                let used = pick(keys)?;
                let template = ScriptTemplate::Sh(p2ms(*threshold, &compressed(&used))?);
                (used, template)
            }
            SectionKind::WshMulti { threshold, keys } => {
                let used = pick(keys)?;
                let template = ScriptTemplate::Wsh(p2ms(*threshold, &compressed(&used))?);
                (used, template)
            }
            SectionKind::TrKey { key } => {
                let used = pick(&[*key])?;
                let template = ScriptTemplate::Tr {
                    internal_key: Some(used[0].x_only),
                    leaves: vec![],
                };
                (used, template)
            }
            SectionKind::TrNs { threshold, keys } => {
                let used = pick(keys)?;
                let template = ScriptTemplate::Tr {
                    internal_key: None,
                    leaves: p2tr_ns(*threshold, &x_only(&used))?,
                };
                (used, template)
            }
            SectionKind::TrMs { threshold, keys } => {
                let used = pick(keys)?;
                let template = ScriptTemplate::Tr {
                    internal_key: None,
                    leaves: vec![p2tr_ms(*threshold, &x_only(&used))?],
                };
                (used, template)
            }
            SectionKind::TrAnyOf { groups } => {
                let mut leaves = Vec::with_capacity(groups.len());
                for group in groups {
                    let group = x_only(&pick(group)?);
                    leaves.extend(p2tr_ns(group.len(), &group)?);
                }
                let mut indexes = groups.iter().flatten().copied().collect::<Vec<_>>();
                indexes.sort_unstable();
                indexes.dedup();
                let template = ScriptTemplate::Tr {
                    internal_key: None,
                    leaves,
                };
                (pick(&indexes)?, template)
            }
            SectionKind::SharedPkh { key, counterparty } => {
                let used = pick(&[*key, *counterparty])?;
                let derived = ecdh::derive_shared_key(
                    &used[0].secret_key,
                    &used[0].public_key,
                    &used[1].public_key,
                )?;
                (used, ScriptTemplate::Pkh(derived.public_key))
            }
        };

        let result = template.build(params)?;
        Ok(self.section(&used, result))
    }

    fn section(&self, used: &[&KeySet], result: ScriptTemplateResult) -> Section {
        let category = result.category();
        let pub_key_type = category.signature_scheme();
        let public_keys = used
            .iter()
            .map(|set| match pub_key_type {
                SignatureScheme::Ecdsa => set.public_key.serialize().to_hex(),
                SignatureScheme::Schnorr => set.x_only.serialize().to_hex(),
            })
            .collect();
        let (leaf_scripts, control_blocks) = match &result.taproot {
            Some(spend) => (
                spend
                    .tree()
                    .map(|tree| {
                        tree.leaves()
                            .iter()
                            .map(|leaf| leaf.script.as_bytes().to_hex())
                            .collect()
                    })
                    .unwrap_or_default(),
                spend
                    .control_blocks()
                    .iter()
                    .map(|control_block| control_block.serialize().to_hex())
                    .collect(),
            ),
            None => (vec![], vec![]),
        };
        let (script, script_hash) = match &result.inner_script {
            Some(inner) => (inner.as_bytes().to_hex(), Some(result.script.as_bytes().to_hex())),
            None => (result.script.as_bytes().to_hex(), None),
        };
        Section {
            title: self.title.clone(),
            category,
            pub_key_type,
            private_keys: used
                .iter()
                .map(|set| set.secret_key.display_secret().to_string())
                .collect(),
            public_keys,
            leaf_scripts,
            control_blocks,
            script,
            script_hash,
            address: result.address,
        }
    }
}
