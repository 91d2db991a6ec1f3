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

//! Threshold (k-of-n) policies and the tapscript leaves implementing them.

use std::collections::BTreeSet;

use bitcoin::blockdata::opcodes::all::{OP_CHECKSIG, OP_CHECKSIGADD, OP_CHECKSIGVERIFY, OP_NUMEQUAL};
use bitcoin::blockdata::opcodes::All;
use bitcoin::blockdata::script::{Builder, Instruction};
use bitcoin::hashes::hex::ToHex;
use bitcoin::Script;
use secp256k1::{PublicKey, XOnlyPublicKey};

use crate::taptree::TapLeaf;
use crate::TemplateError;

/// Maximal number of keys in a threshold policy.
pub const MAX_POLICY_KEYS: usize = 16;

/// Public key which may participate in a threshold policy.
pub trait PolicyKey: Copy + Eq {
    /// Serialized key, as it gets pushed into the script.
    fn key_bytes(&self) -> Vec<u8>;
}

impl PolicyKey for PublicKey {
    fn key_bytes(&self) -> Vec<u8> { self.serialize().to_vec() }
}

impl PolicyKey for XOnlyPublicKey {
    fn key_bytes(&self) -> Vec<u8> { self.serialize().to_vec() }
}

/// Validated `k`-of-`n` policy: `1 <= k <= n <= 16` and no key repeats.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ThresholdPolicy<K: PolicyKey> {
    threshold: usize,
    keys: Vec<K>,
}

impl<K: PolicyKey> ThresholdPolicy<K> {
    /// Validates threshold and keys, keeping the key order as given.
    pub fn new(threshold: usize, keys: impl IntoIterator<Item = K>) -> Result<Self, TemplateError> {
        let keys = keys.into_iter().collect::<Vec<_>>();
        if keys.is_empty() {
            return Err(TemplateError::EmptyInput);
        }
        if keys.len() > MAX_POLICY_KEYS {
            return Err(TemplateError::TooManyKeys(keys.len()));
        }
        if threshold < 1 || threshold > keys.len() {
            return Err(TemplateError::InvalidThreshold {
                threshold,
                keys: keys.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for key in &keys {
            let bytes = key.key_bytes();
            if seen.contains(&bytes) {
                return Err(TemplateError::DuplicateKey(bytes.to_hex()));
            }
            seen.insert(bytes);
        }
        Ok(ThresholdPolicy { threshold, keys })
    }

    /// Number of required signatures.
    #[inline]
    pub fn threshold(&self) -> usize { self.threshold }

    /// Keys in the order they were provided.
    #[inline]
    pub fn keys(&self) -> &[K] { &self.keys }

    /// Iterates over all `threshold`-sized key subsets in combinatorial order.
    pub fn subsets(&self) -> impl Iterator<Item = Vec<K>> + '_ {
        Combinations::new(self.keys.len(), self.threshold)
            .map(|indexes| indexes.into_iter().map(|index| self.keys[index]).collect())
    }
}

/// Iterator over `k`-sized subsets of `0..n` index positions in lexicographic
/// order, i.e. `[0, 1], [0, 2], [1, 2]` for `n = 3, k = 2`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Combinations {
    n: usize,
    next: Option<Vec<usize>>,
}

impl Combinations {
    /// Constructs iterator; yields nothing if `k == 0` or `k > n`.
    pub fn new(n: usize, k: usize) -> Self {
        let next = if k == 0 || k > n {
            None
        } else {
            Some((0..k).collect())
        };
        Combinations { n, next }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let k = current.len();
        let mut following = current.clone();
        // rightmost position which can still be incremented
        if let Some(pos) = (0..k).rev().find(|&pos| following[pos] < self.n - k + pos) {
            following[pos] += 1;
            for next_pos in pos + 1..k {
                following[next_pos] = following[next_pos - 1] + 1;
            }
            self.next = Some(following);
        }
        Some(current)
    }
}

/// Kind of threshold leaf construction.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "lowercase")
)]
pub enum LeafKind {
    /// One leaf per `k`-subset of the keys, each requiring all of the subset
    /// signatures (`tr_ns`).
    #[display("ns")]
    Ns,

    /// A single leaf accumulating signatures with `OP_CHECKSIGADD` (`tr_ms`).
    #[display("ms")]
    Ms,
}

/// Produces one tapscript leaf per `k`-subset of `keys`, taken in
/// combinatorial order over key positions. Each leaf is a chain
/// `<key_1> OP_CHECKSIGVERIFY ... <key_k> OP_CHECKSIG` requiring signatures
/// for every key of the subset.
pub fn p2tr_ns(threshold: usize, keys: &[XOnlyPublicKey]) -> Result<Vec<TapLeaf>, TemplateError> {
    let policy = ThresholdPolicy::new(threshold, keys.iter().copied())?;
    Ok(policy.subsets().map(|subset| TapLeaf::tapscript(all_of_script(&subset))).collect())
}

/// Produces a single tapscript leaf requiring any `k` of `keys`:
/// `<key_1> OP_CHECKSIG <key_2> OP_CHECKSIGADD ... <key_n> OP_CHECKSIGADD
/// OP_k OP_NUMEQUAL`. Keys are sorted in ascending order of their x-only
/// serialization before being put into the script, so the leaf does not
/// depend on the order of the provided keys.
pub fn p2tr_ms(threshold: usize, keys: &[XOnlyPublicKey]) -> Result<TapLeaf, TemplateError> {
    let policy = ThresholdPolicy::new(threshold, keys.iter().copied())?;
    let mut sorted = policy.keys().to_vec();
    sorted.sort_by_key(XOnlyPublicKey::serialize);

    let mut builder = Builder::new();
    for (index, key) in sorted.iter().enumerate() {
        builder = builder.push_slice(&key.serialize()).push_opcode(if index == 0 {
            OP_CHECKSIG
        } else {
            OP_CHECKSIGADD
        });
    }
    let script = builder
        .push_int(policy.threshold() as i64)
        .push_opcode(OP_NUMEQUAL)
        .into_script();
    Ok(TapLeaf::tapscript(script))
}

pub(crate) fn all_of_script(keys: &[XOnlyPublicKey]) -> Script {
    let mut builder = Builder::new();
    for (index, key) in keys.iter().enumerate() {
        builder = builder.push_slice(&key.serialize()).push_opcode(if index + 1 == keys.len() {
            OP_CHECKSIG
        } else {
            OP_CHECKSIGVERIFY
        });
    }
    builder.into_script()
}

/// Threshold policy recovered from a leaf script.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LeafPolicy {
    /// Leaf construction the script matches.
    pub kind: LeafKind,
    /// Number of required signatures.
    pub threshold: usize,
    /// Keys in the order they appear in the script.
    pub keys: Vec<XOnlyPublicKey>,
}

fn small_int(op: All) -> Option<usize> {
    // OP_PUSHNUM_1 is 0x51
    (1..=16u8).find(|n| op == All::from(0x50 + n)).map(usize::from)
}

/// Recovers threshold and keys from a leaf produced by [`p2tr_ns`],
/// [`p2tr_ms`] or [`crate::p2tr_pk`].
pub fn decode_leaf(script: &Script) -> Result<LeafPolicy, TemplateError> {
    let instructions = script
        .instructions()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| TemplateError::UnrecognizedLeaf)?;

    let (body, threshold) = match instructions.as_slice() {
        [body @ .., Instruction::Op(pushnum), Instruction::Op(op)] if *op == OP_NUMEQUAL => {
            (body, Some(small_int(*pushnum).ok_or(TemplateError::UnrecognizedLeaf)?))
        }
        body => (body, None),
    };
    if body.is_empty() || body.len() % 2 != 0 {
        return Err(TemplateError::UnrecognizedLeaf);
    }

    let mut keys = Vec::with_capacity(body.len() / 2);
    let mut ops = Vec::with_capacity(body.len() / 2);
    for chunk in body.chunks(2) {
        match chunk {
            [Instruction::PushBytes(data), Instruction::Op(op)] if data.len() == 32 => {
                let key = XOnlyPublicKey::from_slice(data)
                    .map_err(|_| TemplateError::UnrecognizedLeaf)?;
                keys.push(key);
                ops.push(*op);
            }
            _ => return Err(TemplateError::UnrecognizedLeaf),
        }
    }

    let last = ops.len() - 1;
    match threshold {
        Some(threshold) => {
            let well_formed = ops
                .iter()
                .enumerate()
                .all(|(index, op)| *op == if index == 0 { OP_CHECKSIG } else { OP_CHECKSIGADD });
            if !well_formed || threshold > keys.len() {
                return Err(TemplateError::UnrecognizedLeaf);
            }
            Ok(LeafPolicy {
                kind: LeafKind::Ms,
                threshold,
                keys,
            })
        }
        None => {
            let well_formed = ops.iter().enumerate().all(|(index, op)| {
                *op == if index == last {
                    OP_CHECKSIG
                } else {
                    OP_CHECKSIGVERIFY
                }
            });
            if !well_formed {
                return Err(TemplateError::UnrecognizedLeaf);
            }
            Ok(LeafPolicy {
                kind: LeafKind::Ns,
                threshold: keys.len(),
                keys,
            })
        }
    }
}
