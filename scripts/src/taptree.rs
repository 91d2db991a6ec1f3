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

//! Taproot script trees: weight-balanced (Huffman) assembly of leaf scripts,
//! merkle paths, output key tweaking and control blocks (see [`TapTree`] and
//! [`TaprootSpend`]).

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::mem;

use bitcoin::blockdata::script::Builder;
use bitcoin::hashes::{sha256, Hash};
pub use bitcoin::util::taproot::{ControlBlock, LeafVersion, TaprootMerkleBranch};
use bitcoin::util::taproot::{TapBranchHash, TapLeafHash, TapTweakHash};
use bitcoin::Script;
use secp256k1::{Parity, XOnlyPublicKey, SECP256K1};

use crate::TemplateError;

/// Maximal number of leaves in a script tree.
pub const TAPROOT_MAX_LEAVES: usize = 128;

/// Script committed into taproot script tree.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TapLeaf {
    /// Leaf script.
    pub script: Script,

    /// Leaf version; [`LeafVersion::TapScript`] unless some future version is
    /// used.
    pub version: LeafVersion,

    /// Relative probability of the leaf being used for spending. Leaves with
    /// higher weight get shorter merkle paths.
    pub weight: u32,
}

impl TapLeaf {
    /// Constructs tapscript leaf with the default weight of 1.
    #[inline]
    pub fn tapscript(script: Script) -> TapLeaf {
        TapLeaf {
            script,
            version: LeafVersion::TapScript,
            weight: 1,
        }
    }

    /// Constructs leaf with the consensus-encoded leaf version, which must be
    /// even and distinct from the annex tag `0x50`.
    pub fn with_version(script: Script, version: u8) -> Result<TapLeaf, TemplateError> {
        let version = LeafVersion::from_consensus(version)
            .map_err(|_| TemplateError::InvalidLeafVersion(version))?;
        Ok(TapLeaf {
            script,
            version,
            weight: 1,
        })
    }

    /// Replaces leaf weight.
    #[inline]
    pub fn with_weight(mut self, weight: u32) -> TapLeaf {
        self.weight = weight;
        self
    }

    /// Tagged `TapLeaf` hash over the leaf version and length-prefixed script.
    #[inline]
    pub fn tap_leaf_hash(&self) -> TapLeafHash {
        TapLeafHash::from_script(&self.script, self.version)
    }

    /// Leaf hash as a generic tree node hash.
    #[inline]
    pub fn node_hash(&self) -> sha256::Hash {
        sha256::Hash::from_inner(self.tap_leaf_hash().into_inner())
    }
}

fn branch_hash(a: sha256::Hash, b: sha256::Hash) -> sha256::Hash {
    sha256::Hash::from_inner(TapBranchHash::from_node_hashes(a, b).into_inner())
}

fn tweak_key(
    internal_key: XOnlyPublicKey,
    merkle_root: Option<TapBranchHash>,
) -> Result<(XOnlyPublicKey, Parity), TemplateError> {
    let tweak = TapTweakHash::from_key_and_tweak(internal_key, merkle_root).to_scalar();
    internal_key
        .add_tweak(SECP256K1, &tweak)
        .map_err(|_| TemplateError::CurveEdgeCase)
}

struct MergeNode {
    hash: sha256::Hash,
    leaves: Vec<usize>,
}

/// Taproot script tree with known merkle paths for all of its leaves.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TapTree {
    leaves: Vec<TapLeaf>,
    paths: Vec<Vec<sha256::Hash>>,
    merkle_root: TapBranchHash,
}

impl TapTree {
    /// Builds the tree by repeatedly merging two nodes with the lowest weight
    /// (Huffman construction). Nodes with equal weight are merged in the
    /// order they were created: leaves in the order provided, followed by
    /// branches in the order of merging.
    pub fn with_leaves(leaves: Vec<TapLeaf>) -> Result<TapTree, TemplateError> {
        if leaves.is_empty() {
            return Err(TemplateError::EmptyInput);
        }
        if leaves.len() > TAPROOT_MAX_LEAVES {
            return Err(TemplateError::TooManyLeaves(leaves.len()));
        }
        if leaves.iter().any(|leaf| leaf.weight == 0) {
            return Err(TemplateError::ZeroLeafWeight);
        }

        let mut nodes = Vec::with_capacity(leaves.len() * 2 - 1);
        let mut queue = BinaryHeap::with_capacity(leaves.len());
        for (index, leaf) in leaves.iter().enumerate() {
            nodes.push(MergeNode {
                hash: leaf.node_hash(),
                leaves: vec![index],
            });
            queue.push(Reverse((leaf.weight as u64, index)));
        }

        let mut paths = vec![Vec::<sha256::Hash>::new(); leaves.len()];
        let root = loop {
            let Reverse((weight1, first)) = queue.pop().ok_or(TemplateError::EmptyInput)?;
            let (weight2, second) = match queue.pop() {
                Some(Reverse(node)) => node,
                None => break first,
            };

            let first_hash = nodes[first].hash;
            let second_hash = nodes[second].hash;
            let mut merged = mem::take(&mut nodes[first].leaves);
            for leaf in &merged {
                paths[*leaf].push(second_hash);
            }
            let second_leaves = mem::take(&mut nodes[second].leaves);
            for leaf in &second_leaves {
                paths[*leaf].push(first_hash);
            }
            merged.extend(second_leaves);

            queue.push(Reverse((weight1 + weight2, nodes.len())));
            nodes.push(MergeNode {
                hash: branch_hash(first_hash, second_hash),
                leaves: merged,
            });
        };

        Ok(TapTree {
            merkle_root: TapBranchHash::from_inner(nodes[root].hash.into_inner()),
            leaves,
            paths,
        })
    }

    /// Leaves in the order they were provided.
    #[inline]
    pub fn leaves(&self) -> &[TapLeaf] { &self.leaves }

    /// Merkle root of the tree. For a single-leaf tree this is the leaf hash.
    #[inline]
    pub fn merkle_root(&self) -> TapBranchHash { self.merkle_root }

    /// Sibling hashes from the leaf up to the root, innermost first.
    #[inline]
    pub fn merkle_path(&self, leaf_index: usize) -> Option<&[sha256::Hash]> {
        self.paths.get(leaf_index).map(Vec::as_slice)
    }

    /// Depth of each leaf, in the order of leaves.
    pub fn depths(&self) -> Vec<usize> { self.paths.iter().map(Vec::len).collect() }

    /// Commits the tree into the given internal key.
    #[inline]
    pub fn finalize(self, internal_key: XOnlyPublicKey) -> Result<TaprootSpend, TemplateError> {
        TaprootSpend::with_tree(internal_key, self)
    }
}

/// Taproot output: internal key, optional script tree and resulting tweaked
/// output key.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TaprootSpend {
    internal_key: XOnlyPublicKey,
    output_key: XOnlyPublicKey,
    output_key_parity: Parity,
    tree: Option<TapTree>,
}

impl TaprootSpend {
    /// Key-path only output; the key is tweaked with the tagged hash of itself.
    pub fn with_key(internal_key: XOnlyPublicKey) -> Result<TaprootSpend, TemplateError> {
        let (output_key, output_key_parity) = tweak_key(internal_key, None)?;
        Ok(TaprootSpend {
            internal_key,
            output_key,
            output_key_parity,
            tree: None,
        })
    }

    /// Output committing to a script tree.
    pub fn with_tree(
        internal_key: XOnlyPublicKey,
        tree: TapTree,
    ) -> Result<TaprootSpend, TemplateError> {
        let (output_key, output_key_parity) = tweak_key(internal_key, Some(tree.merkle_root()))?;
        Ok(TaprootSpend {
            internal_key,
            output_key,
            output_key_parity,
            tree: Some(tree),
        })
    }

    /// Untweaked internal key.
    #[inline]
    pub fn internal_key(&self) -> XOnlyPublicKey { self.internal_key }

    /// Tweaked output key put into `scriptPubkey`.
    #[inline]
    pub fn output_key(&self) -> XOnlyPublicKey { self.output_key }

    /// Parity of the tweaked output key.
    #[inline]
    pub fn output_key_parity(&self) -> Parity { self.output_key_parity }

    /// Script tree, if any.
    #[inline]
    pub fn tree(&self) -> Option<&TapTree> { self.tree.as_ref() }

    /// Merkle root of the script tree, if any.
    #[inline]
    pub fn merkle_root(&self) -> Option<TapBranchHash> {
        self.tree.as_ref().map(TapTree::merkle_root)
    }

    /// Witness v1 `scriptPubkey`: `OP_1 <output_key>`.
    pub fn script_pubkey(&self) -> Script {
        Builder::new()
            .push_int(1)
            .push_slice(&self.output_key.serialize())
            .into_script()
    }

    /// Control block for spending the leaf with the given index.
    pub fn control_block(&self, leaf_index: usize) -> Option<ControlBlock> {
        let tree = self.tree.as_ref()?;
        let leaf = tree.leaves.get(leaf_index)?;
        // paths of a tree with at most 128 leaves always fit into a merkle branch
        let merkle_branch = TaprootMerkleBranch::try_from(tree.paths[leaf_index].as_slice()).ok()?;
        Some(ControlBlock {
            leaf_version: leaf.version,
            output_key_parity: self.output_key_parity,
            internal_key: self.internal_key,
            merkle_branch,
        })
    }

    /// Control blocks for all leaves, in the order of leaves.
    pub fn control_blocks(&self) -> Vec<ControlBlock> {
        let count = self.tree.as_ref().map(|tree| tree.leaves.len()).unwrap_or_default();
        (0..count).filter_map(|index| self.control_block(index)).collect()
    }

    /// Checks that the control block proves inclusion of the script into this
    /// output.
    #[inline]
    pub fn verify(&self, control_block: &ControlBlock, script: &Script) -> bool {
        control_block.verify_taproot_commitment(SECP256K1, self.output_key, script)
    }
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::hex::{FromHex, ToHex};
    use bitcoin::util::taproot::TaprootBuilder;

    use super::*;
    use crate::test_keys::x_only_keys;
    use crate::threshold::{p2tr_ms, p2tr_ns};
    use crate::UnspendableKey;

    fn dumb_leaves(count: u8) -> Vec<TapLeaf> {
        (0..count)
            .map(|no| TapLeaf::tapscript(Builder::new().push_int(no as i64 + 1).into_script()))
            .collect()
    }

    fn check_all_blocks(spend: &TaprootSpend) {
        let tree = spend.tree().unwrap();
        let control_blocks = spend.control_blocks();
        assert_eq!(control_blocks.len(), tree.leaves().len());
        for (index, (leaf, control_block)) in tree.leaves().iter().zip(control_blocks).enumerate() {
            assert!(spend.verify(&control_block, &leaf.script));
            assert_eq!(control_block.merkle_branch.as_inner(), tree.merkle_path(index).unwrap());
            let parsed = ControlBlock::from_slice(&control_block.serialize()).unwrap();
            assert_eq!(parsed, control_block);
        }
    }

    #[test]
    fn single_leaf() {
        let leaf = dumb_leaves(1).remove(0);
        let tree = TapTree::with_leaves(vec![leaf.clone()]).unwrap();
        assert_eq!(tree.merkle_path(0), Some(&[][..]));
        assert_eq!(tree.merkle_root().into_inner(), leaf.tap_leaf_hash().into_inner());

        let spend = tree.finalize(XOnlyPublicKey::unspendable_key()).unwrap();
        let control_block = spend.control_block(0).unwrap();
        assert!(control_block.merkle_branch.as_inner().is_empty());
        assert_eq!(control_block.serialize().len(), 33);
        assert_eq!(spend.control_block(1), None);
        check_all_blocks(&spend);
    }

    #[test]
    fn bip341_single_leaf_vector() {
        // BIP-341 wallet test vector with a single script leaf
        let internal_key = XOnlyPublicKey::from_slice(
            &Vec::from_hex("187791b6f712a8ea41c8ecdd0ee77fab3e85263b37e1ec18a3651926b3a6cf27")
                .unwrap(),
        )
        .unwrap();
        let script = Script::from(
            Vec::from_hex("20d85a959b0290bf19bb89ed43c916be835475d013da4b362117393e25a48229b8ac")
                .unwrap(),
        );
        let tree = TapTree::with_leaves(vec![TapLeaf::tapscript(script)]).unwrap();
        assert_eq!(
            tree.merkle_root().to_hex(),
            "5b75adecf53548f3ec6ad7d78383bf84cc57b55a3127c72b9a2481752dd88b21"
        );
        let spend = tree.finalize(internal_key).unwrap();
        assert_eq!(
            spend.output_key().serialize().to_hex(),
            "147c9c57132f6e7ecddba9800bb0c4449251c92a1e60371ee77557b6620f3ea3"
        );
        assert_eq!(
            spend.script_pubkey().as_bytes().to_hex(),
            "5120147c9c57132f6e7ecddba9800bb0c4449251c92a1e60371ee77557b6620f3ea3"
        );
        assert_eq!(
            spend.control_block(0).unwrap().serialize().to_hex(),
            "c1187791b6f712a8ea41c8ecdd0ee77fab3e85263b37e1ec18a3651926b3a6cf27"
        );
    }

    #[test]
    fn bip341_key_only_vector() {
        let internal_key = XOnlyPublicKey::from_slice(
            &Vec::from_hex("d6889cb081036e0faefa3a35157ad71086b123b2b144b649798b494c300a961d")
                .unwrap(),
        )
        .unwrap();
        let spend = TaprootSpend::with_key(internal_key).unwrap();
        assert_eq!(
            spend.output_key().serialize().to_hex(),
            "53a1f6e454df1aa2776a2814a721372d6258050de330b3c6d10ee8f4e0dda343"
        );
        assert_eq!(spend.merkle_root(), None);
        assert!(spend.control_blocks().is_empty());
    }

    #[test]
    fn equal_weights_shape() {
        // A, B merge first, then C joins their branch:
        //       root
        //      /    \
        //    AB      C
        //   /  \
        //  A    B
        let tree = TapTree::with_leaves(dumb_leaves(3)).unwrap();
        assert_eq!(tree.depths(), vec![2, 2, 1]);
        let [a, b, c] = [0, 1, 2].map(|i| tree.leaves()[i].node_hash());
        let ab = branch_hash(a, b);
        assert_eq!(tree.merkle_path(0).unwrap(), &[b, c]);
        assert_eq!(tree.merkle_path(1).unwrap(), &[a, c]);
        assert_eq!(tree.merkle_path(2).unwrap(), &[ab]);
        assert_eq!(tree.merkle_root(), TapBranchHash::from_node_hashes(ab, c));

        let tree = TapTree::with_leaves(dumb_leaves(4)).unwrap();
        assert_eq!(tree.depths(), vec![2, 2, 2, 2]);

        let tree = TapTree::with_leaves(dumb_leaves(5)).unwrap();
        assert_eq!(tree.depths(), vec![3, 3, 2, 2, 2]);
    }

    #[test]
    fn weights_shorten_paths() {
        let mut leaves = dumb_leaves(4);
        leaves[3].weight = 10;
        let tree = TapTree::with_leaves(leaves).unwrap();
        // 1 + 1 -> 2; 1 + 2 -> 3; 3 + 10 -> root
        assert_eq!(tree.depths(), vec![3, 3, 2, 1]);
        check_all_blocks(&tree.finalize(XOnlyPublicKey::unspendable_key()).unwrap());
    }

    #[test]
    fn root_ignores_sibling_order() {
        let leaves = dumb_leaves(2);
        let mut reversed = leaves.clone();
        reversed.reverse();
        assert_eq!(
            TapTree::with_leaves(leaves).unwrap().merkle_root(),
            TapTree::with_leaves(reversed).unwrap().merkle_root()
        );
    }

    #[test]
    fn matches_rust_bitcoin_builder() {
        let leaves = dumb_leaves(2);
        let internal_key = x_only_keys(1)[0];
        let spend = TapTree::with_leaves(leaves.clone())
            .unwrap()
            .finalize(internal_key)
            .unwrap();
        let info = TaprootBuilder::new()
            .add_leaf(1, leaves[0].script.clone())
            .unwrap()
            .add_leaf(1, leaves[1].script.clone())
            .unwrap()
            .finalize(SECP256K1, internal_key)
            .unwrap();
        assert_eq!(spend.output_key(), info.output_key().to_inner());
        assert_eq!(spend.output_key_parity(), info.output_key_parity());
        assert_eq!(spend.merkle_root(), info.merkle_root());
    }

    #[test]
    fn threshold_tree_control_blocks() {
        // 2-of-4 gives 6 leaves; Huffman merges them as
        // ((0 1) (2 3)) (4 5), which is the same shape as the builder below
        let keys = x_only_keys(4);
        let leaves = p2tr_ns(2, &keys).unwrap();
        assert_eq!(leaves.len(), 6);
        let spend = TapTree::with_leaves(leaves.clone())
            .unwrap()
            .finalize(keys[0])
            .unwrap();
        assert_eq!(spend.tree().unwrap().depths(), vec![3, 3, 3, 3, 2, 2]);

        let info = [3u8, 3, 3, 3, 2, 2]
            .into_iter()
            .zip(&leaves)
            .fold(TaprootBuilder::new(), |builder, (depth, leaf)| {
                builder.add_leaf(depth, leaf.script.clone()).unwrap()
            })
            .finalize(SECP256K1, keys[0])
            .unwrap();
        assert_eq!(spend.output_key(), info.output_key().to_inner());

        for (leaf, control_block) in leaves.iter().zip(spend.control_blocks()) {
            assert_eq!(
                leaf.tap_leaf_hash(),
                TapLeafHash::from_script(&leaf.script, LeafVersion::TapScript)
            );
            let expected = info
                .control_block(&(leaf.script.clone(), LeafVersion::TapScript))
                .unwrap();
            assert_eq!(control_block, expected);
            assert_eq!(control_block.serialize(), expected.serialize());
        }
        check_all_blocks(&spend);
    }

    #[test]
    fn threshold_trees_verify() {
        let keys = x_only_keys(4);
        for k in 1..=4 {
            let tree = TapTree::with_leaves(p2tr_ns(k, &keys).unwrap()).unwrap();
            check_all_blocks(&tree.finalize(keys[0]).unwrap());

            let tree = TapTree::with_leaves(vec![p2tr_ms(k, &keys).unwrap()]).unwrap();
            check_all_blocks(&tree.finalize(XOnlyPublicKey::unspendable_key()).unwrap());
        }
    }

    #[test]
    fn tampered_block_fails() {
        let spend = TapTree::with_leaves(dumb_leaves(3))
            .unwrap()
            .finalize(XOnlyPublicKey::unspendable_key())
            .unwrap();
        let leaves = spend.tree().unwrap().leaves().to_vec();
        let mut control_block = spend.control_block(0).unwrap();
        assert!(!spend.verify(&control_block, &leaves[1].script));
        control_block.output_key_parity = match control_block.output_key_parity {
            Parity::Even => Parity::Odd,
            Parity::Odd => Parity::Even,
        };
        assert!(!spend.verify(&control_block, &leaves[0].script));
    }

    #[test]
    fn leaf_limits() {
        assert_eq!(TapTree::with_leaves(vec![]), Err(TemplateError::EmptyInput));

        let many = (0..129)
            .map(|no| TapLeaf::tapscript(Builder::new().push_int(no).into_script()))
            .collect::<Vec<_>>();
        assert_eq!(TapTree::with_leaves(many.clone()), Err(TemplateError::TooManyLeaves(129)));
        let tree = TapTree::with_leaves(many[..128].to_vec()).unwrap();
        assert_eq!(tree.depths(), vec![7; 128]);

        let leaf = dumb_leaves(1).remove(0).with_weight(0);
        assert_eq!(TapTree::with_leaves(vec![leaf]), Err(TemplateError::ZeroLeafWeight));
    }

    #[test]
    fn leaf_versions() {
        let script = dumb_leaves(1).remove(0).script;
        assert_eq!(
            TapLeaf::with_version(script.clone(), 0xc0),
            Ok(TapLeaf::tapscript(script.clone()))
        );
        assert_eq!(
            TapLeaf::with_version(script.clone(), 0x51),
            Err(TemplateError::InvalidLeafVersion(0x51))
        );
        assert_eq!(
            TapLeaf::with_version(script.clone(), 0x50),
            Err(TemplateError::InvalidLeafVersion(0x50))
        );

        let leaf = TapLeaf::with_version(script, 0xc2).unwrap();
        assert_eq!(leaf.version.to_consensus(), 0xc2);
        let spend = TapTree::with_leaves(vec![leaf])
            .unwrap()
            .finalize(XOnlyPublicKey::unspendable_key())
            .unwrap();
        assert_eq!(spend.control_block(0).unwrap().serialize()[0] & 0xfe, 0xc2);
        check_all_blocks(&spend);
    }
}
