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

use crate::address::AddressError;

/// Kind of the key which failed validation.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
pub enum KeyKind {
    /// 33-byte compressed public key used by ECDSA scripts.
    #[display("compressed public")]
    Compressed,

    /// 32-byte x-only public key used by taproot.
    #[display("x-only public")]
    XOnly,

    /// 32-byte secret key.
    #[display("private")]
    Private,
}

/// Errors constructing output scripts, threshold leaves or taproot trees.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum TemplateError {
    /// invalid {0} key encoding.
    InvalidKeyEncoding(KeyKind),

    /// threshold {threshold} is out of range for a policy with {keys} key(s).
    InvalidThreshold {
        /// Requested number of required signatures.
        threshold: usize,
        /// Number of keys in the policy.
        keys: usize,
    },

    /// empty input: at least one key or leaf script is required.
    EmptyInput,

    /// threshold policy has {0} keys while at most 16 keys are supported.
    TooManyKeys(usize),

    /// public key {0} is used more than once in the same policy.
    DuplicateKey(String),

    /// taproot script tree has {0} leaves, while at most 128 are allowed.
    TooManyLeaves(usize),

    /// {0} is not a valid tapscript leaf version.
    InvalidLeafVersion(u8),

    /// taproot leaf weight must be at least 1.
    ZeroLeafWeight,

    /// taproot output requires an internal key, a script tree or both.
    AmbiguousTaprootSpec,

    /// leaf script is not a recognized threshold tapscript.
    UnrecognizedLeaf,

    /// elliptic curve operation produced a zero scalar or a point at infinity.
    CurveEdgeCase,

    /// {0}
    #[from]
    Address(AddressError),
}
