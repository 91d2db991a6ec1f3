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

use ecdh::DeriveError;
use templates::{AddressError, TemplateError};

/// Errors of the showcase API.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum Error {
    /// invalid hex string `{0}`; lowercase hex of even length without `0x`
    /// prefix is expected.
    Hex(String),

    /// request references key #{0}, which is not present in the key list.
    UnknownKey(usize),

    /// {0}
    #[from]
    Template(TemplateError),

    /// {0}
    #[from]
    Address(AddressError),

    /// {0}
    #[from]
    Derive(DeriveError),
}
