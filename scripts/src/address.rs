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

//! Address encoding: Base58Check for P2PKH and P2SH, Bech32 for witness v0
//! and Bech32m for witness v1 (taproot) outputs, with configurable network
//! parameters.

use std::str::FromStr;

use bech32::{FromBase32, ToBase32, Variant};
use bitcoin::hashes::Hash;
use bitcoin::util::address::WitnessVersion;
use bitcoin::util::base58;
use bitcoin::{PubkeyHash, Script, ScriptHash, WPubkeyHash, WScriptHash};
use secp256k1::XOnlyPublicKey;

/// Maximal length of bech32 human-readable part.
pub const BECH32_HRP_MAX_LEN: usize = 83;

/// Errors encoding and decoding addresses.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum AddressError {
    /// unsupported network or address parameters: {0}
    UnsupportedNetwork(String),

    /// script has no address representation
    UnsupportedScript,

    /// invalid Base58Check encoding. Details: {0}
    #[from]
    Base58(base58::Error),

    /// invalid bech32 encoding. Details: {0}
    #[from]
    Bech32(bech32::Error),

    /// witness version {version} address uses wrong bech32 checksum variant
    WrongChecksumVariant {
        /// Witness version of the address
        version: u8,
    },

    /// witness program of version {version} can't have length of {len} bytes
    InvalidWitnessProgram {
        /// Witness version of the address
        version: u8,
        /// Length of the witness program
        len: usize,
    },

    /// addresses with witness version {0} are not supported
    UnsupportedWitnessVersion(u8),

    /// unknown address version byte {0}
    UnknownVersionByte(u8),

    /// address human-readable part `{0}` does not match the network
    UnknownHrp(String),

    /// Base58Check address payload has invalid length of {0} bytes
    InvalidPayloadLength(usize),
}

/// Bitcoin network used by the address
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "lowercase")
)]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
pub enum AddressNetwork {
    /// Bitcoin mainnet
    #[display("mainnet")]
    Mainnet,

    /// Bitcoin testnet and signet
    #[display("testnet")]
    Testnet,

    /// Bitcoin regtest networks
    #[display("regtest")]
    Regtest,
}

impl Default for AddressNetwork {
    fn default() -> Self { AddressNetwork::Mainnet }
}

impl FromStr for AddressNetwork {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "mainnet" | "bitcoin" => AddressNetwork::Mainnet,
            "testnet" | "signet" => AddressNetwork::Testnet,
            "regtest" => AddressNetwork::Regtest,
            _ => return Err(AddressError::UnsupportedNetwork(s.to_owned())),
        })
    }
}

impl From<bitcoin::Network> for AddressNetwork {
    fn from(network: bitcoin::Network) -> Self {
        match network {
            bitcoin::Network::Bitcoin => AddressNetwork::Mainnet,
            bitcoin::Network::Testnet => AddressNetwork::Testnet,
            bitcoin::Network::Signet => AddressNetwork::Testnet,
            bitcoin::Network::Regtest => AddressNetwork::Regtest,
        }
    }
}

impl AddressNetwork {
    /// Detects whether the network is a kind of test network (testnet, signet,
    /// regtest).
    pub fn is_testnet(self) -> bool { self != Self::Mainnet }
}

/// Network-specific address encoding parameters.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct AddressParams {
    /// Base58Check version byte for P2PKH addresses
    pub p2pkh_prefix: u8,

    /// Base58Check version byte for P2SH addresses
    pub p2sh_prefix: u8,

    /// Bech32 human-readable part for witness addresses
    pub bech32_hrp: String,
}

impl From<AddressNetwork> for AddressParams {
    fn from(network: AddressNetwork) -> Self {
        let (p2pkh_prefix, p2sh_prefix, hrp) = match network {
            AddressNetwork::Mainnet => (0x00, 0x05, "bc"),
            AddressNetwork::Testnet => (0x6f, 0xc4, "tb"),
            AddressNetwork::Regtest => (0x6f, 0xc4, "bcrt"),
        };
        AddressParams {
            p2pkh_prefix,
            p2sh_prefix,
            bech32_hrp: hrp.to_owned(),
        }
    }
}

impl Default for AddressParams {
    fn default() -> Self { AddressParams::from(AddressNetwork::Mainnet) }
}

impl AddressParams {
    /// Constructs custom address parameters, checking that version bytes are
    /// distinct and that the human-readable part is a non-empty lowercase
    /// printable ASCII string.
    pub fn custom(
        p2pkh_prefix: u8,
        p2sh_prefix: u8,
        bech32_hrp: impl ToString,
    ) -> Result<AddressParams, AddressError> {
        let params = AddressParams {
            p2pkh_prefix,
            p2sh_prefix,
            bech32_hrp: bech32_hrp.to_string(),
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks consistency of the parameters.
    pub fn validate(&self) -> Result<(), AddressError> {
        let hrp = &self.bech32_hrp;
        if self.p2pkh_prefix == self.p2sh_prefix {
            return Err(AddressError::UnsupportedNetwork(format!(
                "P2PKH and P2SH version bytes are both {:#04x}",
                self.p2pkh_prefix
            )));
        }
        if hrp.is_empty()
            || hrp.len() > BECH32_HRP_MAX_LEN
            || !hrp.bytes().all(|b| (33..=126).contains(&b) && !b.is_ascii_uppercase())
        {
            return Err(AddressError::UnsupportedNetwork(format!(
                "invalid bech32 human-readable part `{}`",
                hrp
            )));
        }
        Ok(())
    }
}

/// Address format
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "lowercase")
)]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
pub enum AddressFormat {
    /// Pay-to-public key hash
    #[display("P2PKH")]
    P2pkh,

    /// Pay-to-script hash
    #[display("P2SH")]
    P2sh,

    /// Pay-to-witness public key hash
    #[display("P2WPKH")]
    P2wpkh,

    /// Pay-to-witness script hash
    #[display("P2WSH")]
    P2wsh,

    /// Pay-to-taproot
    #[display("P2TR")]
    P2tr,
}

impl AddressFormat {
    /// Detects address format matching the `scriptPubkey`. Returns `None` for
    /// scripts which have no address representation.
    pub fn detect(script: &Script) -> Option<AddressFormat> {
        Some(if script.is_p2pkh() {
            AddressFormat::P2pkh
        } else if script.is_p2sh() {
            AddressFormat::P2sh
        } else if script.is_v0_p2wpkh() {
            AddressFormat::P2wpkh
        } else if script.is_v0_p2wsh() {
            AddressFormat::P2wsh
        } else if script.is_v1_p2tr() {
            AddressFormat::P2tr
        } else {
            return None;
        })
    }

    /// Returns witness version used by the address format.
    /// Returns `None` for pre-SegWit address formats.
    pub fn witness_version(self) -> Option<WitnessVersion> {
        match self {
            AddressFormat::P2pkh | AddressFormat::P2sh => None,
            AddressFormat::P2wpkh | AddressFormat::P2wsh => Some(WitnessVersion::V0),
            AddressFormat::P2tr => Some(WitnessVersion::V1),
        }
    }

    /// Bech32 checksum variant for the witness formats.
    pub fn bech32_variant(self) -> Option<Variant> {
        match self.witness_version()? {
            WitnessVersion::V0 => Some(Variant::Bech32),
            _ => Some(Variant::Bech32m),
        }
    }
}

impl FromStr for AddressFormat {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[allow(clippy::match_str_case_mismatch)]
        Ok(match s.to_uppercase().as_str() {
            "P2PKH" => AddressFormat::P2pkh,
            "P2SH" => AddressFormat::P2sh,
            "P2WPKH" => AddressFormat::P2wpkh,
            "P2WSH" => AddressFormat::P2wsh,
            "P2TR" => AddressFormat::P2tr,
            _ => return Err(AddressError::UnsupportedScript),
        })
    }
}

/// Internal address content. Consists of serialized hashes or x-only key value.
#[derive(
    Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, From
)]
pub enum AddressPayload {
    /// P2PKH payload.
    #[from]
    #[display("raw_pkh({0})")]
    PubkeyHash(PubkeyHash),

    /// P2SH payload.
    #[from]
    #[display("raw_sh({0})")]
    ScriptHash(ScriptHash),

    /// P2WPKH payload.
    #[from]
    #[display("raw_wpkh({0})")]
    WPubkeyHash(WPubkeyHash),

    /// P2WSH payload.
    #[from]
    #[display("raw_wsh({0})")]
    WScriptHash(WScriptHash),

    /// P2TR payload.
    #[display("raw_tr({output_key})")]
    Taproot {
        /// Taproot output key (tweaked key)
        output_key: XOnlyPublicKey,
    },
}

impl AddressPayload {
    /// Extracts payload from a given `scriptPubkey`.
    pub fn from_script(script: &Script) -> Result<Self, AddressError> {
        let format = AddressFormat::detect(script).ok_or(AddressError::UnsupportedScript)?;
        let data = script.as_bytes();
        Ok(match format {
            AddressFormat::P2pkh => AddressPayload::PubkeyHash(
                PubkeyHash::from_slice(&data[3..23]).map_err(|_| AddressError::UnsupportedScript)?,
            ),
            AddressFormat::P2sh => AddressPayload::ScriptHash(
                ScriptHash::from_slice(&data[2..22]).map_err(|_| AddressError::UnsupportedScript)?,
            ),
            AddressFormat::P2wpkh => AddressPayload::WPubkeyHash(
                WPubkeyHash::from_slice(&data[2..22])
                    .map_err(|_| AddressError::UnsupportedScript)?,
            ),
            AddressFormat::P2wsh => AddressPayload::WScriptHash(
                WScriptHash::from_slice(&data[2..34])
                    .map_err(|_| AddressError::UnsupportedScript)?,
            ),
            AddressFormat::P2tr => AddressPayload::Taproot {
                output_key: XOnlyPublicKey::from_slice(&data[2..34])
                    .map_err(|_| AddressError::UnsupportedScript)?,
            },
        })
    }

    /// Returns script corresponding to the given address.
    pub fn script_pubkey(self) -> Script {
        match self {
            AddressPayload::PubkeyHash(hash) => Script::new_p2pkh(&hash),
            AddressPayload::ScriptHash(hash) => Script::new_p2sh(&hash),
            AddressPayload::WPubkeyHash(hash) => Script::new_v0_p2wpkh(&hash),
            AddressPayload::WScriptHash(hash) => Script::new_v0_p2wsh(&hash),
            AddressPayload::Taproot { output_key } => bitcoin::blockdata::script::Builder::new()
                .push_int(1)
                .push_slice(&output_key.serialize())
                .into_script(),
        }
    }

    /// Address format of the payload.
    pub fn format(self) -> AddressFormat {
        match self {
            AddressPayload::PubkeyHash(_) => AddressFormat::P2pkh,
            AddressPayload::ScriptHash(_) => AddressFormat::P2sh,
            AddressPayload::WPubkeyHash(_) => AddressFormat::P2wpkh,
            AddressPayload::WScriptHash(_) => AddressFormat::P2wsh,
            AddressPayload::Taproot { .. } => AddressFormat::P2tr,
        }
    }

    fn program(self) -> Vec<u8> {
        match self {
            AddressPayload::PubkeyHash(hash) => hash.to_vec(),
            AddressPayload::ScriptHash(hash) => hash.to_vec(),
            AddressPayload::WPubkeyHash(hash) => hash.to_vec(),
            AddressPayload::WScriptHash(hash) => hash.to_vec(),
            AddressPayload::Taproot { output_key } => output_key.serialize().to_vec(),
        }
    }

    /// Encodes payload as an address string for the given network parameters.
    pub fn encode(self, params: &AddressParams) -> Result<String, AddressError> {
        params.validate()?;
        let format = self.format();
        let prefix = match format {
            AddressFormat::P2pkh => params.p2pkh_prefix,
            AddressFormat::P2sh => params.p2sh_prefix,
            _ => {
                let (version, variant) = match (format.witness_version(), format.bech32_variant()) {
                    (Some(version), Some(variant)) => (version, variant),
                    _ => return Err(AddressError::UnsupportedScript),
                };
                let mut data = vec![bech32::u5::try_from_u8(version.to_num())?];
                data.extend(self.program().to_base32());
                return Ok(bech32::encode(&params.bech32_hrp, data, variant)?);
            }
        };
        let mut data = Vec::with_capacity(21);
        data.push(prefix);
        data.extend(self.program());
        Ok(base58::check_encode_slice(&data))
    }

    /// Decodes address string, checking it against the network parameters.
    ///
    /// Any string with a valid bech32 checksum is decoded as a segwit address,
    /// so an address of another network fails with [`AddressError::UnknownHrp`].
    pub fn decode(s: &str, params: &AddressParams) -> Result<Self, AddressError> {
        params.validate()?;
        match bech32::decode(s) {
            Ok((hrp, data, variant)) => return Self::decode_bech32(hrp, &data, variant, params),
            Err(err) if s.to_lowercase().starts_with(&format!("{}1", params.bech32_hrp)) => {
                return Err(err.into())
            }
            Err(_) => {}
        }

        let data = base58::from_check(s)?;
        if data.len() != 21 {
            return Err(AddressError::InvalidPayloadLength(data.len()));
        }
        let hash = &data[1..];
        Ok(match data[0] {
            prefix if prefix == params.p2pkh_prefix => AddressPayload::PubkeyHash(
                PubkeyHash::from_slice(hash)
                    .map_err(|_| AddressError::InvalidPayloadLength(data.len()))?,
            ),
            prefix if prefix == params.p2sh_prefix => AddressPayload::ScriptHash(
                ScriptHash::from_slice(hash)
                    .map_err(|_| AddressError::InvalidPayloadLength(data.len()))?,
            ),
            prefix => return Err(AddressError::UnknownVersionByte(prefix)),
        })
    }

    fn decode_bech32(
        hrp: String,
        data: &[bech32::u5],
        variant: Variant,
        params: &AddressParams,
    ) -> Result<Self, AddressError> {
        if hrp != params.bech32_hrp {
            return Err(AddressError::UnknownHrp(hrp));
        }
        let (version, program) = match data.split_first() {
            Some((version, program)) => (version.to_u8(), Vec::<u8>::from_base32(program)?),
            None => return Err(AddressError::InvalidWitnessProgram { version: 0, len: 0 }),
        };
        let expected_variant = if version == 0 {
            Variant::Bech32
        } else {
            Variant::Bech32m
        };
        if variant != expected_variant {
            return Err(AddressError::WrongChecksumVariant { version });
        }
        let invalid_program = AddressError::InvalidWitnessProgram {
            version,
            len: program.len(),
        };
        Ok(match (version, program.len()) {
            (0, 20) => AddressPayload::WPubkeyHash(
                WPubkeyHash::from_slice(&program).map_err(|_| invalid_program)?,
            ),
            (0, 32) => AddressPayload::WScriptHash(
                WScriptHash::from_slice(&program).map_err(|_| invalid_program)?,
            ),
            (1, 32) => AddressPayload::Taproot {
                output_key: XOnlyPublicKey::from_slice(&program).map_err(|_| invalid_program)?,
            },
            (0 | 1, _) => return Err(invalid_program),
            (2..=16, _) => return Err(AddressError::UnsupportedWitnessVersion(version)),
            _ => return Err(invalid_program),
        })
    }
}

/// Encodes `scriptPubkey` as an address for the given network parameters.
pub fn encode_address(script: &Script, params: &AddressParams) -> Result<String, AddressError> {
    AddressPayload::from_script(script)?.encode(params)
}

/// Decodes address string into its payload.
#[inline]
pub fn decode_address(s: &str, params: &AddressParams) -> Result<AddressPayload, AddressError> {
    AddressPayload::decode(s, params)
}
