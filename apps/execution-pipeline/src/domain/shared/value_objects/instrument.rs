//! Instrument identification: asset class tag plus the venue's numeric code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::DomainError;

/// Asset class of an instrument, as named by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    /// Cash equity.
    Stock,
    /// Exchange traded fund.
    Etf,
    /// Contract for difference on a stock.
    CfdOnStock,
    /// Spot FX pair.
    FxSpot,
    /// Crypto pair traded as FX.
    FxCrypto,
}

impl AssetType {
    /// Wire name of the asset type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "Stock",
            Self::Etf => "Etf",
            Self::CfdOnStock => "CfdOnStock",
            Self::FxSpot => "FxSpot",
            Self::FxCrypto => "FxCrypto",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Stock" => Ok(Self::Stock),
            "Etf" => Ok(Self::Etf),
            "CfdOnStock" => Ok(Self::CfdOnStock),
            "FxSpot" => Ok(Self::FxSpot),
            "FxCrypto" => Ok(Self::FxCrypto),
            other => Err(DomainError::invalid_value(
                "asset_type",
                format!("unsupported asset type '{other}'"),
            )),
        }
    }
}

/// An instrument as the venue knows it: `(asset type, UIC)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentKey {
    /// Asset class.
    pub asset_type: AssetType,
    /// Venue universal instrument code.
    pub uic: u32,
}

impl InstrumentKey {
    /// Create a new instrument key.
    #[must_use]
    pub const fn new(asset_type: AssetType, uic: u32) -> Self {
        Self { asset_type, uic }
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.asset_type, self.uic)
    }
}

impl FromStr for InstrumentKey {
    type Err = DomainError;

    /// Parses the `AssetType:Uic` form, e.g. `Stock:211`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (asset, uic) = s.split_once(':').ok_or_else(|| {
            DomainError::invalid_value("instrument", format!("expected AssetType:Uic, got '{s}'"))
        })?;
        let uic = uic
            .parse::<u32>()
            .map_err(|e| DomainError::invalid_value("instrument", format!("bad uic '{uic}': {e}")))?;
        Ok(Self::new(asset.parse()?, uic))
    }
}
