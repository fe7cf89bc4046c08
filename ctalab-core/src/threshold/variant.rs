use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Named threshold-machine configuration. Deserialised through [`FromStr`],
/// so legacy names are accepted and anything else is `UnsupportedVariant`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Variant {
    #[default]
    Plain,
    MeanCentered,
    PlainLiquidity,
    MeanCenteredLiquidity,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Plain,
        Variant::MeanCentered,
        Variant::PlainLiquidity,
        Variant::MeanCenteredLiquidity,
    ];

    pub fn mean_centered(self) -> bool {
        matches!(self, Variant::MeanCentered | Variant::MeanCenteredLiquidity)
    }

    pub fn liquidity_gated(self) -> bool {
        matches!(self, Variant::PlainLiquidity | Variant::MeanCenteredLiquidity)
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Plain => "plain",
            Variant::MeanCentered => "mean_centered",
            Variant::PlainLiquidity => "plain_liquidity",
            Variant::MeanCenteredLiquidity => "mean_centered_liquidity",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "plain" | "trade_ori" => Ok(Variant::Plain),
            "mean_centered" | "trade_factor_mean" => Ok(Variant::MeanCentered),
            "plain_liquidity" | "trade_ori_amtclean" => Ok(Variant::PlainLiquidity),
            "mean_centered_liquidity" | "trade_factor_amtclean" => {
                Ok(Variant::MeanCenteredLiquidity)
            }
            other => Err(CoreError::UnsupportedVariant(other.to_string())),
        }
    }
}

impl TryFrom<String> for Variant {
    type Error = CoreError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}
