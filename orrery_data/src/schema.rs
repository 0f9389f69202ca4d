use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Validated holder row as consumed by the scene. Construction goes through
/// [`HolderRecord::new`] so malformed upstream data never reaches the
/// populator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderRecord {
    pub wallet_address: String,
    pub token_amount: f64,
    pub percentage: f64,
}

impl HolderRecord {
    pub fn new(
        wallet_address: impl Into<String>,
        token_amount: f64,
        percentage: f64,
    ) -> Result<Self> {
        let wallet_address = wallet_address.into();
        ensure!(
            !wallet_address.trim().is_empty(),
            "holder row is missing a wallet address"
        );
        ensure!(
            token_amount.is_finite() && token_amount >= 0.0,
            "token amount {token_amount} for {wallet_address} is not a finite non-negative number"
        );
        ensure!(
            percentage.is_finite() && (0.0..=100.0).contains(&percentage),
            "holding percentage {percentage} for {wallet_address} is outside 0..=100"
        );
        Ok(Self {
            wallet_address,
            token_amount,
            percentage,
        })
    }
}

/// Untrusted row shape as delivered by an upstream API or snapshot file.
/// The `owner` alias matches the public holder API field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHolderRow {
    #[serde(alias = "owner")]
    pub wallet_address: String,
    pub amount: f64,
}

/// Per-wallet appearance override merged into an entity at creation or
/// refresh time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customization {
    pub wallet_address: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub skin_index: Option<usize>,
}

impl Customization {
    /// Trims free-text fields and rejects entries without a usable wallet
    /// key. Empty nicknames collapse to `None`.
    pub fn sanitized(mut self) -> Option<Self> {
        if self.wallet_address.trim().is_empty() {
            return None;
        }
        self.nickname = self
            .nickname
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Some(self)
    }
}

/// Shortened wallet form used by overlay panels: the first six characters,
/// an ellipsis, then the last four. Addresses short enough to show whole are
/// returned untouched.
pub fn short_wallet(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 13 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_holder_record() {
        let record = HolderRecord::new("wallet-alpha", 5_000.0, 50.0).expect("record is valid");
        assert_eq!(record.wallet_address, "wallet-alpha");
        assert_eq!(record.token_amount, 5_000.0);
        assert_eq!(record.percentage, 50.0);
    }

    #[test]
    fn rejects_blank_wallet() {
        assert!(HolderRecord::new("   ", 1.0, 1.0).is_err());
    }

    #[test]
    fn rejects_non_finite_amount() {
        assert!(HolderRecord::new("wallet", f64::NAN, 1.0).is_err());
        assert!(HolderRecord::new("wallet", f64::INFINITY, 1.0).is_err());
        assert!(HolderRecord::new("wallet", -1.0, 1.0).is_err());
    }

    #[test]
    fn rejects_out_of_range_percentage() {
        assert!(HolderRecord::new("wallet", 1.0, -0.5).is_err());
        assert!(HolderRecord::new("wallet", 1.0, 100.5).is_err());
        assert!(HolderRecord::new("wallet", 1.0, f64::NAN).is_err());
    }

    #[test]
    fn shortens_long_wallets_only() {
        assert_eq!(
            short_wallet("9h3kQabAtUKcnQDkSDme7KSZZLSWNsEq7NronquWwHDy"),
            "9h3kQa...wHDy"
        );
        assert_eq!(short_wallet("short-wallet"), "short-wallet");
    }

    #[test]
    fn sanitize_trims_nickname_and_drops_blank_wallets() {
        let kept = Customization {
            wallet_address: "wallet".to_string(),
            nickname: Some("  Red Giant  ".to_string()),
            skin_index: Some(3),
        }
        .sanitized()
        .expect("wallet present");
        assert_eq!(kept.nickname.as_deref(), Some("Red Giant"));
        assert_eq!(kept.skin_index, Some(3));

        let empty_nick = Customization {
            wallet_address: "wallet".to_string(),
            nickname: Some("   ".to_string()),
            skin_index: None,
        }
        .sanitized()
        .expect("wallet present");
        assert_eq!(empty_nick.nickname, None);

        let dropped = Customization {
            wallet_address: "  ".to_string(),
            nickname: None,
            skin_index: None,
        }
        .sanitized();
        assert!(dropped.is_none());
    }
}
