//! Transaction types and semantic labels

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Derived classification of a transaction. Never set by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Trade,
    Transfer,
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trade => "trade",
            Self::Transfer => "transfer",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }

    /// Labels a transaction of this type may carry
    pub fn allowed_labels(&self) -> &'static [Label] {
        match self {
            Self::Deposit => DEPOSIT_LABELS,
            Self::Withdrawal => WITHDRAWAL_LABELS,
            Self::Trade => TRADE_LABELS,
            Self::Transfer => TRANSFER_LABELS,
        }
    }

    pub fn allows(&self, label: Label) -> bool {
        self.allowed_labels().contains(&label)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic sub-classification of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    RealizedGain,
    Airdrop,
    Fork,
    Mining,
    #[serde(rename = "staking")]
    Reward,
    LoanInterest,
    OtherIncome,
    Gift,
    Lost,
    Donation,
    Cost,
    #[serde(rename = "margin_interest_fee")]
    InterestPayment,
    MarginTradeFee,
    MarginFeeRefund,
    FromPool,
    ToPool,
    LiquidityIn,
    LiquidityOut,
}

pub const INCOME_LABELS: &[Label] = &[
    Label::Airdrop,
    Label::Fork,
    Label::Mining,
    Label::Reward,
    Label::LoanInterest,
    Label::OtherIncome,
];

pub const EXPENSE_LABELS: &[Label] = &[Label::Cost, Label::MarginTradeFee, Label::InterestPayment];

pub const SPECIAL_LABELS: &[Label] = &[Label::Gift, Label::Lost, Label::Donation];

pub const DEPOSIT_LABELS: &[Label] =
    &join::<8>(&[&[Label::RealizedGain, Label::MarginFeeRefund], INCOME_LABELS]);

pub const WITHDRAWAL_LABELS: &[Label] =
    &join::<7>(&[&[Label::RealizedGain], EXPENSE_LABELS, SPECIAL_LABELS]);

pub const TRADE_LABELS: &[Label] = &[Label::LiquidityIn, Label::LiquidityOut];

pub const TRANSFER_LABELS: &[Label] = &[Label::FromPool, Label::ToPool];

/// Concatenate label groups; `N` must equal the total length
const fn join<const N: usize>(groups: &[&[Label]]) -> [Label; N] {
    let mut out = [Label::RealizedGain; N];
    let mut n = 0;
    let mut g = 0;
    while g < groups.len() {
        let mut i = 0;
        while i < groups[g].len() {
            out[n] = groups[g][i];
            n += 1;
            i += 1;
        }
        g += 1;
    }
    assert!(n == N, "label group length mismatch");
    out
}

const ALL_LABELS: &[Label] = &[
    Label::RealizedGain,
    Label::Airdrop,
    Label::Fork,
    Label::Mining,
    Label::Reward,
    Label::LoanInterest,
    Label::OtherIncome,
    Label::Gift,
    Label::Lost,
    Label::Donation,
    Label::Cost,
    Label::InterestPayment,
    Label::MarginTradeFee,
    Label::MarginFeeRefund,
    Label::FromPool,
    Label::ToPool,
    Label::LiquidityIn,
    Label::LiquidityOut,
];

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RealizedGain => "realized_gain",
            Self::Airdrop => "airdrop",
            Self::Fork => "fork",
            Self::Mining => "mining",
            Self::Reward => "staking",
            Self::LoanInterest => "loan_interest",
            Self::OtherIncome => "other_income",
            Self::Gift => "gift",
            Self::Lost => "lost",
            Self::Donation => "donation",
            Self::Cost => "cost",
            Self::InterestPayment => "margin_interest_fee",
            Self::MarginTradeFee => "margin_trade_fee",
            Self::MarginFeeRefund => "margin_fee_refund",
            Self::FromPool => "from_pool",
            Self::ToPool => "to_pool",
            Self::LiquidityIn => "liquidity_in",
            Self::LiquidityOut => "liquidity_out",
        }
    }

    pub fn all() -> &'static [Label] {
        ALL_LABELS
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        ALL_LABELS
            .iter()
            .copied()
            .find(|label| label.as_str() == wanted)
            .ok_or_else(|| Error::Config(format!("unknown label: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_sets_are_disjoint_except_realized_gain() {
        let sets = [DEPOSIT_LABELS, WITHDRAWAL_LABELS, TRADE_LABELS, TRANSFER_LABELS];
        for label in Label::all() {
            let owners = sets.iter().filter(|set| set.contains(label)).count();
            if *label == Label::RealizedGain {
                assert_eq!(owners, 2);
            } else {
                assert_eq!(owners, 1, "{} should belong to exactly one type", label);
            }
        }
    }

    #[test]
    fn test_label_round_trips_through_str() {
        for label in Label::all() {
            assert_eq!(label.as_str().parse::<Label>().unwrap(), *label);
            assert_eq!(
                serde_json::to_value(label).unwrap(),
                serde_json::Value::String(label.as_str().to_string())
            );
        }
        assert!("bogus".parse::<Label>().is_err());
    }

    #[test]
    fn test_label_groups_feed_type_sets() {
        assert!(INCOME_LABELS.iter().all(|l| DEPOSIT_LABELS.contains(l)));
        assert!(EXPENSE_LABELS.iter().all(|l| WITHDRAWAL_LABELS.contains(l)));
        assert!(SPECIAL_LABELS.iter().all(|l| WITHDRAWAL_LABELS.contains(l)));
        assert_eq!(DEPOSIT_LABELS.len(), INCOME_LABELS.len() + 2);
        assert_eq!(
            WITHDRAWAL_LABELS.len(),
            EXPENSE_LABELS.len() + SPECIAL_LABELS.len() + 1
        );
        assert!(TransactionType::Deposit.allows(Label::Mining));
        assert!(TransactionType::Withdrawal.allows(Label::Donation));
    }

    #[test]
    fn test_allowed_labels_per_type() {
        assert!(TransactionType::Deposit.allows(Label::Reward));
        assert!(!TransactionType::Deposit.allows(Label::Cost));
        assert!(TransactionType::Withdrawal.allows(Label::Cost));
        assert!(TransactionType::Trade.allows(Label::LiquidityIn));
        assert!(TransactionType::Transfer.allows(Label::ToPool));
        assert!(!TransactionType::Transfer.allows(Label::RealizedGain));
    }
}
