use std::collections::HashSet;

use crate::schema::{HolderRecord, RawHolderRow};

/// Holders below this share of supply are dropped during normalization.
pub const MIN_SIGNIFICANT_PERCENTAGE: f64 = 0.01;

/// Result of one normalization pass, with counts for the rows that did not
/// survive it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NormalizeOutcome {
    pub records: Vec<HolderRecord>,
    pub dropped_invalid: usize,
    pub dropped_below_threshold: usize,
    pub dropped_duplicates: usize,
}

impl NormalizeOutcome {
    pub fn dropped_total(&self) -> usize {
        self.dropped_invalid + self.dropped_below_threshold + self.dropped_duplicates
    }
}

fn usable_row(row: &RawHolderRow) -> bool {
    row.amount.is_finite() && row.amount > 0.0 && !row.wallet_address.trim().is_empty()
}

/// Turns untrusted upstream rows into the validated, ranked holder set:
/// each surviving row carries its percentage of the summed supply,
/// sub-threshold rows are dropped, duplicate wallets collapse to their first
/// occurrence, and the output is sorted by token amount descending.
pub fn normalize_rows(rows: &[RawHolderRow]) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();

    // The total sums every parseable amount, duplicates included, to match
    // the upstream aggregation the percentages were defined against.
    let total: f64 = rows
        .iter()
        .filter(|row| usable_row(row))
        .map(|row| row.amount)
        .sum();
    if total <= 0.0 {
        outcome.dropped_invalid = rows.len();
        return outcome;
    }

    let mut seen = HashSet::new();
    for row in rows {
        if !usable_row(row) {
            outcome.dropped_invalid += 1;
            continue;
        }
        if !seen.insert(row.wallet_address.clone()) {
            outcome.dropped_duplicates += 1;
            continue;
        }
        let percentage = row.amount / total * 100.0;
        if percentage < MIN_SIGNIFICANT_PERCENTAGE {
            outcome.dropped_below_threshold += 1;
            continue;
        }
        match HolderRecord::new(row.wallet_address.clone(), row.amount, percentage) {
            Ok(record) => outcome.records.push(record),
            Err(_) => outcome.dropped_invalid += 1,
        }
    }

    outcome
        .records
        .sort_by(|a, b| b.token_amount.total_cmp(&a.token_amount));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(wallet: &str, amount: f64) -> RawHolderRow {
        RawHolderRow {
            wallet_address: wallet.to_string(),
            amount,
        }
    }

    #[test]
    fn computes_percentages_and_ranks_by_amount() {
        let rows = vec![row("small", 1_000.0), row("big", 5_000.0), row("mid", 4_000.0)];
        let outcome = normalize_rows(&rows);
        assert_eq!(outcome.dropped_total(), 0);
        let wallets: Vec<&str> = outcome
            .records
            .iter()
            .map(|r| r.wallet_address.as_str())
            .collect();
        assert_eq!(wallets, vec!["big", "mid", "small"]);
        assert_eq!(outcome.records[0].percentage, 50.0);
        assert_eq!(outcome.records[1].percentage, 40.0);
        assert_eq!(outcome.records[2].percentage, 10.0);
        let sum: f64 = outcome.records.iter().map(|r| r.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn drops_rows_below_the_significance_threshold() {
        let rows = vec![row("whale", 1_000_000.0), row("dust", 50.0)];
        let outcome = normalize_rows(&rows);
        // 50 / 1_000_050 is just under one hundredth of a percent.
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].wallet_address, "whale");
        assert_eq!(outcome.dropped_below_threshold, 1);
    }

    #[test]
    fn collapses_duplicate_wallets_to_first_occurrence() {
        let rows = vec![row("dup", 100.0), row("dup", 100.0), row("other", 200.0)];
        let outcome = normalize_rows(&rows);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.dropped_duplicates, 1);
        // Both duplicate amounts still count toward the total supply.
        assert_eq!(outcome.records[0].wallet_address, "other");
        assert_eq!(outcome.records[0].percentage, 50.0);
        assert_eq!(outcome.records[1].wallet_address, "dup");
        assert_eq!(outcome.records[1].percentage, 25.0);
    }

    #[test]
    fn rejects_unusable_rows() {
        let rows = vec![
            row("ok", 100.0),
            row("", 100.0),
            row("nan", f64::NAN),
            row("zero", 0.0),
        ];
        let outcome = normalize_rows(&rows);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.dropped_invalid, 3);
    }

    #[test]
    fn empty_or_worthless_input_yields_no_records() {
        assert!(normalize_rows(&[]).records.is_empty());
        let outcome = normalize_rows(&[row("a", 0.0), row("b", f64::NEG_INFINITY)]);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.dropped_invalid, 2);
    }
}
