use crate::domain::model::{AccountId, TransferRequest};
use crate::utils::error::{LoadError, Result};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Builds one randomised transfer per iteration.
#[derive(Debug, Clone)]
pub struct TransferFactory {
    accounts: Vec<AccountId>,
    amount: Decimal,
    currency: String,
}

impl TransferFactory {
    pub fn new(accounts: Vec<AccountId>, amount: Decimal, currency: impl Into<String>) -> Result<Self> {
        let first = accounts.first().ok_or_else(|| LoadError::MissingConfigError {
            field: "transfer.accounts".to_string(),
        })?;
        if accounts.iter().all(|a| a == first) {
            return Err(LoadError::invalid_value(
                "transfer.accounts",
                first,
                "At least two distinct accounts are required",
            ));
        }

        Ok(Self {
            accounts,
            amount,
            currency: currency.into(),
        })
    }

    pub fn next_request<R: Rng>(&self, rng: &mut R) -> TransferRequest {
        let (from, to) = pick_distinct_pair(&self.accounts, rng);
        TransferRequest {
            from_account_id: from.clone(),
            to_account_id: to.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            reference_number: Uuid::new_v4().to_string(),
        }
    }
}

/// Uniform sender, then redraw the receiver until it differs.
///
/// Callers must guarantee at least two distinct entries.
fn pick_distinct_pair<'a, R: Rng>(
    accounts: &'a [AccountId],
    rng: &mut R,
) -> (&'a AccountId, &'a AccountId) {
    let from = &accounts[rng.random_range(0..accounts.len())];
    loop {
        let to = &accounts[rng.random_range(0..accounts.len())];
        if to != from {
            return (from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{default_amount, DEFAULT_ACCOUNTS, DEFAULT_CURRENCY};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    fn factory() -> TransferFactory {
        let accounts = DEFAULT_ACCOUNTS.iter().map(|a| AccountId::new(*a)).collect();
        TransferFactory::new(accounts, default_amount(), DEFAULT_CURRENCY).unwrap()
    }

    #[test]
    fn test_sender_and_receiver_always_differ() {
        let factory = factory();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let request = factory.next_request(&mut rng);
            assert_ne!(request.from_account_id, request.to_account_id);
        }
    }

    #[test]
    fn test_reference_numbers_are_unique() {
        let factory = factory();
        let mut rng = StdRng::seed_from_u64(11);
        let references: HashSet<String> = (0..10_000)
            .map(|_| factory.next_request(&mut rng).reference_number)
            .collect();
        assert_eq!(references.len(), 10_000);
    }

    #[test]
    fn test_amount_and_currency_are_fixed() {
        let factory = factory();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let request = factory.next_request(&mut rng);
            assert_eq!(request.amount, Decimal::new(1000, 2));
            assert_eq!(request.currency, "TRY");
        }
    }

    #[test]
    fn test_every_account_gets_picked_as_sender() {
        let factory = factory();
        let mut rng = StdRng::seed_from_u64(42);
        let mut senders: HashMap<AccountId, usize> = HashMap::new();
        for _ in 0..4_000 {
            *senders
                .entry(factory.next_request(&mut rng).from_account_id)
                .or_default() += 1;
        }
        assert_eq!(senders.len(), 4);
        assert!(senders.values().all(|count| *count > 700));
    }

    #[test]
    fn test_rejects_account_sets_without_a_distinct_pair() {
        let single = vec![AccountId::new("a")];
        assert!(TransferFactory::new(single, default_amount(), "TRY").is_err());

        let duplicated = vec![AccountId::new("a"), AccountId::new("a")];
        assert!(TransferFactory::new(duplicated, default_amount(), "TRY").is_err());

        assert!(TransferFactory::new(Vec::new(), default_amount(), "TRY").is_err());
    }

    #[test]
    fn test_two_accounts_alternate() {
        let accounts = vec![AccountId::new("a"), AccountId::new("b")];
        let factory = TransferFactory::new(accounts, default_amount(), "TRY").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let request = factory.next_request(&mut rng);
            assert_ne!(request.from_account_id, request.to_account_id);
        }
    }
}
