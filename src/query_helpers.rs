use std::collections::BTreeSet;

use cosmwasm_std::{Addr, Decimal, Uint128};
use serde_json::Value;
use tracing::warn;

use crate::error::MarketError;
use crate::helpers::{coerce_u64, coerce_uint128};
use crate::state::{Category, CategoryFilter, GigPosting, MarketStats};

fn required_str<'a>(id: &str, record: &'a Value, field: &str) -> Result<&'a str, MarketError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| MarketError::Projection {
            id: id.to_string(),
            msg: format!("field `{}` is missing or not a string", field),
        })
}

/// Normalises one raw `getBusinessData` record.
///
/// Numeric fields fall back to zero; `name` and `creator` must be present.
pub fn project_gig(id: &str, record: &Value) -> Result<GigPosting, MarketError> {
    if !record.is_object() {
        return Err(MarketError::Projection {
            id: id.to_string(),
            msg: "record is not an object".to_string(),
        });
    }

    let title = required_str(id, record, "name")?;
    let creator = required_str(id, record, "creator")?;
    let description = record
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(GigPosting {
        id: id.to_string(),
        title: title.to_string(),
        employer: Addr::unchecked(creator),
        encrypted_budget: id.to_string(),
        public_deadline: coerce_u64(record.get("publicValue1")),
        public_category: Category::from_code(coerce_u64(record.get("publicValue2"))),
        description: description.to_string(),
        timestamp: coerce_u64(record.get("timestamp")),
        is_verified: record
            .get("isVerified")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        decrypted_budget: coerce_uint128(record.get("decryptedValue")),
        local_budget: None,
    })
}

/// Projects a batch, skipping records that fail. Order of the input is kept.
pub fn project_gigs<'a, I>(records: I) -> Vec<GigPosting>
where
    I: IntoIterator<Item = (&'a str, Result<Value, MarketError>)>,
{
    records
        .into_iter()
        .filter_map(|(id, fetched)| {
            match fetched.and_then(|record| project_gig(id, &record)) {
                Ok(gig) => Some(gig),
                Err(err) => {
                    warn!(gig_id = id, error = %err, "skipping gig record");
                    None
                }
            }
        })
        .collect()
}

/// Summary statistics. Every posting counts toward the average; unverified
/// ones contribute zero whatever value the contract reports for them.
pub fn compute_market_stats(gigs: &[GigPosting]) -> MarketStats {
    let total_gigs = gigs.len() as u64;
    if total_gigs == 0 {
        return MarketStats::default();
    }

    let verified_gigs = gigs.iter().filter(|g| g.is_verified).count() as u64;
    let budget_sum = gigs
        .iter()
        .map(|g| {
            if g.is_verified {
                g.decrypted_budget
            } else {
                Uint128::zero()
            }
        })
        .fold(Uint128::zero(), |sum, budget| sum.saturating_add(budget));
    // saturates instead of failing when the sum leaves Decimal's range
    let avg_budget =
        Decimal::checked_from_ratio(budget_sum, total_gigs).unwrap_or(Decimal::MAX);
    let active_categories = gigs
        .iter()
        .map(|g| g.public_category)
        .collect::<BTreeSet<_>>()
        .len() as u64;

    MarketStats {
        total_gigs,
        verified_gigs,
        avg_budget,
        active_categories,
    }
}

/// Average budget rounded half-up to whole units, for display.
pub fn rounded_average(stats: &MarketStats) -> Uint128 {
    let whole = stats.avg_budget.atomics() / Uint128::from(10u128.pow(Decimal::DECIMAL_PLACES));
    let fraction = stats.avg_budget - Decimal::from_ratio(whole, 1u128);
    if fraction >= Decimal::percent(50) {
        whole + Uint128::one()
    } else {
        whole
    }
}

/// Stable, case-insensitive search over title or description combined with a
/// category filter. An empty query matches everything.
pub fn filter_gigs<'a>(
    gigs: &'a [GigPosting],
    query: &str,
    category: CategoryFilter,
) -> Vec<&'a GigPosting> {
    let needle = query.to_lowercase();
    gigs.iter()
        .filter(|gig| {
            gig.title.to_lowercase().contains(&needle)
                || gig.description.to_lowercase().contains(&needle)
        })
        .filter(|gig| category.matches(gig.public_category))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gig(id: &str, title: &str, description: &str, category: Category, budget: u128) -> GigPosting {
        GigPosting {
            id: id.to_string(),
            title: title.to_string(),
            employer: Addr::unchecked("0xemployer"),
            encrypted_budget: id.to_string(),
            public_deadline: 7,
            public_category: category,
            description: description.to_string(),
            timestamp: 1_700_000_000,
            is_verified: true,
            decrypted_budget: Uint128::new(budget),
            local_budget: None,
        }
    }

    #[test]
    fn projection_coerces_fields() {
        let record = json!({
            "name": "Smart contract audit",
            "creator": "0xabc",
            "publicValue1": "21",
            "publicValue2": 3,
            "description": "Audit a vault",
            "timestamp": 1_700_000_000u64,
            "isVerified": true,
            "decryptedValue": "5000"
        });
        let gig = project_gig("gig-1", &record).unwrap();
        assert_eq!(gig.title, "Smart contract audit");
        assert_eq!(gig.employer, Addr::unchecked("0xabc"));
        assert_eq!(gig.encrypted_budget, "gig-1");
        assert_eq!(gig.public_deadline, 21);
        assert_eq!(gig.public_category, Category::Marketing);
        assert!(gig.is_verified);
        assert_eq!(gig.decrypted_budget, Uint128::new(5000));
        assert_eq!(gig.local_budget, None);
    }

    #[test]
    fn projection_defaults_missing_numbers() {
        let record = json!({
            "name": "Copy edit",
            "creator": "0xdef",
            "publicValue1": "n/a",
            "publicValue2": 42
        });
        let gig = project_gig("gig-2", &record).unwrap();
        assert_eq!(gig.public_deadline, 0);
        assert_eq!(gig.public_category, Category::Other);
        assert_eq!(gig.timestamp, 0);
        assert!(!gig.is_verified);
        assert_eq!(gig.decrypted_budget, Uint128::zero());
        assert_eq!(gig.description, "");
    }

    #[test]
    fn projection_rejects_malformed_records() {
        assert!(matches!(
            project_gig("gig-3", &json!({ "creator": "0x1" })),
            Err(MarketError::Projection { .. })
        ));
        assert!(project_gig("gig-4", &json!("not a record")).is_err());
    }

    #[test]
    fn batch_projection_skips_failures() {
        let good = json!({ "name": "A", "creator": "0x1" });
        let records = vec![
            ("a", Ok(good.clone())),
            ("b", Ok(json!({ "name": 5 }))),
            (
                "c",
                Err(MarketError::Rpc {
                    msg: "timeout".to_string(),
                }),
            ),
            ("d", Ok(good)),
        ];
        let gigs = project_gigs(records);
        let ids: Vec<_> = gigs.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn stats_on_empty_collection_are_zero() {
        let stats = compute_market_stats(&[]);
        assert_eq!(stats, MarketStats::default());
        assert_eq!(stats.avg_budget, Decimal::zero());
    }

    #[test]
    fn stats_average_and_distinct_categories() {
        let gigs = vec![
            gig("1", "a", "", Category::Design, 100),
            gig("2", "b", "", Category::Design, 200),
            gig("3", "c", "", Category::Writing, 300),
        ];
        let stats = compute_market_stats(&gigs);
        assert_eq!(stats.total_gigs, 3);
        assert_eq!(stats.verified_gigs, 3);
        assert_eq!(stats.avg_budget, Decimal::from_ratio(200u128, 1u128));
        assert_eq!(stats.active_categories, 2);
        assert_eq!(rounded_average(&stats), Uint128::new(200));
    }

    #[test]
    fn unverified_postings_pull_the_average_down() {
        // a stale value on an unverified posting is not trusted
        let mut pending = gig("2", "b", "", Category::Support, 9_000);
        pending.is_verified = false;
        let gigs = vec![gig("1", "a", "", Category::Support, 101), pending];
        let stats = compute_market_stats(&gigs);
        assert_eq!(stats.verified_gigs, 1);
        assert_eq!(stats.avg_budget, Decimal::from_ratio(101u128, 2u128));
        assert_eq!(rounded_average(&stats), Uint128::new(51));
    }

    #[test]
    fn empty_filter_returns_everything_in_order() {
        let gigs = vec![
            gig("1", "Zeta", "", Category::Design, 1),
            gig("2", "Alpha", "", Category::Writing, 1),
            gig("3", "Mid", "", Category::Other, 1),
        ];
        let filtered = filter_gigs(&gigs, "", CategoryFilter::All);
        let expected: Vec<&GigPosting> = gigs.iter().collect();
        assert_eq!(filtered, expected);
    }

    #[test]
    fn filter_matches_title_or_description_case_insensitively() {
        let gigs = vec![
            gig("1", "Rust Backend", "", Category::Development, 1),
            gig("2", "Logo", "needs RUST-colored palette", Category::Design, 1),
            gig("3", "Blog post", "about gardening", Category::Writing, 1),
        ];
        let ids = |v: Vec<&GigPosting>| v.into_iter().map(|g| g.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(filter_gigs(&gigs, "rust", CategoryFilter::All)), vec!["1", "2"]);
        assert_eq!(
            ids(filter_gigs(
                &gigs,
                "RUST",
                CategoryFilter::Only(Category::Design)
            )),
            vec!["2"]
        );
        assert!(filter_gigs(&gigs, "", CategoryFilter::Only(Category::Support)).is_empty());
    }
}
