// Voting-code ledger: generation, redemption and reset of one-time codes.

use std::collections::HashSet;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::diesel::scoped_futures::ScopedFutureExt;
use rocket_db_pools::Connection;

use crate::db::VotingDB;
use crate::election;
use crate::error::AppError;
use crate::models::{NewVotingCode, VotingCode};
use crate::schema::voting_codes;

pub const CODE_LENGTH: usize = 10;
pub const CODES_PER_PAGE: i64 = 25;
pub const MAX_BATCH_CODES: i64 = 10_000;

pub const VOTED: &str = "Yes";
pub const NOT_VOTED: &str = "No";

fn generate_code() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

/// Generate `quantity` codes, all distinct within the batch.
pub fn generate_batch_codes(quantity: usize) -> Vec<String> {
    let mut seen = HashSet::with_capacity(quantity);
    while seen.len() < quantity {
        seen.insert(generate_code());
    }
    seen.into_iter().collect()
}

/// Number of pages needed to list `total` rows at `per_page` rows each.
pub fn total_pages(total: i64, per_page: i64) -> i64 {
    (total + per_page - 1) / per_page
}

/// Percentage of `part` out of `whole`, zero when nothing exists yet.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Reject quantities outside 1..=MAX_BATCH_CODES before any allocation
/// happens for them.
fn validate_quantity(quantity: i64) -> Result<usize, AppError> {
    if quantity <= 0 {
        return Err(AppError::Validation(
            "Please enter a valid number of codes".to_string(),
        ));
    }
    if quantity > MAX_BATCH_CODES {
        return Err(AppError::Validation(format!(
            "A batch is limited to {} codes",
            MAX_BATCH_CODES
        )));
    }
    Ok(quantity as usize)
}

/// Generate a fresh batch of codes and (re)open the election session named
/// `session_name`, as a single transaction. Fails if codes already exist.
pub async fn generate_batch(
    db: &mut Connection<VotingDB>,
    quantity: i64,
    session_name: &str,
) -> Result<usize, AppError> {
    let quantity = validate_quantity(quantity)?;

    db.transaction::<usize, AppError, _>(|conn| {
        async move {
            let existing: i64 = voting_codes::table.count().get_result(conn).await?;
            if existing > 0 {
                return Err(AppError::Conflict(
                    "Codes already generated. Reset if you want to regenerate!".to_string(),
                ));
            }

            let new_codes: Vec<NewVotingCode> = generate_batch_codes(quantity)
                .into_iter()
                .map(|code| NewVotingCode {
                    code,
                    has_voted: NOT_VOTED.to_string(),
                })
                .collect();

            diesel::insert_into(voting_codes::table)
                .values(&new_codes)
                .execute(conn)
                .await?;

            election::open_session(conn, session_name).await?;

            Ok(new_codes.len())
        }
        .scope_boxed()
    })
    .await
}

/// Look up a voting code, case-insensitively. A code that is unknown or
/// already redeemed is rejected; redemption itself does not flip `has_voted`,
/// that happens only when a ballot is successfully submitted.
pub async fn redeem(db: &mut Connection<VotingDB>, code: &str) -> Result<VotingCode, AppError> {
    let normalized = code.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(AppError::Validation("Please enter a vote code".to_string()));
    }

    let found: Option<VotingCode> = voting_codes::table
        .filter(voting_codes::code.eq(&normalized))
        .first::<VotingCode>(db)
        .await
        .optional()?;

    match found {
        Some(record) if record.has_voted != VOTED => Ok(record),
        _ => Err(AppError::InvalidCode),
    }
}

/// Delete every code. The foreign key from votes blocks the reset once any
/// code has been used; that surfaces as a ConflictError.
pub async fn reset_all(db: &mut Connection<VotingDB>) -> Result<usize, AppError> {
    let existing: i64 = voting_codes::table.count().get_result(db).await?;
    if existing == 0 {
        return Err(AppError::NotFound(
            "Cannot reset, no codes generated yet".to_string(),
        ));
    }

    let deleted = diesel::delete(voting_codes::table).execute(db).await?;
    Ok(deleted)
}

/// One page of the code listing plus the paging totals.
pub async fn list_page(
    db: &mut Connection<VotingDB>,
    page: i64,
) -> Result<(Vec<VotingCode>, i64, i64), AppError> {
    let page = page.max(1);
    let total: i64 = voting_codes::table.count().get_result(db).await?;

    let rows = voting_codes::table
        .order(voting_codes::id.asc())
        .limit(CODES_PER_PAGE)
        .offset((page - 1) * CODES_PER_PAGE)
        .load::<VotingCode>(db)
        .await?;

    Ok((rows, total, total_pages(total, CODES_PER_PAGE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_alphabet_and_length() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn batch_codes_are_unique() {
        let codes = generate_batch_codes(500);
        assert_eq!(codes.len(), 500);
        let unique: HashSet<&String> = codes.iter().collect();
        assert_eq!(unique.len(), 500);
    }

    #[test]
    fn empty_batch_is_empty() {
        assert!(generate_batch_codes(0).is_empty());
    }

    #[test]
    fn quantity_bounds_are_enforced() {
        assert!(matches!(
            validate_quantity(0),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_quantity(-5),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_quantity(MAX_BATCH_CODES + 1),
            Err(AppError::Validation(_))
        ));
        assert_eq!(validate_quantity(1).unwrap(), 1);
        assert_eq!(
            validate_quantity(MAX_BATCH_CODES).unwrap(),
            MAX_BATCH_CODES as usize
        );
    }

    #[test]
    fn paging_math() {
        assert_eq!(total_pages(0, CODES_PER_PAGE), 0);
        assert_eq!(total_pages(1, CODES_PER_PAGE), 1);
        assert_eq!(total_pages(25, CODES_PER_PAGE), 1);
        assert_eq!(total_pages(26, CODES_PER_PAGE), 2);
        assert_eq!(total_pages(100, CODES_PER_PAGE), 4);
    }

    #[test]
    fn percentage_handles_empty_ledger() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(3, 3), 100.0);
    }
}
