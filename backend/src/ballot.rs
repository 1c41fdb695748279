// Ballot submission engine. The whole submission is one transaction: vote
// rows, tally increments and the has_voted flip either all land or none do.

use std::collections::HashMap;

use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::diesel::scoped_futures::ScopedFutureExt;
use rocket_db_pools::Connection;

use crate::db::VotingDB;
use crate::error::AppError;
use crate::ledger::{NOT_VOTED, VOTED};
use crate::models::{NewVote, VotingCode};
use crate::schema::{candidates, election_sessions, voting_codes, votes};

/// Check every submitted selection against the candidate roster: the chosen
/// candidate must exist and belong to the claimed position. Positions without
/// a selection are abstentions and are simply skipped. Returns the accepted
/// (position_id, candidate_id) pairs in position order.
pub fn validate_selections(
    roster: &[(i32, i32)],
    selections: &HashMap<i32, i32>,
) -> Result<Vec<(i32, i32)>, AppError> {
    let positions_by_candidate: HashMap<i32, i32> = roster.iter().copied().collect();

    let mut picks = Vec::with_capacity(selections.len());
    for (&position_id, &candidate_id) in selections {
        match positions_by_candidate.get(&candidate_id) {
            Some(&actual) if actual == position_id => picks.push((position_id, candidate_id)),
            _ => return Err(AppError::InvalidSelection),
        }
    }

    // Deterministic insert order for the vote rows.
    picks.sort_unstable();
    Ok(picks)
}

/// Record one ballot: one vote per selected position, credited to the chosen
/// candidates, consuming the voting code. Partial ballots are permitted, an
/// empty one is not.
pub async fn submit_ballot(
    db: &mut Connection<VotingDB>,
    code: &str,
    selections: &HashMap<i32, i32>,
) -> Result<usize, AppError> {
    if selections.is_empty() {
        return Err(AppError::Validation(
            "Ballot contains no selections".to_string(),
        ));
    }

    let normalized = code.trim().to_uppercase();

    let result = db
        .transaction::<usize, AppError, _>(|conn| {
            async move {
                let open_sessions: i64 = election_sessions::table
                    .filter(election_sessions::active.eq(true))
                    .count()
                    .get_result(conn)
                    .await?;
                if open_sessions == 0 {
                    return Err(AppError::NotFound("no active election".to_string()));
                }

                // Row-lock the code so two racing submissions with the same
                // code serialize: the loser observes has_voted = "Yes".
                let code_row: Option<VotingCode> = voting_codes::table
                    .filter(voting_codes::code.eq(&normalized))
                    .for_update()
                    .first::<VotingCode>(conn)
                    .await
                    .optional()?;

                let code_row = match code_row {
                    Some(row) if row.has_voted == NOT_VOTED => row,
                    _ => return Err(AppError::InvalidCode),
                };

                let roster: Vec<(i32, i32)> = candidates::table
                    .select((candidates::id, candidates::position_id))
                    .load::<(i32, i32)>(conn)
                    .await?;

                let picks = validate_selections(&roster, selections)?;

                for &(position_id, candidate_id) in &picks {
                    diesel::insert_into(votes::table)
                        .values(&NewVote {
                            voting_code_id: code_row.id,
                            candidate_id,
                            position_id,
                        })
                        .execute(conn)
                        .await?;

                    diesel::update(candidates::table.find(candidate_id))
                        .set(candidates::total_votes.eq(candidates::total_votes + 1))
                        .execute(conn)
                        .await?;
                }

                diesel::update(voting_codes::table.find(code_row.id))
                    .set(voting_codes::has_voted.eq(VOTED))
                    .execute(conn)
                    .await?;

                Ok(picks.len())
            }
            .scope_boxed()
        })
        .await;

    // A storage failure inside the unit has already been rolled back; what the
    // voter sees is that the submission as a whole did not go through.
    match result {
        Err(AppError::Database(err)) => {
            eprintln!("Error recording ballot: {}", err);
            Err(AppError::SubmissionFailed)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // (candidate_id, position_id) pairs: candidates 1-2 run for position 10,
    // candidate 3 runs for position 20.
    fn roster() -> Vec<(i32, i32)> {
        vec![(1, 10), (2, 10), (3, 20)]
    }

    #[test]
    fn accepts_full_ballot() {
        let selections = HashMap::from([(10, 2), (20, 3)]);
        let picks = validate_selections(&roster(), &selections).unwrap();
        assert_eq!(picks, vec![(10, 2), (20, 3)]);
    }

    #[test]
    fn accepts_partial_ballot() {
        let selections = HashMap::from([(20, 3)]);
        let picks = validate_selections(&roster(), &selections).unwrap();
        assert_eq!(picks, vec![(20, 3)]);
    }

    #[test]
    fn rejects_candidate_from_other_position() {
        // Candidate 3 runs for position 20, not 10.
        let selections = HashMap::from([(10, 3)]);
        let err = validate_selections(&roster(), &selections).unwrap_err();
        assert!(matches!(err, AppError::InvalidSelection));
    }

    #[test]
    fn rejects_unknown_candidate() {
        let selections = HashMap::from([(10, 99)]);
        let err = validate_selections(&roster(), &selections).unwrap_err();
        assert!(matches!(err, AppError::InvalidSelection));
    }

    #[test]
    fn empty_ballot_yields_no_picks() {
        let selections = HashMap::new();
        let picks = validate_selections(&roster(), &selections).unwrap();
        assert!(picks.is_empty());
    }

    #[test]
    fn picks_are_position_ordered() {
        let selections = HashMap::from([(20, 3), (10, 1)]);
        let picks = validate_selections(&roster(), &selections).unwrap();
        assert_eq!(picks, vec![(10, 1), (20, 3)]);
    }
}
