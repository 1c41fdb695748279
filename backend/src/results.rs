// Finalization and ranking: snapshots per-position tallies into an immutable
// ranked record set when the election closes.

use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::Connection;

use crate::db::VotingDB;
use crate::error::AppError;
use crate::ledger;
use crate::models::{
    Candidate, ElectionSession, FinalCandidateRow, FinalPositionResults, FinalResult,
    FinalResultsReport, LiveCandidateResult, LivePositionResults, NewFinalResult, Position,
};
use crate::schema::{candidates, election_sessions, final_results, positions};

/// One candidate's tally at close time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateTally {
    pub candidate_id: i32,
    pub position_id: i32,
    pub total_votes: i32,
}

/// A tally with its assigned rank within the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedTally {
    pub candidate_id: i32,
    pub position_id: i32,
    pub total_votes: i32,
    pub rank: i32,
}

/// Rank candidates within each position: votes descending, ties broken by
/// candidate id ascending. Ranks are dense 1..N per position; tied candidates
/// still receive distinct sequential ranks.
pub fn assign_ranks(mut tallies: Vec<CandidateTally>) -> Vec<RankedTally> {
    tallies.sort_unstable_by(|a, b| {
        a.position_id
            .cmp(&b.position_id)
            .then(b.total_votes.cmp(&a.total_votes))
            .then(a.candidate_id.cmp(&b.candidate_id))
    });

    let mut ranked = Vec::with_capacity(tallies.len());
    let mut current_position = None;
    let mut rank = 0;

    for tally in tallies {
        if current_position != Some(tally.position_id) {
            current_position = Some(tally.position_id);
            rank = 0;
        }
        rank += 1;
        ranked.push(RankedTally {
            candidate_id: tally.candidate_id,
            position_id: tally.position_id,
            total_votes: tally.total_votes,
            rank,
        });
    }

    ranked
}

/// Snapshot the current tallies as the final results of `session_id`. Must be
/// invoked exactly once per session; a second invocation is refused rather
/// than allowed to duplicate the snapshot.
pub async fn finalize(
    db: &mut Connection<VotingDB>,
    session_id: i32,
) -> Result<usize, AppError> {
    let already: i64 = final_results::table
        .filter(final_results::session_id.eq(session_id))
        .count()
        .get_result(db)
        .await?;
    if already > 0 {
        return Err(AppError::Conflict(
            "Results already finalized for this session".to_string(),
        ));
    }

    let tallies: Vec<CandidateTally> = candidates::table
        .select((candidates::id, candidates::position_id, candidates::total_votes))
        .load::<(i32, i32, i32)>(db)
        .await?
        .into_iter()
        .map(|(candidate_id, position_id, total_votes)| CandidateTally {
            candidate_id,
            position_id,
            total_votes,
        })
        .collect();

    let rows: Vec<NewFinalResult> = assign_ranks(tallies)
        .into_iter()
        .map(|r| NewFinalResult {
            session_id,
            candidate_id: r.candidate_id,
            position_id: r.position_id,
            total_votes: r.total_votes,
            rank: r.rank,
        })
        .collect();

    if rows.is_empty() {
        return Ok(0);
    }

    let inserted = diesel::insert_into(final_results::table)
        .values(&rows)
        .execute(db)
        .await?;

    Ok(inserted)
}

/// Ranked final results of the most recently closed session, grouped by
/// position and ordered by rank. `None` when no session has ever been closed.
pub async fn final_results_for_latest_closed_session(
    db: &mut Connection<VotingDB>,
) -> Result<Option<FinalResultsReport>, AppError> {
    let session: Option<ElectionSession> = election_sessions::table
        .filter(election_sessions::active.eq(false))
        .order(election_sessions::id.desc())
        .first::<ElectionSession>(db)
        .await
        .optional()?;

    let session = match session {
        Some(s) => s,
        None => return Ok(None),
    };

    let rows: Vec<(FinalResult, Candidate, Position)> = final_results::table
        .inner_join(candidates::table.on(final_results::candidate_id.eq(candidates::id)))
        .inner_join(positions::table.on(final_results::position_id.eq(positions::id)))
        .filter(final_results::session_id.eq(session.id))
        .order((final_results::position_id.asc(), final_results::rank.asc()))
        .select((
            FinalResult::as_select(),
            Candidate::as_select(),
            Position::as_select(),
        ))
        .load::<(FinalResult, Candidate, Position)>(db)
        .await?;

    let mut grouped: Vec<FinalPositionResults> = Vec::new();
    for (result, candidate, position) in rows {
        let row = FinalCandidateRow {
            full_name: candidate.full_name,
            class_name: candidate.class_name,
            gender: candidate.gender,
            photo_url: candidate.photo_url,
            position_name: position.name.clone(),
            total_votes: result.total_votes,
            rank: result.rank,
        };
        match grouped.last_mut() {
            Some(group) if group.position.id == position.id => group.candidates.push(row),
            _ => grouped.push(FinalPositionResults {
                position,
                candidates: vec![row],
            }),
        }
    }

    Ok(Some(FinalResultsReport {
        session,
        positions: grouped,
    }))
}

/// Running tallies grouped by position, with each candidate's real share of
/// the position's votes.
pub async fn live_results(
    db: &mut Connection<VotingDB>,
) -> Result<Vec<LivePositionResults>, AppError> {
    let rows: Vec<(Candidate, Position)> = candidates::table
        .inner_join(positions::table)
        .order((positions::id.asc(), candidates::total_votes.desc(), candidates::id.asc()))
        .select((Candidate::as_select(), Position::as_select()))
        .load::<(Candidate, Position)>(db)
        .await?;

    let mut grouped: Vec<(Position, Vec<Candidate>)> = Vec::new();
    for (candidate, position) in rows {
        match grouped.last_mut() {
            Some((pos, group)) if pos.id == position.id => group.push(candidate),
            _ => grouped.push((position, vec![candidate])),
        }
    }

    let results = grouped
        .into_iter()
        .map(|(position, group)| {
            let cast: i64 = group.iter().map(|c| c.total_votes as i64).sum();
            let candidates = group
                .into_iter()
                .map(|c| LiveCandidateResult {
                    id: c.id,
                    full_name: c.full_name,
                    class_name: c.class_name,
                    photo_url: c.photo_url,
                    total_votes: c.total_votes,
                    percentage: ledger::percentage(c.total_votes as i64, cast),
                })
                .collect();
            LivePositionResults {
                position,
                total_votes: cast,
                candidates,
            }
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(candidate_id: i32, position_id: i32, total_votes: i32) -> CandidateTally {
        CandidateTally {
            candidate_id,
            position_id,
            total_votes,
        }
    }

    #[test]
    fn ranks_are_dense_and_vote_ordered() {
        let ranked = assign_ranks(vec![
            tally(1, 10, 7),
            tally(2, 10, 10),
            tally(3, 10, 3),
        ]);
        let by_rank: Vec<(i32, i32)> = ranked.iter().map(|r| (r.rank, r.candidate_id)).collect();
        assert_eq!(by_rank, vec![(1, 2), (2, 1), (3, 3)]);

        // No gaps, no repeats, non-increasing votes.
        for pair in ranked.windows(2) {
            assert_eq!(pair[1].rank, pair[0].rank + 1);
            assert!(pair[1].total_votes <= pair[0].total_votes);
        }
    }

    #[test]
    fn ranks_restart_per_position() {
        let ranked = assign_ranks(vec![
            tally(1, 10, 5),
            tally(2, 20, 9),
            tally(3, 10, 8),
            tally(4, 20, 2),
        ]);
        let position_ranks: Vec<(i32, i32, i32)> = ranked
            .iter()
            .map(|r| (r.position_id, r.rank, r.candidate_id))
            .collect();
        assert_eq!(
            position_ranks,
            vec![(10, 1, 3), (10, 2, 1), (20, 1, 2), (20, 2, 4)]
        );
    }

    #[test]
    fn ties_break_by_candidate_id() {
        let ranked = assign_ranks(vec![
            tally(9, 10, 4),
            tally(2, 10, 4),
            tally(5, 10, 4),
        ]);
        let order: Vec<i32> = ranked.iter().map(|r| r.candidate_id).collect();
        assert_eq!(order, vec![2, 5, 9]);
        let ranks: Vec<i32> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn empty_tallies_rank_to_nothing() {
        assert!(assign_ranks(Vec::new()).is_empty());
    }
}
