// Election session state machine: a session is either open (active = 1) or
// closed, and at most one session is active at any time.

use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::diesel::scoped_futures::ScopedFutureExt;
use rocket_db_pools::Connection;

use crate::db::VotingDB;
use crate::error::AppError;
use crate::models::{ElectionSession, NewElectionSession};
use crate::results;
use crate::schema::{candidates, election_sessions, final_results, positions, votes, voting_codes};

/// The currently active session, if any.
pub async fn active_session(
    db: &mut Connection<VotingDB>,
) -> Result<Option<ElectionSession>, AppError> {
    let session = election_sessions::table
        .filter(election_sessions::active.eq(true))
        .order(election_sessions::id.desc())
        .first::<ElectionSession>(db)
        .await
        .optional()?;
    Ok(session)
}

/// Open the session named `name`: reactivate the existing row with that name
/// or insert a new one. Any other active session is deactivated first, which
/// keeps the single-active invariant. A name whose session was already
/// finalized is refused, so a fresh cycle always gets a fresh session row.
pub async fn open_session(db: &mut Connection<VotingDB>, name: &str) -> Result<(), AppError> {
    let existing: Option<ElectionSession> = election_sessions::table
        .filter(election_sessions::name.eq(name))
        .first::<ElectionSession>(db)
        .await
        .optional()?;

    // A session that already owns a results snapshot is immutable history.
    // Reactivating it would make a second close impossible: finalize refuses
    // to duplicate the snapshot, so close_election would fail forever.
    if let Some(session) = &existing {
        let finalized: i64 = final_results::table
            .filter(final_results::session_id.eq(session.id))
            .count()
            .get_result(db)
            .await?;
        if finalized > 0 {
            return Err(AppError::Conflict(
                "This session was already finalized. Use a new session name".to_string(),
            ));
        }
    }

    diesel::update(election_sessions::table.filter(election_sessions::active.eq(true)))
        .set(election_sessions::active.eq(false))
        .execute(db)
        .await?;

    match existing {
        Some(session) => {
            diesel::update(election_sessions::table.find(session.id))
                .set(election_sessions::active.eq(true))
                .execute(db)
                .await?;
        }
        None => {
            diesel::insert_into(election_sessions::table)
                .values(&NewElectionSession {
                    name: name.to_string(),
                    active: true,
                })
                .execute(db)
                .await?;
        }
    }

    Ok(())
}

/// Close the active election: snapshot the final results, then deactivate the
/// session. Both happen in one transaction so a failed finalization leaves the
/// election open.
pub async fn close_election(
    db: &mut Connection<VotingDB>,
) -> Result<(ElectionSession, usize), AppError> {
    db.transaction::<(ElectionSession, usize), AppError, _>(|conn| {
        async move {
            let session: Option<ElectionSession> = election_sessions::table
                .filter(election_sessions::active.eq(true))
                .first::<ElectionSession>(conn)
                .await
                .optional()?;

            let mut session = match session {
                Some(s) => s,
                None => return Err(AppError::NotFound("no active election".to_string())),
            };

            let recorded = results::finalize(conn, session.id).await?;

            diesel::update(election_sessions::table.find(session.id))
                .set(election_sessions::active.eq(false))
                .execute(conn)
                .await?;
            session.active = false;

            Ok((session, recorded))
        }
        .scope_boxed()
    })
    .await
}

/// Destructive administrative escape hatch: wipe votes, final results,
/// candidates, positions and codes, and force any active session inactive.
/// The UI layer is responsible for gating this behind a confirmation.
pub async fn full_reset(db: &mut Connection<VotingDB>) -> Result<(), AppError> {
    db.transaction::<(), AppError, _>(|conn| {
        async move {
            diesel::delete(votes::table).execute(conn).await?;
            diesel::delete(final_results::table).execute(conn).await?;
            diesel::delete(candidates::table).execute(conn).await?;
            diesel::delete(positions::table).execute(conn).await?;
            diesel::delete(voting_codes::table).execute(conn).await?;

            diesel::update(election_sessions::table.filter(election_sessions::active.eq(true)))
                .set(election_sessions::active.eq(false))
                .execute(conn)
                .await?;

            Ok(())
        }
        .scope_boxed()
    })
    .await
}
