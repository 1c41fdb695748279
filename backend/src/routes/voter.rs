use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::serde::json::Json;
use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::Connection;

use crate::auth::{VoterCode, VOTED_COOKIE, VOTER_COOKIE};
use crate::ballot;
use crate::db::VotingDB;
use crate::election;
use crate::error::AppError;
use crate::ledger;
use crate::models::{
    BallotCandidate, BallotPosition, BallotRequest, Candidate, ElectionStatusResponse, Position,
    RedeemCodeRequest, RedeemCodeResponse, SubmitBallotResponse,
};
use crate::schema::{candidates, positions};

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie
}

// Public election status, shown on the code-entry page
#[get("/election")]
pub async fn election_status(
    mut db: Connection<VotingDB>,
) -> Result<Json<ElectionStatusResponse>, AppError> {
    let session = election::active_session(&mut db).await?;
    Ok(Json(ElectionStatusResponse {
        open: session.is_some(),
        name: session.map(|s| s.name),
    }))
}

// Exchange a voting code for ballot access
#[post("/vote/redeem", format = "json", data = "<request>")]
pub async fn redeem_code(
    mut db: Connection<VotingDB>,
    cookies: &CookieJar<'_>,
    request: Json<RedeemCodeRequest>,
) -> Result<Json<RedeemCodeResponse>, AppError> {
    let record = ledger::redeem(&mut db, &request.code).await?;

    cookies.add(session_cookie(VOTER_COOKIE, record.code.clone()));

    Ok(Json(RedeemCodeResponse { code: record.code }))
}

// The ballot form data: every position with its candidates
#[get("/vote/ballot")]
pub async fn ballot_form(
    _voter: VoterCode,
    mut db: Connection<VotingDB>,
) -> Result<Json<Vec<BallotPosition>>, AppError> {
    if election::active_session(&mut db).await?.is_none() {
        return Err(AppError::NotFound("no active election".to_string()));
    }

    let rows: Vec<(Position, Candidate)> = positions::table
        .inner_join(candidates::table)
        .order((positions::id.asc(), candidates::id.asc()))
        .select((Position::as_select(), Candidate::as_select()))
        .load::<(Position, Candidate)>(&mut db)
        .await?;

    let mut grouped: Vec<BallotPosition> = Vec::new();
    for (position, candidate) in rows {
        let entry = BallotCandidate {
            id: candidate.id,
            full_name: candidate.full_name,
            class_name: candidate.class_name,
            gender: candidate.gender,
            photo_url: candidate.photo_url,
        };
        match grouped.last_mut() {
            Some(group) if group.position.id == position.id => group.candidates.push(entry),
            _ => grouped.push(BallotPosition {
                position,
                candidates: vec![entry],
            }),
        }
    }

    Ok(Json(grouped))
}

// Cast the ballot: one vote per selected position, consuming the code
#[post("/vote", format = "json", data = "<request>")]
pub async fn submit_ballot(
    voter: VoterCode,
    mut db: Connection<VotingDB>,
    cookies: &CookieJar<'_>,
    request: Json<BallotRequest>,
) -> Result<Json<SubmitBallotResponse>, AppError> {
    let recorded = ballot::submit_ballot(&mut db, &voter.0, &request.selections).await?;

    // The code is spent: drop ballot access and arm the one-shot
    // confirmation marker.
    cookies.remove(Cookie::from(VOTER_COOKIE));
    cookies.add(session_cookie(VOTED_COOKIE, "1".to_string()));

    Ok(Json(SubmitBallotResponse {
        votes_recorded: recorded,
    }))
}

// One-shot confirmation view marker: true exactly once after a submission
#[get("/vote/confirmation")]
pub async fn confirmation(cookies: &CookieJar<'_>) -> Result<Json<bool>, Status> {
    match cookies.get(VOTED_COOKIE) {
        Some(_) => {
            cookies.remove(Cookie::from(VOTED_COOKIE));
            Ok(Json(true))
        }
        None => Ok(Json(false)),
    }
}
