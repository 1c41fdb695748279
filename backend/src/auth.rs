// Request guards carrying the authenticated-admin flag and the redeemed-code
// token, so handlers receive explicit request-scoped context.

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::Connection;

use crate::db::VotingDB;
use crate::schema::admin_sessions;

pub const ADMIN_COOKIE: &str = "admin_auth";
pub const VOTER_COOKIE: &str = "voter_code";
pub const VOTED_COOKIE: &str = "voted";

/// Present on requests whose admin_auth cookie matches a stored admin session.
pub struct AdminUser;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = match req.cookies().get(ADMIN_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        let mut db = match req.guard::<Connection<VotingDB>>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        let known: i64 = admin_sessions::table
            .find(&token)
            .count()
            .get_result(&mut db)
            .await
            .unwrap_or(0);

        if known > 0 {
            Outcome::Success(AdminUser)
        } else {
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

/// The voting code redeemed earlier in this visit. The ballot engine
/// re-validates it against the store at submission time; the cookie only
/// carries it between the redeem and submit requests.
pub struct VoterCode(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoterCode {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match req.cookies().get(VOTER_COOKIE) {
            Some(cookie) => Outcome::Success(VoterCode(cookie.value().to_string())),
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
