use std::collections::HashMap;

use chrono::NaiveDateTime;
use rocket::serde::{Deserialize, Serialize};
use rocket_db_pools::diesel::prelude::*;

use crate::schema::{
    admin_sessions, candidates, election_sessions, final_results, positions, votes, voting_codes,
};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = voting_codes)]
pub struct VotingCode {
    pub id: i32,
    pub code: String,
    pub has_voted: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = voting_codes)]
pub struct NewVotingCode {
    pub code: String,
    pub has_voted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = positions)]
pub struct Position {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = positions)]
pub struct NewPosition {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = candidates)]
pub struct Candidate {
    pub id: i32,
    pub full_name: String,
    pub class_name: String,
    pub gender: String,
    pub photo_url: String,
    pub position_id: i32,
    pub total_votes: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = candidates)]
pub struct NewCandidate {
    pub full_name: String,
    pub class_name: String,
    pub gender: String,
    pub photo_url: String,
    pub position_id: i32,
    pub total_votes: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = votes)]
pub struct NewVote {
    pub voting_code_id: i32,
    pub candidate_id: i32,
    pub position_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = election_sessions)]
pub struct ElectionSession {
    pub id: i32,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = election_sessions)]
pub struct NewElectionSession {
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = final_results)]
pub struct FinalResult {
    pub id: i32,
    pub session_id: i32,
    pub candidate_id: i32,
    pub position_id: i32,
    pub total_votes: i32,
    pub rank: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = final_results)]
pub struct NewFinalResult {
    pub session_id: i32,
    pub candidate_id: i32,
    pub position_id: i32,
    pub total_votes: i32,
    pub rank: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = admin_sessions)]
pub struct NewAdminSession {
    pub session_token: String,
    pub expires_at: Option<NaiveDateTime>,
    pub ip_address: Option<String>,
}

// ---- Request payloads ----

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct RedeemCodeRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct BallotRequest {
    /// position id -> candidate id; positions left out are abstentions
    pub selections: HashMap<i32, i32>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct GenerateCodesRequest {
    pub quantity: i64,
    pub session_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct PositionRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct CandidateRequest {
    pub full_name: String,
    pub class_name: String,
    pub gender: String,
    pub photo_url: Option<String>,
    pub position_id: i32,
}

// ---- Response payloads ----

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct RedeemCodeResponse {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ElectionStatusResponse {
    pub open: bool,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DashboardResponse {
    pub total_candidates: i64,
    pub total_positions: i64,
    pub total_codes: i64,
    pub used_codes: i64,
    pub used_percentage: f64,
    pub election_open: bool,
    pub session_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct CodeRow {
    pub id: i32,
    pub code: String,
    pub has_voted: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct CodePageResponse {
    pub codes: Vec<CodeRow>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct GenerateCodesResponse {
    pub generated: usize,
    pub session_name: String,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct CandidateWithPosition {
    pub id: i32,
    pub full_name: String,
    pub class_name: String,
    pub gender: String,
    pub photo_url: String,
    pub position: Position,
    pub total_votes: i32,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct BallotCandidate {
    pub id: i32,
    pub full_name: String,
    pub class_name: String,
    pub gender: String,
    pub photo_url: String,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct BallotPosition {
    pub position: Position,
    pub candidates: Vec<BallotCandidate>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct SubmitBallotResponse {
    pub votes_recorded: usize,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct LiveCandidateResult {
    pub id: i32,
    pub full_name: String,
    pub class_name: String,
    pub photo_url: String,
    pub total_votes: i32,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct LivePositionResults {
    pub position: Position,
    pub total_votes: i64,
    pub candidates: Vec<LiveCandidateResult>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct FinalCandidateRow {
    pub full_name: String,
    pub class_name: String,
    pub gender: String,
    pub photo_url: String,
    pub position_name: String,
    pub total_votes: i32,
    pub rank: i32,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct FinalPositionResults {
    pub position: Position,
    pub candidates: Vec<FinalCandidateRow>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct FinalResultsReport {
    pub session: ElectionSession,
    pub positions: Vec<FinalPositionResults>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct CloseElectionResponse {
    pub session: ElectionSession,
    pub results_recorded: usize,
}
