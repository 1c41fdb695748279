use rocket::http::{ContentType, Status};
use rocket::serde::json::Json;
use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::Connection;
use rust_xlsxwriter::Workbook;

use crate::auth::AdminUser;
use crate::db::VotingDB;
use crate::election;
use crate::error::AppError;
use crate::ledger;
use crate::models::{
    Candidate, CandidateRequest, CandidateWithPosition, CloseElectionResponse, CodePageResponse,
    CodeRow, DashboardResponse, FinalResultsReport, GenerateCodesRequest, GenerateCodesResponse,
    LivePositionResults, NewCandidate, NewPosition, Position, PositionRequest,
};
use crate::results;
use crate::schema::{candidates, positions, voting_codes};

const DEFAULT_PHOTO: &str = "uploads/default.png";

fn validate_gender(gender: &str) -> Result<(), AppError> {
    if gender == "Male" || gender == "Female" {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Gender must be Male or Female".to_string(),
        ))
    }
}

// Dashboard summary counters
#[get("/admin/dashboard")]
pub async fn dashboard(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
) -> Result<Json<DashboardResponse>, AppError> {
    let total_candidates: i64 = candidates::table.count().get_result(&mut db).await?;
    let total_positions: i64 = positions::table.count().get_result(&mut db).await?;
    let total_codes: i64 = voting_codes::table.count().get_result(&mut db).await?;
    let used_codes: i64 = voting_codes::table
        .filter(voting_codes::has_voted.eq(ledger::VOTED))
        .count()
        .get_result(&mut db)
        .await?;

    let session = election::active_session(&mut db).await?;

    Ok(Json(DashboardResponse {
        total_candidates,
        total_positions,
        total_codes,
        used_codes,
        used_percentage: ledger::percentage(used_codes, total_codes),
        election_open: session.is_some(),
        session_name: session.map(|s| s.name),
    }))
}

// ---- Voting codes ----

// Paginated code listing, 25 per page
#[get("/admin/codes?<page>")]
pub async fn list_codes(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
    page: Option<i64>,
) -> Result<Json<CodePageResponse>, AppError> {
    let page = page.unwrap_or(1).max(1);
    let (rows, total, total_pages) = ledger::list_page(&mut db, page).await?;

    let codes = rows
        .into_iter()
        .map(|row| CodeRow {
            id: row.id,
            code: row.code,
            has_voted: row.has_voted,
            created_at: row
                .created_at
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        })
        .collect();

    Ok(Json(CodePageResponse {
        codes,
        total,
        total_pages,
        current_page: page,
    }))
}

// Generate a code batch and open the election session for it
#[post("/admin/codes", format = "json", data = "<request>")]
pub async fn generate_codes(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
    request: Json<GenerateCodesRequest>,
) -> Result<Json<GenerateCodesResponse>, AppError> {
    let session_name = match &request.session_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => format!("Election {}", chrono::Local::now().format("%Y-%m-%d")),
    };

    let generated = ledger::generate_batch(&mut db, request.quantity, &session_name).await?;

    Ok(Json(GenerateCodesResponse {
        generated,
        session_name,
    }))
}

// Reset all codes; refused once any code has been used
#[delete("/admin/codes")]
pub async fn reset_codes(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
) -> Result<Json<usize>, AppError> {
    let deleted = ledger::reset_all(&mut db).await?;
    Ok(Json(deleted))
}

// Export the code sheet as a workbook for printing and cutting out
#[get("/admin/codes/export")]
pub async fn export_codes(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
) -> Result<(ContentType, Vec<u8>), AppError> {
    let rows = voting_codes::table
        .order(voting_codes::id.asc())
        .load::<crate::models::VotingCode>(&mut db)
        .await?;

    if rows.is_empty() {
        return Err(AppError::NotFound(
            "No codes available for download".to_string(),
        ));
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let headers = ["Code", "Used", "Created"];
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
    }

    for (i, code) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet
            .write_string(row, 0, &code.code)
            .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
        worksheet
            .write_string(row, 1, &code.has_voted)
            .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
        let created = code
            .created_at
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        worksheet
            .write_string(row, 2, &created)
            .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
    }

    worksheet.autofit();

    let buf = workbook
        .save_to_buffer()
        .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;

    Ok((
        ContentType::new(
            "application",
            "vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        buf,
    ))
}

// ---- Positions ----

#[get("/admin/positions")]
pub async fn list_positions(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
) -> Result<Json<Vec<Position>>, AppError> {
    let rows = positions::table
        .order(positions::id.asc())
        .load::<Position>(&mut db)
        .await?;
    Ok(Json(rows))
}

#[post("/admin/positions", format = "json", data = "<request>")]
pub async fn create_position(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
    request: Json<PositionRequest>,
) -> Result<Json<i32>, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Position name is required".to_string()));
    }

    diesel::insert_into(positions::table)
        .values(&NewPosition {
            name: name.to_string(),
        })
        .execute(&mut db)
        .await?;

    let position_id = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>(
        "LAST_INSERT_ID()",
    ))
    .get_result::<i32>(&mut db)
    .await?;

    Ok(Json(position_id))
}

#[put("/admin/positions/<id>", format = "json", data = "<request>")]
pub async fn update_position(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
    id: i32,
    request: Json<PositionRequest>,
) -> Result<Status, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Position name is required".to_string()));
    }

    let updated = diesel::update(positions::table.find(id))
        .set(positions::name.eq(name))
        .execute(&mut db)
        .await?;

    if updated == 0 {
        return Err(AppError::NotFound("Position not found".to_string()));
    }
    Ok(Status::Ok)
}

// Deleting a position still referenced by candidates fails with a conflict
#[delete("/admin/positions/<id>")]
pub async fn delete_position(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
    id: i32,
) -> Result<Status, AppError> {
    let deleted = diesel::delete(positions::table.find(id))
        .execute(&mut db)
        .await?;

    if deleted == 0 {
        return Err(AppError::NotFound("Position not found".to_string()));
    }
    Ok(Status::Ok)
}

// ---- Candidates ----

#[get("/admin/candidates")]
pub async fn list_candidates(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
) -> Result<Json<Vec<CandidateWithPosition>>, AppError> {
    let rows: Vec<(Candidate, Position)> = candidates::table
        .inner_join(positions::table)
        .order(candidates::id.asc())
        .select((Candidate::as_select(), Position::as_select()))
        .load::<(Candidate, Position)>(&mut db)
        .await?;

    let response = rows
        .into_iter()
        .map(|(candidate, position)| CandidateWithPosition {
            id: candidate.id,
            full_name: candidate.full_name,
            class_name: candidate.class_name,
            gender: candidate.gender,
            photo_url: candidate.photo_url,
            position,
            total_votes: candidate.total_votes,
        })
        .collect();

    Ok(Json(response))
}

#[post("/admin/candidates", format = "json", data = "<request>")]
pub async fn create_candidate(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
    request: Json<CandidateRequest>,
) -> Result<Json<i32>, AppError> {
    if request.full_name.trim().is_empty() || request.class_name.trim().is_empty() {
        return Err(AppError::Validation(
            "Full name and class are required".to_string(),
        ));
    }
    validate_gender(&request.gender)?;

    let position: Option<Position> = positions::table
        .find(request.position_id)
        .first::<Position>(&mut db)
        .await
        .optional()?;
    if position.is_none() {
        return Err(AppError::NotFound("Position not found".to_string()));
    }

    let photo_url = match &request.photo_url {
        Some(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => DEFAULT_PHOTO.to_string(),
    };

    diesel::insert_into(candidates::table)
        .values(&NewCandidate {
            full_name: request.full_name.trim().to_string(),
            class_name: request.class_name.trim().to_string(),
            gender: request.gender.clone(),
            photo_url,
            position_id: request.position_id,
            total_votes: 0,
        })
        .execute(&mut db)
        .await?;

    let candidate_id = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>(
        "LAST_INSERT_ID()",
    ))
    .get_result::<i32>(&mut db)
    .await?;

    Ok(Json(candidate_id))
}

#[put("/admin/candidates/<id>", format = "json", data = "<request>")]
pub async fn update_candidate(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
    id: i32,
    request: Json<CandidateRequest>,
) -> Result<Status, AppError> {
    if request.full_name.trim().is_empty() || request.class_name.trim().is_empty() {
        return Err(AppError::Validation(
            "Full name and class are required".to_string(),
        ));
    }
    validate_gender(&request.gender)?;

    let existing: Option<Candidate> = candidates::table
        .find(id)
        .first::<Candidate>(&mut db)
        .await
        .optional()?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound("Candidate not found".to_string())),
    };

    let position: Option<Position> = positions::table
        .find(request.position_id)
        .first::<Position>(&mut db)
        .await
        .optional()?;
    if position.is_none() {
        return Err(AppError::NotFound("Position not found".to_string()));
    }

    // Keep the stored photo when the update carries none
    let photo_url = match &request.photo_url {
        Some(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => existing.photo_url,
    };

    diesel::update(candidates::table.find(id))
        .set((
            candidates::full_name.eq(request.full_name.trim()),
            candidates::class_name.eq(request.class_name.trim()),
            candidates::gender.eq(&request.gender),
            candidates::photo_url.eq(photo_url),
            candidates::position_id.eq(request.position_id),
        ))
        .execute(&mut db)
        .await?;

    Ok(Status::Ok)
}

// Deleting a candidate with recorded votes fails with a conflict
#[delete("/admin/candidates/<id>")]
pub async fn delete_candidate(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
    id: i32,
) -> Result<Status, AppError> {
    let deleted = diesel::delete(candidates::table.find(id))
        .execute(&mut db)
        .await?;

    if deleted == 0 {
        return Err(AppError::NotFound("Candidate not found".to_string()));
    }
    Ok(Status::Ok)
}

// ---- Election lifecycle and results ----

// Close the active election: finalize the tallies, then deactivate
#[post("/admin/election/close")]
pub async fn close_election(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
) -> Result<Json<CloseElectionResponse>, AppError> {
    let (session, results_recorded) = election::close_election(&mut db).await?;
    Ok(Json(CloseElectionResponse {
        session,
        results_recorded,
    }))
}

// Running tallies while the election is open
#[get("/admin/results")]
pub async fn live_results(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
) -> Result<Json<Vec<LivePositionResults>>, AppError> {
    let results = results::live_results(&mut db).await?;
    Ok(Json(results))
}

// Ranked final results of the most recently closed session
#[get("/admin/results/final")]
pub async fn final_results(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
) -> Result<Json<FinalResultsReport>, AppError> {
    match results::final_results_for_latest_closed_session(&mut db).await? {
        Some(report) => Ok(Json(report)),
        None => Err(AppError::NotFound(
            "No election has been closed yet".to_string(),
        )),
    }
}

// Final results workbook for the reporting layer
#[get("/admin/results/export")]
pub async fn export_results(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
) -> Result<(ContentType, Vec<u8>), AppError> {
    let report = match results::final_results_for_latest_closed_session(&mut db).await? {
        Some(report) => report,
        None => {
            return Err(AppError::NotFound(
                "No election has been closed yet".to_string(),
            ))
        }
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let headers = [
        "Full name",
        "Class",
        "Gender",
        "Photo",
        "Position",
        "Total votes",
        "Rank",
    ];
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
    }

    let mut row: u32 = 1;
    for group in &report.positions {
        for candidate in &group.candidates {
            worksheet
                .write_string(row, 0, &candidate.full_name)
                .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
            worksheet
                .write_string(row, 1, &candidate.class_name)
                .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
            worksheet
                .write_string(row, 2, &candidate.gender)
                .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
            worksheet
                .write_string(row, 3, &candidate.photo_url)
                .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
            worksheet
                .write_string(row, 4, &candidate.position_name)
                .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
            worksheet
                .write_number(row, 5, candidate.total_votes as f64)
                .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
            worksheet
                .write_number(row, 6, candidate.rank as f64)
                .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;
            row += 1;
        }
    }

    worksheet.autofit();

    let buf = workbook
        .save_to_buffer()
        .map_err(|e| AppError::Internal(format!("workbook error: {}", e)))?;

    Ok((
        ContentType::new(
            "application",
            "vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        buf,
    ))
}

// Destructive full reset of all operational data
#[post("/admin/reset")]
pub async fn full_reset(
    _admin: AdminUser,
    mut db: Connection<VotingDB>,
) -> Result<Status, AppError> {
    election::full_reset(&mut db).await?;
    Ok(Status::Ok)
}
