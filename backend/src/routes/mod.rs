// Routes module - organizes all HTTP route handlers

pub mod admin;
pub mod auth;
pub mod voter;

use rocket::http::Status;
use rocket::serde::json::{json, Value};

#[catch(404)]
pub fn not_found() -> Value {
    json!({ "error": "not found" })
}

#[catch(401)]
pub fn unauthorized() -> Status {
    Status::Unauthorized
}

#[catch(422)]
pub fn unprocessable() -> Value {
    json!({ "error": "malformed request body" })
}
