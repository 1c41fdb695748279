use bcrypt::verify;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::serde::json::Json;
use rocket::State;
use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::Connection;
use uuid::Uuid;

use crate::auth::{AdminUser, ADMIN_COOKIE};
use crate::db::VotingDB;
use crate::models::{AdminLoginRequest, NewAdminSession};
use crate::schema::admin_sessions;
use crate::AppState;

// Admin login endpoint
#[post("/admin/login", format = "json", data = "<login>")]
pub async fn admin_login(
    mut db: Connection<VotingDB>,
    state: &State<AppState>,
    cookies: &CookieJar<'_>,
    login: Json<AdminLoginRequest>,
) -> Result<Status, Status> {
    if verify(&login.password, &state.admin_password_hash).unwrap_or(false) {
        let token = Uuid::new_v4().to_string();
        let new_session = NewAdminSession {
            session_token: token.clone(),
            expires_at: None,
            ip_address: None,
        };

        diesel::insert_into(admin_sessions::table)
            .values(&new_session)
            .execute(&mut db)
            .await
            .map_err(|e| {
                eprintln!("Error creating admin session: {}", e);
                Status::InternalServerError
            })?;

        let mut cookie = Cookie::new(ADMIN_COOKIE, token);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookies.add(cookie);
        Ok(Status::Ok)
    } else {
        // Clear any existing invalid cookie
        cookies.remove(Cookie::from(ADMIN_COOKIE));
        Err(Status::Unauthorized)
    }
}

// Admin logout endpoint
#[post("/admin/logout")]
pub async fn admin_logout(
    mut db: Connection<VotingDB>,
    cookies: &CookieJar<'_>,
) -> Result<Status, Status> {
    if let Some(cookie) = cookies.get(ADMIN_COOKIE) {
        let token = cookie.value();
        diesel::delete(admin_sessions::table.find(token))
            .execute(&mut db)
            .await
            .ok();
        cookies.remove(Cookie::from(ADMIN_COOKIE));
    }
    Ok(Status::Ok)
}

// Check if admin is authenticated
#[get("/admin/check")]
pub async fn admin_check(_admin: AdminUser) -> Json<bool> {
    Json(true)
}
