// Main application entry point

#[macro_use]
extern crate rocket;

mod auth;
mod ballot;
mod config;
mod db;
mod election;
mod error;
mod ledger;
mod models;
mod results;
mod routes;
mod schema;
#[cfg(test)]
mod tests;

use rocket::fairing::AdHoc;
use rocket_db_pools::Database;

use config::AppConfig;
use db::VotingDB;

/// Request-independent application state.
pub struct AppState {
    pub admin_password_hash: String,
}

#[rocket::launch]
fn rocket() -> _ {
    let app_config = AppConfig::load();

    let mut figment = rocket::config::Config::figment()
        .merge(("port", app_config.rocket_port))
        .merge((
            "databases.voting_db",
            rocket_db_pools::Config {
                url: app_config.database_url.clone(),
                min_connections: None,
                max_connections: 64,
                connect_timeout: 3,
                idle_timeout: None,
                extensions: None,
            },
        ));

    if let Some(secret_key) = &app_config.secret_key {
        figment = figment.merge(("secret_key", secret_key.clone()));
    }

    rocket::custom(figment)
        .manage(AppState {
            admin_password_hash: app_config.admin_password_hash.clone(),
        })
        .attach(VotingDB::init())
        .attach(AdHoc::on_ignite("Database Migrations", db::run_migrations))
        .mount(
            "/api",
            routes![
                routes::voter::election_status,
                routes::voter::redeem_code,
                routes::voter::ballot_form,
                routes::voter::submit_ballot,
                routes::voter::confirmation,
                routes::auth::admin_login,
                routes::auth::admin_logout,
                routes::auth::admin_check,
                routes::admin::dashboard,
                routes::admin::list_codes,
                routes::admin::generate_codes,
                routes::admin::reset_codes,
                routes::admin::export_codes,
                routes::admin::list_positions,
                routes::admin::create_position,
                routes::admin::update_position,
                routes::admin::delete_position,
                routes::admin::list_candidates,
                routes::admin::create_candidate,
                routes::admin::update_candidate,
                routes::admin::delete_candidate,
                routes::admin::close_election,
                routes::admin::live_results,
                routes::admin::final_results,
                routes::admin::export_results,
                routes::admin::full_reset,
            ],
        )
        .register(
            "/",
            catchers![
                routes::not_found,
                routes::unauthorized,
                routes::unprocessable
            ],
        )
}
