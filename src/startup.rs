use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::SessionService;
use crate::middleware::JwtMiddleware;
use crate::routes::{get_current_user, health_check, login, logout, logout_all, refresh, register};
use crate::security::AuthRateLimits;

/// Wire the HTTP server around an already-constructed session service.
///
/// The service (and through it the ledger and credential store) is
/// injected here rather than built inside the handlers, so tests can
/// run the full HTTP surface against in-memory stores.
pub fn run(listener: TcpListener, sessions: SessionService) -> Result<Server, std::io::Error> {
    let sessions_data = web::Data::new(sessions.clone());
    let rate_limits = web::Data::new(AuthRateLimits::default());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(sessions_data.clone())
            .app_data(rate_limits.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            // Routes requiring a verified access token
            .service(
                web::scope("/auth")
                    .wrap(JwtMiddleware::new(sessions.clone()))
                    .route("/me", web::get().to(get_current_user))
                    .route("/logout_all", web::post().to(logout_all)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
