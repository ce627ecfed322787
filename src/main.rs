use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use staffhub::app_state::AppState;
use staffhub::auth::{login, signup, Authentication};
use staffhub::config::Config;
use staffhub::db;
use staffhub::project::{
    create_project, delete_project, get_project, projects_by_company, update_project,
};
use staffhub::task::{
    create_task, delete_task, get_task, tasks_by_project, tasks_by_user, update_task,
};
use staffhub::user_management::{find_user_email, get_user_by_id};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("failed to initialise database");
    std::fs::create_dir_all(&config.upload_dir)?;

    let frontend_origin = config.frontend_origin.clone();
    let bind_addr = config.bind_addr.clone();

    println!("Server running at http://{}", bind_addr);
    println!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(web::Data::new(AppState {
                db: pool.clone(),
                config: config.clone(),
            }))
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(signup))
                    .route("/login", web::post().to(login)),
            )
            // TASKS
            .service(
                web::scope("/api/tasks")
                    .route("", web::post().to(create_task))
                    .route("/user/{user_id}", web::get().to(tasks_by_user))
                    .route("/project/{project_id}", web::get().to(tasks_by_project))
                    .route("/{id}", web::get().to(get_task))
                    .route("/{id}", web::put().to(update_task))
                    .route("/{id}", web::delete().to(delete_task)),
            )
            // PROJECTS
            .service(
                web::scope("/api/projects")
                    .route("", web::post().to(create_project))
                    .route("/company/{company_id}", web::get().to(projects_by_company))
                    .route("/{id}", web::get().to(get_project))
                    .route("/{id}", web::put().to(update_project))
                    .route("/{id}", web::delete().to(delete_project)),
            )
            // USERS
            .service(
                web::scope("/api/users")
                    .route("/find_user_email", web::get().to(find_user_email))
                    .route("/get/{id}", web::get().to(get_user_by_id)),
            )
    })
    .bind(&bind_addr)?
    .run()
    .await
}
