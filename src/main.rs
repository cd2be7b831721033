use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use twocomms_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{
        FacebookCapiService, MonobankService, NovaPoshtaService, TelegramService,
        TikTokEventsService,
    },
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    survey::{SurveyDefinition, SurveyEngine},
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    // External integrations.
    let monobank = MonobankService::new(config.monobank.clone());
    let novaposhta = NovaPoshtaService::new(config.novaposhta.clone());
    let telegram = TelegramService::new(config.telegram.clone());
    let facebook = FacebookCapiService::new(config.facebook.clone());
    let tiktok = TikTokEventsService::new(config.tiktok.clone());

    let survey_definition = SurveyDefinition::load(config.survey.definition_path.as_deref())
        .expect("Failed to load survey definition");
    log::info!("Loaded survey definition '{}'", survey_definition.key);
    let survey_engine = Arc::new(SurveyEngine::new(survey_definition));

    // Application services.
    let auth_service = AuthService::new(pool.clone(), jwt_service.clone());
    let catalog_service = CatalogService::new(pool.clone());
    let cart_service = CartService::new(pool.clone());
    let promo_service = PromoService::new(pool.clone());
    let order_service = OrderService::new(
        pool.clone(),
        cart_service.clone(),
        monobank.clone(),
        telegram.clone(),
        facebook.clone(),
        tiktok.clone(),
    );
    let survey_service = SurveyService::new(
        pool.clone(),
        survey_engine.clone(),
        promo_service.clone(),
        telegram.clone(),
    );
    let dropship_service = DropshipService::new(pool.clone());
    let utm_service = UtmService::new(pool.clone());

    tasks::spawn_all(
        survey_service.clone(),
        order_service.clone(),
        novaposhta.clone(),
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(catalog_service.clone()))
            .app_data(web::Data::new(cart_service.clone()))
            .app_data(web::Data::new(promo_service.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .app_data(web::Data::new(survey_service.clone()))
            .app_data(web::Data::new(dropship_service.clone()))
            .app_data(web::Data::new(utm_service.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::catalog_config)
                    .configure(handlers::cart_config)
                    .configure(handlers::promo_config)
                    .configure(handlers::order_config)
                    .configure(handlers::survey_config)
                    .configure(handlers::dropship_config)
                    .configure(handlers::utm_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
