use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use cafe_pos_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::PaymentGateway,
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
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

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建JWT服务
    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    if config.payment.server_key.is_empty() {
        log::warn!("Payment server key is empty, /api/payment will fail");
    }
    let payment_gateway = PaymentGateway::new(config.payment.clone());

    // 创建服务
    let events = OrderEventHub::new();
    let store_service = StoreService::new(pool.clone(), config.geofence.clone());
    let order_service = OrderService::new(pool.clone(), store_service.clone(), events);
    let table_service = TableService::new(pool.clone(), config.server.public_base_url.clone());
    let product_service = ProductService::new(pool.clone());
    let auth_service = AuthService::new(pool.clone(), jwt_service.clone(), config.staff.clone());
    let user_service = UserService::new(pool.clone(), config.staff.clone());
    let report_service = ReportService::new(pool.clone());

    // 启动HTTP服务器
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
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(order_service.clone()))
            .app_data(web::Data::new(table_service.clone()))
            .app_data(web::Data::new(product_service.clone()))
            .app_data(web::Data::new(store_service.clone()))
            .app_data(web::Data::new(report_service.clone()))
            .app_data(web::Data::new(payment_gateway.clone()))
            .configure(swagger_config)
            .configure(handlers::payment_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::navigation_config)
                    .configure(handlers::user_config)
                    .configure(handlers::product_config)
                    .configure(handlers::table_config)
                    .configure(handlers::store_config)
                    .configure(handlers::order_config)
                    .configure(handlers::report_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
