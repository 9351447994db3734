use std::sync::Arc;

use actix_web::web::{self, Data, JsonConfig, PathConfig, QueryConfig, ServiceConfig};
use actix_web::{App, HttpResponse, HttpServer, ResponseError};
use mongodb::{bson, Client};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

pub mod campaign;
pub mod channel;
pub mod config;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod recipient;
pub mod typedid;
pub mod utils;

pub use crate::campaign::{CampaignBody, CreateCampaignBody};
pub use crate::config::AppConfig;
pub use crate::error::Error;

use crate::channel::{DeepLinkChannel, HandoffLog};
use crate::config::{DispatchConfig, StorageBackend};
use crate::database::{Database, MemoryDatabase, MongoDatabase};
use crate::dispatch::DispatchController;

/// Shared services handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub controller: DispatchController,
    pub handoffs: HandoffLog,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, config: &DispatchConfig) -> AppState {
        let handoffs = HandoffLog::new(config.handoff_log_capacity);
        let channel = DeepLinkChannel::new(config.default_country_code.clone(), handoffs.clone());
        let controller = DispatchController::new(db.clone(), Arc::new(channel))
            .with_auto_advance_delay(config.auto_advance_delay());

        AppState {
            db,
            controller,
            handoffs,
        }
    }
}

pub fn configure(state: AppState) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(JsonConfig::default().error_handler(|err, _req| {
            // format json errors with custom format
            Error::InvalidJson(err).into()
        }))
        .app_data(PathConfig::default().error_handler(|err, _req| {
            // format path errors with custom format
            Error::InvalidPath(err).into()
        }))
        .app_data(QueryConfig::default().error_handler(|err, _req| {
            // format query errors with custom format
            Error::InvalidQuery(err).into()
        }))
        .app_data(Data::from(state.db))
        .app_data(Data::new(state.controller))
        .app_data(Data::new(state.handoffs))
        .service(campaign::endpoints::create_campaign)
        .service(campaign::endpoints::get_campaigns)
        .service(campaign::endpoints::get_campaign_by_id)
        .service(campaign::endpoints::refresh_campaign_summary)
        .service(recipient::endpoints::get_recipients_in_campaign)
        .service(recipient::endpoints::set_recipient_status_in_campaign)
        .service(dispatch::endpoints::get_session_in_campaign)
        .service(dispatch::endpoints::dispatch_in_campaign)
        .service(dispatch::endpoints::skip_in_campaign)
        .service(dispatch::endpoints::pause_in_campaign)
        .service(dispatch::endpoints::close_session_in_campaign)
        .service(channel::endpoints::get_handoffs_in_campaign)
        .default_service(web::to(path_not_found));
    }
}

async fn path_not_found() -> HttpResponse {
    Error::PathNotFound.error_response()
}

pub fn init_tracing(config: &AppConfig) {
    let filter = match &config.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::NEW)
        .compact()
        .init();
}

async fn connect(config: &AppConfig) -> Result<Arc<dyn Database>, Error> {
    match config.storage.backend {
        StorageBackend::Mongo => {
            info!("connecting to db: {}", config.storage.uri);
            let db = Client::with_uri_str(&config.storage.uri)
                .await?
                .database(&config.storage.database);

            // ping the database to ensure connection is established
            db.run_command(bson::doc! { "ping": 1 }, None).await?;

            Ok(Arc::new(MongoDatabase::initialize(db).await?))
        }
        StorageBackend::Memory => {
            info!("using in-memory storage, nothing will be persisted");
            Ok(Arc::new(MemoryDatabase::new()))
        }
    }
}

pub async fn run(config: AppConfig) -> Result<(), Error> {
    let db = connect(&config).await?;
    let state = AppState::new(db, &config.dispatch);
    let controller = state.controller.clone();

    info!("listening on {}:{}", config.server.host, config.server.port);
    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .configure(configure(state.clone()))
    })
    .bind(config.server_addr())?
    .run()
    .await?;

    controller.close_all().await;

    Ok(())
}
