use campaign_dispatch::{AppConfig, Error};

#[actix_web::main]
async fn main() -> Result<(), Error> {
    let config = AppConfig::load()?;
    campaign_dispatch::init_tracing(&config);

    campaign_dispatch::run(config).await
}
