mod config;
mod db;
mod error;
mod resources;
mod store;

use std::sync::Arc;

use crate::config::Settings;
use crate::db::init_pool;
use crate::resources::comment_conf;
use crate::store::{CommentStore, MemoryCommentStore, PgCommentStore};
use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath, TrailingSlash};
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env()?;

    let store: Arc<dyn CommentStore> = match &settings.database_url {
        Some(db_url) => {
            let pool = init_pool(db_url, settings.max_connections).await?;
            info!("storing comments in postgres");
            Arc::new(PgCommentStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, comments are kept in memory only");
            Arc::new(MemoryCommentStore::default())
        }
    };
    let store = web::Data::from(store);

    info!("listening on {}", settings.bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .configure(comment_conf)
    })
    .bind(&settings.bind_address)?
    .run()
    .await?;

    Ok(())
}
