// Módulos de la aplicación
mod api;
mod app_state;
mod cache;
mod config;
mod consolidate;
mod extract;
mod fetch;
mod index;
mod knowledge;
mod learning;
mod llm;
mod models;
mod pipeline;
mod processor;
mod respond;
mod scrape;

use std::sync::Arc;

use anyhow::{bail, Result};
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;

#[derive(Parser)]
#[command(
    name = "crawler_rag_webapp",
    about = "Pipeline RAG ligero con aprendizaje por feedback"
)]
struct Cli {
    /// Prompt a ejecutar en modo directo; sin argumentos se arranca el servidor HTTP.
    prompt: Vec<String>,

    /// Reconstruye el índice TF-IDF a partir de la base de conocimiento.
    #[arg(long)]
    train: bool,

    /// Descarga y limpia URLs para el corpus del entrenador.
    #[arg(long, value_name = "URL", num_args = 1..)]
    scrape: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env()?;

    // 3. Modos fuera de banda: entrenamiento y scraping
    if cli.train {
        let summary = index::Trainer::train(&cfg.data_dir)?;
        println!(
            "Entrenamiento completado: {} documentos, {} términos.",
            summary.n_docs, summary.vocabulary_size
        );
        return Ok(());
    }

    if !cli.scrape.is_empty() {
        let added = scrape::scrape_urls(&cfg, &cli.scrape).await?;
        println!("Scrapeados {added} documentos nuevos.");
        return Ok(());
    }

    // 4. Construir el pipeline con sus dependencias
    let crawler = Arc::new(pipeline::Crawler::from_config(&cfg)?);

    // 5. Modo directo: ejecutar un prompt y volcar el resultado como JSON
    if !cli.prompt.is_empty() {
        let prompt = cli.prompt.join(" ");
        let prompt = prompt.trim();
        if prompt.is_empty() {
            bail!("El prompt no puede estar vacío");
        }

        let result = crawler.run(prompt).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    // 6. Modo servidor: router de la API con CORS
    let app_state = AppState { crawler };

    let app = Router::new()
        .merge(api::create_router(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(&cfg.server_addr).await?;
    info!("🚀 Servidor escuchando en http://{}", cfg.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
