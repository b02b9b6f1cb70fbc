//! # IMDb Trends Pipeline
//!
//! ## Visão Geral
//! Ingestão dos dumps públicos do IMDb (metadados e avaliações de títulos),
//! junção filtrada para longas-metragens avaliados e agregados descritivos
//! por década, duração, gênero e popularidade, além do ranking por votos.
//! A tabela de metadados é lida em lotes e dobrada em acumuladores, mantendo
//! o pico de memória limitado.
//!
//! ## Princípios de Engenharia
//! - **Memória Limitada**: O pico é O(lote + tabela de avaliações), nunca O(linhas totais).
//! - **Fluxo Linear**: Aquisição, junção em streaming, agregação e emissão, sem retroalimentação.
//! - **Observabilidade**: Tempos de execução por etapa; avisos contabilizam linhas descartadas.

mod aggregate;
mod charts;
mod errors;
mod fetch;
mod impl_errors;
mod models;
mod pipeline;
mod report;

use std::env;
use std::fs;
use std::time::Instant;

use log::warn;

use crate::aggregate::Aggregator;
use crate::models::Config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let global_timer = Instant::now();

    println!("--- INICIANDO IMDB TRENDS PIPELINE ---");

    // Carrega configuração TOML opcional (caminho via CLI); sem argumento,
    // valem os padrões compilados
    let config = match env::args().nth(1) {
        Some(path) => match Config::load_from_file(&path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Erro na carga de configuração: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    // Garante estrutura de pastas: cache de dados e destinos dos relatórios
    fs::create_dir_all(&config.data_dir)?;
    fs::create_dir_all(&config.summary_dir)?;
    fs::create_dir_all(&config.figure_dir)?;

    // Reuso de conexões/Keep-alive para os dois downloads
    let client = fetch::create_http_client()?;

    let step_timer = Instant::now();
    let basics_path = fetch::ensure_dataset(
        &client,
        &config.basics.url,
        &config.basics.local_path(&config.data_dir),
    )?;
    let ratings_path = fetch::ensure_dataset(
        &client,
        &config.ratings.url,
        &config.ratings.local_path(&config.data_dir),
    )?;
    println!("Datasets disponíveis ({:.2?})", step_timer.elapsed());

    // Materializa o lookup de avaliações (a menor das duas tabelas)
    let step_timer = Instant::now();
    let (ratings, ratings_dropped) = pipeline::load_ratings(&ratings_path)?;
    println!(
        "Lookup de avaliações: {} títulos ({:.2?})",
        ratings.len(),
        step_timer.elapsed()
    );

    // Passada única: filtra, junta e agrega lote a lote
    let step_timer = Instant::now();
    let mut aggregator = Aggregator::new(&config);
    let stats = pipeline::stream_filter_join(&basics_path, &ratings, &config, |film| {
        aggregator.observe(film)
    })?;
    println!(
        "Junção concluída: {} filmes de {} linhas ({:.2?})",
        stats.films_joined,
        stats.rows_read,
        step_timer.elapsed()
    );

    let rows_dropped = stats.rows_dropped + ratings_dropped;
    if rows_dropped > 0 {
        warn!("{} linhas malformadas descartadas durante o parsing", rows_dropped);
    }

    // Finaliza acumuladores e emite: CSVs são fatais, figuras não
    let summaries = aggregator.finalize(rows_dropped);
    report::write_summaries(&summaries, &config)?;
    if config.render_charts {
        charts::render_all(&summaries, &config);
    }

    println!("\n==========================================");
    println!("Fim da análise. Resumos em {}", config.summary_dir.display());
    println!("Tempo de execução: {:.2?}", global_timer.elapsed());
    println!("==========================================");

    Ok(())
}
