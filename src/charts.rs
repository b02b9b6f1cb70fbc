//! # Figuras Suplementares (Plotters)
//!
//! ## Visão Geral
//! Renderiza um gráfico de barras por resumo. As figuras são entregáveis
//! secundários: qualquer falha aqui vira aviso e a execução continua, pois
//! os CSVs já estão em disco quando este módulo roda.

use std::path::Path;

use log::{info, warn};
use plotters::prelude::*;

use crate::aggregate::{BucketRow, ReportSummaries};
use crate::errors::PipelineError;
use crate::models::Config;

/// Dimensões das figuras PNG.
const FIGURE_SIZE: (u32, u32) = (1000, 600);

/// Quantos gêneros entram na figura de notas por gênero.
const GENRE_CHART_LIMIT: usize = 10;

/// Renderiza todas as figuras, avisando (sem abortar) a cada falha.
pub fn render_all(summaries: &ReportSummaries, config: &Config) {
    let figures: [(&str, &str, &str, &str, Vec<(String, f64)>); 4] = [
        (
            "films_per_decade.png",
            "Filmes Avaliados por Década",
            "Década",
            "Quantidade",
            counts_by_bucket(&summaries.decades),
        ),
        (
            "runtime_distribution.png",
            "Distribuição de Duração dos Longas",
            "Faixa (min)",
            "Quantidade",
            counts_by_bucket(&summaries.runtime),
        ),
        (
            "top_genres_weighted_rating.png",
            "Nota Ponderada dos Gêneros Mais Votados",
            "Gênero",
            "Nota Ponderada",
            genre_ratings(&summaries.genres, GENRE_CHART_LIMIT),
        ),
        (
            "popularity_by_votes.png",
            "Filmes por Faixa de Votos",
            "Faixa de Votos",
            "Quantidade",
            counts_by_bucket(&summaries.tiers),
        ),
    ];

    for (filename, title, x_desc, y_desc, data) in figures {
        let path = config.figure_dir.join(filename);
        match bar_chart(&path, title, x_desc, y_desc, &data) {
            Ok(()) => info!("figura gerada: {}", path.display()),
            Err(e) => warn!("figura ignorada ({}): {}", path.display(), e),
        }
    }
}

/// Pares (rótulo, contagem) na ordem de emissão do resumo.
fn counts_by_bucket(rows: &[BucketRow]) -> Vec<(String, f64)> {
    rows.iter()
        .map(|row| (row.key.clone(), row.title_count as f64))
        .collect()
}

/// Os `limit` gêneros com mais votos acumulados, com sua média ponderada.
fn genre_ratings(rows: &[BucketRow], limit: usize) -> Vec<(String, f64)> {
    let mut by_votes: Vec<&BucketRow> = rows
        .iter()
        .filter(|row| row.weighted_average_rating.is_some())
        .collect();
    by_votes.sort_by(|a, b| b.total_votes.cmp(&a.total_votes));
    by_votes.truncate(limit);
    by_votes
        .into_iter()
        .map(|row| (row.key.clone(), row.weighted_average_rating.unwrap_or(0.0)))
        .collect()
}

/// Gráfico de barras verticais com rótulos categóricos no eixo X.
fn bar_chart(
    path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    data: &[(String, f64)],
) -> Result<(), PipelineError> {
    if data.is_empty() {
        return Err(PipelineError::Chart(
            "resumo sem linhas para plotar".to_string(),
        ));
    }

    let upper = data
        .iter()
        .map(|(_, value)| *value)
        .fold(0.0_f64, f64::max)
        .max(1.0)
        * 1.1;

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(64)
        .build_cartesian_2d(0..data.len() as i32, 0.0_f64..upper)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_labels(data.len())
        .x_label_formatter(&|idx| {
            data.get(*idx as usize)
                .map(|(label, _)| label.clone())
                .unwrap_or_default()
        })
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(data.iter().enumerate().map(|(i, (_, value))| {
            Rectangle::new([(i as i32, 0.0), (i as i32 + 1, *value)], BLUE.filled())
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

fn chart_err<E: std::fmt::Display>(error: E) -> PipelineError {
    PipelineError::Chart(error.to_string())
}
