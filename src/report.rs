//! # Emissão dos Relatórios
//!
//! ## Visão Geral
//! Converte os resumos finalizados em arquivos CSV com esquema de colunas
//! estável (uma linha por balde, ordenadas pela chave) e nas métricas globais
//! em JSON. Erros de escrita aqui são fatais: os CSVs são o entregável
//! primário da execução.

use std::fs::File;
use std::path::Path;

use log::info;
use polars::io::SerWriter;
use polars::prelude::*;

use crate::aggregate::{BucketRow, ReportSummaries, TopFilm};
use crate::errors::PipelineError;
use crate::models::Config;

/// Precisão decimal das médias ponderadas nos CSVs.
const FLOAT_PRECISION: usize = 4;

/// Grava as cinco tabelas-resumo e as métricas globais.
pub fn write_summaries(
    summaries: &ReportSummaries,
    config: &Config,
) -> Result<(), PipelineError> {
    let dir = &config.summary_dir;

    write_bucket_table(&dir.join("films_per_decade.csv"), "decade", &summaries.decades)?;
    write_bucket_table(
        &dir.join("runtime_distribution.csv"),
        "runtime_bin",
        &summaries.runtime,
    )?;
    write_bucket_table(
        &dir.join("genre_weighted_ratings.csv"),
        "genre",
        &summaries.genres,
    )?;
    write_bucket_table(
        &dir.join("popularity_by_votes.csv"),
        "vote_band",
        &summaries.tiers,
    )?;
    write_top_films(&dir.join("top_films_by_votes.csv"), &summaries.top_films)?;
    write_metrics(&dir.join("high_level_metrics.json"), summaries)?;

    info!("resumos gravados em {}", dir.display());
    Ok(())
}

/// Esquema fixo dos CSVs por balde: chave, contagem, votos, média ponderada.
fn write_bucket_table(
    path: &Path,
    key_column: &str,
    rows: &[BucketRow],
) -> Result<(), PipelineError> {
    let keys: Vec<&str> = rows.iter().map(|row| row.key.as_str()).collect();
    let counts: Vec<u64> = rows.iter().map(|row| row.title_count).collect();
    let votes: Vec<u64> = rows.iter().map(|row| row.total_votes).collect();
    let means: Vec<Option<f64>> = rows.iter().map(|row| row.weighted_average_rating).collect();

    let mut frame = df!(
        key_column => keys,
        "title_count" => counts,
        "total_votes" => votes,
        "weighted_average_rating" => means
    )?;
    write_csv(path, &mut frame)
}

/// Ranking por votos, uma linha por posição.
fn write_top_films(path: &Path, films: &[TopFilm]) -> Result<(), PipelineError> {
    let ranks: Vec<u32> = (1..=films.len() as u32).collect();
    let ids: Vec<&str> = films.iter().map(|f| f.tconst.as_str()).collect();
    let titles: Vec<&str> = films.iter().map(|f| f.primary_title.as_str()).collect();
    let years: Vec<Option<i32>> = films.iter().map(|f| f.start_year).collect();
    let ratings: Vec<f64> = films.iter().map(|f| f.average_rating).collect();
    let votes: Vec<u64> = films.iter().map(|f| f.num_votes).collect();

    let mut frame = df!(
        "rank" => ranks,
        "tconst" => ids,
        "primary_title" => titles,
        "start_year" => years,
        "average_rating" => ratings,
        "num_votes" => votes
    )?;
    write_csv(path, &mut frame)
}

fn write_csv(path: &Path, frame: &mut DataFrame) -> Result<(), PipelineError> {
    let file = File::create(path)?;
    CsvWriter::new(file)
        .include_header(true)
        .with_float_precision(Some(FLOAT_PRECISION))
        .finish(frame)?;
    Ok(())
}

fn write_metrics(path: &Path, summaries: &ReportSummaries) -> Result<(), PipelineError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &summaries.metrics)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::models::JoinedFilm;
    use std::fs;

    fn sample_summaries() -> ReportSummaries {
        let mut aggregator = Aggregator::new(&Config::default());
        aggregator.observe(&JoinedFilm {
            tconst: "tt0111161".to_string(),
            primary_title: "The Shawshank Redemption".to_string(),
            start_year: Some(1994),
            runtime_minutes: Some(142),
            genres: vec!["Drama".to_string()],
            average_rating: 9.3,
            num_votes: 3_100_000,
        });
        aggregator.observe(&JoinedFilm {
            tconst: "tt0068646".to_string(),
            primary_title: "The Godfather".to_string(),
            start_year: Some(1972),
            runtime_minutes: Some(175),
            genres: vec!["Crime".to_string(), "Drama".to_string()],
            average_rating: 9.2,
            num_votes: 2_100_000,
        });
        aggregator.finalize(3)
    }

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.summary_dir = dir.to_path_buf();
        config
    }

    #[test]
    fn bucket_tables_have_stable_schema_and_row_per_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        write_summaries(&sample_summaries(), &config).unwrap();

        let decades = fs::read_to_string(dir.path().join("films_per_decade.csv")).unwrap();
        let mut lines = decades.lines();
        assert_eq!(
            lines.next().unwrap(),
            "decade,title_count,total_votes,weighted_average_rating"
        );
        // Ordenado pela chave: 1970s antes de 1990s
        assert!(lines.next().unwrap().starts_with("1970s,1,"));
        assert!(lines.next().unwrap().starts_with("1990s,1,"));

        let runtime = fs::read_to_string(dir.path().join("runtime_distribution.csv")).unwrap();
        // Cabeçalho + as 8 faixas fixas, incluindo as vazias
        assert_eq!(runtime.lines().count(), 9);

        let genres = fs::read_to_string(dir.path().join("genre_weighted_ratings.csv")).unwrap();
        let genre_keys: Vec<&str> = genres
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap())
            .collect();
        assert_eq!(genre_keys, vec!["Crime", "Drama"]);
    }

    #[test]
    fn top_films_csv_is_ranked() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        write_summaries(&sample_summaries(), &config).unwrap();

        let top = fs::read_to_string(dir.path().join("top_films_by_votes.csv")).unwrap();
        let mut lines = top.lines();
        assert_eq!(
            lines.next().unwrap(),
            "rank,tconst,primary_title,start_year,average_rating,num_votes"
        );
        assert!(lines.next().unwrap().starts_with("1,tt0111161,"));
        assert!(lines.next().unwrap().starts_with("2,tt0068646,"));
    }

    #[test]
    fn metrics_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        write_summaries(&sample_summaries(), &config).unwrap();

        let raw = fs::read_to_string(dir.path().join("high_level_metrics.json")).unwrap();
        let metrics: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(metrics["total_films"], 2);
        assert_eq!(metrics["rows_dropped"], 3);
        // Ambos os filmes têm 120+ min de duração
        assert_eq!(metrics["share_over_120_min"], 1.0);
    }
}
