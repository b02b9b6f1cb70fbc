//! # Junção Filtrada em Streaming
//!
//! ## Visão Geral
//! Lê a tabela de metadados em lotes de tamanho fixo para limitar o pico de
//! memória, filtra para títulos do tipo "movie" e junta cada lote contra o
//! lookup de avaliações já materializado. Cada lote é filtrado, juntado e
//! dobrado nos acumuladores antes do lote seguinte ser lido: pipeline pull
//! síncrono, memória O(lote + lookup) em vez de O(linhas totais).
//!
//! Precondição de escala: a tabela de avaliações cabe inteira em memória
//! (dezenas de bytes por entrada). Se isso deixar de valer, a alternativa é
//! uma junção sort-merge ou um índice externo em disco.
//!
//! Política de parsing: melhor esforço. Linha com campo numérico presente e
//! malformado é descartada e contada; o sentinela `\N` vira `None`, nunca um
//! placeholder numérico.

use std::collections::HashMap;
use std::path::Path;

use log::info;
use polars::io::SerReader;
use polars::prelude::*;

use crate::errors::PipelineError;
use crate::models::{Config, JoinedFilm, RatingRecord, RatingsLookup};

/// Tipo de título que o relatório considera longa-metragem.
const FEATURE_FILM_TYPE: &str = "movie";

/// Intervalo de linhas entre logs de progresso.
const ROW_MILESTONE: u64 = 2_000_000;

/// Contadores da passada sobre as tabelas de origem.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    pub rows_read: u64,
    pub films_joined: u64,
    pub rows_dropped: u64,
}

/// Opções de leitura compartilhadas pelas duas tabelas: TSV com cabeçalho,
/// sentinela `\N` como nulo e todas as colunas como texto. O parsing numérico
/// fica por conta deste módulo, para que uma linha malformada descarte só a
/// própria linha em vez de abortar a leitura.
fn tsv_options(batch_size: Option<usize>) -> CsvReadOptions {
    let mut options = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|parse| {
            parse
                .with_separator(b'\t')
                .with_quote_char(None)
                .with_truncate_ragged_lines(true)
                .with_null_values(Some(NullValues::AllColumnsSingle("\\N".into())))
        });
    if let Some(size) = batch_size {
        options = options.with_chunk_size(size);
    }
    options
}

/// Resgata uma coluna textual obrigatória do lote.
fn column<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a StringChunked, PipelineError> {
    frame
        .column(name)
        .map_err(|_| PipelineError::Schema(format!("coluna obrigatória ausente: {}", name)))?
        .str()
        .map_err(|e| PipelineError::Schema(format!("coluna {} não textual: {}", name, e)))
}

/// Carrega a tabela de avaliações inteira no lookup id -> avaliação.
///
/// Retorna o lookup e a contagem de linhas descartadas por malformação.
pub fn load_ratings(path: &Path) -> Result<(RatingsLookup, u64), PipelineError> {
    let frame = tsv_options(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let ids = column(&frame, "tconst")?;
    let ratings = column(&frame, "averageRating")?;
    let votes = column(&frame, "numVotes")?;

    let mut lookup: RatingsLookup = HashMap::with_capacity(frame.height());
    let mut dropped = 0u64;
    for i in 0..frame.height() {
        let (Some(id), Some(rating_raw), Some(votes_raw)) = (ids.get(i), ratings.get(i), votes.get(i))
        else {
            dropped += 1;
            continue;
        };
        match (rating_raw.trim().parse::<f64>(), votes_raw.trim().parse::<u64>()) {
            (Ok(average_rating), Ok(num_votes)) => {
                lookup.insert(
                    id.to_string(),
                    RatingRecord {
                        average_rating,
                        num_votes,
                    },
                );
            }
            _ => dropped += 1,
        }
    }

    Ok((lookup, dropped))
}

/// Percorre a tabela de metadados em lotes, emitindo cada filme juntado para
/// `on_film` antes de ler o lote seguinte.
///
/// A sequência é finita e não reiniciável sem reler o arquivo. A ordem de
/// emissão segue a ordem do arquivo, mas o agregador não depende dela.
pub fn stream_filter_join<F>(
    path: &Path,
    ratings: &RatingsLookup,
    config: &Config,
    mut on_film: F,
) -> Result<StreamStats, PipelineError>
where
    F: FnMut(&JoinedFilm),
{
    let mut reader = tsv_options(Some(config.batch_size))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?;
    let mut batched = reader.batched_borrowed()?;

    let mut stats = StreamStats::default();
    let mut next_milestone = ROW_MILESTONE;

    while let Some(batches) = batched.next_batches(1)? {
        for batch in &batches {
            fold_batch(batch, ratings, &mut stats, &mut on_film)?;
        }
        if stats.rows_read >= next_milestone {
            info!("{} linhas de metadados processadas", stats.rows_read);
            next_milestone += ROW_MILESTONE;
        }
    }

    info!(
        "passada concluída: {} linhas lidas, {} filmes juntados, {} descartadas",
        stats.rows_read, stats.films_joined, stats.rows_dropped
    );
    Ok(stats)
}

/// Filtra e junta um único lote, dobrando cada filme qualificado em `on_film`.
fn fold_batch<F>(
    batch: &DataFrame,
    ratings: &RatingsLookup,
    stats: &mut StreamStats,
    on_film: &mut F,
) -> Result<(), PipelineError>
where
    F: FnMut(&JoinedFilm),
{
    let ids = column(batch, "tconst")?;
    let kinds = column(batch, "titleType")?;
    let titles = column(batch, "primaryTitle")?;
    let years = column(batch, "startYear")?;
    let runtimes = column(batch, "runtimeMinutes")?;
    let genres = column(batch, "genres")?;

    for i in 0..batch.height() {
        stats.rows_read += 1;

        let (Some(id), Some(kind)) = (ids.get(i), kinds.get(i)) else {
            stats.rows_dropped += 1;
            continue;
        };
        if kind != FEATURE_FILM_TYPE {
            continue;
        }
        // Junção: sem avaliação correspondente, o título fica fora do relatório
        let Some(rating) = ratings.get(id) else {
            continue;
        };
        let Some(title) = titles.get(i) else {
            stats.rows_dropped += 1;
            continue;
        };
        let (Ok(start_year), Ok(runtime_minutes)) = (
            parse_optional::<i32>(years.get(i)),
            parse_optional::<u32>(runtimes.get(i)),
        ) else {
            stats.rows_dropped += 1;
            continue;
        };

        let joined = JoinedFilm {
            tconst: id.to_string(),
            primary_title: title.to_string(),
            start_year,
            runtime_minutes,
            genres: split_genres(genres.get(i)),
            average_rating: rating.average_rating,
            num_votes: rating.num_votes,
        };
        stats.films_joined += 1;
        on_film(&joined);
    }

    Ok(())
}

/// `None` (sentinela `\N`) permanece indefinido; valor presente e malformado
/// é erro, para que a linha seja descartada inteira pelo chamador.
fn parse_optional<T: std::str::FromStr>(value: Option<&str>) -> Result<Option<T>, T::Err> {
    match value {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some),
    }
}

/// Separa o campo de gêneros por vírgula em rótulos não vazios.
fn split_genres(value: Option<&str>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty() && *label != "\\N")
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
