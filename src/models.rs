//! # Modelos de Configuração e Domínio
//!
//! ## Visão Geral
//! Este módulo define a configuração explícita do pipeline (caminhos, URLs e
//! limiares) e os registros de domínio trocados entre as etapas. Nenhum
//! componente lê estado global: tudo chega via `Config` injetada, o que
//! permite exercitar cada etapa com caminhos e limiares de teste.
//!
//! ## Boas Práticas
//! - **Encapsulamento**: Validações de integridade ocorrem no momento da carga.
//! - **Padrões compilados**: A execução sem argumentos usa `Config::default()`;
//!   um TOML opcional sobrescreve apenas os campos presentes.

use crate::errors::PipelineError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Origem remota de um dataset e o nome do arquivo no cache local.
///
/// O nome local já é o do arquivo descomprimido: a descompressão gzip
/// acontece durante o download, nunca na leitura.
#[derive(Debug, Deserialize, Clone)]
pub struct DatasetSource {
    /// Nome do arquivo no cache (ex: "title.basics.tsv").
    pub filename: String,

    /// URL do dump comprimido publicado pelo IMDb.
    pub url: String,
}

impl DatasetSource {
    /// Caminho físico do dataset dentro do diretório de cache.
    pub fn local_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.filename)
    }
}

/// Configuração completa de uma execução.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Diretório de cache dos dumps brutos.
    pub data_dir: PathBuf,

    /// Diretório das tabelas-resumo em CSV (entregável primário).
    pub summary_dir: PathBuf,

    /// Diretório das figuras PNG (entregável suplementar).
    pub figure_dir: PathBuf,

    /// Tabela de metadados de títulos: a maior das duas, lida em lotes.
    pub basics: DatasetSource,

    /// Tabela de avaliações: a menor, materializada inteira em memória
    /// antes do streaming (precondição de escala documentada em `pipeline`).
    pub ratings: DatasetSource,

    /// Número de linhas por lote na leitura da tabela de metadados.
    pub batch_size: usize,

    /// Quantidade de filmes no ranking por votos.
    pub top_n: usize,

    /// Piso de votos para a visão de faixas de popularidade. Filmes abaixo
    /// do piso continuam contando nas demais dimensões.
    pub tier_vote_floor: u64,

    /// Habilita a renderização das figuras (falhas são não-fatais).
    pub render_charts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            summary_dir: PathBuf::from("reports/summaries"),
            figure_dir: PathBuf::from("reports/figures"),
            basics: DatasetSource {
                filename: "title.basics.tsv".to_string(),
                url: "https://datasets.imdbws.com/title.basics.tsv.gz".to_string(),
            },
            ratings: DatasetSource {
                filename: "title.ratings.tsv".to_string(),
                url: "https://datasets.imdbws.com/title.ratings.tsv.gz".to_string(),
            },
            batch_size: 500_000,
            top_n: 10,
            tier_vote_floor: 50_000,
            render_charts: true,
        }
    }
}

impl Config {
    /// Carrega e valida o ficheiro de configuração TOML.
    ///
    /// Campos ausentes no TOML herdam os padrões compilados.
    ///
    /// # Erros
    /// Retorna `PipelineError::Io` se o ficheiro não for encontrado ou
    /// `PipelineError::Schema` se a estrutura for inválida.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let content = fs::read_to_string(path).map_err(PipelineError::Io)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| PipelineError::Schema(format!("Erro no TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validação pós-carga (Fail-Fast).
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.batch_size == 0 {
            return Err(PipelineError::Schema(
                "batch_size deve ser maior que zero".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(PipelineError::Schema(
                "top_n deve ser maior que zero".to_string(),
            ));
        }
        for dataset in [&self.basics, &self.ratings] {
            if dataset.filename.is_empty() || dataset.url.is_empty() {
                return Err(PipelineError::Schema(
                    "dataset sem filename ou url".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Avaliação agregada de um título (tabela de ratings).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingRecord {
    /// Nota média no intervalo 0 a 10.
    pub average_rating: f64,

    /// Total de votos computados.
    pub num_votes: u64,
}

/// Mapeamento id -> avaliação, materializado uma única vez antes do streaming
/// e somente-leitura a partir daí.
pub type RatingsLookup = HashMap<String, RatingRecord>;

/// Filme com avaliação, resultado da junção filtrada.
///
/// Invariante: só existe para títulos do tipo "movie" com avaliação presente
/// na tabela de ratings. Transiente: consumido imediatamente pelo agregador,
/// nunca persistido.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedFilm {
    pub tconst: String,
    pub primary_title: String,
    pub start_year: Option<i32>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub average_rating: f64,
    pub num_votes: u64,
}
