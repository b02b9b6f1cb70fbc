//! Implementações de traits para os enums de erro do sistema
//!
//! Este módulo existe exclusivamente para desacoplar:
//! - definição de erros (enums)
//! - implementação de traits (`Display`, `Error`, `From`)

use std::error::Error as StdError;
use std::fmt;

use polars::prelude::PolarsError;

use crate::errors::{FetchError, PipelineError};

/* ========================================================================== */
/* Display                                                                    */
/* ========================================================================== */

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(err) => {
                write!(f, "[Rede] {}", err)
            }

            FetchError::HttpStatus { status, url } => {
                write!(f, "[HTTP] status {} ao baixar {}", status, url)
            }

            FetchError::FileSystem(err) => {
                write!(f, "[I/O] {}", err)
            }

            FetchError::EmptyResponse { url } => {
                write!(f, "[Vazio] nenhum byte recebido de {}", url)
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Io(err) => {
                write!(f, "[I/O] {}", err)
            }

            PipelineError::Json(err) => {
                write!(f, "[JSON] {}", err)
            }

            PipelineError::Table(err) => {
                write!(f, "[Tabela] {}", err)
            }

            PipelineError::Schema(msg) => {
                write!(f, "[Schema] {}", msg)
            }

            PipelineError::Chart(msg) => {
                write!(f, "[Figura] {}", msg)
            }
        }
    }
}

/* ========================================================================== */
/* std::error::Error                                                          */
/* ========================================================================== */

impl StdError for FetchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FetchError::Network(err) => Some(err),
            FetchError::FileSystem(err) => Some(err),
            FetchError::HttpStatus { .. } => None,
            FetchError::EmptyResponse { .. } => None,
        }
    }
}

impl StdError for PipelineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            PipelineError::Io(err) => Some(err),
            PipelineError::Json(err) => Some(err),
            PipelineError::Table(_) => None,
            PipelineError::Schema(_) => None,
            PipelineError::Chart(_) => None,
        }
    }
}

/* ========================================================================== */
/* Conversions                                                                */
/* ========================================================================== */

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Json(err)
    }
}

impl From<PolarsError> for PipelineError {
    fn from(err: PolarsError) -> Self {
        PipelineError::Table(err.to_string())
    }
}
