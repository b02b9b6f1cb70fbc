//! # Definição de Erros do Pipeline
//!
//! Este módulo centraliza as falhas possíveis durante a aquisição dos dumps
//! e as etapas de junção, agregação e emissão.
//!
//! # Error Handling Strategy
//! - **Tipagem:** Enums para tratamento exaustivo.
//! - **Extensibilidade:** Marcados como `non_exhaustive` para permitir evolução sem quebra de contrato.

/// Define erros específicos da camada de aquisição (rede/disco).
///
/// Qualquer variante aqui é fatal para a execução: não há política de retry
/// nem recuperação de arquivo parcial.
#[derive(Debug)]
#[non_exhaustive]
pub enum FetchError {
    /// Falha na conexão, DNS ou handshake TLS.
    Network(reqwest::Error),

    /// O servidor respondeu, mas com status HTTP de erro.
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    /// Falha ao criar ou escrever o arquivo no cache local.
    FileSystem(std::io::Error),

    /// O servidor respondeu com sucesso, mas nenhum byte útil foi recebido.
    EmptyResponse { url: String },
}

/// Enumeração central de falhas das etapas de processamento.
#[derive(Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// Falhas no sistema de arquivos (permissão, disco cheio, arquivo inexistente).
    /// Encapsula `std::io::Error`.
    Io(std::io::Error),

    /// Encapsula `serde_json::Error` (métricas globais em JSON).
    Json(serde_json::Error),

    /// Erros originados na engine tabular (leitura/escrita CSV).
    /// Armazenados como `String` para reduzir acoplamento direto.
    Table(String),

    /// Coluna obrigatória ausente ou inconsistência de formato nos dados.
    Schema(String),

    /// Falha na renderização de uma figura. Não-fatal: o chamador registra
    /// o aviso e segue, os CSVs são o entregável primário.
    Chart(String),
}
