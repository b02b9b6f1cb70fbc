//! # Aquisição dos Datasets (Rede -> Disco)
//!
//! ## Visão Geral
//! Garante a presença local dos dumps do IMDb: cache idempotente com download
//! em streaming e descompressão gzip em voo. O corpo da resposta é conectado
//! direto ao arquivo via `io::copy`, passando pelo descompressor; o pico de
//! memória fica nos buffers internos de poucos KB, independente do tamanho
//! do dump.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use reqwest::blocking::Client;

use crate::errors::FetchError;

/// Timeout generoso: os dumps têm centenas de MB.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Cliente HTTP reutilizável (keep-alive entre os dois downloads).
pub fn create_http_client() -> Result<Client, FetchError> {
    Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(FetchError::Network)
}

/// Garante a presença do dataset em `dest`, baixando-o na primeira execução.
///
/// Idempotente: se o arquivo já existe, retorna imediatamente sem tocar a
/// rede. Caso contrário baixa o recurso comprimido e grava a versão
/// descomprimida.
///
/// # Errors
/// Falhas de rede ou disco são fatais. Um arquivo parcialmente escrito é
/// removido antes do erro propagar, para que a reexecução baixe de novo em
/// vez de envenenar o cache.
pub fn ensure_dataset(client: &Client, url: &str, dest: &Path) -> Result<PathBuf, FetchError> {
    if dest.exists() {
        info!("{} já presente, download ignorado", dest.display());
        return Ok(dest.to_path_buf());
    }

    // 1. Configura e envia a requisição
    let response = client.get(url).send().map_err(FetchError::Network)?;
    if !response.status().is_success() {
        return Err(FetchError::HttpStatus {
            status: response.status(),
            url: url.to_string(),
        });
    }

    // 2. Prepara a barra de progresso (bytes comprimidos recebidos)
    let total_size = response.content_length().unwrap_or(0);
    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Baixando {}", url));

    // 3. Cria o arquivo e conecta: Rede -> Barra -> Gzip -> Disco
    let file = File::create(dest).map_err(FetchError::FileSystem)?;
    let mut writer = BufWriter::new(file);
    let mut decoder = GzDecoder::new(pb.wrap_read(response));

    let copied = match io::copy(&mut decoder, &mut writer) {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(dest);
            return Err(FetchError::FileSystem(e));
        }
    };
    if let Err(e) = writer.flush() {
        let _ = fs::remove_file(dest);
        return Err(FetchError::FileSystem(e));
    }

    if copied == 0 {
        let _ = fs::remove_file(dest);
        return Err(FetchError::EmptyResponse {
            url: url.to_string(),
        });
    }

    pb.finish_with_message(format!("Download concluído: {}", dest.display()));
    Ok(dest.to_path_buf())
}
