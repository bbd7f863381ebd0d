//! # Persistência dos Artefatos
//!
//! Grava os três artefatos de uma construção em `<output_dir>/<idioma>/`:
//!
//! - `kb/`: a [`KnowledgeBase`] serializada.
//! - `nlp/`: o [`VectorPipeline`], incluindo as estatísticas da inferência.
//! - `descriptions.csv`: `(id, descrição resolvida)`, uma linha por entidade,
//!   sem cabeçalho, aspas apenas quando necessário, UTF-8.
//!
//! Erros de sistema de arquivos são propagados sem novas tentativas.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::BuildConfig;
use crate::description::ResolvedDescription;
use crate::error::{Error, Result};
use crate::kb::KnowledgeBase;
use crate::pipeline::VectorPipeline;

/// Caminhos efetivamente gravados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPaths {
    pub kb_dir: PathBuf,
    pub nlp_dir: PathBuf,
    pub descriptions_csv: PathBuf,
}

/// Grava KB, pipeline e CSV de descrições no layout da configuração.
pub fn persist(
    config: &BuildConfig,
    kb: &KnowledgeBase,
    nlp: &VectorPipeline,
    descriptions: &[ResolvedDescription],
) -> Result<PersistedPaths> {
    let language_dir = config.language_dir();
    fs::create_dir_all(&language_dir).map_err(|e| Error::io(&language_dir, e))?;

    let paths = PersistedPaths {
        kb_dir: config.kb_dir(),
        nlp_dir: config.nlp_dir(),
        descriptions_csv: config.descriptions_path(),
    };

    kb.to_disk(&paths.kb_dir)?;
    nlp.to_disk(&paths.nlp_dir)?;
    write_descriptions_csv(&paths.descriptions_csv, descriptions)?;

    info!("Artefatos gravados em {}", language_dir.display());
    Ok(paths)
}

/// Grava o CSV `id,descrição` na ordem recebida.
pub fn write_descriptions_csv(path: &Path, descriptions: &[ResolvedDescription]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::CRLF)
        .from_path(path)?;

    for (id, description) in descriptions {
        writer.write_record([id.as_str(), description.as_str()])?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}
