//! # Configuração da Construção
//!
//! Reúne os parâmetros de uma execução: modelo de vetores, idioma, paralelismo
//! e diretórios de entrada/saída. Os caminhos de saída seguem o layout
//! `<output_dir>/<idioma>/{kb, nlp, descriptions.csv}`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Padrão aceito para o código de idioma. Também vira segmento de caminho.
static LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,3}(-[a-z0-9]+)?$").unwrap());

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_DESCRIPTION_MAX_CHARS: usize = 200;

/// Parâmetros de uma construção da KB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Diretório do modelo de vetores (ver [`crate::pipeline::VectorPipeline::load`]).
    pub vectors_model: PathBuf,
    /// Código do idioma (ex: "en", "pt").
    pub language: String,
    /// Número de threads da inferência; `<= 0` usa todos os núcleos.
    pub n_process: i32,
    /// Raiz dos dados do extrator (`<wiki_dir>/<idioma>/entities.jsonl`...).
    pub wiki_dir: PathBuf,
    /// Raiz da saída.
    pub output_dir: PathBuf,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_description_max_chars")]
    pub description_max_chars: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_description_max_chars() -> usize {
    DEFAULT_DESCRIPTION_MAX_CHARS
}

impl BuildConfig {
    /// Cria a configuração com os valores padrão para lote e truncamento.
    pub fn new(
        vectors_model: impl Into<PathBuf>,
        language: impl Into<String>,
        n_process: i32,
        wiki_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            vectors_model: vectors_model.into(),
            language: language.into(),
            n_process,
            wiki_dir: wiki_dir.into(),
            output_dir: output_dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            description_max_chars: DEFAULT_DESCRIPTION_MAX_CHARS,
        }
    }

    /// Verifica o idioma e o tamanho de lote antes de tocar no disco.
    pub fn validate(&self) -> Result<()> {
        validate_language(&self.language)?;
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size deve ser maior que zero".into()));
        }
        Ok(())
    }

    /// `<output_dir>/<idioma>`
    pub fn language_dir(&self) -> PathBuf {
        self.output_dir.join(&self.language)
    }

    pub fn kb_dir(&self) -> PathBuf {
        self.language_dir().join("kb")
    }

    pub fn nlp_dir(&self) -> PathBuf {
        self.language_dir().join("nlp")
    }

    pub fn descriptions_path(&self) -> PathBuf {
        self.language_dir().join("descriptions.csv")
    }

    /// `<wiki_dir>/<idioma>`
    pub fn wiki_language_dir(&self) -> PathBuf {
        wiki_language_dir(&self.wiki_dir, &self.language)
    }
}

pub(crate) fn wiki_language_dir(wiki_dir: &Path, language: &str) -> PathBuf {
    wiki_dir.join(language)
}

/// Rejeita códigos de idioma que não sejam seguros como nome de diretório.
pub fn validate_language(language: &str) -> Result<()> {
    if LANGUAGE_RE.is_match(language) {
        Ok(())
    } else {
        Err(Error::Config(format!("código de idioma inválido: '{language}'")))
    }
}
