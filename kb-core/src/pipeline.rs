//! # Pipeline de Vetores: Inferência de Embeddings das Entidades
//!
//! O pipeline ("nlp") transforma a descrição resolvida de cada entidade em um
//! vetor de largura fixa:
//!
//! 1. Tokenização ([`crate::tokenizer`]).
//! 2. Busca do vetor de cada token na [`VectorTable`] (forma exata e, se
//!    configurado, forma minúscula).
//! 3. Média dos vetores de todos os tokens. Tokens sem vetor entram como zero,
//!    e um documento vazio produz o vetor nulo.
//!
//! O processamento em lote ([`VectorPipeline::pipe`]) roda em um pool Rayon com
//! `n_process` threads e devolve os vetores **na mesma ordem** dos textos.
//!
//! ## Layout em disco
//!
//! ```text
//! nlp/
//! ├── config.json   # idioma, nome, tokenizador, fallback minúsculo
//! ├── meta.json     # estatísticas da última inferência
//! └── vectors.txt   # tabela word2vec/GloVe
//! ```

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::tokenizer::{tokenize_with_mode, Token, TokenizerMode};
use crate::vectors::VectorTable;

pub const CONFIG_FILE: &str = "config.json";
pub const META_FILE: &str = "meta.json";
const DEFAULT_VECTORS_FILE: &str = "vectors.txt";

/// Configuração persistida do pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub lang: String,
    pub name: String,
    #[serde(default)]
    pub tokenizer: TokenizerMode,
    /// Se verdadeiro, tokens sem vetor tentam novamente em minúsculas.
    #[serde(default)]
    pub lowercase_fallback: bool,
    /// Nome do arquivo da tabela de vetores, relativo ao diretório do modelo.
    #[serde(default = "default_vectors_file")]
    pub vectors_file: String,
}

fn default_vectors_file() -> String {
    DEFAULT_VECTORS_FILE.to_string()
}

/// Estatísticas acumuladas pelas inferências.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMeta {
    pub docs_processed: u64,
    pub tokens_processed: u64,
    /// Tokens sem vetor (contribuíram com zeros para a média).
    pub oov_tokens: u64,
}

/// Um documento processado.
#[derive(Debug, Clone, PartialEq)]
pub struct Doc {
    pub tokens: Vec<Token>,
    pub vector: Vec<f32>,
    pub oov: usize,
}

/// O pipeline de vetores: tokenizador + tabela de vetores.
#[derive(Debug, Clone)]
pub struct VectorPipeline {
    config: PipelineConfig,
    vectors: VectorTable,
    meta: PipelineMeta,
}

impl VectorPipeline {
    pub fn new(config: PipelineConfig, vectors: VectorTable) -> Self {
        Self {
            config,
            vectors,
            meta: PipelineMeta::default(),
        }
    }

    /// Carrega um modelo de vetores a partir do seu diretório.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        let raw = fs::read_to_string(&config_path).map_err(|e| Error::io(&config_path, e))?;
        let config: PipelineConfig = serde_json::from_str(&raw).map_err(|e| {
            Error::VectorsModel(format!("{}: {e}", config_path.display()))
        })?;

        let vectors = VectorTable::load_text(&dir.join(&config.vectors_file))?;

        let meta_path = dir.join(META_FILE);
        let meta = if meta_path.exists() {
            let raw = fs::read_to_string(&meta_path).map_err(|e| Error::io(&meta_path, e))?;
            serde_json::from_str(&raw)?
        } else {
            PipelineMeta::default()
        };

        info!(
            "Modelo de vetores '{}' carregado: {} palavras, largura {}",
            config.name,
            vectors.len(),
            vectors.width()
        );
        Ok(Self {
            config,
            vectors,
            meta,
        })
    }

    /// Grava config, tabela de vetores e meta em `dir` (criado se necessário).
    pub fn to_disk(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let config = PipelineConfig {
            vectors_file: DEFAULT_VECTORS_FILE.to_string(),
            ..self.config.clone()
        };
        write_json(&dir.join(CONFIG_FILE), &config)?;
        write_json(&dir.join(META_FILE), &self.meta)?;
        self.vectors.save_text(&dir.join(DEFAULT_VECTORS_FILE))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn meta(&self) -> &PipelineMeta {
        &self.meta
    }

    /// Largura dos vetores produzidos.
    pub fn vectors_length(&self) -> usize {
        self.vectors.width()
    }

    fn lookup(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).or_else(|| {
            if self.config.lowercase_fallback {
                self.vectors.get(&word.to_lowercase())
            } else {
                None
            }
        })
    }

    /// Processa um único texto.
    pub fn make_doc(&self, text: &str) -> Doc {
        let tokens = tokenize_with_mode(text, self.config.tokenizer);
        let width = self.vectors.width();
        let mut vector = vec![0.0f32; width];
        let mut oov = 0;

        for token in &tokens {
            match self.lookup(&token.text) {
                Some(v) => {
                    for (acc, x) in vector.iter_mut().zip(v) {
                        *acc += x;
                    }
                }
                None => oov += 1,
            }
        }

        if !tokens.is_empty() {
            let n = tokens.len() as f32;
            vector.iter_mut().for_each(|x| *x /= n);
        }

        Doc {
            tokens,
            vector,
            oov,
        }
    }

    /// Infere os vetores de todos os textos, em lotes, num pool de `n_process` threads.
    ///
    /// A saída `i` corresponde ao texto `i`. `on_batch(concluídos, total)` é chamado
    /// após cada lote. `n_process <= 0` usa um thread por núcleo disponível.
    pub fn pipe<T, F>(
        &mut self,
        texts: &[T],
        n_process: i32,
        batch_size: usize,
        mut on_batch: F,
    ) -> Result<Vec<Vec<f32>>>
    where
        T: AsRef<str> + Sync,
        F: FnMut(usize, usize),
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count(n_process))
            .build()?;
        let total = texts.len();
        let mut vectors = Vec::with_capacity(total);
        let mut tokens_processed = 0u64;
        let mut oov_tokens = 0u64;

        let this = &*self;
        for batch in texts.chunks(batch_size.max(1)) {
            let docs: Vec<Doc> = pool.install(|| {
                batch
                    .par_iter()
                    .map(|text| this.make_doc(text.as_ref()))
                    .collect()
            });
            for doc in docs {
                tokens_processed += doc.tokens.len() as u64;
                oov_tokens += doc.oov as u64;
                vectors.push(doc.vector);
            }
            debug!("lote concluído: {}/{}", vectors.len(), total);
            on_batch(vectors.len(), total);
        }

        self.meta.docs_processed += total as u64;
        self.meta.tokens_processed += tokens_processed;
        self.meta.oov_tokens += oov_tokens;
        Ok(vectors)
    }
}

fn thread_count(n_process: i32) -> usize {
    // Zero deixa o Rayon escolher (RAYON_NUM_THREADS ou número de núcleos).
    if n_process <= 0 {
        0
    } else {
        n_process as usize
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(lowercase_fallback: bool) -> VectorPipeline {
        let mut vectors = VectorTable::new(2);
        vectors.add("city", &[1.0, 0.0]).unwrap();
        vectors.add("capital", &[0.0, 1.0]).unwrap();
        vectors.add("paris", &[2.0, 2.0]).unwrap();
        VectorPipeline::new(
            PipelineConfig {
                lang: "en".into(),
                name: "test_vectors".into(),
                tokenizer: TokenizerMode::Standard,
                lowercase_fallback,
                vectors_file: DEFAULT_VECTORS_FILE.into(),
            },
            vectors,
        )
    }

    #[test]
    fn test_doc_vector_is_mean_with_oov_as_zero() {
        let nlp = pipeline(false);
        // "city", "capital", "." -> ((1,0) + (0,1) + (0,0)) / 3
        let doc = nlp.make_doc("city capital.");
        assert_eq!(doc.tokens.len(), 3);
        assert_eq!(doc.oov, 1);
        assert!((doc.vector[0] - 1.0 / 3.0).abs() < 1e-6);
        assert!((doc.vector[1] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_doc_is_zero_vector() {
        let nlp = pipeline(false);
        assert_eq!(nlp.make_doc("").vector, vec![0.0, 0.0]);
    }

    #[test]
    fn test_lowercase_fallback() {
        assert_eq!(pipeline(false).make_doc("Paris").vector, vec![0.0, 0.0]);
        assert_eq!(pipeline(true).make_doc("Paris").vector, vec![2.0, 2.0]);
    }

    #[test]
    fn test_pipe_preserves_order_across_batches() {
        let mut nlp = pipeline(false);
        let texts: Vec<String> = (0..25)
            .map(|i| if i % 2 == 0 { "city".to_string() } else { "capital".to_string() })
            .collect();
        let mut progress = Vec::new();
        let vectors = nlp.pipe(&texts, 4, 10, |done, total| progress.push((done, total))).unwrap();

        assert_eq!(vectors.len(), texts.len());
        for (i, v) in vectors.iter().enumerate() {
            let expected = if i % 2 == 0 { vec![1.0, 0.0] } else { vec![0.0, 1.0] };
            assert_eq!(v, &expected, "vetor {i} fora de ordem");
        }
        assert_eq!(progress, vec![(10, 25), (20, 25), (25, 25)]);
        assert_eq!(nlp.meta().docs_processed, 25);
        assert_eq!(nlp.meta().oov_tokens, 0);
    }

    #[test]
    fn test_pipe_with_default_thread_count() {
        let mut nlp = pipeline(false);
        let vectors = nlp.pipe(&["paris city"], -1, 1000, |_, _| {}).unwrap();
        assert_eq!(vectors, vec![vec![1.5, 1.0]]);
    }

    #[test]
    fn test_to_disk_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut nlp = pipeline(true);
        nlp.pipe(&["city"], 1, 10, |_, _| {}).unwrap();
        nlp.to_disk(&dir.path().join("nlp")).unwrap();

        let loaded = VectorPipeline::load(&dir.path().join("nlp")).unwrap();
        assert_eq!(loaded.config(), nlp.config());
        assert_eq!(loaded.meta().docs_processed, 1);
        assert_eq!(loaded.make_doc("Paris").vector, vec![2.0, 2.0]);
    }

    #[test]
    fn test_load_missing_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            VectorPipeline::load(&dir.path().join("nope")),
            Err(Error::Io { .. })
        ));
    }
}
