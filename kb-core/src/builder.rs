//! # Construtor da KB: Orquestrador com Eventos Observáveis
//!
//! Conduz uma execução completa, em ordem estrita e sem novas tentativas:
//!
//! 1. **Load**: entidades e priors de aliases do extrator ([`crate::wiki`]).
//! 2. **Resolve**: descrição representativa de cada entidade.
//! 3. **Infer**: vetor de cada descrição pelo [`VectorPipeline`].
//! 4. **Build**: entidades, aliases naturais e aliases sintéticos `_<id>_` na KB.
//! 5. **Persist**: `kb/`, `nlp/` e `descriptions.csv`.
//!
//! Cada passo emite um [`BuildEvent`] por um canal `mpsc`, permitindo que a CLI
//! (ou qualquer outra interface) acompanhe o progresso. O primeiro erro
//! interrompe a execução: é emitido como `BuildEvent::Error` e devolvido.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::BuildConfig;
use crate::description::resolve_descriptions;
use crate::device::Device;
use crate::error::Result;
use crate::kb::{synthetic_alias, AliasOutcome, KnowledgeBase};
use crate::persist::{persist, PersistedPaths};
use crate::pipeline::VectorPipeline;
use crate::wiki::WikiSource;

/// Eventos emitidos durante a construção.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BuildEvent {
    /// **Passo 1**: tabela de entidades carregada.
    EntitiesLoaded { total: usize },
    /// **Passo 1**: tabela de priors de aliases carregada.
    AliasesLoaded { total: usize },
    /// **Passo 2**: uma descrição por entidade.
    DescriptionsResolved { total: usize },
    /// **Passo 3**: um lote de descrições vetorizado.
    EmbeddingProgress { done: usize, total: usize },
    /// **Passo 4**: entidades registradas na KB com vetor e frequência.
    EntitiesRegistered { total: usize, vector_length: usize },
    /// **Passo 4**: aliases naturais e sintéticos registrados.
    AliasesRegistered {
        natural: usize,
        synthetic: usize,
        /// Aliases que já existiam na KB e foram mantidos como estavam.
        skipped: usize,
    },
    /// **Passo 5**: artefatos gravados.
    Persisted {
        kb_dir: PathBuf,
        nlp_dir: PathBuf,
        descriptions_csv: PathBuf,
    },
    /// **Conclusão**: a KB foi construída e gravada.
    Done { report: BuildReport },
    /// **Falha**: a execução foi abortada.
    Error { message: String },
}

/// Resumo de uma construção bem-sucedida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub language: String,
    pub entities: usize,
    pub natural_aliases: usize,
    pub synthetic_aliases: usize,
    pub skipped_aliases: usize,
    pub vector_length: usize,
    pub device: Device,
    pub paths: PersistedPaths,
    pub processing_ms: u64,
}

/// O construtor da KB para um idioma.
pub struct KbBuilder {
    config: BuildConfig,
}

impl KbBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Executa a construção de forma síncrona, descartando os eventos.
    pub fn run(&self) -> Result<BuildReport> {
        let (tx, _rx) = mpsc::channel();
        self.run_streaming(tx)
    }

    /// Executa a construção enviando eventos de progresso em `tx`.
    ///
    /// Um receptor já descartado não interrompe a execução.
    pub fn run_streaming(&self, tx: mpsc::Sender<BuildEvent>) -> Result<BuildReport> {
        match self.execute(&tx) {
            Ok(report) => {
                let _ = tx.send(BuildEvent::Done {
                    report: report.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                let _ = tx.send(BuildEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn execute(&self, tx: &mpsc::Sender<BuildEvent>) -> Result<BuildReport> {
        let start = Instant::now();
        let config = &self.config;
        config.validate()?;

        let device = Device::detect();
        device.announce();

        let mut nlp = VectorPipeline::load(&config.vectors_model)?;

        // === Passo 1: Carga ===
        info!("Construindo a base de conhecimento para '{}'", config.language);
        let source = WikiSource::new(&config.wiki_dir);
        let entities = source.load_entities(&config.language)?;
        let _ = tx.send(BuildEvent::EntitiesLoaded {
            total: entities.len(),
        });
        let alias_priors = source.load_alias_entity_prior_probabilities(&config.language)?;
        let _ = tx.send(BuildEvent::AliasesLoaded {
            total: alias_priors.len(),
        });

        // === Passo 2: Descrições ===
        let descriptions = resolve_descriptions(&entities, config.description_max_chars);
        let _ = tx.send(BuildEvent::DescriptionsResolved {
            total: descriptions.len(),
        });

        // === Passo 3: Inferência dos vetores ===
        let texts: Vec<&str> = descriptions.iter().map(|(_, d)| d.as_str()).collect();
        let vectors = nlp.pipe(&texts, config.n_process, config.batch_size, |done, total| {
            let _ = tx.send(BuildEvent::EmbeddingProgress { done, total });
        })?;

        // === Passo 4: KB ===
        let vector_length = nlp.vectors_length();
        let mut kb = KnowledgeBase::new(vector_length);
        let entity_list: Vec<String> = entities.ids().map(str::to_string).collect();
        let freq_list: Vec<u64> = entities.iter().map(|e| e.count).collect();
        kb.set_entities(&entity_list, vectors, &freq_list)?;
        let _ = tx.send(BuildEvent::EntitiesRegistered {
            total: kb.n_entities(),
            vector_length,
        });

        let mut natural = 0;
        let mut synthetic = 0;
        let mut skipped = 0;
        for (alias, priors) in alias_priors.iter() {
            let ids: Vec<&str> = priors.iter().map(|(id, _)| id.as_str()).collect();
            let probs: Vec<f32> = priors.iter().map(|&(_, p)| p).collect();
            match kb.add_alias(alias, &ids[..], &probs)? {
                AliasOutcome::Added => natural += 1,
                AliasOutcome::AlreadyExists => skipped += 1,
            }
        }
        // Aliases sintéticos para busca pelo id exato.
        for id in &entity_list {
            match kb.add_alias(&synthetic_alias(id), &[id.as_str()], &[1.0])? {
                AliasOutcome::Added => synthetic += 1,
                AliasOutcome::AlreadyExists => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("{skipped} aliases repetidos foram ignorados");
        }
        let _ = tx.send(BuildEvent::AliasesRegistered {
            natural,
            synthetic,
            skipped,
        });

        // === Passo 5: Persistência ===
        let paths = persist(config, &kb, &nlp, &descriptions)?;
        let _ = tx.send(BuildEvent::Persisted {
            kb_dir: paths.kb_dir.clone(),
            nlp_dir: paths.nlp_dir.clone(),
            descriptions_csv: paths.descriptions_csv.clone(),
        });

        info!("Base de conhecimento construída com sucesso.");
        Ok(BuildReport {
            language: config.language.clone(),
            entities: kb.n_entities(),
            natural_aliases: natural,
            synthetic_aliases: synthetic,
            skipped_aliases: skipped,
            vector_length,
            device,
            paths,
            processing_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_invalid_language_emits_error_event() {
        let config = BuildConfig::new("nope", "../x", 1, "wiki", "output");
        let (tx, rx) = mpsc::channel();
        let result = KbBuilder::new(config).run_streaming(tx);
        assert!(matches!(result, Err(Error::Config(_))));

        let events: Vec<BuildEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(
            matches!(&events[0], BuildEvent::Error { .. }),
            "Único evento deve ser Error"
        );
    }

    #[test]
    fn test_events_serialize_tagged() {
        let event = BuildEvent::EmbeddingProgress { done: 10, total: 20 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "EmbeddingProgress");
        assert_eq!(json["data"]["done"], 10);
    }
}
