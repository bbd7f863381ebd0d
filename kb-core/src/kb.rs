//! # Base de Conhecimento (Knowledge Base - KB) para Entity Linking
//!
//! Estrutura em memória indexada por id de entidade e por alias:
//!
//! - **Entidades**: id, frequência (peso a priori) e vetor de largura fixa.
//! - **Aliases**: texto de superfície → lista ordenada de candidatos, cada um
//!   com a probabilidade a priori de o alias se referir àquela entidade.
//!
//! Um linker consulta a KB com o texto da menção ([`KnowledgeBase::get_candidates`])
//! e desambigua entre os candidatos usando priors e vetores.
//!
//! ## Regras
//! - Ids de entidade são únicos.
//! - Os vetores têm todos `entity_vector_length` posições, todas finitas.
//! - Probabilidades de um alias são finitas, não negativas e somam no máximo 1
//!   (tolerância de `1e-5`).
//! - Um alias já registrado não é sobrescrito: o primeiro registro vence.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, KbError, Result};

/// Folga aceita na soma das probabilidades de um alias.
const PROB_SUM_TOLERANCE: f32 = 1e-5;
const FORMAT_VERSION: u32 = 1;

const META_FILE: &str = "meta.json";
const ENTITIES_FILE: &str = "entities.jsonl";
const ALIASES_FILE: &str = "aliases.jsonl";

/// Alias sintético que permite buscar uma entidade pelo id exato: `_Q42_`.
pub fn synthetic_alias(entity_id: &str) -> String {
    format!("_{entity_id}_")
}

/// Um candidato devolvido pela busca de um alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub entity: String,
    pub alias: String,
    pub prior_prob: f32,
    pub entity_freq: u64,
}

/// Resultado de [`KnowledgeBase::add_alias`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOutcome {
    Added,
    /// O alias já existia; a lista original foi mantida.
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq)]
struct EntityEntry {
    id: String,
    freq: u64,
    vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
struct AliasEntry {
    alias: String,
    /// (índice da entidade, probabilidade)
    candidates: Vec<(usize, f32)>,
}

/// A base de conhecimento em memória.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    entity_vector_length: usize,
    entities: Vec<EntityEntry>,
    entity_index: HashMap<String, usize>,
    aliases: Vec<AliasEntry>,
    alias_index: HashMap<String, usize>,
}

impl KnowledgeBase {
    pub fn new(entity_vector_length: usize) -> Self {
        Self {
            entity_vector_length,
            entities: Vec::new(),
            entity_index: HashMap::new(),
            aliases: Vec::new(),
            alias_index: HashMap::new(),
        }
    }

    pub fn entity_vector_length(&self) -> usize {
        self.entity_vector_length
    }

    pub fn n_entities(&self) -> usize {
        self.entities.len()
    }

    pub fn n_aliases(&self) -> usize {
        self.aliases.len()
    }

    pub fn contains_entity(&self, id: &str) -> bool {
        self.entity_index.contains_key(id)
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.alias_index.contains_key(alias)
    }

    /// Ids das entidades, na ordem de registro.
    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.id.as_str())
    }

    /// Aliases, na ordem de registro.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(|a| a.alias.as_str())
    }

    /// Registra todas as entidades de uma vez.
    ///
    /// Nada é inserido se alguma regra for violada: as listas precisam ter o
    /// mesmo tamanho, os vetores a largura da KB e os ids serem inéditos.
    pub fn set_entities(
        &mut self,
        entity_list: &[String],
        vector_list: Vec<Vec<f32>>,
        freq_list: &[u64],
    ) -> std::result::Result<(), KbError> {
        if entity_list.len() != vector_list.len() || entity_list.len() != freq_list.len() {
            return Err(KbError::EntityListMismatch {
                entities: entity_list.len(),
                vectors: vector_list.len(),
                freqs: freq_list.len(),
            });
        }

        let mut seen = HashSet::with_capacity(entity_list.len());
        for (id, vector) in entity_list.iter().zip(&vector_list) {
            self.check_vector(id, vector)?;
            if self.entity_index.contains_key(id) || !seen.insert(id.as_str()) {
                return Err(KbError::DuplicateEntity(id.clone()));
            }
        }

        self.entities.reserve(entity_list.len());
        for ((id, vector), &freq) in entity_list.iter().zip(vector_list).zip(freq_list) {
            self.entity_index.insert(id.clone(), self.entities.len());
            self.entities.push(EntityEntry {
                id: id.clone(),
                freq,
                vector,
            });
        }
        Ok(())
    }

    /// Registra uma entidade. Um id repetido é ignorado com aviso e devolve `false`.
    pub fn add_entity(
        &mut self,
        id: &str,
        freq: u64,
        vector: Vec<f32>,
    ) -> std::result::Result<bool, KbError> {
        self.check_vector(id, &vector)?;
        if self.entity_index.contains_key(id) {
            warn!("Entidade '{id}' já existe na base de conhecimento; ignorada");
            return Ok(false);
        }
        self.entity_index.insert(id.to_string(), self.entities.len());
        self.entities.push(EntityEntry {
            id: id.to_string(),
            freq,
            vector,
        });
        Ok(true)
    }

    fn check_vector(&self, id: &str, vector: &[f32]) -> std::result::Result<(), KbError> {
        if vector.len() != self.entity_vector_length {
            return Err(KbError::VectorLength {
                entity: id.to_string(),
                expected: self.entity_vector_length,
                found: vector.len(),
            });
        }
        if let Some(position) = vector.iter().position(|x| !x.is_finite()) {
            return Err(KbError::NonFiniteVector {
                entity: id.to_string(),
                position,
            });
        }
        Ok(())
    }

    /// Registra um alias com seus candidatos e probabilidades (mesma ordem).
    ///
    /// Se o alias já existir, emite um aviso e mantém a lista original.
    pub fn add_alias<S: AsRef<str>>(
        &mut self,
        alias: &str,
        entities: &[S],
        probabilities: &[f32],
    ) -> std::result::Result<AliasOutcome, KbError> {
        if entities.len() != probabilities.len() {
            return Err(KbError::AliasListMismatch {
                alias: alias.to_string(),
                entities: entities.len(),
                probabilities: probabilities.len(),
            });
        }

        let mut candidates = Vec::with_capacity(entities.len());
        let mut sum = 0.0f32;
        for (entity, &prob) in entities.iter().zip(probabilities) {
            let entity = entity.as_ref();
            let Some(&idx) = self.entity_index.get(entity) else {
                return Err(KbError::UnknownEntity {
                    alias: alias.to_string(),
                    entity: entity.to_string(),
                });
            };
            if !prob.is_finite() || prob < 0.0 {
                return Err(KbError::InvalidProbability {
                    alias: alias.to_string(),
                    entity: entity.to_string(),
                    prob,
                });
            }
            sum += prob;
            candidates.push((idx, prob));
        }
        if sum > 1.0 + PROB_SUM_TOLERANCE {
            return Err(KbError::ProbabilitySum {
                alias: alias.to_string(),
                sum,
            });
        }

        if self.alias_index.contains_key(alias) {
            warn!("Alias '{alias}' já existe na base de conhecimento; mantida a lista original");
            return Ok(AliasOutcome::AlreadyExists);
        }
        self.alias_index.insert(alias.to_string(), self.aliases.len());
        self.aliases.push(AliasEntry {
            alias: alias.to_string(),
            candidates,
        });
        Ok(AliasOutcome::Added)
    }

    /// Candidatos de um alias exato, na ordem de registro. Vazio se desconhecido.
    pub fn get_alias_candidates(&self, alias: &str) -> Vec<Candidate> {
        let Some(&slot) = self.alias_index.get(alias) else {
            return Vec::new();
        };
        let entry = &self.aliases[slot];
        entry
            .candidates
            .iter()
            .map(|&(idx, prior_prob)| {
                let entity = &self.entities[idx];
                Candidate {
                    entity: entity.id.clone(),
                    alias: entry.alias.clone(),
                    prior_prob,
                    entity_freq: entity.freq,
                }
            })
            .collect()
    }

    /// Candidatos para o texto de uma menção (aparado nas bordas).
    pub fn get_candidates(&self, mention: &str) -> Vec<Candidate> {
        self.get_alias_candidates(mention.trim())
    }

    pub fn get_vector(&self, entity: &str) -> Option<&[f32]> {
        self.entity_index
            .get(entity)
            .map(|&i| self.entities[i].vector.as_slice())
    }

    pub fn get_frequency(&self, entity: &str) -> Option<u64> {
        self.entity_index.get(entity).map(|&i| self.entities[i].freq)
    }

    /// Prior de `entity` para `alias`; 0.0 quando não há ligação.
    pub fn get_prior_prob(&self, entity: &str, alias: &str) -> f32 {
        let (Some(&e), Some(&a)) = (self.entity_index.get(entity), self.alias_index.get(alias))
        else {
            return 0.0;
        };
        self.aliases[a]
            .candidates
            .iter()
            .find(|(idx, _)| *idx == e)
            .map_or(0.0, |&(_, p)| p)
    }

    /// Grava a KB em `dir` (criado se necessário).
    pub fn to_disk(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let meta = KbMeta {
            format_version: FORMAT_VERSION,
            entity_vector_length: self.entity_vector_length,
            n_entities: self.n_entities(),
            n_aliases: self.n_aliases(),
        };
        let meta_path = dir.join(META_FILE);
        fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)
            .map_err(|e| Error::io(&meta_path, e))?;

        write_jsonl(
            &dir.join(ENTITIES_FILE),
            self.entities.iter().map(|e| EntityRecord {
                id: e.id.clone(),
                freq: e.freq,
                vector: e.vector.clone(),
            }),
        )?;
        write_jsonl(
            &dir.join(ALIASES_FILE),
            self.aliases.iter().map(|a| AliasRecord {
                alias: a.alias.clone(),
                entities: a
                    .candidates
                    .iter()
                    .map(|&(idx, _)| self.entities[idx].id.clone())
                    .collect(),
                probabilities: a.candidates.iter().map(|&(_, p)| p).collect(),
            }),
        )?;

        info!(
            "KB gravada em {}: {} entidades, {} aliases",
            dir.display(),
            self.n_entities(),
            self.n_aliases()
        );
        Ok(())
    }

    /// Lê uma KB gravada por [`KnowledgeBase::to_disk`], validando cada registro.
    pub fn from_disk(dir: &Path) -> Result<Self> {
        let meta_path = dir.join(META_FILE);
        let raw = fs::read_to_string(&meta_path).map_err(|e| Error::io(&meta_path, e))?;
        let meta: KbMeta = serde_json::from_str(&raw)?;
        if meta.format_version != FORMAT_VERSION {
            return Err(Error::MalformedLine {
                path: meta_path,
                line: 1,
                message: format!("versão de formato {} não suportada", meta.format_version),
            });
        }

        let mut kb = KnowledgeBase::new(meta.entity_vector_length);
        let entities_path = dir.join(ENTITIES_FILE);
        read_jsonl(&entities_path, |line, record: EntityRecord| {
            let added = match kb.add_entity(&record.id, record.freq, record.vector) {
                Ok(true) => Ok(()),
                Ok(false) => Err(KbError::DuplicateEntity(record.id)),
                Err(e) => Err(e),
            };
            added.map_err(|e| malformed(&entities_path, line, e))
        })?;

        let aliases_path = dir.join(ALIASES_FILE);
        read_jsonl(&aliases_path, |line, record: AliasRecord| {
            kb.add_alias(&record.alias, &record.entities[..], &record.probabilities)
                .map(|_| ())
                .map_err(|e| malformed(&aliases_path, line, e))
        })?;

        Ok(kb)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct KbMeta {
    format_version: u32,
    entity_vector_length: usize,
    n_entities: usize,
    n_aliases: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntityRecord {
    id: String,
    freq: u64,
    vector: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AliasRecord {
    alias: String,
    entities: Vec<String>,
    probabilities: Vec<f32>,
}

fn malformed(path: &Path, line: usize, e: KbError) -> Error {
    Error::MalformedLine {
        path: path.to_path_buf(),
        line,
        message: e.to_string(),
    }
}

fn write_jsonl<T: Serialize>(path: &Path, records: impl Iterator<Item = T>) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n").map_err(|e| Error::io(path, e))?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}

fn read_jsonl<T, F>(path: &Path, mut f: F) -> Result<()>
where
    T: for<'de> Deserialize<'de>,
    F: FnMut(usize, T) -> Result<()>,
{
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::io(path, e))?;
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| Error::MalformedLine {
            path: path.to_path_buf(),
            line: i + 1,
            message: e.to_string(),
        })?;
        f(i + 1, record)?;
    }
    Ok(())
}
