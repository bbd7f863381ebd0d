//! # Leitura dos Dados do Extrator Wikipedia/Wikidata
//!
//! O extrator (colaborador externo) grava, por idioma, dois arquivos JSONL em
//! `<wiki_dir>/<idioma>/`:
//!
//! - `entities.jsonl`: `{"id", "name", "description"?, "article_text"?, "count"?}`
//! - `aliases.jsonl`: `{"alias", "entity_id", "count"}` ou `{"alias", "entity_id", "prior_prob"}`
//!
//! As contagens de um alias viram probabilidades a priori `count / soma(counts)`,
//! logo a soma por alias nunca passa de 1.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{validate_language, wiki_language_dir};
use crate::entity::{AliasPriors, Entity, EntityStore};
use crate::error::{Error, Result};

pub const ENTITIES_FILE: &str = "entities.jsonl";
pub const ALIASES_FILE: &str = "aliases.jsonl";

/// Fonte de dados do extrator, enraizada em um diretório.
#[derive(Debug, Clone)]
pub struct WikiSource {
    root: PathBuf,
}

impl WikiSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Carrega a tabela de entidades do idioma, na ordem do arquivo.
    pub fn load_entities(&self, language: &str) -> Result<EntityStore> {
        validate_language(language)?;
        let path = wiki_language_dir(&self.root, language).join(ENTITIES_FILE);
        let mut store = EntityStore::new();

        for_each_record(&path, |line, entity: Entity| {
            store.insert(entity).map_err(|e| Error::MalformedLine {
                path: path.clone(),
                line,
                message: e.to_string(),
            })
        })?;

        info!("{} entidades carregadas de {}", store.len(), path.display());
        Ok(store)
    }

    /// Carrega a tabela alias → [(entidade, prior)] do idioma.
    pub fn load_alias_entity_prior_probabilities(&self, language: &str) -> Result<AliasPriors> {
        validate_language(language)?;
        let path = wiki_language_dir(&self.root, language).join(ALIASES_FILE);
        let mut table = AliasTable::default();

        for_each_record(&path, |line, row: AliasRow| {
            table.add(row).map_err(|message| Error::MalformedLine {
                path: path.clone(),
                line,
                message,
            })
        })?;

        let priors = table.into_priors();
        info!("{} aliases carregados de {}", priors.len(), path.display());
        Ok(priors)
    }
}

#[derive(Debug, Deserialize)]
struct AliasRow {
    alias: String,
    entity_id: String,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    prior_prob: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Weight {
    Count,
    Prior,
}

/// Acumulador que agrupa as linhas por alias preservando a ordem de aparição.
#[derive(Debug, Default)]
struct AliasTable {
    aliases: Vec<AliasGroup>,
    index: HashMap<String, usize>,
}

#[derive(Debug)]
struct AliasGroup {
    alias: String,
    weight: Weight,
    entities: Vec<(String, f64)>,
}

impl AliasTable {
    fn add(&mut self, row: AliasRow) -> std::result::Result<(), String> {
        let (weight, value) = match (row.count, row.prior_prob) {
            (Some(count), None) => (Weight::Count, count as f64),
            (None, Some(prob)) => (Weight::Prior, prob as f64),
            (Some(_), Some(_)) => return Err("linha com 'count' e 'prior_prob' ao mesmo tempo".into()),
            (None, None) => return Err("linha sem 'count' nem 'prior_prob'".into()),
        };

        let existing = self.index.get(&row.alias).copied();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                self.index.insert(row.alias.clone(), self.aliases.len());
                self.aliases.push(AliasGroup {
                    alias: row.alias.clone(),
                    weight,
                    entities: Vec::new(),
                });
                self.aliases.len() - 1
            }
        };

        let group = &mut self.aliases[slot];
        if group.weight != weight {
            return Err(format!("alias '{}' mistura 'count' e 'prior_prob'", row.alias));
        }
        match group.entities.iter().position(|(id, _)| *id == row.entity_id) {
            Some(i) => group.entities[i].1 += value,
            None => group.entities.push((row.entity_id, value)),
        }
        Ok(())
    }

    fn into_priors(self) -> AliasPriors {
        let mut priors = AliasPriors::new();
        for group in self.aliases {
            match group.weight {
                Weight::Prior => {
                    let list = group
                        .entities
                        .into_iter()
                        .map(|(id, p)| (id, p as f32))
                        .collect();
                    priors.push(group.alias, list);
                }
                Weight::Count => {
                    let total: f64 = group.entities.iter().map(|(_, c)| c).sum();
                    if total <= 0.0 {
                        debug!("alias '{}' sem ocorrências, descartado", group.alias);
                        continue;
                    }
                    let list = group
                        .entities
                        .into_iter()
                        .map(|(id, c)| (id, (c / total) as f32))
                        .collect();
                    priors.push(group.alias, list);
                }
            }
        }
        priors
    }
}

/// Lê um arquivo JSONL registro a registro; linhas em branco são ignoradas.
fn for_each_record<T, F>(path: &Path, mut f: F) -> Result<()>
where
    T: DeserializeOwned,
    F: FnMut(usize, T) -> Result<()>,
{
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = BufReader::new(file);

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|e| Error::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: T = serde_json::from_str(&line).map_err(|e| Error::MalformedLine {
            path: path.to_path_buf(),
            line: line_no,
            message: e.to_string(),
        })?;
        f(line_no, record)?;
    }
    Ok(())
}
