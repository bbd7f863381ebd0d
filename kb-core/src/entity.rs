//! # Entidades e Priors de Aliases
//!
//! Tipos somente-leitura carregados uma única vez a partir do extrator
//! Wikipedia/Wikidata ([`crate::wiki`]).
//!
//! A ordem de iteração importa: os vetores inferidos, o registro na KB e as
//! linhas do `descriptions.csv` seguem a ordem em que as entidades foram lidas.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::KbError;

/// Uma entidade do mundo real (pessoa, lugar, conceito).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Identificador único, ex: QID do Wikidata ("Q90").
    pub id: String,
    /// Nome de exibição.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Trecho do artigo da Wikipedia.
    #[serde(default)]
    pub article_text: Option<String>,
    /// Frequência de ocorrência, usada como peso a priori.
    #[serde(default)]
    pub count: u64,
}

impl Entity {
    /// Descrição explícita, quando presente e não vazia.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    /// Texto do artigo, quando presente e não vazio.
    pub fn article_text(&self) -> Option<&str> {
        self.article_text.as_deref().filter(|t| !t.is_empty())
    }
}

/// Mapa id → [`Entity`] que preserva a ordem de inserção.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insere uma entidade. Ids duplicados são erro de quem chama.
    pub fn insert(&mut self, entity: Entity) -> Result<(), KbError> {
        if self.index.contains_key(&entity.id) {
            return Err(KbError::DuplicateEntity(entity.id));
        }
        self.index.insert(entity.id.clone(), self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Itera na ordem de carga.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.id.as_str())
    }
}

/// Um candidato de um alias: (id da entidade, probabilidade a priori).
pub type EntityPrior = (String, f32);

/// Tabela alias → lista ordenada de (entidade, prior), na ordem de carga.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasPriors {
    entries: Vec<(String, Vec<EntityPrior>)>,
}

impl AliasPriors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, alias: impl Into<String>, priors: Vec<EntityPrior>) {
        self.entries.push((alias.into(), priors));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[EntityPrior])> {
        self.entries
            .iter()
            .map(|(alias, priors)| (alias.as_str(), priors.as_slice()))
    }
}
