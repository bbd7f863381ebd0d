//! # Resolução de Descrições
//!
//! Cada entidade recebe um único texto representativo, que alimenta a
//! inferência de vetores e o `descriptions.csv`. Prioridade:
//!
//! 1. Descrição explícita (não vazia).
//! 2. Primeiros `max_chars` caracteres do artigo (não vazio).
//! 3. Nome da entidade.

use crate::entity::{Entity, EntityStore};

/// Par (id da entidade, descrição resolvida), na ordem do [`EntityStore`].
pub type ResolvedDescription = (String, String);

/// Escolhe o texto representativo de uma entidade.
///
/// O truncamento conta caracteres Unicode, não bytes.
pub fn resolve_description(entity: &Entity, max_chars: usize) -> String {
    if let Some(description) = entity.description() {
        description.to_string()
    } else if let Some(article) = entity.article_text() {
        article.chars().take(max_chars).collect()
    } else {
        entity.name.clone()
    }
}

/// Resolve as descrições de todas as entidades, preservando a ordem de carga.
pub fn resolve_descriptions(store: &EntityStore, max_chars: usize) -> Vec<ResolvedDescription> {
    store
        .iter()
        .map(|e| (e.id.clone(), resolve_description(e, max_chars)))
        .collect()
}
