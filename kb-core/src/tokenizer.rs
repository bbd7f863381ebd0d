//! # Tokenizador do Pipeline de Vetores
//!
//! Divide a descrição de uma entidade em tokens cujo vetor será buscado na
//! tabela de vetores. Cada token preserva sua posição original no texto
//! (offset em bytes).
//!
//! ## Esquema de Tokenização
//!
//! - **Standard**: fronteiras de palavra Unicode (UAX #29). Pontuação vira token
//!   próprio, espaços são descartados.
//! - **Whitespace**: apenas separa por espaços em branco. Útil para tabelas de
//!   vetores treinadas sobre texto já tokenizado.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use kb_core::tokenizer::{tokenize_with_mode, TokenizerMode};
//!
//! let tokens = tokenize_with_mode("Paris, capital.", TokenizerMode::Standard);
//! let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(texts, vec!["Paris", ",", "capital", "."]);
//! ```

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Um token extraído do texto original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "Paris", ",").
    pub text: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token na lista (0, 1, 2...).
    pub index: usize,
}

/// Estratégias de tokenização disponíveis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerMode {
    /// Fronteiras de palavra Unicode (UAX #29).
    #[default]
    Standard,
    /// Separação apenas por espaços em branco.
    Whitespace,
}

/// Tokeniza um texto usando o modo padrão.
pub fn tokenize(text: &str) -> Vec<Token> {
    tokenize_with_mode(text, TokenizerMode::Standard)
}

/// Tokeniza um texto com o modo especificado.
pub fn tokenize_with_mode(text: &str, mode: TokenizerMode) -> Vec<Token> {
    let pieces: Vec<(usize, &str)> = match mode {
        TokenizerMode::Standard => text
            .split_word_bound_indices()
            .filter(|(_, s)| !s.trim().is_empty())
            .collect(),
        TokenizerMode::Whitespace => text
            .split_whitespace()
            .map(|s| (s.as_ptr() as usize - text.as_ptr() as usize, s))
            .collect(),
    };

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, (start, s))| Token {
            text: s.to_string(),
            start,
            end: start + s.len(),
            index,
        })
        .collect()
}
