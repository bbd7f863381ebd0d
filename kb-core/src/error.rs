//! Erros do kb-core.

use std::path::PathBuf;

use thiserror::Error;

/// Erros que podem ocorrer durante a construção, consulta ou persistência da KB.
#[derive(Error, Debug)]
pub enum Error {
    /// Erro de I/O (arquivo ausente, permissão, disco cheio).
    #[error("Erro de I/O em {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Erro de serialização JSON fora de um arquivo JSONL.
    #[error("Erro de serialização: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Erro ao escrever o CSV de descrições.
    #[error("Erro de CSV: {0}")]
    Csv(#[from] csv::Error),
    /// Linha malformada em um arquivo de entrada (JSONL ou tabela de vetores).
    #[error("Linha {line} malformada em {path}: {message}")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        message: String,
    },
    /// Violação das regras da base de conhecimento.
    #[error("Base de conhecimento inválida: {0}")]
    Kb(#[from] KbError),
    /// Modelo de vetores inconsistente ou incompleto.
    #[error("Modelo de vetores inválido: {0}")]
    VectorsModel(String),
    /// Configuração inválida (idioma, tamanho de lote...).
    #[error("Configuração inválida: {0}")]
    Config(String),
    /// Falha ao criar o pool de threads da inferência.
    #[error("Falha ao criar o pool de threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Atalho para embrulhar um `std::io::Error` com o caminho envolvido.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Regras violadas ao popular a [`KnowledgeBase`](crate::kb::KnowledgeBase).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KbError {
    #[error("listas de tamanhos diferentes: {entities} entidades, {vectors} vetores, {freqs} frequências")]
    EntityListMismatch {
        entities: usize,
        vectors: usize,
        freqs: usize,
    },
    #[error("vetor da entidade '{entity}' tem tamanho {found}, esperado {expected}")]
    VectorLength {
        entity: String,
        expected: usize,
        found: usize,
    },
    #[error("vetor da entidade '{entity}' tem valor não finito na posição {position}")]
    NonFiniteVector { entity: String, position: usize },
    #[error("entidade duplicada: '{0}'")]
    DuplicateEntity(String),
    #[error("alias '{alias}': {entities} entidades para {probabilities} probabilidades")]
    AliasListMismatch {
        alias: String,
        entities: usize,
        probabilities: usize,
    },
    #[error("alias '{alias}' aponta para entidade desconhecida '{entity}'")]
    UnknownEntity { alias: String, entity: String },
    #[error("alias '{alias}' tem probabilidade inválida {prob} para '{entity}'")]
    InvalidProbability {
        alias: String,
        entity: String,
        prob: f32,
    },
    #[error("alias '{alias}': soma das probabilidades {sum} excede 1")]
    ProbabilitySum { alias: String, sum: f32 },
}

/// Result type alias para o kb-core.
pub type Result<T> = std::result::Result<T, Error>;
