//! # kb-core: Base de Conhecimento para Entity Linking
//!
//! Este crate constrói a base de conhecimento (KB) usada para desambiguar
//! menções de entidades em texto: um índice de aliases (textos de superfície)
//! para entidades candidatas, cada candidato com uma probabilidade a priori,
//! e cada entidade com um vetor semântico e uma frequência.
//!
//! ## Arquitetura do Sistema
//!
//! A construção é um pipeline linear, sem desvios nem novas tentativas:
//!
//! 1.  **Carga** ([`wiki`]): entidades e priors de aliases produzidos pelo extrator Wikipedia/Wikidata.
//! 2.  **Descrições** ([`description`]): descrição > início do artigo > nome.
//! 3.  **Inferência** ([`pipeline`]): tokenização ([`tokenizer`]) e média dos vetores de palavras ([`vectors`]).
//! 4.  **KB** ([`kb`]): entidades, aliases naturais e aliases sintéticos `_<id>_`.
//! 5.  **Persistência** ([`persist`]): `kb/`, `nlp/` e `descriptions.csv` em `<saída>/<idioma>/`.
//!
//! O [`builder`] orquestra os passos e emite [`BuildEvent`]s de progresso.
//!
//! ## Exemplo de Uso
//!
//! ```rust,no_run
//! use kb_core::{BuildConfig, KbBuilder};
//!
//! let config = BuildConfig::new("models/en_vectors", "en", 4, "wiki", "output");
//! let report = KbBuilder::new(config).run()?;
//! println!("{} entidades, {} aliases", report.entities, report.natural_aliases);
//! # Ok::<(), kb_core::Error>(())
//! ```
//!
//! ## Consulta
//!
//! ```rust,no_run
//! use kb_core::KnowledgeBase;
//!
//! let kb = KnowledgeBase::from_disk("output/en/kb".as_ref())?;
//! for candidate in kb.get_candidates("Paris") {
//!     println!("{} ({:.2})", candidate.entity, candidate.prior_prob);
//! }
//! # Ok::<(), kb_core::Error>(())
//! ```

pub mod builder;
pub mod config;
pub mod description;
pub mod device;
pub mod entity;
pub mod error;
pub mod kb;
pub mod persist;
pub mod pipeline;
pub mod tokenizer;
pub mod vectors;
pub mod wiki;

pub use builder::{BuildEvent, BuildReport, KbBuilder};
pub use config::BuildConfig;
pub use entity::{AliasPriors, Entity, EntityStore};
pub use error::{Error, KbError, Result};
pub use kb::{synthetic_alias, AliasOutcome, Candidate, KnowledgeBase};
pub use pipeline::VectorPipeline;
