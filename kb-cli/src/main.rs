//! `create-kb`: constrói a base de conhecimento e grava os artefatos por idioma.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use kb_core::{BuildConfig, BuildEvent, KbBuilder};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "create-kb", about = "Cria a base de conhecimento e grava em disco")]
struct Args {
    /// Diretório do modelo com os vetores de palavras
    vectors_model: PathBuf,

    /// Idioma (ex: en, pt)
    language: String,

    /// Número de threads da inferência (<= 0 usa todos os núcleos)
    #[arg(allow_negative_numbers = true)]
    n_process: i32,

    /// Raiz dos dados do extrator Wikipedia/Wikidata
    #[arg(long, env = "KB_WIKI_DIR", default_value = "wiki")]
    wiki_dir: PathBuf,

    /// Raiz da saída; os artefatos vão para <output-dir>/<idioma>/
    #[arg(long, env = "KB_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Descrições por lote de inferência
    #[arg(long, default_value_t = kb_core::config::DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = BuildConfig::new(
        args.vectors_model,
        args.language,
        args.n_process,
        args.wiki_dir,
        args.output_dir,
    );
    config.batch_size = args.batch_size;

    let builder = KbBuilder::new(config);
    let (tx, rx) = mpsc::channel();

    // Os eventos são registrados enquanto a construção roda
    let logger = thread::spawn(move || {
        for event in rx {
            log_event(&event);
        }
    });

    let result = builder.run_streaming(tx);
    let _ = logger.join();

    let report = result.with_context(|| {
        format!(
            "falha ao construir a base de conhecimento para '{}'",
            builder.config().language
        )
    })?;
    info!(
        "{} entidades, {} aliases naturais, {} sintéticos em {} ms",
        report.entities, report.natural_aliases, report.synthetic_aliases, report.processing_ms
    );
    Ok(())
}

fn log_event(event: &BuildEvent) {
    match event {
        BuildEvent::EntitiesLoaded { total } => info!("{total} entidades carregadas"),
        BuildEvent::AliasesLoaded { total } => info!("{total} aliases carregados"),
        BuildEvent::DescriptionsResolved { total } => info!("{total} descrições resolvidas"),
        BuildEvent::EmbeddingProgress { done, total } => {
            info!("Inferindo vetores das entidades: {done}/{total}")
        }
        BuildEvent::EntitiesRegistered {
            total,
            vector_length,
        } => info!("{total} entidades registradas (vetores de largura {vector_length})"),
        BuildEvent::AliasesRegistered {
            natural,
            synthetic,
            skipped,
        } => info!("aliases: {natural} naturais, {synthetic} sintéticos, {skipped} ignorados"),
        BuildEvent::Persisted {
            kb_dir,
            nlp_dir,
            descriptions_csv,
        } => info!(
            "KB em {}, pipeline em {}, descrições em {}",
            kb_dir.display(),
            nlp_dir.display(),
            descriptions_csv.display()
        ),
        BuildEvent::Done { report } => debug!("relatório: {report:?}"),
        // O erro sobe por `main` com o contexto completo
        BuildEvent::Error { message } => debug!("construção abortada: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_args() {
        let args = Args::try_parse_from(["create-kb", "models/en", "en", "4"]).unwrap();
        assert_eq!(args.vectors_model, PathBuf::from("models/en"));
        assert_eq!(args.language, "en");
        assert_eq!(args.n_process, 4);
        assert_eq!(args.batch_size, kb_core::config::DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_negative_process_count_and_flags() {
        let args = Args::try_parse_from([
            "create-kb",
            "models/pt",
            "pt",
            "-1",
            "--output-dir",
            "/tmp/out",
            "--batch-size",
            "64",
        ])
        .unwrap();
        assert_eq!(args.n_process, -1);
        assert_eq!(args.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(args.batch_size, 64);
    }

    #[test]
    fn test_missing_args_rejected() {
        assert!(Args::try_parse_from(["create-kb", "models/en"]).is_err());
    }
}
