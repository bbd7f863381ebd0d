//! Construção completa sobre um diretório temporário: extrator → KB → disco.

use std::fs;
use std::path::Path;
use std::sync::mpsc;

use kb_core::pipeline::VectorPipeline;
use kb_core::{synthetic_alias, BuildConfig, BuildEvent, Error, KbBuilder, KnowledgeBase};

fn write_fixture(root: &Path) -> BuildConfig {
    let article = "Long article...".repeat(20);
    let wiki = root.join("wiki").join("en");
    fs::create_dir_all(&wiki).unwrap();
    fs::write(
        wiki.join("entities.jsonl"),
        format!(
            "{}\n{}\n{}\n{}\n",
            r#"{"id":"Q1","name":"Paris","description":"A city.","article_text":"Paris is...","count":120}"#,
            serde_json::json!({"id": "Q2", "name": "Bar", "article_text": article, "count": 7}),
            r#"{"id":"Q3","name":"Foo","count":2}"#,
            r#"{"id":"Q4","name":"Paris Hilton","description":"A person.","count":30}"#,
        ),
    )
    .unwrap();
    fs::write(
        wiki.join("aliases.jsonl"),
        concat!(
            r#"{"alias":"paris","entity_id":"Q1","count":9}"#, "\n",
            r#"{"alias":"paris","entity_id":"Q4","count":1}"#, "\n",
            r#"{"alias":"foo","entity_id":"Q3","count":4}"#, "\n",
            r#"{"alias":"_Q3_","entity_id":"Q4","count":1}"#, "\n",
        ),
    )
    .unwrap();

    let model = root.join("model");
    fs::create_dir_all(&model).unwrap();
    fs::write(
        model.join("config.json"),
        r#"{"lang":"en","name":"test_vectors","lowercase_fallback":true}"#,
    )
    .unwrap();
    fs::write(
        model.join("vectors.txt"),
        "4 2\na 1 0\ncity 0 1\nfoo 1 1\nperson 0 0.5\n",
    )
    .unwrap();

    let mut config = BuildConfig::new(model, "en", 2, root.join("wiki"), root.join("output"));
    config.batch_size = 3;
    config
}

#[test]
fn test_full_build_writes_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());
    let report = KbBuilder::new(config.clone()).run().unwrap();

    assert_eq!(report.entities, 4);
    assert_eq!(report.natural_aliases, 3);
    // `_Q3_` já existia como alias natural
    assert_eq!(report.synthetic_aliases, 3);
    assert_eq!(report.skipped_aliases, 1);
    assert_eq!(report.vector_length, 2);

    let kb = KnowledgeBase::from_disk(&config.kb_dir()).unwrap();
    assert_eq!(kb.n_entities(), 4);
    assert_eq!(kb.n_aliases(), 6);

    let paris = kb.get_alias_candidates("paris");
    let pairs: Vec<(&str, f32)> = paris.iter().map(|c| (c.entity.as_str(), c.prior_prob)).collect();
    assert_eq!(pairs, vec![("Q1", 0.9), ("Q4", 0.1)]);

    for id in ["Q1", "Q2", "Q4"] {
        let candidates = kb.get_alias_candidates(&synthetic_alias(id));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].entity, id);
        assert_eq!(candidates[0].prior_prob, 1.0);
    }
    // a colisão mantém o alias natural
    assert_eq!(kb.get_alias_candidates("_Q3_")[0].entity, "Q4");

    assert_eq!(kb.get_frequency("Q1"), Some(120));
    let ids: Vec<&str> = kb.entity_ids().collect();
    assert_eq!(ids, vec!["Q1", "Q2", "Q3", "Q4"]);

    // "A city." -> (a + city + ".") / 3
    let q1 = kb.get_vector("Q1").unwrap();
    assert!((q1[0] - 1.0 / 3.0).abs() < 1e-6 && (q1[1] - 1.0 / 3.0).abs() < 1e-6);
    assert_eq!(kb.get_vector("Q3"), Some(&[1.0, 1.0][..]));
    // "A person." -> (a + person + ".") / 3
    let q4 = kb.get_vector("Q4").unwrap();
    assert!((q4[0] - 1.0 / 3.0).abs() < 1e-6 && (q4[1] - 0.5 / 3.0).abs() < 1e-6);

    let nlp = VectorPipeline::load(&config.nlp_dir()).unwrap();
    assert_eq!(nlp.meta().docs_processed, 4);
    assert_eq!(nlp.vectors_length(), 2);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(config.descriptions_path())
        .unwrap();
    let rows: Vec<(String, String)> = reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].to_string(), r[1].to_string())
        })
        .collect();
    let article = "Long article...".repeat(20);
    assert_eq!(
        rows,
        vec![
            ("Q1".to_string(), "A city.".to_string()),
            ("Q2".to_string(), article[..200].to_string()),
            ("Q3".to_string(), "Foo".to_string()),
            ("Q4".to_string(), "A person.".to_string()),
        ]
    );
}

#[test]
fn test_events_follow_pipeline_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());
    let (tx, rx) = mpsc::channel();
    KbBuilder::new(config).run_streaming(tx).unwrap();

    let events: Vec<BuildEvent> = rx.try_iter().collect();
    let names: Vec<&str> = events
        .iter()
        .map(|e| match e {
            BuildEvent::EntitiesLoaded { .. } => "entities",
            BuildEvent::AliasesLoaded { .. } => "aliases",
            BuildEvent::DescriptionsResolved { .. } => "descriptions",
            BuildEvent::EmbeddingProgress { .. } => "embedding",
            BuildEvent::EntitiesRegistered { .. } => "registered",
            BuildEvent::AliasesRegistered { .. } => "aliases_registered",
            BuildEvent::Persisted { .. } => "persisted",
            BuildEvent::Done { .. } => "done",
            BuildEvent::Error { .. } => "error",
        })
        .collect();
    assert_eq!(
        names,
        vec![
            "entities",
            "aliases",
            "descriptions",
            "embedding",
            "embedding",
            "registered",
            "aliases_registered",
            "persisted",
            "done",
        ]
    );
    assert!(matches!(
        events[4],
        BuildEvent::EmbeddingProgress { done: 4, total: 4 }
    ));
}

#[test]
fn test_invalid_alias_probabilities_abort_before_persisting() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());
    fs::write(
        dir.path().join("wiki/en/aliases.jsonl"),
        concat!(
            r#"{"alias":"x","entity_id":"Q1","prior_prob":0.8}"#, "\n",
            r#"{"alias":"x","entity_id":"Q2","prior_prob":0.7}"#, "\n",
        ),
    )
    .unwrap();

    let result = KbBuilder::new(config.clone()).run();
    assert!(matches!(result, Err(Error::Kb(_))));
    assert!(!config.language_dir().exists());
}

#[test]
fn test_unknown_alias_entity_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());
    fs::write(
        dir.path().join("wiki/en/aliases.jsonl"),
        concat!(r#"{"alias":"x","entity_id":"Q99","count":1}"#, "\n"),
    )
    .unwrap();
    assert!(matches!(
        KbBuilder::new(config).run(),
        Err(Error::Kb(kb_core::KbError::UnknownEntity { .. }))
    ));
}

#[test]
fn test_missing_language_data_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_fixture(dir.path());
    config.language = "pt".to_string();
    assert!(matches!(KbBuilder::new(config).run(), Err(Error::Io { .. })));
}

#[test]
fn test_non_finite_word_vector_aborts_before_persisting() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path());
    fs::write(
        config.vectors_model.join("vectors.txt"),
        "2 2\ncity 0 1\nodd nan 1\n",
    )
    .unwrap();

    assert!(matches!(
        KbBuilder::new(config.clone()).run(),
        Err(Error::MalformedLine { line: 3, .. })
    ));
    assert!(!config.kb_dir().exists());
}
