//! # Tabela de Vetores de Palavras
//!
//! Lê e grava tabelas no formato texto do word2vec/GloVe:
//!
//! ```text
//! 3 4            <- cabeçalho opcional "<linhas> <largura>"
//! paris 0.1 0.2 0.3 0.4
//! city 0.0 0.5 0.1 0.2
//! ...
//! ```
//!
//! Os vetores ficam num único buffer contíguo (`rows * width`), e o
//! vocabulário mapeia cada palavra para a sua linha.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Tabela palavra → vetor de largura fixa.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorTable {
    width: usize,
    words: Vec<String>,
    index: HashMap<String, usize>,
    data: Vec<f32>,
}

impl VectorTable {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Largura dos vetores (dimensão do espaço).
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Adiciona uma linha. Palavras repetidas mantêm o primeiro vetor.
    pub fn add(&mut self, word: impl Into<String>, vector: &[f32]) -> Result<bool> {
        let word = word.into();
        if vector.len() != self.width {
            return Err(Error::VectorsModel(format!(
                "vetor de '{word}' tem largura {}, esperado {}",
                vector.len(),
                self.width
            )));
        }
        if let Some(position) = vector.iter().position(|v| !v.is_finite()) {
            return Err(Error::VectorsModel(format!(
                "vetor de '{word}' tem valor não finito na posição {position}"
            )));
        }
        if self.index.contains_key(&word) {
            debug!("palavra repetida na tabela de vetores: '{word}'");
            return Ok(false);
        }
        self.index.insert(word.clone(), self.words.len());
        self.words.push(word);
        self.data.extend_from_slice(vector);
        Ok(true)
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.index.get(word).map(|&row| {
            let start = row * self.width;
            &self.data[start..start + self.width]
        })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Lê uma tabela em formato texto. A largura vem do cabeçalho ou da primeira linha.
    ///
    /// Uma primeira linha com dois inteiros só é cabeçalho se a largura declarada
    /// bater com a da linha seguinte; caso contrário é a linha de uma tabela de
    /// largura 1 cuja palavra é numérica.
    pub fn load_text(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let reader = BufReader::new(file);
        let mut table: Option<VectorTable> = None;
        let mut pending_header: Option<(String, String)> = None;

        for (i, line) in reader.lines().enumerate() {
            let line_no = i + 1;
            let line = line.map_err(|e| Error::io(path, e))?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let rest: Vec<&str> = fields.collect();

            if line_no == 1 && rest.len() == 1 && is_header(word, rest[0]) {
                pending_header = Some((word.to_string(), rest[0].to_string()));
                continue;
            }

            let vector = parse_row(path, line_no, &rest)?;

            if let Some((first, declared)) = pending_header.take() {
                if declared.parse::<usize>().ok() == Some(vector.len()) {
                    table = Some(VectorTable::new(vector.len()));
                } else {
                    let first_vector = parse_row(path, 1, &[declared.as_str()])?;
                    add_row(&mut table, path, 1, &first, &first_vector)?;
                }
            }
            add_row(&mut table, path, line_no, word, &vector)?;
        }

        if let Some((first, declared)) = pending_header {
            let first_vector = parse_row(path, 1, &[declared.as_str()])?;
            add_row(&mut table, path, 1, &first, &first_vector)?;
        }

        match table {
            Some(table) if table.width > 0 => Ok(table),
            _ => Err(Error::VectorsModel(format!(
                "tabela de vetores vazia: {}",
                path.display()
            ))),
        }
    }

    /// Grava a tabela em formato texto, com cabeçalho.
    pub fn save_text(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        let mut write = || -> std::io::Result<()> {
            writeln!(writer, "{} {}", self.len(), self.width)?;
            for (row, word) in self.words.iter().enumerate() {
                write!(writer, "{word}")?;
                for v in &self.data[row * self.width..(row + 1) * self.width] {
                    write!(writer, " {v}")?;
                }
                writeln!(writer)?;
            }
            writer.flush()
        };
        write().map_err(|e| Error::io(path, e))
    }
}

fn is_header(rows: &str, width: &str) -> bool {
    rows.parse::<usize>().is_ok() && width.parse::<usize>().is_ok()
}

fn parse_row(path: &Path, line: usize, fields: &[&str]) -> Result<Vec<f32>> {
    fields
        .iter()
        .map(|v| v.parse::<f32>())
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|e| Error::MalformedLine {
            path: path.to_path_buf(),
            line,
            message: e.to_string(),
        })
}

fn add_row(
    table: &mut Option<VectorTable>,
    path: &Path,
    line: usize,
    word: &str,
    vector: &[f32],
) -> Result<()> {
    let target = table.get_or_insert_with(|| VectorTable::new(vector.len()));
    target.add(word, vector).map_err(|e| Error::MalformedLine {
        path: path.to_path_buf(),
        line,
        message: e.to_string(),
    })?;
    Ok(())
}
