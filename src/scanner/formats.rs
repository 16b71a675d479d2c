//! Parsers for population files.

use super::{display_name, LoadedDeme};
use crate::error::LoadError;
use crate::models::{Deme, Individual};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Parse a plain-text population: one genome per line.
///
/// Each line is either `fitness` or `id fitness`, separated by a comma, tab
/// or spaces. Blank lines and `#` comments are skipped, as is an
/// `id,fitness` header. Genomes without an id are named `<stem>#<line>`.
pub fn parse_text(path: &Path, content: &str) -> Result<LoadedDeme, LoadError> {
    let stem = file_stem(path);
    let mut deme = Deme::new(display_name(path));

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();

        let (id, value) = match fields.as_slice() {
            [value] => (format!("{}#{}", stem, line_no), *value),
            [id, value] => {
                if value.eq_ignore_ascii_case("fitness") {
                    continue;
                }
                (id.to_string(), *value)
            }
            _ => {
                return Err(LoadError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    value: line.to_string(),
                })
            }
        };

        let fitness: f64 = value.parse().map_err(|_| LoadError::Parse {
            path: path.to_path_buf(),
            line: line_no,
            value: value.to_string(),
        })?;

        deme.push_genome(Arc::new(Individual::new(id, fitness)));
    }

    Ok(deme)
}

/// A JSON population document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Document {
    Fitness(f64),
    Genome { id: String, fitness: f64 },
    Named { name: String, members: Vec<Document> },
    List(Vec<Document>),
}

/// Parse a JSON population.
///
/// Accepts a number, an `{ "id", "fitness" }` object, an array of documents,
/// or an `{ "name", "members" }` object. Arrays and named objects become
/// demes; bare numbers are named `<stem>#<index>`.
pub fn parse_json(path: &Path, content: &str) -> Result<LoadedDeme, LoadError> {
    let document: Document = serde_json::from_str(content).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let stem = file_stem(path);
    let name = display_name(path);

    Ok(match document {
        Document::Named { name, members } => build_deme(name, &stem, members),
        Document::List(members) => build_deme(name, &stem, members),
        single => build_deme(name, &stem, vec![single]),
    })
}

fn build_deme(name: String, stem: &str, members: Vec<Document>) -> LoadedDeme {
    let mut deme = Deme::new(name);

    for (idx, member) in members.into_iter().enumerate() {
        match member {
            Document::Fitness(fitness) => {
                deme.push_genome(Arc::new(Individual::new(format!("{}#{}", stem, idx), fitness)))
            }
            Document::Genome { id, fitness } => {
                deme.push_genome(Arc::new(Individual::new(id, fitness)))
            }
            Document::Named { name, members } => deme.push_deme(build_deme(name, stem, members)),
            Document::List(members) => {
                let name = format!("{}[{}]", deme.name, idx);
                deme.push_deme(build_deme(name, stem, members));
            }
        }
    }

    deme
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "genome".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genome, Member};

    fn genomes(deme: &LoadedDeme) -> Vec<(String, f64)> {
        deme.members
            .iter()
            .filter_map(|m| match m {
                Member::Genome(g) => Some((g.id.clone(), g.fitness())),
                Member::Deme(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_text_formats() {
        let content = "# comment\nid,fitness\n1.5\na,2\nb\t3\n  c   4.25  \n";
        let deme = parse_text(Path::new("gen/pop.csv"), content).unwrap();

        assert_eq!(deme.name, "pop.csv");
        assert_eq!(
            genomes(&deme),
            vec![
                ("pop#3".to_string(), 1.5),
                ("a".to_string(), 2.0),
                ("b".to_string(), 3.0),
                ("c".to_string(), 4.25),
            ]
        );
    }

    #[test]
    fn test_parse_text_accepts_non_finite() {
        let deme = parse_text(Path::new("p.txt"), "inf\n-inf\nNaN\n").unwrap();
        let values: Vec<f64> = genomes(&deme).into_iter().map(|(_, f)| f).collect();
        assert_eq!(values[0], f64::INFINITY);
        assert_eq!(values[1], f64::NEG_INFINITY);
        assert!(values[2].is_nan());
    }

    #[test]
    fn test_parse_text_rejects_extra_fields() {
        let err = parse_text(Path::new("p.txt"), "a 1 2\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_parse_json_nested() {
        let content = r#"{
            "name": "world",
            "members": [
                1.0,
                {"id": "alpha", "fitness": 2.0},
                {"name": "island", "members": [3.0, 4.0]},
                [5.0]
            ]
        }"#;
        let deme = parse_json(Path::new("w.json"), content).unwrap();

        assert_eq!(deme.name, "world");
        assert_eq!(deme.len(), 4);
        assert_eq!(deme.leaf_count(), 5);
        assert_eq!(
            genomes(&deme),
            vec![("w#0".to_string(), 1.0), ("alpha".to_string(), 2.0)]
        );
        match &deme.members[3] {
            Member::Deme(d) => assert_eq!(d.name, "world[3]"),
            Member::Genome(_) => panic!("expected nested deme"),
        }
    }

    #[test]
    fn test_parse_json_single_value() {
        let deme = parse_json(Path::new("one.json"), "7.5").unwrap();
        assert_eq!(deme.name, "one.json");
        assert_eq!(genomes(&deme), vec![("one#0".to_string(), 7.5)]);
    }

    #[test]
    fn test_parse_json_invalid() {
        let err = parse_json(Path::new("bad.json"), r#"{"oops": true}"#).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }
}
