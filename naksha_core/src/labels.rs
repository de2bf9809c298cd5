use crate::error::ClassifierError;
use serde::Serialize;
use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufRead},
    iter::Peekable,
    path::Path,
    str::Chars,
};

/// Class index to label mapping of a loaded model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// The five campus buildings of the standalone classifier.
    ///
    /// A general ImageNet classifier has 1000 outputs, so most of its top
    /// indices fall outside this table and surface as
    /// [`ClassifierError::LabelMapping`].
    pub fn campus_buildings() -> Self {
        Self::new(
            [
                "Main Building",
                "Library",
                "Science Block",
                "Engineering Block",
                "Cafeteria",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        )
    }

    /// One label per line, line number is the class index. Blank lines are
    /// skipped. Repeated labels are rejected since responses key
    /// probabilities by label.
    pub fn from_file(filepath: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(filepath)?;
        let reader = io::BufReader::new(file);
        let mut labels = Vec::new();

        for line_result in reader.lines() {
            let line = line_result?;
            let label = line.trim();
            if !label.is_empty() {
                labels.push(label.to_string());
            }
        }

        if labels.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Labels file contains no labels",
            ));
        }

        if let Some(label) = first_duplicate(&labels) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Labels file lists {:?} more than once", label),
            ));
        }

        Ok(Self::new(labels))
    }

    /// Parses the `names` metadata written by YOLO exporters, a Python dict
    /// literal such as `{0: 'library', 1: 'jubilee_hall'}`.
    pub fn from_names_metadata(names: &str) -> Result<Self, String> {
        let body = names
            .trim()
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| format!("Invalid names metadata: {}", names))?;

        let mut entries = Vec::new();
        let mut chars = body.chars().peekable();
        loop {
            skip_separators(&mut chars);
            if chars.peek().is_none() {
                break;
            }

            let index = parse_index(&mut chars)?;
            skip_whitespace(&mut chars);
            if chars.next() != Some(':') {
                return Err(format!("Expected ':' after class index {}", index));
            }
            skip_whitespace(&mut chars);
            let label = parse_quoted(&mut chars)?;
            entries.push((index, label));
        }

        entries.sort_by_key(|(index, _)| *index);
        for (position, (index, _)) in entries.iter().enumerate() {
            if *index != position {
                return Err(format!(
                    "Class indices are not contiguous: expected {}, found {}",
                    position, index
                ));
            }
        }

        if entries.is_empty() {
            return Err("Names metadata contains no labels".to_string());
        }

        let labels: Vec<String> = entries.into_iter().map(|(_, label)| label).collect();
        if let Some(label) = first_duplicate(&labels) {
            return Err(format!("Names metadata lists {:?} more than once", label));
        }

        Ok(Self::new(labels))
    }

    pub fn get(&self, index: usize) -> Result<&str, ClassifierError> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(ClassifierError::LabelMapping {
                index,
                table_len: self.labels.len(),
            })
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

fn first_duplicate(labels: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    labels
        .iter()
        .map(String::as_str)
        .find(|label| !seen.insert(*label))
}

fn skip_whitespace(chars: &mut Peekable<Chars>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn skip_separators(chars: &mut Peekable<Chars>) {
    while chars
        .next_if(|c| c.is_whitespace() || *c == ',')
        .is_some()
    {}
}

fn parse_index(chars: &mut Peekable<Chars>) -> Result<usize, String> {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
        .parse()
        .map_err(|_| format!("Invalid class index near '{}'", chars.clone().collect::<String>()))
}

fn parse_quoted(chars: &mut Peekable<Chars>) -> Result<String, String> {
    let quote = match chars.next() {
        Some(c @ ('\'' | '"')) => c,
        other => return Err(format!("Expected quoted label, found {:?}", other)),
    };

    let mut label = String::new();
    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some(escaped) => label.push(escaped),
                None => break,
            },
            Some(c) if c == quote => return Ok(label),
            Some(c) => label.push(c),
            None => break,
        }
    }

    Err(format!("Unterminated label '{}'", label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_campus_buildings() {
        let table = LabelTable::campus_buildings();

        assert_eq!(table.len(), 5);
        assert_eq!(table.get(0).unwrap(), "Main Building");
        assert_eq!(table.get(4).unwrap(), "Cafeteria");
    }

    #[test]
    fn test_get_out_of_range() {
        let table = LabelTable::campus_buildings();

        match table.get(5) {
            Err(ClassifierError::LabelMapping { index, table_len }) => {
                assert_eq!(index, 5);
                assert_eq!(table_len, 5);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "jubilee_hall").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  cravath_hall  ").unwrap();

        let table = LabelTable::from_file(file.path()).unwrap();

        assert_eq!(table.as_slice(), &["jubilee_hall", "cravath_hall"]);
    }

    #[test]
    fn test_from_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let err = LabelTable::from_file(file.path()).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_from_file_rejects_duplicate_labels() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "library").unwrap();
        writeln!(file, "jubilee_hall").unwrap();
        writeln!(file, " library").unwrap();

        let err = LabelTable::from_file(file.path()).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("library"));
    }

    #[test]
    fn test_from_names_metadata() {
        let table =
            LabelTable::from_names_metadata("{1: \"cravath's hall\", 0: 'jubilee_hall', 2: 'library'}")
                .unwrap();

        assert_eq!(
            table.as_slice(),
            &["jubilee_hall", "cravath's hall", "library"]
        );
    }

    #[test]
    fn test_from_names_metadata_escaped_quote() {
        let table = LabelTable::from_names_metadata(r"{0: 'fisk\'s chapel'}").unwrap();

        assert_eq!(table.get(0).unwrap(), "fisk's chapel");
    }

    #[test]
    fn test_from_names_metadata_rejects_gaps() {
        let result = LabelTable::from_names_metadata("{0: 'a', 2: 'c'}");

        assert!(result.is_err());
    }

    #[test]
    fn test_from_names_metadata_rejects_duplicate_labels() {
        let result = LabelTable::from_names_metadata("{0: 'library', 1: 'library'}");

        assert!(result.is_err());
    }

    #[test]
    fn test_from_names_metadata_rejects_garbage() {
        assert!(LabelTable::from_names_metadata("names").is_err());
        assert!(LabelTable::from_names_metadata("{}").is_err());
        assert!(LabelTable::from_names_metadata("{0: unquoted}").is_err());
    }
}
