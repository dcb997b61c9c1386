use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::error::DescriptorError;

/// A document to download: where its first page is and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    #[serde(alias = "Id", alias = "book", deserialize_with = "text_or_number")]
    pub id: String,
    #[serde(rename = "url", alias = "Url", alias = "entryUrl")]
    pub entry_url: String,
    #[serde(rename = "path", alias = "Path", alias = "targetPath")]
    pub target_path: PathBuf,
}

impl DocumentDescriptor {
    pub fn new(
        id: impl Into<String>,
        entry_url: impl Into<String>,
        target_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            entry_url: entry_url.into(),
            target_path: target_path.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

struct Record {
    file: PathBuf,
    line: usize,
    descriptor: DocumentDescriptor,
}

/// Loads descriptors from a JSON array or a JSON Lines file.
///
/// Relative entry URLs are resolved against `base_url`. Every descriptor is
/// validated before anything is returned, errors point at the offending line
/// (or the 1-based position for JSON arrays).
pub fn load_descriptors(
    file: &Path,
    base_url: Option<&Url>,
) -> Result<Vec<DocumentDescriptor>, DescriptorError> {
    let records = read_records(file)?;
    validate(records, base_url)
}

/// Loads and concatenates every `*.json` and `*.jsonl` file of `dir`, in file
/// name order.
pub fn load_index_dir(
    dir: &Path,
    base_url: Option<&Url>,
) -> Result<Vec<DocumentDescriptor>, DescriptorError> {
    let mut files = vec![];
    for ext in ["json", "jsonl"] {
        let pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy()))
            .join(format!("*.{ext}"));
        for path in glob::glob(&pattern.to_string_lossy())? {
            files.push(path?);
        }
    }
    files.sort();

    let mut records = vec![];
    for file in files {
        log::debug!("Loading index {}", file.display());
        records.extend(read_records(&file)?);
    }
    validate(records, base_url)
}

fn read_records(file: &Path) -> Result<Vec<Record>, DescriptorError> {
    let raw = fs_err::read_to_string(file)?;

    if raw.trim_start().starts_with('[') {
        let values: Vec<serde_json::Value> =
            serde_json::from_str(&raw).map_err(|source| DescriptorError::Parse {
                file: file.to_path_buf(),
                line: source.line(),
                source,
            })?;
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                serde_json::from_value(value)
                    .map(|descriptor| Record {
                        file: file.to_path_buf(),
                        line: i + 1,
                        descriptor,
                    })
                    .map_err(|source| DescriptorError::Parse {
                        file: file.to_path_buf(),
                        line: i + 1,
                        source,
                    })
            })
            .collect()
    } else {
        raw.lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| {
                serde_json::from_str(l)
                    .map(|descriptor| Record {
                        file: file.to_path_buf(),
                        line: i + 1,
                        descriptor,
                    })
                    .map_err(|source| DescriptorError::Parse {
                        file: file.to_path_buf(),
                        line: i + 1,
                        source,
                    })
            })
            .collect()
    }
}

fn validate(
    records: Vec<Record>,
    base_url: Option<&Url>,
) -> Result<Vec<DocumentDescriptor>, DescriptorError> {
    let mut targets: HashMap<PathBuf, String> = HashMap::with_capacity(records.len());
    let mut descriptors = Vec::with_capacity(records.len());

    for Record {
        file,
        line,
        mut descriptor,
    } in records
    {
        let invalid = |reason: String| DescriptorError::Invalid {
            file: file.clone(),
            line,
            reason,
        };

        if descriptor.id.trim().is_empty() {
            return Err(invalid("empty `id`".into()));
        }
        if descriptor.target_path.as_os_str().is_empty() {
            return Err(invalid(format!("empty `path` for {}", descriptor.id)));
        }

        let entry_url = match (Url::parse(&descriptor.entry_url), base_url) {
            (Ok(url), _) => url,
            (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => base
                .join(&descriptor.entry_url)
                .map_err(|e| invalid(format!("invalid `url` for {}: {e}", descriptor.id)))?,
            (Err(e), _) => {
                return Err(invalid(format!(
                    "invalid `url` {:?} for {}: {e}",
                    descriptor.entry_url, descriptor.id
                )))
            }
        };
        descriptor.entry_url = entry_url.into();

        if let Some(first) = targets.get(&descriptor.target_path) {
            return Err(DescriptorError::DuplicateTarget {
                path: descriptor.target_path,
                first: first.clone(),
                second: descriptor.id,
            });
        }
        targets.insert(descriptor.target_path.clone(), descriptor.id.clone());

        descriptors.push(descriptor);
    }

    Ok(descriptors)
}
