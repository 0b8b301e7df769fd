//! Markdown document discovery.
//!
//! A source root is laid out as `<root>/<snapshot>/<project>/**/*.md`.
//! Snapshots are visited in lexical order, so a document present in a
//! later snapshot replaces the earlier copy with the same `doc_id`.

use encoding_rs::Encoding;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::traits::DocumentSource;
use crate::types::DocMeta;

#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub doc_id: String,
    pub title: String,
    pub project: String,
    pub url: String,
    pub path: PathBuf,
    pub encoding: &'static Encoding,
}

impl SourceDocument {
    /// Read and decode the file. Invalid byte sequences are replaced.
    pub fn read_markdown(&self) -> Result<String> {
        let bytes = fs::read(&self.path)?;
        let (text, _, had_errors) = self.encoding.decode(&bytes);
        if had_errors {
            warn!(doc_id = %self.doc_id, encoding = self.encoding.name(), "replaced malformed byte sequences");
        }
        Ok(text.into_owned())
    }

    pub fn meta(&self) -> DocMeta {
        DocMeta { id: self.doc_id.clone(), title: self.title.clone(), project: self.project.clone(), url: self.url.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct DirectorySource {
    kind: String,
    root: PathBuf,
    encoding: &'static Encoding,
    projects: BTreeMap<String, String>,
}

impl DirectorySource {
    pub fn new(kind: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self { kind: kind.into(), root: root.into(), encoding: encoding_rs::UTF_8, projects: BTreeMap::new() }
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self { self.encoding = encoding; self }

    /// Rename project directories. Once a map is set, unmapped projects are skipped.
    pub fn with_projects(mut self, projects: BTreeMap<String, String>) -> Self { self.projects = projects; self }

    pub fn from_config(conf: &SourceConfig, base: &Path) -> Result<Self> {
        let encoding = Encoding::for_label(conf.encoding.as_bytes())
            .ok_or_else(|| Error::InvalidConfig(format!("unknown encoding '{}'", conf.encoding)))?;
        Ok(Self::new(conf.kind.clone(), crate::config::resolve_with_base(base, &conf.dir))
            .with_encoding(encoding)
            .with_projects(conf.projects.clone()))
    }

    fn resolve_into(&self, out: &mut OrderedDocs) -> Result<()> {
        for snapshot_dir in sorted_subdirs(&self.root)? {
            let snapshot = file_name(&snapshot_dir);
            for project_dir in sorted_subdirs(&snapshot_dir)? {
                let dir_name = file_name(&project_dir);
                let project = if self.projects.is_empty() {
                    dir_name
                } else if let Some(mapped) = self.projects.get(&dir_name) {
                    mapped.clone()
                } else {
                    continue;
                };
                for entry in walkdir::WalkDir::new(&project_dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
                    if !entry.file_type().is_file() { continue; }
                    let path = entry.path();
                    let Some(stem) = markdown_stem(path) else { continue };
                    let relative = path.strip_prefix(&project_dir).unwrap_or(path);
                    let relative = relative.with_extension("");
                    let relative = relative.to_string_lossy().replace('\\', "/");
                    let doc_id = format!("{}/{}/{}", self.kind, project, relative);
                    let doc = SourceDocument {
                        doc_id: doc_id.clone(),
                        title: stem,
                        project: project.clone(),
                        url: String::new(),
                        path: path.to_path_buf(),
                        encoding: self.encoding,
                    };
                    if out.insert(doc) {
                        info!(%doc_id, %snapshot, "document updated by later snapshot");
                    }
                }
            }
        }
        Ok(())
    }
}

impl DocumentSource for DirectorySource {
    fn documents(&self) -> Result<Vec<SourceDocument>> {
        let mut docs = OrderedDocs::default();
        self.resolve_into(&mut docs)?;
        Ok(docs.into_vec())
    }
}

/// Several directory sources; later sources override earlier ones by `doc_id`.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    sources: Vec<DirectorySource>,
}

impl SourceSet {
    pub fn new(sources: Vec<DirectorySource>) -> Self { Self { sources } }

    pub fn from_configs(confs: &[SourceConfig], base: &Path) -> Result<Self> {
        let sources = confs.iter().map(|c| DirectorySource::from_config(c, base)).collect::<Result<Vec<_>>>()?;
        Ok(Self::new(sources))
    }

    pub fn is_empty(&self) -> bool { self.sources.is_empty() }
}

impl DocumentSource for SourceSet {
    fn documents(&self) -> Result<Vec<SourceDocument>> {
        let mut docs = OrderedDocs::default();
        for source in &self.sources { source.resolve_into(&mut docs)?; }
        Ok(docs.into_vec())
    }
}

/// Keeps first-seen order of ids while letting later inserts replace the value.
#[derive(Default)]
struct OrderedDocs {
    docs: Vec<SourceDocument>,
    by_id: HashMap<String, usize>,
}

impl OrderedDocs {
    /// Returns true when an existing document was replaced.
    fn insert(&mut self, doc: SourceDocument) -> bool {
        if let Some(&slot) = self.by_id.get(&doc.doc_id) {
            self.docs[slot] = doc;
            true
        } else {
            self.by_id.insert(doc.doc_id.clone(), self.docs.len());
            self.docs.push(doc);
            false
        }
    }

    fn into_vec(self) -> Vec<SourceDocument> { self.docs }
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!("source directory {}", dir.display())));
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort_by_key(|p| file_name(p));
    Ok(dirs)
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}

fn markdown_stem(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if ext != "md" && ext != "MD" { return None; }
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}
