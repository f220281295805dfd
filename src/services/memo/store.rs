use std::fs;
use std::path::{Path, PathBuf};

use super::model::StoredItem;
use super::{hash, normalize};

/// As duas listas persistidas. As chaves são as mesmas do storage da
/// extensão.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Words,
    Sentences,
}

impl ListKind {
    pub fn storage_key(self) -> &'static str {
        match self {
            ListKind::Words => "memoWords",
            ListKind::Sentences => "memoSentences",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, String> {
        match name {
            "words" => Ok(ListKind::Words),
            "sentences" => Ok(ListKind::Sentences),
            _ => Err(format!("unknown list '{name}' (expected words|sentences)")),
        }
    }
}

/// Listas de itens salvos, uma por arquivo JSON sob `root`.
pub struct MemoStore {
    root: PathBuf,
}

impl MemoStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Raiz padrão: diretório corrente do host.
    pub fn open_default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    fn list_path(&self, kind: ListKind) -> PathBuf {
        self.root.join(format!("{}.json", kind.storage_key()))
    }

    /// Arquivo ausente = lista vazia. Arquivo corrompido idem: loga e
    /// devolve vazio em vez de travar o host.
    pub fn load(&self, kind: ListKind) -> Vec<StoredItem> {
        let path = self.list_path(kind);
        if !path.exists() {
            return Vec::new();
        }

        let data = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("failed to read {}: {e}", path.display());
                return Vec::new();
            }
        };

        match serde_json::from_str(&data) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("failed to parse {}: {e}", path.display());
                Vec::new()
            }
        }
    }

    pub fn save(&self, kind: ListKind, items: &[StoredItem]) -> Result<(), String> {
        let json = serde_json::to_string_pretty(items).map_err(|e| e.to_string())?;
        write_atomic(&self.list_path(kind), json.as_bytes())
    }

    /// Append idempotente: o mesmo original (normalizado + hash) não
    /// entra duas vezes — o segundo clique de "salvar" vira no-op.
    /// Retorna (entrou?, tamanho da lista).
    pub fn add(&self, kind: ListKind, item: StoredItem) -> Result<(bool, usize), String> {
        let mut items = self.load(kind);

        let key = hash::hash_norm(&normalize::normalize(&item.record.original));
        let duplicate = items
            .iter()
            .any(|it| hash::hash_norm(&normalize::normalize(&it.record.original)) == key);

        if duplicate {
            return Ok((false, items.len()));
        }

        items.push(item);
        self.save(kind, &items)?;
        Ok((true, items.len()))
    }

    /// Remove por posição (a UI referencia itens pelo índice na
    /// lista). Retorna o tamanho restante.
    pub fn remove(&self, kind: ListKind, index: usize) -> Result<usize, String> {
        let mut items = self.load(kind);

        if index >= items.len() {
            return Err(format!("index {index} out of range (len {})", items.len()));
        }

        items.remove(index);
        self.save(kind, &items)?;
        Ok(items.len())
    }

    pub fn clear(&self, kind: ListKind) -> Result<(), String> {
        self.save(kind, &[])
    }
}

// temp + rename no mesmo diretório
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), String> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    fs::write(&tmp, bytes).map_err(|e| e.to_string())?;

    if path.exists() {
        fs::remove_file(path).map_err(|e| e.to_string())?;
    }

    fs::rename(&tmp, path).map_err(|e| e.to_string())?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "memo".to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}
