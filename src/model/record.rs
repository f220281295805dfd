use serde::{Deserialize, Serialize};

/// Registro normalizado de tradução: o shape fixo que o resto do
/// sistema consome, independente de qual engine respondeu.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationRecord {
    #[serde(default)]
    pub original: String,

    /// Sempre presente (pode ser vazio).
    #[serde(default)]
    pub translated: String,

    // Campos opcionais ausentes ficam None e somem do JSON —
    // "sem dado" nunca vira container vazio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<Vec<DictEntry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Vec<DefEntry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,

    #[serde(default)]
    pub source: EngineKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DictEntry {
    pub pos: String,

    /// Ordem de inserção = ordem do upstream; no máximo 5 termos.
    pub terms: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DefEntry {
    pub pos: String,

    /// No máximo 3 definições por classe gramatical.
    pub defs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Ai,
    Google,
}

impl Default for EngineKind {
    fn default() -> Self {
        EngineKind::Google
    }
}

/// Seções de análise remontadas do stream. Os valores só crescem
/// durante a vida do stream e congelam no fim dele. Seção ausente
/// fica vazia — não é erro.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSections {
    #[serde(default)]
    pub grammar: String,

    #[serde(default)]
    pub phrases: String,

    #[serde(default)]
    pub tip: String,
}
