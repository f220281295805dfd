use regex::Regex;
use serde_json::Value;

use crate::model::record::{DefEntry, DictEntry, EngineKind, TranslationRecord};

// Limites vindos do consumidor (flashcard): mais que isso não cabe
// num verso de cartão.
const MAX_TERMS: usize = 5;
const MAX_DEFS: usize = 3;
const MAX_EXAMPLES: usize = 3;

/// Normaliza o payload posicional do endpoint público de tradução
/// num [`TranslationRecord`].
///
/// As posições do array raiz têm significado fixo:
/// 0 = segmentos de tradução, 1 = dicionário bilíngue,
/// 12 = definições, 13 = exemplos.
///
/// Posição ausente/null é ausência de dado (campo `None`, nunca
/// container vazio). Posição presente com shape errado é skew de
/// versão do upstream e vira erro — melhor falhar do que ler o campo
/// errado em silêncio.
pub fn normalize(data: &Value, original: &str) -> Result<TranslationRecord, String> {
    let root = data
        .as_array()
        .ok_or_else(|| "response root is not an array".to_string())?;

    let (translated, phonetic) = translation_and_phonetic(position(root, 0)?);
    let dictionary = dictionary(position(root, 1)?)?;
    let definitions = definitions(position(root, 12)?)?;
    let examples = examples(position(root, 13)?)?;

    Ok(TranslationRecord {
        original: original.to_string(),
        translated,
        phonetic,
        dictionary,
        definitions,
        examples,
        source: EngineKind::Google,
    })
}

// Ausente/null → None; presente mas não-array → skew.
fn position(root: &[Value], idx: usize) -> Result<Option<&Vec<Value>>, String> {
    match root.get(idx) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(format!("position {idx} is not an array")),
    }
}

fn translation_and_phonetic(segments: Option<&Vec<Value>>) -> (String, Option<String>) {
    let segments = match segments {
        Some(s) => s,
        None => return (String::new(), None),
    };

    // Tradução = concatenação, em ordem, do primeiro elemento de
    // cada segmento (segmentos sem texto são pulados).
    let mut translated = String::new();
    for seg in segments {
        if let Some(t) = seg.get(0).and_then(|v| v.as_str()) {
            translated.push_str(t);
        }
    }

    // Fonética: último segmento, slot 2 e depois 3 como fallback —
    // o primeiro não-vazio vence. Só vale se o segmento tiver >= 3
    // slots.
    let phonetic = segments.last().and_then(|last| {
        let arr = last.as_array()?;
        if arr.len() < 3 {
            return None;
        }
        for idx in [2usize, 3] {
            if let Some(p) = arr.get(idx).and_then(|v| v.as_str()) {
                if !p.trim().is_empty() {
                    return Some(p.to_string());
                }
            }
        }
        None
    });

    (translated, phonetic)
}

fn dictionary(entries: Option<&Vec<Value>>) -> Result<Option<Vec<DictEntry>>, String> {
    let entries = match entries {
        Some(e) => e,
        None => return Ok(None),
    };

    let mut out = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let pos = entry
            .get(0)
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("dictionary entry {i} has no part-of-speech"))?;

        let terms = entry
            .get(1)
            .and_then(|v| v.as_array())
            .ok_or_else(|| format!("dictionary entry {i} has no term list"))?;

        // Primeiros 5 elementos, ordem do upstream preservada.
        let terms: Vec<String> = terms
            .iter()
            .take(MAX_TERMS)
            .filter_map(|t| t.as_str())
            .map(str::to_string)
            .collect();

        out.push(DictEntry {
            pos: pos.to_string(),
            terms,
        });
    }

    Ok(Some(out))
}

fn definitions(entries: Option<&Vec<Value>>) -> Result<Option<Vec<DefEntry>>, String> {
    let entries = match entries {
        Some(e) => e,
        None => return Ok(None),
    };

    let mut out = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let pos = entry
            .get(0)
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("definition entry {i} has no part-of-speech"))?;

        let defs = entry
            .get(1)
            .and_then(|v| v.as_array())
            .ok_or_else(|| format!("definition entry {i} has no definition list"))?;

        // Cada sub-item contribui com o primeiro elemento, até 3.
        let defs: Vec<String> = defs
            .iter()
            .filter_map(|d| d.get(0).and_then(|v| v.as_str()))
            .take(MAX_DEFS)
            .map(str::to_string)
            .collect();

        out.push(DefEntry {
            pos: pos.to_string(),
            defs,
        });
    }

    Ok(Some(out))
}

fn examples(entries: Option<&Vec<Value>>) -> Result<Option<Vec<String>>, String> {
    let entries = match entries {
        Some(e) => e,
        None => return Ok(None),
    };

    // Só a primeira sub-lista carrega exemplos; sem ela, sem dado.
    let first = match entries.first() {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => return Err("examples sub-list is not an array".to_string()),
    };

    let bold_re = Regex::new(r"</?b>").unwrap();

    let out: Vec<String> = first
        .iter()
        .filter_map(|ex| ex.get(0).and_then(|v| v.as_str()))
        .take(MAX_EXAMPLES)
        .map(|s| bold_re.replace_all(s, "").into_owned())
        .collect();

    Ok(Some(out))
}
