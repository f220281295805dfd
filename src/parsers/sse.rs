use serde_json::Value;

/// Resultado de uma linha crua do stream SSE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Fragmento incremental de texto para anexar.
    Delta(String),

    /// Terminador `data: [DONE]` — fim de stream, não é erro.
    Done,

    /// Linha sem conteúdo útil (comentário, keep-alive, frame de
    /// metadata ou JSON quebrado). O stream continua.
    Ignored,
}

const DATA_PREFIX: &str = "data:";
const DONE_TOKEN: &str = "[DONE]";

/// Classifica uma linha do stream. Só frames `data: ...` carregam
/// conteúdo; todo o resto é protocolo e vira no-op.
pub fn parse_line(line: &str) -> SseLine {
    let payload = match line.strip_prefix(DATA_PREFIX) {
        Some(rest) => rest.trim(),
        None => return SseLine::Ignored,
    };

    if payload == DONE_TOKEN {
        return SseLine::Done;
    }

    let v: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            // Chunk de controle não-parseável ainda é frame válido de
            // protocolo: loga e segue, nunca derruba o stream.
            tracing::warn!("dropping malformed SSE frame: {e}");
            return SseLine::Ignored;
        }
    };

    match v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
    {
        Some(delta) => SseLine::Delta(delta.to_string()),
        None => SseLine::Ignored,
    }
}
