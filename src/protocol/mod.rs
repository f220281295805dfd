use serde_json::{json, Value};

use crate::model::record::{EngineKind, TranslationRecord};
use crate::services::ai::{self, CancelToken};
use crate::services::memo::model::StoredItem;
use crate::services::memo::store::{ListKind, MemoStore};
use crate::services::{engine, export, google};

mod command;
use command::Command;

fn get_cmd(req: &Value) -> &str {
    req.get("cmd").and_then(|v| v.as_str()).unwrap_or("")
}

fn get_id(req: &Value) -> Value {
    req.get("id").cloned().unwrap_or(Value::Null)
}

fn get_payload<'a>(req: &'a Value) -> &'a Value {
    static EMPTY: Value = Value::Null;
    req.get("payload").unwrap_or(&EMPTY)
}

fn get_str<'a>(payload: &'a Value, key: &str) -> &'a str {
    payload.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn get_str_or<'a>(payload: &'a Value, key: &str, default: &'a str) -> &'a str {
    match payload.get(key).and_then(|v| v.as_str()) {
        Some(s) if !s.is_empty() => s,
        _ => default,
    }
}

fn ok(id: Value, payload: Value) -> String {
    json!({
        "id": id,
        "status": "ok",
        "payload": payload
    })
    .to_string()
}

fn err(id: Value, message: impl Into<String>) -> String {
    json!({
        "id": id,
        "status": "error",
        "message": message.into()
    })
    .to_string()
}

// A raiz do storage normalmente é implícita (cwd do host); o
// frontend pode apontar outra via payload.store_root (ex.: diretório
// do perfil).
fn open_store(payload: &Value) -> MemoStore {
    let root = get_str(payload, "store_root");
    if root.is_empty() {
        MemoStore::open_default()
    } else {
        MemoStore::new(root)
    }
}

fn parse_list(payload: &Value) -> Result<ListKind, String> {
    ListKind::from_name(get_str(payload, "list"))
}

pub fn handle(input: &str) -> String {
    let req: Value = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(_) => {
            return json!({
                "status": "error",
                "message": "invalid json"
            })
            .to_string();
        }
    };

    let id = get_id(&req);
    let payload = get_payload(&req);

    match Command::from(get_cmd(&req)) {
        Command::Ping => ok(id, json!({ "message": "memo-core alive" })),
        Command::Translate => translate(id, payload),
        Command::Analyze => analyze(id, payload),
        Command::MemoAdd => memo_add(id, payload),
        Command::MemoList => memo_list(id, payload),
        Command::MemoRemove => memo_remove(id, payload),
        Command::MemoClear => memo_clear(id, payload),
        Command::ExportAnki => export_anki(id, payload),
        Command::Unknown => err(id, "unknown command"),
    }
}

fn translate(id: Value, payload: &Value) -> String {
    let text = get_str(payload, "text");
    if text.is_empty() {
        return err(id, "payload.text is required");
    }

    let primary = match get_str_or(payload, "engine", "google") {
        "ai" => EngineKind::Ai,
        "google" => EngineKind::Google,
        other => return err(id, format!("unknown engine '{other}' (expected ai|google)")),
    };

    let ai_cfg = ai::AiConfig {
        base_url: get_str(payload, "base_url"),
        api_key: get_str(payload, "api_key"),
        model: get_str(payload, "model"),
        target_lang: get_str_or(payload, "tl", "zh-CN"),
    };
    let google_cfg = google::GoogleConfig {
        source_lang: get_str_or(payload, "sl", "auto"),
        target_lang: get_str_or(payload, "tl", "zh-CN"),
    };

    match engine::translate(primary, text, &ai_cfg, &google_cfg) {
        Ok(record) => ok(id, json!({ "record": record })),
        Err(e) => {
            tracing::error!("translate failed on both engines: {e}");

            // Mantém o schema do flashcard mesmo na falha: translated
            // carrega o diagnóstico em vez de estourar na UI.
            let placeholder = TranslationRecord {
                original: text.to_string(),
                translated: format!("translation failed: {e}"),
                phonetic: None,
                dictionary: None,
                definitions: None,
                examples: None,
                source: primary,
            };
            ok(id, json!({ "record": placeholder }))
        }
    }
}

fn analyze(id: Value, payload: &Value) -> String {
    let text = get_str(payload, "text");
    if text.is_empty() {
        return err(id, "payload.text is required");
    }

    let base_url = get_str(payload, "base_url");
    let api_key = get_str(payload, "api_key");
    let model = get_str(payload, "model");

    if base_url.is_empty() {
        return err(id, "payload.base_url is required");
    }
    if api_key.is_empty() {
        return err(id, "payload.api_key is required");
    }
    if model.is_empty() {
        return err(id, "payload.model is required");
    }

    let cfg = ai::AiConfig {
        base_url,
        api_key,
        model,
        target_lang: get_str_or(payload, "tl", "zh-CN"),
    };

    // O protocolo é request/response, então aqui o token nunca é
    // cancelado; ele existe para consumidores diretos do serviço que
    // abandonam o stream.
    match ai::analyze(text, &cfg, &CancelToken::new()) {
        Ok(sections) => ok(id, json!({ "sections": sections })),
        Err(e) => err(id, e.to_string()),
    }
}

fn memo_add(id: Value, payload: &Value) -> String {
    let kind = match parse_list(payload) {
        Ok(k) => k,
        Err(e) => return err(id, e),
    };

    let item_val = payload.get("item").cloned().unwrap_or(Value::Null);
    if item_val.is_null() {
        return err(id, "payload.item is required");
    }

    let item: StoredItem = match serde_json::from_value(item_val) {
        Ok(v) => v,
        Err(e) => return err(id, format!("invalid payload.item: {e}")),
    };

    if item.record.original.trim().is_empty() {
        return err(id, "item.original is required");
    }

    match open_store(payload).add(kind, item) {
        Ok((added, count)) => ok(id, json!({ "added": added, "count": count })),
        Err(e) => err(id, e),
    }
}

fn memo_list(id: Value, payload: &Value) -> String {
    let kind = match parse_list(payload) {
        Ok(k) => k,
        Err(e) => return err(id, e),
    };

    let items = open_store(payload).load(kind);
    ok(id, json!({ "items": items }))
}

fn memo_remove(id: Value, payload: &Value) -> String {
    let kind = match parse_list(payload) {
        Ok(k) => k,
        Err(e) => return err(id, e),
    };

    let index = match payload.get("index").and_then(|v| v.as_u64()) {
        Some(i) => i as usize,
        None => return err(id, "payload.index is required"),
    };

    match open_store(payload).remove(kind, index) {
        Ok(count) => ok(id, json!({ "count": count })),
        Err(e) => err(id, e),
    }
}

fn memo_clear(id: Value, payload: &Value) -> String {
    let kind = match parse_list(payload) {
        Ok(k) => k,
        Err(e) => return err(id, e),
    };

    match open_store(payload).clear(kind) {
        Ok(()) => ok(id, json!({ "count": 0 })),
        Err(e) => err(id, e),
    }
}

fn export_anki(id: Value, payload: &Value) -> String {
    let kind = match parse_list(payload) {
        Ok(k) => k,
        Err(e) => return err(id, e),
    };

    let items = open_store(payload).load(kind);
    if items.is_empty() {
        return err(id, "list is empty");
    }

    let csv = export::to_anki_csv(&items, kind);
    ok(id, json!({ "csv": csv, "count": items.len() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(cmd: &str, payload: Value) -> String {
        json!({ "id": 1, "cmd": cmd, "payload": payload }).to_string()
    }

    fn response(cmd: &str, payload: Value) -> Value {
        serde_json::from_str(&handle(&request(cmd, payload))).unwrap()
    }

    #[test]
    fn ping_answers_ok() {
        let resp = response("ping", json!({}));
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["id"], 1);
    }

    #[test]
    fn unknown_command_is_an_error() {
        let resp = response("definitely.not.a.command", json!({}));
        assert_eq!(resp["status"], "error");
    }

    #[test]
    fn invalid_json_still_gets_an_envelope() {
        let resp: Value = serde_json::from_str(&handle("{oops")).unwrap();
        assert_eq!(resp["status"], "error");
        assert_eq!(resp["message"], "invalid json");
    }

    #[test]
    fn translate_requires_text() {
        let resp = response("translate", json!({}));
        assert_eq!(resp["status"], "error");
    }

    #[test]
    fn translate_rejects_unknown_engine() {
        let resp = response("translate", json!({ "text": "hi", "engine": "bing" }));
        assert_eq!(resp["status"], "error");
    }

    #[test]
    fn analyze_requires_credentials() {
        let resp = response("analyze", json!({ "text": "hi" }));
        assert_eq!(resp["status"], "error");

        let resp = response(
            "analyze",
            json!({ "text": "hi", "base_url": "https://api.example.com", "api_key": "k" }),
        );
        assert_eq!(resp["status"], "error"); // falta model
    }

    #[test]
    fn memo_flow_add_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let resp = response(
            "memo.add",
            json!({
                "list": "words",
                "store_root": root,
                "item": { "original": "hello", "translated": "你好", "url": "https://x" }
            }),
        );
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["payload"]["added"], true);
        assert_eq!(resp["payload"]["count"], 1);

        // segundo save da mesma palavra: no-op
        let resp = response(
            "memo.add",
            json!({
                "list": "words",
                "store_root": root,
                "item": { "original": "Hello", "translated": "你好" }
            }),
        );
        assert_eq!(resp["payload"]["added"], false);
        assert_eq!(resp["payload"]["count"], 1);

        let resp = response("memo.list", json!({ "list": "words", "store_root": root }));
        assert_eq!(resp["payload"]["items"][0]["original"], "hello");

        let resp = response(
            "memo.remove",
            json!({ "list": "words", "store_root": root, "index": 0 }),
        );
        assert_eq!(resp["payload"]["count"], 0);

        let resp = response(
            "memo.remove",
            json!({ "list": "words", "store_root": root, "index": 0 }),
        );
        assert_eq!(resp["status"], "error"); // lista já vazia
    }

    #[test]
    fn memo_rejects_unknown_list() {
        let resp = response("memo.list", json!({ "list": "phrases" }));
        assert_eq!(resp["status"], "error");
    }

    #[test]
    fn export_of_empty_list_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let resp = response(
            "export.anki",
            json!({ "list": "sentences", "store_root": root }),
        );
        assert_eq!(resp["status"], "error");
    }

    #[test]
    fn export_builds_tsv_from_saved_items() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        response(
            "memo.add",
            json!({
                "list": "sentences",
                "store_root": root,
                "item": { "original": "good morning", "translated": "早上好", "url": "https://x" }
            }),
        );

        let resp = response(
            "export.anki",
            json!({ "list": "sentences", "store_root": root }),
        );
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["payload"]["count"], 1);

        let csv = resp["payload"]["csv"].as_str().unwrap();
        assert!(csv.starts_with("# separator:Tab\n# html:true\nFront\tBack\n"));
        assert!(csv.contains("<strong>good morning</strong>"));
        assert!(csv.contains("早上好"));
    }
}
