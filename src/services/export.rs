use regex::Regex;

use crate::services::memo::model::StoredItem;
use crate::services::memo::store::ListKind;

// Cabeçalho que o Anki entende: separador tab, HTML ligado.
const CSV_HEADER: &str = "# separator:Tab\n# html:true\nFront\tBack\n";

/// Monta o arquivo de export (TSV) de uma lista salva: uma linha por
/// item, frente e verso em HTML. Todo texto vindo do usuário/upstream
/// é escapado; células nunca carregam tab nem quebra de linha crua.
pub fn to_anki_csv(items: &[StoredItem], kind: ListKind) -> String {
    let bold_re = Regex::new(r"</?b>").unwrap();

    let mut out = String::from(CSV_HEADER);

    for item in items {
        let front = front_cell(item, kind);
        let back = back_cell(item, kind, &bold_re);

        out.push_str(&clean(&front));
        out.push('\t');
        out.push_str(&clean(&back));
        out.push('\n');
    }

    out
}

fn front_cell(item: &StoredItem, kind: ListKind) -> String {
    let mut front = format!("<strong>{}</strong>", escape_html(&item.record.original));

    if kind == ListKind::Words {
        if let Some(phonetic) = &item.record.phonetic {
            front.push_str(&format!(
                " <span style=\"color:#666; font-size:0.8em;\">[{}]</span>",
                escape_html(phonetic)
            ));
        }
    }

    front
}

fn back_cell(item: &StoredItem, kind: ListKind, bold_re: &Regex) -> String {
    let record = &item.record;
    let mut back = String::new();

    match kind {
        ListKind::Words => {
            // Dicionário; sem ele, cai na tradução simples.
            match &record.dictionary {
                Some(dictionary) => {
                    back.push_str("<div style=\"margin-bottom:10px;\">");
                    for d in dictionary {
                        back.push_str(&format!(
                            "<div><i style=\"color:#007bff;\">{}</i> {}</div>",
                            escape_html(&d.pos),
                            escape_html(&d.terms.join(", "))
                        ));
                    }
                    back.push_str("</div>");
                }
                None => {
                    back.push_str(&format!(
                        "<div style=\"margin-bottom:10px;\">{}</div>",
                        escape_html(&record.translated)
                    ));
                }
            }

            if let Some(definitions) = &record.definitions {
                back.push_str(
                    "<div style=\"margin-bottom:10px; font-size:0.9em; text-align:left;\">",
                );
                for group in definitions {
                    back.push_str(&format!("<div><i>{}</i></div>", escape_html(&group.pos)));
                    back.push_str("<ol style=\"margin:0; padding-left:20px;\">");
                    for def in &group.defs {
                        back.push_str(&format!("<li>{}</li>", escape_html(def)));
                    }
                    back.push_str("</ol>");
                }
                back.push_str("</div>");
            }

            if let Some(examples) = &record.examples {
                back.push_str(
                    "<div style=\"margin-top:10px; border-top:1px dashed #ccc; padding-top:5px; font-style:italic; font-size:0.9em; text-align:left; color:#555;\">",
                );
                for ex in examples {
                    // O normalizador já tira <b>/</b>; itens salvos
                    // antes disso ainda podem carregar a marcação.
                    let plain = bold_re.replace_all(ex, "");
                    back.push_str(&format!("<div>• {}</div>", escape_html(&plain)));
                }
                back.push_str("</div>");
            }
        }
        ListKind::Sentences => {
            back.push_str(&format!(
                "<div style=\"font-size:1.1em; color:#333;\">{}</div>",
                escape_html(&record.translated)
            ));
        }
    }

    back.push_str(&format!(
        "<div style=\"margin-top:10px; font-size:0.7em; color:#999;\"><a href=\"{}\">Source</a></div>",
        escape_html(&item.url)
    ));

    back
}

// Células TSV não podem carregar tab nem quebra de linha crua.
fn clean(cell: &str) -> String {
    cell.replace('\t', " ").replace('\n', "<br>")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}
