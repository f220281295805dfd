use crate::model::record::AnalysisSections;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Grammar,
    Phrases,
    Tip,
}

// Marcadores exatos (minúsculos, com colchetes). O token em si nunca
// é anexado a seção nenhuma.
const MARKERS: [(&str, Section); 3] = [
    ("[grammar]", Section::Grammar),
    ("[phrases]", Section::Phrases),
    ("[tip]", Section::Tip),
];

/// Remonta as seções nomeadas a partir dos deltas de um stream.
///
/// Os marcadores podem chegar partidos em qualquer fronteira de
/// chunk, então o sufixo que ainda pode ser começo de marcador fica
/// retido em `tail` e só é liberado quando prova que é texto literal
/// (ou quando o stream acaba).
#[derive(Debug, Default)]
pub struct SectionReassembler {
    active: Option<Section>,
    tail: String,
    sections: AnalysisSections,
    frozen: bool,
}

impl SectionReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processa um delta. Depois de `finish()` vira no-op.
    pub fn push(&mut self, delta: &str) {
        if self.frozen {
            return;
        }

        let mut buf = std::mem::take(&mut self.tail);
        buf.push_str(delta);

        let mut rest = buf.as_str();
        loop {
            match rest.find('[') {
                None => {
                    self.commit(rest);
                    break;
                }
                Some(i) => {
                    self.commit(&rest[..i]);
                    let cand = &rest[i..];

                    if let Some((marker, section)) = match_full_marker(cand) {
                        // Marcador completo: troca a seção ativa e
                        // descarta o token.
                        self.active = Some(section);
                        rest = &cand[marker.len()..];
                    } else if is_marker_prefix(cand) {
                        // Pode ser marcador partido; segura até o
                        // próximo delta decidir.
                        self.tail = cand.to_string();
                        break;
                    } else {
                        // `[` literal.
                        self.commit("[");
                        rest = &cand[1..];
                    }
                }
            }
        }
    }

    /// Fim de stream: descarrega o tail (provou que não era
    /// marcador), apara whitespace no fim de cada seção e congela o
    /// estado.
    pub fn finish(&mut self) -> AnalysisSections {
        if !self.frozen {
            let tail = std::mem::take(&mut self.tail);
            self.commit(&tail);

            trim_trailing_ws(&mut self.sections.grammar);
            trim_trailing_ws(&mut self.sections.phrases);
            trim_trailing_ws(&mut self.sections.tip);

            self.frozen = true;
        }
        self.sections.clone()
    }

    // Texto sem seção ativa (preâmbulo/ruído) é descartado.
    fn commit(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let target = match self.active {
            None => return,
            Some(Section::Grammar) => &mut self.sections.grammar,
            Some(Section::Phrases) => &mut self.sections.phrases,
            Some(Section::Tip) => &mut self.sections.tip,
        };
        target.push_str(text);
    }
}

fn match_full_marker(cand: &str) -> Option<(&'static str, Section)> {
    MARKERS
        .iter()
        .find(|(m, _)| cand.starts_with(m))
        .map(|&(m, s)| (m, s))
}

// Prefixo estrito: `cand` acabou antes de fechar o marcador.
fn is_marker_prefix(cand: &str) -> bool {
    MARKERS
        .iter()
        .any(|(m, _)| m.len() > cand.len() && m.starts_with(cand))
}

fn trim_trailing_ws(s: &mut String) {
    let len = s.trim_end().len();
    s.truncate(len);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(deltas: &[&str]) -> AnalysisSections {
        let mut r = SectionReassembler::new();
        for d in deltas {
            r.push(d);
        }
        r.finish()
    }

    #[test]
    fn routes_text_into_named_sections() {
        let s = collect(&["[grammar]主语 + 谓语[phrases]key phrase[tip]谐音记忆"]);
        assert_eq!(s.grammar, "主语 + 谓语");
        assert_eq!(s.phrases, "key phrase");
        assert_eq!(s.tip, "谐音记忆");
    }

    #[test]
    fn marker_split_across_two_deltas() {
        let s = collect(&["[gram", "mar]text"]);
        assert_eq!(s.grammar, "text");
        // nada de "[gram" vazando pra nenhuma seção
        assert_eq!(s.phrases, "");
        assert_eq!(s.tip, "");
    }

    #[test]
    fn marker_split_one_char_at_a_time() {
        let deltas: Vec<String> = "[phrases]ok".chars().map(String::from).collect();
        let mut r = SectionReassembler::new();
        for d in &deltas {
            r.push(d);
        }
        let s = r.finish();
        assert_eq!(s.phrases, "ok");
        assert_eq!(s.grammar, "");
    }

    #[test]
    fn preamble_before_first_marker_is_discarded() {
        let s = collect(&["Sure, here is the analysis:\n", "[tip]abc"]);
        assert_eq!(s.tip, "abc");
        assert_eq!(s.grammar, "");
        assert_eq!(s.phrases, "");
    }

    #[test]
    fn literal_bracket_text_is_kept() {
        let s = collect(&["[grammar]a [b] c"]);
        assert_eq!(s.grammar, "a [b] c");
    }

    #[test]
    fn marker_like_text_that_diverges_is_literal() {
        // "[grampa]" compartilha prefixo com "[grammar]" até divergir
        let s = collect(&["[tip]a[gram", "pa]b"]);
        assert_eq!(s.tip, "a[grampa]b");
    }

    #[test]
    fn unfinished_marker_prefix_flushes_at_stream_end() {
        let s = collect(&["[grammar]x[tip"]);
        assert_eq!(s.grammar, "x[tip");
        assert_eq!(s.tip, "");
    }

    #[test]
    fn reentering_a_section_keeps_accumulating() {
        let s = collect(&["[grammar]a[tip]b[grammar]c"]);
        assert_eq!(s.grammar, "ac");
        assert_eq!(s.tip, "b");
    }

    #[test]
    fn trailing_whitespace_is_trimmed_at_freeze() {
        let s = collect(&["[tip]abc  \n"]);
        assert_eq!(s.tip, "abc");
    }

    #[test]
    fn push_after_finish_is_a_noop() {
        let mut r = SectionReassembler::new();
        r.push("[tip]before");
        let first = r.finish();
        r.push(" after");
        let second = r.finish();
        assert_eq!(first, second);
        assert_eq!(second.tip, "before");
    }

    #[test]
    fn empty_stream_yields_empty_sections() {
        let s = collect(&[]);
        assert_eq!(s, AnalysisSections::default());
    }

    #[test]
    fn consecutive_markers_leave_earlier_section_empty() {
        let s = collect(&["[grammar]", "[phrases]only here"]);
        assert_eq!(s.grammar, "");
        assert_eq!(s.phrases, "only here");
    }
}
