//! Prompt templates sent to the generation API.
//!
//! Pure functions of their inputs. Recently used references are listed as a
//! "do not reuse" block only when there are any.

use rand::seq::SliceRandom;
use rand::Rng;

/// Themes the public devotional draws from.
pub const THEMES: [&str; 10] = [
    "fé em tempos difíceis",
    "esperança nas promessas de Deus",
    "o poder do perdão",
    "a graça que transforma",
    "propósito e confiança em Deus",
    "a presença de Deus na dor",
    "gratidão nas pequenas coisas",
    "descanso na vontade divina",
    "coragem diante do medo",
    "identidade em Cristo",
];

/// Pick a theme uniformly at random.
pub fn pick_theme<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    THEMES.choose(rng).copied().unwrap_or(THEMES[0])
}

fn avoid_block(recent_references: &[String]) -> String {
    if recent_references.is_empty() {
        return String::new();
    }

    let list = recent_references
        .iter()
        .map(|reference| format!("- {}", reference))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "IMPORTANTE: NÃO SELECIONE as seguintes referências, usadas recentemente:\n{}\n",
        list
    )
}

const DEVOTIONAL_STYLE: &str = "\
Estilo:
- Evite vocativos como \"querido irmão\" ou \"querida irmã\" e não mencione o dia atual.
- Escreva com tom reflexivo, maduro e expositivo, como quem comenta um texto bíblico de forma acessível.
- Prefira perspectivas menos óbvias, com personagens ou episódios bíblicos pouco explorados (Ana, Neemias, Habacuque, Marta, Elias, Gideão).
- Explore contrastes espirituais, como fé e medo ou graça e merecimento.
- Use metáforas sutis e linguagem literária equilibrada.
- Evite clichês e frases prontas.
- Mantenha o texto centrado em Cristo, com coerência teológica e aplicação prática.
- Use entre 350 e 500 palavras.
";

const DEVOTIONAL_SHAPE: &str = r#"Retorne somente o JSON abaixo (nomes dos campos em inglês, conteúdo em português):
{
  "title": "Título breve e instigante",
  "description": "Resumo curto do tema tratado",
  "verse_reference": "Livro Capítulo:Versículos",
  "verse_text": "Texto bíblico em português (Nova Almeida Atualizada)",
  "reflection": "Reflexão expositiva sobre o tema e o texto bíblico",
  "application": "Aplicações práticas em parágrafos corridos, sem listas ou marcações HTML",
  "prayer": "Oração breve, coerente com o tema",
  "reading_time_estimate": 5
}
"#;

/// Prompt for the daily scripture passage.
pub fn passage_prompt(recent_references: &[String]) -> String {
    format!(
        r#"Você é um estudioso da Bíblia e curador de passagens devocionais diárias.

Selecione uma passagem bíblica menos previsível, mas inspiradora, que traga conforto, fé, esperança ou sabedoria ao leitor.

Critérios de seleção:
- Escolha de 1 a 6 versículos consecutivos.
- Evite passagens muito repetidas (Filipenses 4:6-7, João 3:16, Salmos 23, Jeremias 29:11).
- Dê preferência a livros menos citados (Habacuque, Neemias, Sofonias, Tiago, 1 Pedro, Josué, Hebreus).
- Equilibre Antigo e Novo Testamento e varie os gêneros bíblicos.

{avoid}
Formato:
- Tradução Nova Almeida Atualizada (NAA).
- Numere os versículos (1., 2., 3.) e coloque cada um em uma nova linha.
- Apenas o texto bíblico, sem comentários.

Retorne somente o JSON abaixo (nomes dos campos em inglês, conteúdo em português):
{{
  "verse_reference": "Livro Capítulo:Versículos",
  "verse_text": "Versículos numerados separados por quebras de linha (\n)",
  "reading_time_estimate": 2
}}

Exemplo:
{{
  "verse_reference": "Isaías 40:29-31",
  "verse_text": "1. Ele fortalece o cansado e dá grande vigor ao que está sem forças.\n2. Os jovens se cansam e ficam exaustos, e os moços tropeçam e caem,\n3. mas os que esperam no Senhor renovam as suas forças.",
  "reading_time_estimate": 2
}}
"#,
        avoid = avoid_block(recent_references)
    )
}

/// Prompt for the shared daily devotional on `theme`.
pub fn public_devotional_prompt(theme: &str, recent_references: &[String]) -> String {
    format!(
        "Você é um teólogo e escritor cristão especializado em meditações expositivas e devocionais.\n\
         Produza um devocional com profundidade bíblica e linguagem clara.\n\n\
         Gere um devocional ORIGINAL baseado no tema: \"{theme}\".\n\n\
         {style}\n\
         {avoid}\n\
         {shape}",
        theme = theme,
        style = DEVOTIONAL_STYLE,
        avoid = avoid_block(recent_references),
        shape = DEVOTIONAL_SHAPE,
    )
}

/// Prompt for a user's private devotional, grounded in their `feeling`.
pub fn private_devotional_prompt(feeling: &str) -> String {
    format!(
        "Você é um teólogo e escritor cristão especializado em meditações expositivas e devocionais.\n\
         Seu papel não é falar em nome de Deus nem oferecer novas revelações, mas ajudar o leitor a refletir \
         sobre as Escrituras e a orar a partir delas.\n\n\
         Produza um devocional ORIGINAL fundamentado na Bíblia, tomando o sentimento do leitor como contexto \
         humano e não como autoridade interpretativa.\n\n\
         Sentimento do leitor: \"{feeling}\"\n\n\
         Diretrizes teológicas:\n\
         - Apresente o texto como uma leitura possível da Escritura, não como interpretação absoluta.\n\
         - Evite linguagem que sugira profecia, revelação direta ou promessa específica de ação divina.\n\
         - A oração deve ser breve e aberta, convidando o leitor a continuar com suas próprias palavras.\n\n\
         {style}\n\
         {shape}",
        feeling = feeling,
        style = DEVOTIONAL_STYLE,
        shape = DEVOTIONAL_SHAPE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn avoid_block_lists_each_reference() {
        let refs = vec!["Tiago 1:2-4".to_string(), "Habacuque 3:17-19".to_string()];
        let prompt = passage_prompt(&refs);

        assert!(prompt.contains("NÃO SELECIONE"));
        assert!(prompt.contains("- Tiago 1:2-4\n- Habacuque 3:17-19"));
    }

    #[test]
    fn avoid_block_is_omitted_without_references() {
        assert!(!passage_prompt(&[]).contains("NÃO SELECIONE"));
        assert!(!public_devotional_prompt("coragem diante do medo", &[]).contains("NÃO SELECIONE"));
    }

    #[test]
    fn devotional_prompts_embed_their_subject() {
        let public = public_devotional_prompt("o poder do perdão", &["Salmos 46:1".to_string()]);
        assert!(public.contains("\"o poder do perdão\""));
        assert!(public.contains("- Salmos 46:1"));
        assert!(public.contains("\"verse_text\""));

        let private = private_devotional_prompt("sinto-me sozinho");
        assert!(private.contains("Sentimento do leitor: \"sinto-me sozinho\""));
        assert!(!private.contains("NÃO SELECIONE"));
    }

    #[test]
    fn picked_theme_is_from_the_list() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert!(THEMES.contains(&pick_theme(&mut rng)));
        }
    }
}
