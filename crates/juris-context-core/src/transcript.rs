//! Transcript enrichment.
//!
//! [`enrich`] is a pure transform: it takes the stored transcript by
//! reference and returns a new message list in which the most recent
//! `user` turn carries the retrieved context and the answering
//! instructions for the target language. The stored transcript is never
//! touched, so enrichment cannot compound across turns.

use crate::models::{Language, Message, Role};

/// Prompt material for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTemplate {
    /// Initial system turn of a conversation in this language.
    pub system_prompt: String,
    /// Heading placed above the retrieved context.
    pub context_label: String,
    /// Instructions used when context was retrieved.
    pub instructions_with_context: String,
    /// Instructions used when no context is available.
    pub instructions_without_context: String,
}

/// Templates for every [`Language`] the detectors can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub french: LanguageTemplate,
    pub english: LanguageTemplate,
    pub arabic: LanguageTemplate,
    pub tunisian: LanguageTemplate,
}

impl PromptTemplates {
    pub fn get(&self, language: Language) -> &LanguageTemplate {
        match language {
            Language::French => &self.french,
            Language::English => &self.english,
            Language::Arabic => &self.arabic,
            Language::Tunisian => &self.tunisian,
        }
    }

    pub fn system_prompt(&self, language: Language) -> &str {
        &self.get(language).system_prompt
    }
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            french: french(),
            english: english(),
            arabic: arabic(),
            tunisian: tunisian(),
        }
    }
}

fn french() -> LanguageTemplate {
    LanguageTemplate {
        system_prompt: "Tu es un assistant juridique spécialisé en droit tunisien. \
            Tu réponds avec précision, tu cites tes sources et tu signales clairement \
            les limites de tes connaissances."
            .to_string(),
        context_label: "Contexte juridique extrait des documents :".to_string(),
        instructions_with_context: "Consignes :\n\
            - Réponds en français.\n\
            - Appuie-toi sur le contexte ci-dessus et cite mot pour mot les articles et références juridiques qui s'y trouvent.\n\
            - Si le contexte ne suffit pas pour répondre, dis-le explicitement au lieu d'inventer.\n\
            - Structure ta réponse : réponse directe, explication détaillée, références citées, prochaines étapes pratiques."
            .to_string(),
        instructions_without_context: "Consignes :\n\
            - Réponds en français.\n\
            - Aucun document pertinent n'a été trouvé : réponds à partir de tes connaissances générales.\n\
            - Cite les textes de loi si tu les connais avec certitude.\n\
            - Indique clairement les points sur lesquels tu n'es pas sûr.\n\
            - Structure ta réponse : réponse directe, explication détaillée, références citées, prochaines étapes pratiques."
            .to_string(),
    }
}

fn english() -> LanguageTemplate {
    LanguageTemplate {
        system_prompt: "You are a legal assistant specialised in Tunisian law. \
            Answer precisely, cite your sources and be clear about the limits of what you know."
            .to_string(),
        context_label: "Legal context retrieved from the documents:".to_string(),
        instructions_with_context: "Instructions:\n\
            - Answer in English.\n\
            - Rely on the context above and quote any legal articles or references it contains verbatim.\n\
            - If the context is not sufficient to answer, say so explicitly instead of making something up.\n\
            - Structure the answer: direct answer, detailed explanation, cited references, practical next steps."
            .to_string(),
        instructions_without_context: "Instructions:\n\
            - Answer in English.\n\
            - No relevant document was found: answer from general knowledge.\n\
            - Cite legal texts when you know them with certainty.\n\
            - State clearly where you are uncertain.\n\
            - Structure the answer: direct answer, detailed explanation, cited references, practical next steps."
            .to_string(),
    }
}

fn arabic() -> LanguageTemplate {
    LanguageTemplate {
        system_prompt: "أنت مساعد قانوني متخصص في القانون التونسي. \
            أجب بدقة، واذكر مصادرك، ووضّح حدود معرفتك."
            .to_string(),
        context_label: "السياق القانوني المستخرج من الوثائق:".to_string(),
        instructions_with_context: "التعليمات:\n\
            - أجب باللغة العربية.\n\
            - اعتمد على السياق أعلاه وانقل الفصول والمراجع القانونية الواردة فيه حرفياً.\n\
            - إذا لم يكن السياق كافياً للإجابة، صرّح بذلك بوضوح بدل الاختلاق.\n\
            - رتّب إجابتك: إجابة مباشرة، ثم شرح مفصل، ثم المراجع المذكورة، ثم الخطوات العملية التالية."
            .to_string(),
        instructions_without_context: "التعليمات:\n\
            - أجب باللغة العربية.\n\
            - لم يتم العثور على وثائق ذات صلة: أجب اعتماداً على معرفتك العامة.\n\
            - اذكر النصوص القانونية إن كنت متأكداً منها.\n\
            - وضّح النقاط التي لست متأكداً منها.\n\
            - رتّب إجابتك: إجابة مباشرة، ثم شرح مفصل، ثم المراجع المذكورة، ثم الخطوات العملية التالية."
            .to_string(),
    }
}

fn tunisian() -> LanguageTemplate {
    LanguageTemplate {
        system_prompt: "Tu es un assistant juridique spécialisé en droit tunisien. \
            L'utilisateur écrit en dialecte tunisien (derja) : réponds en derja, \
            avec précision, en citant tes sources."
            .to_string(),
        context_label: "Contexte juridique extrait des documents :".to_string(),
        instructions_with_context: "Consignes :\n\
            - Réponds en dialecte tunisien (derja), dans l'écriture utilisée par l'utilisateur.\n\
            - Cite mot pour mot, dans leur langue d'origine, les articles et références juridiques présents dans le contexte.\n\
            - Si le contexte ne suffit pas pour répondre, dis-le explicitement au lieu d'inventer.\n\
            - Structure ta réponse : réponse directe, explication détaillée, références citées, prochaines étapes pratiques."
            .to_string(),
        instructions_without_context: "Consignes :\n\
            - Réponds en dialecte tunisien (derja), dans l'écriture utilisée par l'utilisateur.\n\
            - Aucun document pertinent n'a été trouvé : réponds à partir de tes connaissances générales.\n\
            - Cite les textes de loi si tu les connais avec certitude.\n\
            - Indique clairement les points sur lesquels tu n'es pas sûr.\n\
            - Structure ta réponse : réponse directe, explication détaillée, références citées, prochaines étapes pratiques."
            .to_string(),
    }
}

/// Render the enriched body of a user turn.
pub fn render_user_turn(
    user_text: &str,
    context: &str,
    template: &LanguageTemplate,
) -> String {
    if context.trim().is_empty() {
        format!(
            "{}\n\n{}",
            user_text, template.instructions_without_context
        )
    } else {
        format!(
            "{}\n\n{}\n{}\n\n{}",
            user_text,
            template.context_label,
            context.trim_end(),
            template.instructions_with_context
        )
    }
}

/// Return a copy of `messages` whose last `user` turn embeds `context`
/// and the instructions for `language`. Without a user turn the copy is
/// returned unchanged.
pub fn enrich(
    messages: &[Message],
    context: &str,
    language: Language,
    templates: &PromptTemplates,
) -> Vec<Message> {
    let mut enriched = messages.to_vec();
    if let Some(turn) = enriched.iter_mut().rev().find(|m| m.role == Role::User) {
        turn.content = render_user_turn(&turn.content, context, templates.get(language));
    }
    enriched
}
