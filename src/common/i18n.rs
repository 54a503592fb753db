// src/common/i18n.rs

use std::collections::HashMap;

// Traduções embutidas no binário (locales/*.json)
const PT_MESSAGES: &str = include_str!("../../locales/pt.json");
const EN_MESSAGES: &str = include_str!("../../locales/en.json");

pub const DEFAULT_LANG: &str = "pt";

/// Dicionário de mensagens de erro por idioma.
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    /// Carrega os idiomas embutidos. Falha só se algum JSON estiver malformado.
    pub fn load() -> anyhow::Result<Self> {
        let mut messages = HashMap::new();
        messages.insert("pt".to_string(), serde_json::from_str(PT_MESSAGES)?);
        messages.insert("en".to_string(), serde_json::from_str(EN_MESSAGES)?);
        Ok(Self { messages })
    }

    /// Busca a mensagem para a chave, caindo para o idioma padrão e depois para a própria chave.
    /// `{0}` na mensagem é substituído pelo argumento, se houver.
    pub fn translate(&self, lang: &str, key: &str, arg: Option<&str>) -> String {
        let template = self
            .messages
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string());

        match arg {
            Some(value) => template.replace("{0}", value),
            None => template,
        }
    }
}
