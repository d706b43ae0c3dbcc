//! System-directive assembly — the persona plus retrieved knowledge.
//!
//! The directive is rebuilt for every turn: a fixed persona preamble for
//! the configured business, then the retrieved snippets concatenated in
//! ranked order, separated by a blank line. Tool schemas travel
//! separately in the completion request; they are not prose.

use heatline_core::turn::ContextSnippet;

/// The assistant persona for one deployment. Built once at startup.
#[derive(Debug, Clone)]
pub struct Persona {
    pub company_name: String,
    pub contact_phone: String,
    /// Replaces the built-in preamble entirely when set.
    pub prompt_override: Option<String>,
}

impl Persona {
    pub fn from_config(config: &heatline_config::AppConfig) -> Self {
        Self {
            company_name: config.company.name.clone(),
            contact_phone: config.company.contact_phone.clone(),
            prompt_override: config.answers.system_prompt_override.clone(),
        }
    }

    /// The persona preamble, before any retrieved knowledge.
    pub fn preamble(&self) -> String {
        if let Some(override_prompt) = &self.prompt_override {
            return override_prompt.clone();
        }
        format!(
            "You are the customer assistant for {name}, a heating and cooling service company. \
             Answer customer questions using the knowledge provided below when it is relevant. \
             Use the available tools when the customer asks you to take an action. \
             When you cannot help, refer the customer to {phone}. \
             Be concise and practical.",
            name = self.company_name,
            phone = self.contact_phone,
        )
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::from_config(&heatline_config::AppConfig::default())
    }
}

/// Assemble the full system directive for one turn.
pub fn build_directive(persona: &Persona, snippets: &[ContextSnippet]) -> String {
    let mut directive = persona.preamble();

    if !snippets.is_empty() {
        directive.push_str("\n\n## Relevant knowledge\n");
        for snippet in snippets {
            directive.push('\n');
            directive.push_str(snippet.content.trim());
            directive.push('\n');
        }
    }

    directive
}
