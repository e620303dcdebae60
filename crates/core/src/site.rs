//! Admin-editable site documents.
//!
//! Each document is stored as JSON under a fixed key. A missing document
//! reads as its [`Default`], and missing fields inside a stored document are
//! filled from the default too, so older documents keep working as fields
//! are added.

use serde::{Deserialize, Serialize};

/// Storage keys of the site documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteDocument {
    Filters,
    ActiveFilters,
    Content,
    Sections,
}

impl SiteDocument {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Filters => "filters",
            Self::ActiveFilters => "active_filters",
            Self::Content => "content",
            Self::Sections => "sections",
        }
    }
}

/// How the header logo is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogoMode {
    #[default]
    Text,
    Image,
    Both,
}

/// Branding: logo, favicon and title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteContent {
    pub logo_text: String,
    pub logo_image_url: String,
    pub logo_mode: LogoMode,
    pub favicon_url: String,
    pub site_title: String,
    pub logo_image_size_percent: u16,
}

impl Default for SiteContent {
    fn default() -> Self {
        Self {
            logo_text: "Meu Site".to_owned(),
            logo_image_url: String::new(),
            logo_mode: LogoMode::Text,
            favicon_url: String::new(),
            site_title: "Minha Loja".to_owned(),
            logo_image_size_percent: 100,
        }
    }
}

impl SiteContent {
    /// Clamp the logo size into a usable range.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.logo_image_size_percent = self.logo_image_size_percent.clamp(10, 300);
        self
    }
}

/// Per-section visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct EnabledSections {
    pub top: bool,
    pub about: bool,
    pub features: bool,
    pub contact: bool,
    pub footer: bool,
}

impl Default for EnabledSections {
    fn default() -> Self {
        Self {
            top: true,
            about: true,
            features: true,
            contact: true,
            footer: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Link {
    pub label: String,
    pub url: String,
}

fn link(label: &str, url: &str) -> Link {
    Link {
        label: label.to_owned(),
        url: url.to_owned(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TopSection {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub action_button_1: Option<Link>,
    pub action_button_2: Option<Link>,
}

/// About section; the body is an opaque rich-text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AboutSection {
    pub title: String,
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Benefit {
    pub icon: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FeaturesSection {
    pub title: String,
    pub subtitle: String,
    pub benefits: Vec<Benefit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OpeningHours {
    pub open: String,
    pub close: String,
}

/// Opening hours, Monday first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WeeklyHours {
    pub monday: OpeningHours,
    pub tuesday: OpeningHours,
    pub wednesday: OpeningHours,
    pub thursday: OpeningHours,
    pub friday: OpeningHours,
    pub saturday: OpeningHours,
    pub sunday: OpeningHours,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ContactSection {
    pub title: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub opening_hours: WeeklyHours,
    pub show_contact_form: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FooterColumn {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FooterSection {
    pub text: String,
    pub column_1: FooterColumn,
    pub column_2: Vec<Link>,
    pub column_3: String,
}

/// Home page sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSections {
    pub enabled: EnabledSections,
    pub top: TopSection,
    pub about: AboutSection,
    pub features: FeaturesSection,
    pub contact: ContactSection,
    pub footer: FooterSection,
}

impl Default for SiteSections {
    fn default() -> Self {
        let benefit = |icon: &str, title: &str, description: &str| Benefit {
            icon: icon.to_owned(),
            title: title.to_owned(),
            description: description.to_owned(),
        };
        Self {
            enabled: EnabledSections::default(),
            top: TopSection {
                title: "Bem-vindo à Minha Loja".to_owned(),
                subtitle: "Os melhores produtos para você".to_owned(),
                image_url: String::new(),
                action_button_1: Some(link("Ver Produtos", "/produtos")),
                action_button_2: Some(link("Contato", "/contato")),
            },
            about: AboutSection {
                title: "Sobre Nós".to_owned(),
                content: serde_json::json!({
                    "blocks": [{
                        "type": "paragraph",
                        "data": { "text": "Somos uma loja dedicada a oferecer os melhores produtos." }
                    }]
                }),
            },
            features: FeaturesSection {
                title: "Por que escolher a gente?".to_owned(),
                subtitle: "Benefícios de comprar conosco".to_owned(),
                benefits: vec![
                    benefit(
                        "shield",
                        "Compra Protegida",
                        "Seus dados protegidos com as melhores práticas de segurança",
                    ),
                    benefit(
                        "truck",
                        "Entrega Rápida",
                        "Receba seus produtos rapidamente em todo o Brasil",
                    ),
                    benefit(
                        "star",
                        "Produtos Selecionados",
                        "Só trabalhamos com produtos de alta qualidade",
                    ),
                ],
            },
            contact: ContactSection {
                title: "Fale Conosco".to_owned(),
                email: "contato@minhaloja.com".to_owned(),
                phone: "(11) 99999-9999".to_owned(),
                address: "Rua Exemplo, 123, São Paulo - SP".to_owned(),
                opening_hours: WeeklyHours::default(),
                show_contact_form: true,
            },
            footer: FooterSection {
                text: "© Minha Loja. Todos os direitos reservados.".to_owned(),
                column_1: FooterColumn {
                    title: "E-Shop".to_owned(),
                    description: "Sobre a loja: Somos referência em qualidade e atendimento."
                        .to_owned(),
                },
                column_2: vec![
                    link("Início", "/"),
                    link("Produtos", "/produtos"),
                    link("Contato", "/contato"),
                ],
                column_3: "Fale conosco: contato@minhaloja.com | (11) 99999-9999".to_owned(),
            },
        }
    }
}

impl SiteSections {
    /// Drop sections that are switched off, for public rendering.
    #[must_use]
    pub fn visible(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        let mut put = |key: &str, on: bool, value: serde_json::Result<serde_json::Value>| {
            if on && let Ok(value) = value {
                out.insert(key.to_owned(), value);
            }
        };
        put("top", self.enabled.top, serde_json::to_value(&self.top));
        put("about", self.enabled.about, serde_json::to_value(&self.about));
        put(
            "features",
            self.enabled.features,
            serde_json::to_value(&self.features),
        );
        put(
            "contact",
            self.enabled.contact,
            serde_json::to_value(&self.contact),
        );
        put("footer", self.enabled.footer, serde_json::to_value(&self.footer));
        serde_json::Value::Object(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_defaults_fill_missing_fields() {
        let content: SiteContent =
            serde_json::from_str(r#"{"site_title":"Camisas Retrô","logo_mode":"both"}"#).unwrap();
        assert_eq!(content.site_title, "Camisas Retrô");
        assert_eq!(content.logo_mode, LogoMode::Both);
        assert_eq!(content.logo_text, "Meu Site");
        assert_eq!(content.logo_image_size_percent, 100);
    }

    #[test]
    fn test_content_normalized_clamps_size() {
        let content = SiteContent {
            logo_image_size_percent: 900,
            ..SiteContent::default()
        }
        .normalized();
        assert_eq!(content.logo_image_size_percent, 300);
    }

    #[test]
    fn test_sections_default_all_enabled() {
        let sections = SiteSections::default();
        assert_eq!(sections.enabled, EnabledSections::default());
        assert_eq!(sections.features.benefits.len(), 3);
        assert!(sections.contact.show_contact_form);
    }

    #[test]
    fn test_visible_hides_disabled_sections() {
        let mut sections = SiteSections::default();
        sections.enabled.about = false;
        let visible = sections.visible();
        assert!(visible.get("about").is_none());
        assert_eq!(visible["top"]["title"], "Bem-vindo à Minha Loja");
    }

    #[test]
    fn test_partial_sections_document() {
        let sections: SiteSections =
            serde_json::from_str(r#"{"enabled":{"footer":false},"top":{"title":"Oi"}}"#).unwrap();
        assert!(!sections.enabled.footer);
        assert!(sections.enabled.top);
        assert_eq!(sections.top.title, "Oi");
        // nested structs default to empty, not to the storefront copy
        assert_eq!(sections.top.subtitle, "");
        assert_eq!(sections.contact.title, "Fale Conosco");
    }

    #[test]
    fn test_document_keys() {
        assert_eq!(SiteDocument::ActiveFilters.key(), "active_filters");
    }
}
