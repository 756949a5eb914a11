//! Language switcher shown in the app header, plus the UI strings each
//! language renders.
//!
//! Switching language moves the app under a `/<code>/` path prefix, so most
//! checks here are URL checks.

use crate::assertion::expect;
use crate::driver::AriaRole;
use crate::locator::{Locator, TextMatch};
use crate::page::Page;
use crate::result::{ProbeError, ProbeResult};
use crate::step::Traced;
use crate::wait::UrlPattern;

/// UI strings of one language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translations {
    /// Navigation link labels
    pub dashboard: &'static str,
    pub expenses: &'static str,
    pub incomes: &'static str,
    pub summary: &'static str,

    /// Expense form
    pub add_expense: &'static str,
    pub amount: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub ai_suggest: &'static str,
    /// A takeout-food description the categorizer files under food
    pub test_description: &'static str,

    /// Case-insensitive heading patterns on the summary screen
    pub financial_summary: &'static str,
    pub ai_insights: &'static str,
    pub alerts: &'static str,
    pub trends: &'static str,
    pub recommendations: &'static str,
}

const ENGLISH: Translations = Translations {
    dashboard: "🏠 Dashboard",
    expenses: "💸 Expenses",
    incomes: "💰 Incomes",
    summary: "📊 Summary",
    add_expense: "Add New Expense",
    amount: "Amount",
    description: "Description",
    category: "Category",
    ai_suggest: "AI Suggest",
    test_description: "Takeout food",
    financial_summary: "Financial Summary",
    ai_insights: "AI Financial Insights",
    alerts: "Alerts",
    trends: "Spending Trends",
    recommendations: "Recommendations",
};

const SPANISH: Translations = Translations {
    dashboard: "🏠 Panel",
    expenses: "💸 Gastos",
    incomes: "💰 Ingresos",
    summary: "📊 Resumen",
    add_expense: "Agregar Nuevo Gasto",
    amount: "Monto",
    description: "Descripción",
    category: "Categoría",
    ai_suggest: "Sugerencia IA",
    test_description: "Comida para llevar",
    financial_summary: "Resumen Financiero",
    ai_insights: "Perspectivas Financieras IA",
    alerts: "Alertas",
    trends: "Tendencias de Gasto",
    recommendations: "Recomendaciones",
};

const PORTUGUESE: Translations = Translations {
    dashboard: "🏠 Painel",
    expenses: "💸 Despesas",
    incomes: "💰 Receitas",
    summary: "📊 Resumo",
    add_expense: "Adicionar Nova Despesa",
    amount: "Valor",
    description: "Descrição",
    category: "Categoria",
    ai_suggest: "Sugestão IA",
    test_description: "Pizza delivery",
    financial_summary: "Resumo Financeiro",
    ai_insights: "Insights Financeiros IA",
    alerts: "Alertas",
    trends: "Tendências de Gastos",
    recommendations: "Recomendações",
};

const FRENCH: Translations = Translations {
    dashboard: "🏠 Tableau de bord",
    expenses: "💸 Dépenses",
    incomes: "💰 Revenus",
    summary: "📊 Résumé",
    add_expense: "Ajouter Nouvelle Dépense",
    amount: "Montant",
    description: "Description",
    category: "Catégorie",
    ai_suggest: "Suggestion IA",
    test_description: "Nourriture à emporter",
    financial_summary: "Résumé Financier",
    ai_insights: "Perspectives Financières IA",
    alerts: "Alertes",
    trends: "Tendances de Dépenses",
    recommendations: "Recommandations",
};

/// Languages the app ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Spanish,
    Portuguese,
    French,
}

impl Language {
    pub const ALL: [Self; 4] = [Self::English, Self::Spanish, Self::Portuguese, Self::French];

    /// Languages reachable from the English default
    pub const SWITCH_TARGETS: [Self; 3] = [Self::Spanish, Self::Portuguese, Self::French];

    /// Flag and native name, as on the switcher buttons
    #[must_use]
    pub const fn button_label(self) -> &'static str {
        match self {
            Self::English => "🇺🇸 English",
            Self::Spanish => "🇪🇸 Español",
            Self::Portuguese => "🇧🇷 Português",
            Self::French => "🇫🇷 Français",
        }
    }

    /// Native name without the flag
    #[must_use]
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Spanish => "Español",
            Self::Portuguese => "Português",
            Self::French => "Français",
        }
    }

    /// Path prefix segment
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
            Self::Portuguese => "pt",
            Self::French => "fr",
        }
    }

    #[must_use]
    pub const fn translations(self) -> &'static Translations {
        match self {
            Self::English => &ENGLISH,
            Self::Spanish => &SPANISH,
            Self::Portuguese => &PORTUGUESE,
            Self::French => &FRENCH,
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.code() == code)
    }

    /// `**/<code>/**`
    #[must_use]
    pub fn url_pattern(self) -> UrlPattern {
        UrlPattern::glob(format!("**/{}/**", self.code()))
    }

    fn path_segment(self) -> String {
        format!("/{}/", self.code())
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.native_name())
    }
}

#[derive(Debug, Clone)]
pub struct LanguageSelector {
    page: Page,
    /// The switcher, whichever language is active
    pub language_button: Locator,
}

impl Traced for LanguageSelector {
    const NAME: &'static str = "LanguageSelector";
}

impl LanguageSelector {
    #[must_use]
    pub fn new(page: &Page) -> Self {
        let any_label = Language::ALL
            .iter()
            .map(|l| regex::escape(l.button_label()))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            page: page.clone(),
            language_button: page.get_by_role(AriaRole::Button, TextMatch::pattern(any_label)),
        }
    }

    pub async fn click_language_button(&self) -> ProbeResult<()> {
        self.try_step("click_language_button", self.language_button.click())
            .await
    }

    /// Open the switcher and pick `language`
    pub async fn select_language(&self, language: Language) -> ProbeResult<()> {
        self.try_step("select_language", async {
            self.click_language_button().await?;
            self.page
                .get_by_role(AriaRole::Button, language.button_label())
                .click()
                .await
        })
        .await
    }

    pub async fn verify_current_language(&self, language: Language) -> ProbeResult<()> {
        let label = TextMatch::pattern(regex::escape(language.button_label()));
        self.try_step(
            "verify_current_language",
            expect(&self.language_button).to_have_text_matching(label),
        )
        .await
    }

    pub async fn wait_for_language_change(&self, language: Language) -> ProbeResult<()> {
        self.try_step("wait_for_language_change", async {
            self.page.wait_for_url(&language.url_pattern()).await?;
            Ok(())
        })
        .await
    }

    pub async fn switch_to_language(&self, language: Language) -> ProbeResult<()> {
        self.try_step("switch_to_language", async {
            self.select_language(language).await?;
            self.wait_for_language_change(language).await
        })
        .await
    }

    pub async fn verify_navigation_link(&self, name: &str) -> ProbeResult<()> {
        let link = self.page.get_by_role(AriaRole::Link, name);
        self.try_step("verify_navigation_link", expect(&link).to_be_visible())
            .await
    }

    /// Dashboard, expenses, incomes and summary links
    pub async fn verify_navigation_links(&self, translations: &Translations) -> ProbeResult<()> {
        self.try_step("verify_navigation_links", async {
            for name in [
                translations.dashboard,
                translations.expenses,
                translations.incomes,
                translations.summary,
            ] {
                self.verify_navigation_link(name).await?;
            }
            Ok(())
        })
        .await
    }

    pub async fn verify_button_text(&self, text: &str) -> ProbeResult<()> {
        let button = self.page.get_by_role(AriaRole::Button, text);
        self.try_step("verify_button_text", expect(&button).to_be_visible())
            .await
    }

    /// The current URL already carries the language prefix
    pub async fn verify_language_persistence(&self, language: Language) -> ProbeResult<()> {
        self.try_step("verify_language_persistence", async {
            let url = self.page.url().await?;
            if url.contains(&language.path_segment()) {
                Ok(())
            } else {
                Err(ProbeError::assertion(format!(
                    "expected {url} to stay under {}",
                    language.path_segment()
                )))
            }
        })
        .await
    }

    /// Wait for the language prefix, then check it
    pub async fn verify_page_in_language(&self, language: Language) -> ProbeResult<()> {
        self.try_step("verify_page_in_language", async {
            self.wait_for_language_change(language).await?;
            self.verify_language_persistence(language).await
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::ElementSnapshot;
    use crate::mock::{Effect, ScriptedDriver};
    use crate::pages::fixtures;
    use std::sync::Arc;

    fn header(language: Language) -> Vec<ElementSnapshot> {
        let t = language.translations();
        let mut elements = vec![
            ElementSnapshot::new("lang", "button").text(language.button_label()),
            ElementSnapshot::new("nav-dashboard", "a").text(t.dashboard),
            ElementSnapshot::new("nav-expenses", "a").text(t.expenses),
            ElementSnapshot::new("nav-incomes", "a").text(t.incomes),
            ElementSnapshot::new("nav-summary", "a").text(t.summary),
            ElementSnapshot::new("add", "button").text(t.add_expense),
        ];
        for other in Language::ALL.into_iter().filter(|l| *l != language) {
            elements.push(
                ElementSnapshot::new(format!("pick-{}", other.code()), "button")
                    .text(other.button_label())
                    .hidden(),
            );
        }
        elements
    }

    fn driver() -> Arc<ScriptedDriver> {
        let mut driver = ScriptedDriver::new().screen("/expenses", header(Language::English));
        for language in Language::SWITCH_TARGETS {
            let code = language.code();
            driver = driver
                .screen(format!("/{code}/expenses"), header(language))
                .screen(format!("/{code}/summary"), header(language))
                .on_click(
                    format!("pick-{code}"),
                    vec![Effect::Navigate(format!("/{code}/expenses"))],
                );
        }
        let menu = Language::SWITCH_TARGETS
            .iter()
            .map(|l| Effect::Show(format!("pick-{}", l.code())))
            .collect();
        Arc::new(driver.on_click("lang", menu).on_click(
            "nav-summary",
            vec![Effect::Navigate("/es/summary".into())],
        ))
    }

    mod language_tests {
        use super::*;

        #[test]
        fn test_codes_round_trip() {
            for language in Language::ALL {
                assert_eq!(Language::from_code(language.code()), Some(language));
            }
            assert_eq!(Language::from_code("de"), None);
        }

        #[test]
        fn test_label_ends_with_native_name() {
            for language in Language::ALL {
                assert!(language.button_label().ends_with(language.native_name()));
            }
        }

        #[test]
        fn test_url_pattern() {
            assert!(Language::Spanish
                .url_pattern()
                .matches("https://app.test/es/dashboard"));
            assert!(!Language::Spanish
                .url_pattern()
                .matches("https://app.test/pt/dashboard"));
        }
    }

    mod selector_tests {
        use super::*;

        #[tokio::test]
        async fn test_switch_updates_url_and_labels() {
            for language in Language::SWITCH_TARGETS {
                let driver = driver();
                let page = fixtures::page(&driver);
                page.goto("/expenses").await.unwrap();
                let selector = LanguageSelector::new(&page);
                selector.verify_current_language(Language::English).await.unwrap();

                selector.switch_to_language(language).await.unwrap();
                selector.verify_page_in_language(language).await.unwrap();
                selector
                    .verify_navigation_links(language.translations())
                    .await
                    .unwrap();
                selector
                    .verify_button_text(language.translations().add_expense)
                    .await
                    .unwrap();
                selector.verify_current_language(language).await.unwrap();
            }
        }

        #[tokio::test]
        async fn test_language_persists_across_navigation() {
            let driver = driver();
            let page = fixtures::page(&driver);
            page.goto("/expenses").await.unwrap();
            let selector = LanguageSelector::new(&page);
            selector.switch_to_language(Language::Spanish).await.unwrap();
            page.get_by_role(AriaRole::Link, SPANISH.summary)
                .click()
                .await
                .unwrap();
            page.wait_for_url(&UrlPattern::glob("**/es/summary"))
                .await
                .unwrap();
            selector
                .verify_language_persistence(Language::Spanish)
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_untranslated_page_fails_persistence() {
            let driver = driver();
            let page = fixtures::page(&driver);
            page.goto("/expenses").await.unwrap();
            let selector = LanguageSelector::new(&page);
            let err = selector
                .verify_language_persistence(Language::French)
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
        }
    }
}
