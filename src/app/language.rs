//! 界面语言上下文
//!
//! 翻译查找顺序：当前语言表 → 英文表 → key 本身

use std::str::FromStr;
use tokio::sync::watch;
use tracing::info;

/// 支持的界面语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    Es,
    Fr,
    De,
    Pt,
    It,
}

impl Locale {
    pub const ALL: [Locale; 6] = [
        Locale::En,
        Locale::Es,
        Locale::Fr,
        Locale::De,
        Locale::Pt,
        Locale::It,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
            Locale::Fr => "fr",
            Locale::De => "de",
            Locale::Pt => "pt",
            Locale::It => "it",
        }
    }

    fn table(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Locale::En => EN,
            Locale::Es => ES,
            Locale::Fr => FR,
            Locale::De => DE,
            Locale::Pt => PT,
            Locale::It => IT,
        }
    }
}

impl FromStr for Locale {
    type Err = std::convert::Infallible;

    /// 接受 "es"、"es-MX"、"ES_es" 等写法，未知语言退回英文
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Ok(Locale::ALL
            .into_iter()
            .find(|l| l.code() == primary)
            .unwrap_or_default())
    }
}

const EN: &[(&str, &str)] = &[
    ("nav.discover", "Discover"),
    ("nav.favorites", "Favorites"),
    ("nav.journey", "My Journey"),
    ("nav.moderation", "Moderation"),
    ("filter.all", "All"),
    ("filter.gender", "Gender"),
    ("filter.country", "Country"),
    ("filter.language", "Language"),
    ("filter.ethnicity", "Ethnicity"),
    ("filter.category", "Category"),
    ("filter.goal", "Goal"),
    ("filter.no_results", "No broadcasters match your filters"),
    ("status.online", "Online"),
    ("status.offline", "Offline"),
    ("status.live", "Live"),
    ("status.in_session", "In session"),
    ("recommend.title", "Recommended for you"),
    ("recommend.empty", "No recommendations yet"),
    ("auth.sign_in", "Sign in"),
    ("auth.sign_out", "Sign out"),
    ("auth.guest", "Continue as guest"),
    ("auth.delete_failed", "Could not delete your account. Please try again."),
    ("journey.sessions", "Sessions"),
    ("journey.minutes", "Minutes"),
    ("goal.progress", "Goal progress"),
];

const ES: &[(&str, &str)] = &[
    ("nav.discover", "Descubrir"),
    ("nav.favorites", "Favoritos"),
    ("nav.journey", "Mi recorrido"),
    ("filter.all", "Todos"),
    ("filter.gender", "Género"),
    ("filter.country", "País"),
    ("filter.language", "Idioma"),
    ("filter.category", "Categoría"),
    ("filter.no_results", "Ningún emisor coincide con tus filtros"),
    ("status.online", "En línea"),
    ("status.offline", "Desconectado"),
    ("status.live", "En vivo"),
    ("status.in_session", "En sesión"),
    ("recommend.title", "Recomendados para ti"),
    ("auth.sign_in", "Iniciar sesión"),
    ("auth.sign_out", "Cerrar sesión"),
    ("auth.guest", "Continuar como invitado"),
];

const FR: &[(&str, &str)] = &[
    ("nav.discover", "Découvrir"),
    ("nav.favorites", "Favoris"),
    ("filter.all", "Tous"),
    ("filter.language", "Langue"),
    ("status.online", "En ligne"),
    ("status.offline", "Hors ligne"),
    ("status.live", "En direct"),
    ("recommend.title", "Recommandés pour vous"),
    ("auth.sign_in", "Se connecter"),
    ("auth.sign_out", "Se déconnecter"),
];

const DE: &[(&str, &str)] = &[
    ("nav.discover", "Entdecken"),
    ("nav.favorites", "Favoriten"),
    ("filter.all", "Alle"),
    ("filter.language", "Sprache"),
    ("status.online", "Online"),
    ("status.offline", "Offline"),
    ("status.live", "Live"),
    ("recommend.title", "Für dich empfohlen"),
    ("auth.sign_in", "Anmelden"),
    ("auth.sign_out", "Abmelden"),
];

const PT: &[(&str, &str)] = &[
    ("nav.discover", "Descobrir"),
    ("nav.favorites", "Favoritos"),
    ("filter.all", "Todos"),
    ("filter.language", "Idioma"),
    ("status.online", "Online"),
    ("status.offline", "Offline"),
    ("status.live", "Ao vivo"),
    ("recommend.title", "Recomendados para você"),
    ("auth.sign_in", "Entrar"),
    ("auth.sign_out", "Sair"),
];

const IT: &[(&str, &str)] = &[
    ("nav.discover", "Scopri"),
    ("nav.favorites", "Preferiti"),
    ("filter.all", "Tutti"),
    ("filter.language", "Lingua"),
    ("status.online", "Online"),
    ("status.offline", "Offline"),
    ("status.live", "In diretta"),
    ("recommend.title", "Consigliati per te"),
    ("auth.sign_in", "Accedi"),
    ("auth.sign_out", "Esci"),
];

fn lookup(locale: Locale, key: &str) -> Option<&'static str> {
    locale
        .table()
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
}

/// 语言上下文（通过 watch 通道发布当前语言）
pub struct LanguageContext {
    locale: watch::Sender<Locale>,
}

impl LanguageContext {
    pub fn new(locale: Locale) -> Self {
        let (locale, _) = watch::channel(locale);
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        *self.locale.borrow()
    }

    pub fn set_locale(&self, locale: Locale) {
        info!("[Language] 切换界面语言: {}", locale.code());
        self.locale.send_replace(locale);
    }

    pub fn subscribe(&self) -> watch::Receiver<Locale> {
        self.locale.subscribe()
    }

    /// 翻译；找不到时依次退回英文和 key 本身
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        lookup(self.locale(), key)
            .or_else(|| lookup(Locale::En, key))
            .unwrap_or(key)
    }
}

impl Default for LanguageContext {
    fn default() -> Self {
        Self::new(Locale::En)
    }
}
