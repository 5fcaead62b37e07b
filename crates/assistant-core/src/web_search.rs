use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};
use url::Url;

use crate::desktop::DesktopActions;
use crate::telemetry::LogContext;

static RECIPE_TRIGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"найти рецепт|как приготовить|рецепт").expect("valid regex"));
static RECIPE_EXTRACTORS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"рецепт\s+([а-яё\s]+)").expect("valid regex"),
        Regex::new(r"приготовить\s+([а-яё\s]+)").expect("valid regex"),
        Regex::new(r"найти\s+рецепт\s+([а-яё\s]+)").expect("valid regex"),
    ]
});
static VIDEO_TRIGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"найти видео|посмотреть видео").expect("valid regex"));
static VIDEO_EXTRACTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"видео\s+([а-яё\s]+)").expect("valid regex"));
static GENERAL_TRIGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"найти|поиск|искать|загугли|найди").expect("valid regex"));

const RECIPE_PHRASES: [&str; 3] = ["найти рецепт", "рецепт", "как приготовить"];
const VIDEO_PHRASES: [&str; 2] = ["найти видео", "посмотреть видео"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Recipe,
    Video,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIntent {
    pub kind: SearchKind,
    pub query: String,
}

struct SearchRule {
    kind: SearchKind,
    trigger: &'static LazyLock<Regex>,
    extract: fn(&str) -> String,
}

/// Evaluated top to bottom; the first rule whose trigger matches decides.
static SEARCH_RULES: [SearchRule; 3] = [
    SearchRule {
        kind: SearchKind::Recipe,
        trigger: &RECIPE_TRIGGER,
        extract: extract_dish_name,
    },
    SearchRule {
        kind: SearchKind::Video,
        trigger: &VIDEO_TRIGGER,
        extract: extract_video_topic,
    },
    SearchRule {
        kind: SearchKind::General,
        trigger: &GENERAL_TRIGGER,
        extract: extract_general_query,
    },
];

/// Classifies `text` as a search request without touching the browser.
pub fn detect_search_intent(text: &str) -> Option<SearchIntent> {
    let normalized = text.to_lowercase();
    SEARCH_RULES
        .iter()
        .find(|rule| rule.trigger.is_match(&normalized))
        .map(|rule| SearchIntent {
            kind: rule.kind,
            query: (rule.extract)(&normalized),
        })
}

fn extract_dish_name(text: &str) -> String {
    first_capture(RECIPE_EXTRACTORS.iter(), text)
        .unwrap_or_else(|| strip_phrases(text, &RECIPE_PHRASES))
}

fn extract_video_topic(text: &str) -> String {
    first_capture(std::iter::once(&*VIDEO_EXTRACTOR), text)
        .unwrap_or_else(|| strip_phrases(text, &VIDEO_PHRASES))
}

fn extract_general_query(text: &str) -> String {
    GENERAL_TRIGGER.replace_all(text, "").trim().to_string()
}

fn first_capture<'a>(patterns: impl Iterator<Item = &'a Regex>, text: &str) -> Option<String> {
    patterns
        .filter_map(|pattern| pattern.captures(text))
        .find_map(|captures| captures.get(1))
        .map(|capture| capture.as_str().trim().to_string())
}

fn strip_phrases(text: &str, phrases: &[&str]) -> String {
    phrases
        .iter()
        .fold(text.to_string(), |acc, phrase| acc.replace(phrase, ""))
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEngine {
    Google,
    Yandex,
    Bing,
}

impl SearchEngine {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "google" => Some(Self::Google),
            "yandex" => Some(Self::Yandex),
            "bing" => Some(Self::Bing),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Yandex => "yandex",
            Self::Bing => "bing",
        }
    }

    pub fn search_url(self, query: &str) -> Result<Url, url::ParseError> {
        let (base, key) = match self {
            Self::Google => ("https://www.google.com/search", "q"),
            Self::Yandex => ("https://yandex.ru/search/", "text"),
            Self::Bing => ("https://www.bing.com/search", "q"),
        };
        let mut url = Url::parse(base)?;
        url.query_pairs_mut().append_pair(key, query);
        Ok(url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecializedSearch {
    Recipe,
    Video,
    Map,
    News,
}

impl SpecializedSearch {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Recipe => "рецепт",
            Self::Video => "видео",
            Self::Map => "карта",
            Self::News => "новости",
        }
    }

    pub fn search_url(self, query: &str) -> Result<Url, url::ParseError> {
        match self {
            Self::Recipe => {
                let mut url = Url::parse("https://www.google.com/search")?;
                url.query_pairs_mut()
                    .append_pair("q", &format!("{query} рецепт"));
                Ok(url)
            }
            Self::Video => {
                let mut url = Url::parse("https://www.youtube.com/results")?;
                url.query_pairs_mut().append_pair("search_query", query);
                Ok(url)
            }
            Self::Map => {
                let mut url = Url::parse("https://www.google.com/maps/search/")?;
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(query);
                }
                Ok(url)
            }
            Self::News => {
                let mut url = Url::parse("https://news.google.com/search")?;
                url.query_pairs_mut().append_pair("q", query);
                Ok(url)
            }
        }
    }
}

/// Opens search results in the browser and phrases the confirmation.
#[derive(Debug, Clone)]
pub struct WebSearch {
    engine: SearchEngine,
    log: LogContext,
}

impl WebSearch {
    pub fn new(log: LogContext) -> Self {
        Self {
            engine: SearchEngine::Google,
            log,
        }
    }

    pub fn with_engine(mut self, engine: SearchEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn search(&self, query: &str, desktop: &dyn DesktopActions) -> String {
        info!(parent: self.log.span(), query, engine = self.engine.as_str(), "web search");
        match self.engine.search_url(query) {
            Ok(url) => match self.navigate(&url, desktop) {
                Ok(()) => format!("Ищу '{query}' в {}", self.engine.as_str()),
                Err(reply) => reply,
            },
            Err(err) => self.url_failure(err),
        }
    }

    pub fn specialized_search(
        &self,
        query: &str,
        kind: SpecializedSearch,
        desktop: &dyn DesktopActions,
    ) -> String {
        info!(parent: self.log.span(), query, kind = kind.label(), "specialized search");
        match kind.search_url(query) {
            Ok(url) => match self.navigate(&url, desktop) {
                Ok(()) => format!("Ищу {} по запросу '{query}'", kind.label()),
                Err(reply) => reply,
            },
            Err(err) => self.url_failure(err),
        }
    }

    pub fn search_recipe(&self, dish_name: &str, desktop: &dyn DesktopActions) -> String {
        self.specialized_search(dish_name, SpecializedSearch::Recipe, desktop)
    }

    pub fn search_video(&self, topic: &str, desktop: &dyn DesktopActions) -> String {
        self.specialized_search(topic, SpecializedSearch::Video, desktop)
    }

    /// Runs whichever search `text` asks for. `None` when it is not a search request.
    pub fn parse_search_intent(&self, text: &str, desktop: &dyn DesktopActions) -> Option<String> {
        let intent = detect_search_intent(text)?;
        Some(self.execute(&intent, desktop))
    }

    pub fn execute(&self, intent: &SearchIntent, desktop: &dyn DesktopActions) -> String {
        match intent.kind {
            SearchKind::Recipe => self.search_recipe(&intent.query, desktop),
            SearchKind::Video => self.search_video(&intent.query, desktop),
            SearchKind::General => self.search(&intent.query, desktop),
        }
    }

    fn navigate(&self, url: &Url, desktop: &dyn DesktopActions) -> Result<(), String> {
        desktop.open_url(url.as_str()).map_err(|err| {
            warn!(parent: self.log.span(), error = %err, "failed to open search results");
            format!("Не удалось открыть браузер: {err}")
        })
    }

    fn url_failure(&self, err: url::ParseError) -> String {
        warn!(parent: self.log.span(), error = %err, "failed to build search url");
        "Не удалось сформировать поисковый запрос".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use super::{
        SearchEngine, SearchIntent, SearchKind, SpecializedSearch, WebSearch,
        detect_search_intent,
    };
    use crate::desktop::{DesktopActionError, DesktopActions, PowerAction};
    use crate::telemetry::LogContext;

    #[derive(Default)]
    struct Browser {
        opened: Mutex<Vec<String>>,
        offline: bool,
    }

    impl DesktopActions for Browser {
        fn launch_program(&self, _program: &str) -> Result<(), DesktopActionError> {
            Ok(())
        }

        fn open_url(&self, url: &str) -> Result<(), DesktopActionError> {
            if self.offline {
                return Err(DesktopActionError::Open {
                    target: url.to_string(),
                    reason: "no browser".to_string(),
                });
            }
            self.opened.lock().expect("lock").push(url.to_string());
            Ok(())
        }

        fn open_path(&self, _path: &Path) -> Result<(), DesktopActionError> {
            Ok(())
        }

        fn terminate_process(&self, _image_name: &str) -> Result<(), DesktopActionError> {
            Ok(())
        }

        fn power(&self, _action: PowerAction) -> Result<(), DesktopActionError> {
            Ok(())
        }

        fn capture_screen(&self, _destination: &Path) -> Result<(), DesktopActionError> {
            Ok(())
        }
    }

    fn intent(kind: SearchKind, query: &str) -> Option<SearchIntent> {
        Some(SearchIntent {
            kind,
            query: query.to_string(),
        })
    }

    #[test]
    fn recipe_rule_extracts_dish_name() {
        assert_eq!(
            detect_search_intent("найди рецепт борща"),
            intent(SearchKind::Recipe, "борща")
        );
        assert_eq!(
            detect_search_intent("Как приготовить плов по-узбекски"),
            intent(SearchKind::Recipe, "плов по")
        );
    }

    #[test]
    fn recipe_rule_falls_back_to_stripping_triggers() {
        assert_eq!(detect_search_intent("рецепт"), intent(SearchKind::Recipe, ""));
        assert_eq!(
            detect_search_intent("как приготовить 2 яйца"),
            intent(SearchKind::Recipe, "2 яйца")
        );
    }

    #[test]
    fn video_rule_extracts_topic() {
        assert_eq!(
            detect_search_intent("хочу посмотреть видео про космос"),
            intent(SearchKind::Video, "про космос")
        );
        assert_eq!(
            detect_search_intent("найти видео 2024"),
            intent(SearchKind::Video, "2024")
        );
    }

    #[test]
    fn recipe_rule_outranks_video_rule() {
        assert_eq!(
            detect_search_intent("найти видео рецепт пиццы"),
            intent(SearchKind::Recipe, "пиццы")
        );
    }

    #[test]
    fn general_rule_strips_every_trigger_word() {
        assert_eq!(
            detect_search_intent("загугли погоду на марсе найди"),
            intent(SearchKind::General, "погоду на марсе")
        );
    }

    #[test]
    fn text_without_triggers_is_not_a_search() {
        assert_eq!(detect_search_intent("текст без триггеров"), None);
        assert_eq!(detect_search_intent(""), None);
    }

    #[test]
    fn urls_are_percent_encoded() {
        let url = SearchEngine::Yandex.search_url("rust книги").expect("url");
        assert_eq!(url.as_str(), "https://yandex.ru/search/?text=rust+%D0%BA%D0%BD%D0%B8%D0%B3%D0%B8");

        let url = SpecializedSearch::Map.search_url("red square").expect("url");
        assert_eq!(url.as_str(), "https://www.google.com/maps/search/red%20square");

        let url = SpecializedSearch::Video.search_url("cats").expect("url");
        assert_eq!(url.as_str(), "https://www.youtube.com/results?search_query=cats");
    }

    #[test]
    fn engine_names_parse_case_insensitively() {
        assert_eq!(SearchEngine::parse(" Bing "), Some(SearchEngine::Bing));
        assert_eq!(SearchEngine::parse("altavista"), None);
    }

    #[test]
    fn parse_search_intent_names_the_dish_and_opens_one_page() {
        let browser = Browser::default();
        let search = WebSearch::new(LogContext::disabled());

        let reply = search
            .parse_search_intent("найди рецепт борща", &browser)
            .expect("recipe request");

        assert_eq!(reply, "Ищу рецепт по запросу 'борща'");
        let opened = browser.opened.lock().expect("lock").clone();
        assert_eq!(opened.len(), 1);
        assert!(opened[0].starts_with("https://www.google.com/search?q="));
    }

    #[test]
    fn parse_search_intent_ignores_plain_text() {
        let browser = Browser::default();
        let search = WebSearch::new(LogContext::disabled());

        assert_eq!(search.parse_search_intent("текст без триггеров", &browser), None);
        assert!(browser.opened.lock().expect("lock").is_empty());
    }

    #[test]
    fn general_search_uses_selected_engine_and_reports_browser_failure() {
        let browser = Browser::default();
        let search = WebSearch::new(LogContext::disabled()).with_engine(SearchEngine::Bing);
        assert_eq!(search.search("rust", &browser), "Ищу 'rust' в bing");
        assert_eq!(
            *browser.opened.lock().expect("lock"),
            vec!["https://www.bing.com/search?q=rust".to_string()]
        );

        let offline = Browser {
            offline: true,
            ..Browser::default()
        };
        assert_eq!(
            search.search("rust", &offline),
            "Не удалось открыть браузер: failed to open https://www.bing.com/search?q=rust: no browser"
        );
    }
}
