use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::applications::ApplicationManager;
use crate::commands::CommandTriggerTable;
use crate::config::{AssistantSettings, JarvisPaths};
use crate::desktop::DesktopActions;
use crate::dispatch::Dispatch;
use crate::fallback::GenerativeFallback;
use crate::llm::{LlmGateway, OpenAiConfigError};
use crate::memory::ConversationMemory;
use crate::personal::PersonalAssistant;
use crate::router::CommandRouter;
use crate::speech::{SpeechInput, SpeechOutput};
use crate::system::SystemCommands;
use crate::telemetry::LogContext;
use crate::weather::{OpenWeatherClient, OpenWeatherConfig, WeatherError, WeatherLookup};
use crate::web_search::{SearchKind, WebSearch, detect_search_intent};

pub const UNRECOGNIZED_COMMAND_REPLY: &str = "Не удалось распознать команду";
pub const FAREWELL_REPLY: &str = "До свидания!";
pub const INTRODUCTION: &str =
    "Здравствуйте! Я Джарвис, ваш персональный ассистент. Как я могу к вам обращаться?";

#[derive(Debug, Error)]
pub enum AssistantBuildError {
    #[error("completion client: {0}")]
    Llm(#[from] OpenAiConfigError),
    #[error("weather client: {0}")]
    Weather(#[from] WeatherError),
}

/// External effects the assistant is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub desktop: Arc<dyn DesktopActions>,
    /// `None` disables generative answers.
    pub llm: Option<Arc<dyn LlmGateway>>,
    /// `None` makes weather questions answer with the setup instruction.
    pub weather: Option<Arc<dyn WeatherLookup>>,
}

/// The listen, route, dispatch, speak loop.
pub struct Assistant {
    settings: AssistantSettings,
    paths: JarvisPaths,
    router: CommandRouter,
    memory: ConversationMemory,
    fallback: GenerativeFallback,
    system: SystemCommands,
    applications: ApplicationManager,
    web_search: WebSearch,
    desktop: Arc<dyn DesktopActions>,
    running: bool,
    log: LogContext,
}

impl Assistant {
    /// Wires the HTTP-backed completion and weather clients from `settings`.
    pub fn new(
        settings: AssistantSettings,
        paths: JarvisPaths,
        desktop: Arc<dyn DesktopActions>,
        log: LogContext,
    ) -> Result<Self, AssistantBuildError> {
        let fallback = GenerativeFallback::from_settings(&settings.ai, log.component("ai"))?;

        let weather = match settings.weather_api_key() {
            Some(api_key) => Some(Arc::new(OpenWeatherClient::new(
                OpenWeatherConfig::with_api_key(api_key),
            )?) as Arc<dyn WeatherLookup>),
            None => {
                warn!(parent: log.span(), "no weather API key configured");
                None
            }
        };

        Ok(Self::assemble(settings, paths, desktop, fallback, weather, log))
    }

    pub fn with_collaborators(
        settings: AssistantSettings,
        paths: JarvisPaths,
        collaborators: Collaborators,
        log: LogContext,
    ) -> Self {
        let fallback = GenerativeFallback::new(
            collaborators.llm,
            settings.ai.model.clone(),
            settings.ai.max_tokens,
            log.component("ai"),
        );
        Self::assemble(
            settings,
            paths,
            collaborators.desktop,
            fallback,
            collaborators.weather,
            log,
        )
    }

    fn assemble(
        settings: AssistantSettings,
        paths: JarvisPaths,
        desktop: Arc<dyn DesktopActions>,
        fallback: GenerativeFallback,
        weather: Option<Arc<dyn WeatherLookup>>,
        log: LogContext,
    ) -> Self {
        let table = CommandTriggerTable::load(&paths.commands_file, &log.component("commands"));
        let personal = PersonalAssistant::new(
            weather,
            settings.default_city.clone(),
            &settings.time_zone,
            log.component("personal"),
        );
        let router = CommandRouter::new(table, personal, log.component("router"));
        let memory = ConversationMemory::load(&paths.memory_dir, log.component("memory"));
        let system = SystemCommands::new(paths.media_dir.clone(), log.component("system"));
        let applications = ApplicationManager::new(log.component("apps"));
        let web_search = WebSearch::new(log.component("web_search"));

        info!(
            parent: log.span(),
            triggers = router.table().len(),
            generative = fallback.is_configured(),
            "assistant initialized"
        );

        Self {
            settings,
            paths,
            router,
            memory,
            fallback,
            system,
            applications,
            web_search,
            desktop,
            running: true,
            log,
        }
    }

    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Greets a known user by name, otherwise asks for a name and stores it.
    pub async fn greet(&mut self, input: &mut dyn SpeechInput, output: &mut dyn SpeechOutput) {
        let user_name = self.settings.user_name.trim().to_string();
        if !user_name.is_empty() {
            output
                .speak(&format!("Здравствуйте, {user_name}! Джарвис к вашим услугам."))
                .await;
            return;
        }

        output.speak(INTRODUCTION).await;
        let heard = input.listen().await;
        let user_name = heard.trim();
        if user_name.is_empty() {
            return;
        }

        self.settings.user_name = user_name.to_string();
        match self.settings.save(&self.paths.settings_file) {
            Ok(()) => info!(parent: self.log.span(), "user name saved"),
            Err(err) => error!(parent: self.log.span(), error = %err, "failed to save user name"),
        }
        output
            .speak(&format!("Приятно познакомиться, {user_name}!"))
            .await;
    }

    /// Greets, then handles utterances one at a time until an exit command
    /// arrives or the input closes.
    pub async fn run(&mut self, input: &mut dyn SpeechInput, output: &mut dyn SpeechOutput) {
        self.greet(input, output).await;

        while self.running {
            if input.is_closed() {
                info!(parent: self.log.span(), "speech input closed");
                break;
            }

            let command = input.listen().await;
            if command.is_empty() {
                continue;
            }

            info!(parent: self.log.span(), command = %command, "command received");
            let response = self.process_command(&command).await;
            info!(parent: self.log.span(), response = %response, "responding");
            output.speak(&response).await;
        }

        info!(parent: self.log.span(), "assistant stopped");
    }

    pub async fn process_command(&mut self, command: &str) -> String {
        if command.trim().is_empty() {
            return UNRECOGNIZED_COMMAND_REPLY.to_string();
        }

        let intent = self.router.resolve(command).await;
        let dispatch = Dispatch::from_intent(&intent);
        info!(
            parent: self.log.span(),
            category = intent.category.as_str(),
            action = intent.action.as_str(),
            parameters = %intent.parameters,
            handler = dispatch.label(),
            "intent resolved"
        );

        let desktop = self.desktop.as_ref();
        match dispatch {
            Dispatch::System(action) => self.system.execute(action, desktop),
            Dispatch::OpenApplication { name } => {
                self.applications.open_application(&name, desktop)
            }
            Dispatch::CloseApplication { name } => {
                self.applications.close_application(&name, desktop)
            }
            Dispatch::Search { kind, query } => match kind {
                SearchKind::General => self.web_search.search(&query, desktop),
                SearchKind::Recipe => self.web_search.search_recipe(&query, desktop),
                SearchKind::Video => self.web_search.search_video(&query, desktop),
            },
            Dispatch::SearchIntent { text } => match detect_search_intent(&text) {
                Some(search) => self.web_search.execute(&search, desktop),
                None => self.fallback.process(&mut self.memory, command).await,
            },
            Dispatch::Reply(answer) => answer,
            Dispatch::Exit => {
                self.running = false;
                FAREWELL_REPLY.to_string()
            }
            Dispatch::Generative => self.fallback.process(&mut self.memory, command).await,
        }
    }
}
