//! Application context: everything a command handler needs, built once at
//! startup and passed by reference.

use crate::agent::{Agent, AgentSpec, build_agent};
use crate::backends::capabilities_for;
use crate::capabilities::MailCapabilities;
use crate::composition::{Composition, ProviderFlags, SystemPromptId, select_active_provider};
use crate::config::{AppConfig, PathsConfig};
use crate::env_store::EnvFile;
use crate::template::{CommandTemplates, PromptLibrary};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AppContext {
    pub config: AppConfig,
    /// `config.paths` resolved against the workspace.
    pub paths: PathsConfig,
    pub composition: Composition,
    /// Operations of the active provider; `None` when nothing is linked.
    pub capabilities: Option<MailCapabilities>,
    pub agent: Arc<dyn Agent>,
    /// Bounded sub-agent used by CRM initialization.
    pub init_agent: Arc<dyn Agent>,
    pub templates: CommandTemplates,
    pub env_file: EnvFile,
}

impl AppContext {
    /// Assemble a context from explicit parts.
    pub fn new(
        config: AppConfig,
        workspace: &Path,
        composition: Composition,
        capabilities: Option<MailCapabilities>,
        agent: Arc<dyn Agent>,
        init_agent: Arc<dyn Agent>,
    ) -> Self {
        let paths = config.paths.resolve(workspace);
        Self {
            templates: CommandTemplates::new(paths.commands_dir.clone()),
            env_file: EnvFile::new(paths.env_file.clone()),
            config,
            paths,
            composition,
            capabilities,
            agent,
            init_agent,
        }
    }

    /// Select the provider from `flags` and wire real backends and agents.
    pub fn from_config(config: AppConfig, workspace: &Path, flags: ProviderFlags) -> Self {
        let paths = config.paths.resolve(workspace);
        let composition = select_active_provider(flags);
        match composition.active {
            Some(kind) => info!(provider = %kind, "active email provider selected"),
            None => warn!("no email provider linked"),
        }

        let capabilities = composition
            .active
            .map(|kind| capabilities_for(kind, paths.contacts_file.clone()));

        let prompts = PromptLibrary::new(paths.prompts_dir.clone());
        let agent = build_agent(
            AgentSpec {
                name: "email-agent".to_string(),
                system_prompt: prompts.load(composition.system_prompt),
                tools: composition.tools.names(),
                plugins: composition.plugins.clone(),
                max_iterations: config.agent.max_iterations,
                keep_history: true,
            },
            &config.llm,
        );
        let init_agent = build_agent(
            AgentSpec {
                name: "crm-init".to_string(),
                system_prompt: prompts.load(SystemPromptId::CrmInit),
                tools: composition.init_tools.names(),
                plugins: vec!["re_act"],
                max_iterations: config.agent.init_max_iterations,
                keep_history: false,
            },
            &config.llm,
        );

        Self::new(config, workspace, composition, capabilities, agent, init_agent)
    }
}
