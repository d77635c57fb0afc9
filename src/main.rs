use std::sync::Arc;

use aclengine::acl::{decide, load_acls, AccessDecision, Principal};
use aclengine::directory::{DirectorySources, FilterCriteria, MemoryDirectory, ResolveContext};
use aclengine::errors::EngineError;
use aclengine::resolve::{find_users, PrincipalResolver};
use aclengine::settings::Settings;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "aclengine",
    version,
    about = "Access control resolution engine"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the effective access level of a session on a resource
    Check {
        /// Resource whose ACL is evaluated
        #[arg(short, long)]
        resource: String,
        /// Authenticated user; repeat for provider-qualified names
        #[arg(short, long = "user")]
        users: Vec<String>,
        /// Extra group asserted by the caller
        #[arg(long = "group")]
        groups: Vec<String>,
        /// Extra role asserted by the caller
        #[arg(long = "role")]
        roles: Vec<String>,
        /// Override `directory.community`
        #[arg(long)]
        community: Option<String>,
    },
    /// List the roles of a user or group
    Roles {
        #[arg(long, conflicts_with = "group", required_unless_present = "group")]
        user: Option<String>,
        #[arg(long)]
        group: Option<String>,
    },
    /// Flatten nested groups into their members
    Expand {
        #[arg(long = "group", required = true)]
        groups: Vec<String>,
    },
    /// Search users across every directory source
    FindUsers {
        /// attribute=value or attribute~pattern (`%`, `_` wildcards)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
        /// Attributes to return
        #[arg(short, long = "attr")]
        attributes: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    resource: String,
    level: u32,
    decided_by: String,
    principals: Vec<String>,
}

fn main() -> miette::Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli)?;
    Ok(())
}

fn run(cli: Cli) -> Result<(), EngineError> {
    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    let sources = load_sources(&settings)?;
    tracing::debug!(?sources, "Directory sources ready");

    // one context per invocation
    let ctx = match settings.directory.timeout() {
        Some(timeout) => ResolveContext::with_timeout(timeout),
        None => ResolveContext::unbounded(),
    };

    match cli.command {
        Command::Check {
            resource,
            users,
            groups,
            roles,
            community,
        } => {
            let registry = load_acls(&settings.acl.policies_dir)?;
            let index = registry
                .get(&resource)
                .ok_or_else(|| EngineError::UnknownResource(resource.clone()))?;

            let mut resolver =
                PrincipalResolver::from_sources(&sources, settings.directory.max_group_depth);
            if let Some(community) = community.or_else(|| settings.directory.community.clone()) {
                resolver = resolver.with_community(community);
            }

            let mut principals = resolver.resolve(users.as_slice(), &ctx);
            for group in groups {
                principals.insert(Principal::group(group));
            }
            for role in roles {
                principals.insert(Principal::role(role));
            }

            let decision = decide(&principals, &index);
            tracing::info!(%resource, ?decision, "Access decision");

            let decided_by = match &decision {
                AccessDecision::Granted { source, .. } => source.to_string(),
                _ => String::new(),
            };
            let level = decision.into_result(&resource)?;

            print_json(&CheckOutput {
                resource,
                level: level.bits(),
                decided_by,
                principals: principals.iter().map(|p| p.to_string()).collect(),
            })?;
        }
        Command::Roles { user, group } => {
            let resolver =
                PrincipalResolver::from_sources(&sources, settings.directory.max_group_depth);
            let principal = user
                .map(Principal::user)
                .or_else(|| group.map(Principal::group))
                .ok_or_else(|| EngineError::Usage("either --user or --group is required".into()))?;
            print_json(&resolver.roles().roles_for(&principal, &ctx))?;
        }
        Command::Expand { groups } => {
            let resolver =
                PrincipalResolver::from_sources(&sources, settings.directory.max_group_depth);
            let input: Vec<Principal> = groups.into_iter().map(Principal::group).collect();
            print_json(&resolver.groups().expand_groups(&input, &ctx))?;
        }
        Command::FindUsers {
            filters,
            attributes,
        } => {
            let criteria = FilterCriteria::parse_all(filters.as_slice())?;
            print_json(&find_users(&sources, &criteria, &attributes, &ctx))?;
        }
    }

    Ok(())
}

fn load_sources(settings: &Settings) -> Result<DirectorySources, EngineError> {
    let mut sources = DirectorySources::new();
    for path in &settings.directory.sources {
        let directory = MemoryDirectory::load(path)?;
        sources = sources.with_directory(Arc::new(directory));
    }
    if sources.is_empty() {
        tracing::warn!("No directory sources configured; sessions resolve to their users only");
    }
    Ok(sources)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), EngineError> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
