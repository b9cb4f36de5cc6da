use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use menagerie_authz::config::{Config, TelemetryConfig};
use menagerie_authz::domain::{EntityKind, EntityRef, Principal, StringUuid};
use menagerie_authz::policy::{catalog, PolicyEngine};
use menagerie_authz::repository::entity::EntityRepositoryImpl;
use menagerie_authz::repository::membership::MembershipRepositoryImpl;
use menagerie_authz::repository::principal::PrincipalRepositoryImpl;
use menagerie_authz::repository::{self, PrincipalRepository};
use menagerie_authz::telemetry;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "menagerie-authz", about = "Inspect Menagerie authorization decisions")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a registered operation for a principal
    Check {
        /// Principal id; omit to evaluate as an anonymous caller
        #[arg(long)]
        principal: Option<StringUuid>,
        #[arg(long)]
        operation: String,
        /// Operation arguments as JSON
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Print a principal's aggregated permissions in a community
    Permissions {
        #[arg(long)]
        principal: StringUuid,
        #[arg(long)]
        community: StringUuid,
    },
    /// Resolve the community an entity belongs to
    Resolve {
        /// Entity kind, e.g. traitListEntry
        #[arg(long)]
        kind: EntityKind,
        #[arg(long)]
        id: StringUuid,
    },
    /// Apply field redaction to a JSON object as a principal would see it
    Redact {
        #[arg(long)]
        principal: Option<StringUuid>,
        /// Object type, e.g. Character
        #[arg(long = "type")]
        type_name: String,
        #[arg(long)]
        object: String,
    },
    /// List registered operations and their policies
    Operations,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::Operations = cli.command {
        telemetry::init(&TelemetryConfig::default());
        return list_operations();
    }

    let config = Config::from_env()?;
    let metrics_handle = telemetry::init(&config.telemetry);
    info!(environment = %config.environment, "Starting menagerie-authz");

    let pool = repository::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let principals = PrincipalRepositoryImpl::new(pool.clone());
    let engine = PolicyEngine::new(
        Arc::new(MembershipRepositoryImpl::new(pool.clone())),
        Arc::new(EntityRepositoryImpl::new(pool)),
        Arc::new(catalog::default_registry()?),
        config.policy.clone(),
    );

    match cli.command {
        Commands::Check {
            principal,
            operation,
            args,
        } => {
            let principal = load_principal(&principals, principal).await?;
            let args = parse_json(&args, "--args")?;
            let decision = engine
                .evaluate_operation(&operation, principal.as_ref(), &args)
                .await?;
            print_json(&decision)?;
        }
        Commands::Permissions {
            principal,
            community,
        } => {
            let aggregate = engine
                .permissions()
                .aggregate_community_permissions(principal, community)
                .await?;
            print_json(&aggregate)?;
        }
        Commands::Resolve { kind, id } => {
            let resolution = engine
                .communities()
                .resolve_community(EntityRef::new(kind, id))
                .await?;
            print_json(&resolution)?;
        }
        Commands::Redact {
            principal,
            type_name,
            object,
        } => {
            let principal = load_principal(&principals, principal).await?;
            let object = parse_json(&object, "--object")?;
            let redacted = engine
                .redactor()
                .redact_object(principal.as_ref(), &type_name, &object)
                .await?;
            print_json(&redacted)?;
        }
        Commands::Operations => list_operations()?,
    }

    if let Some(handle) = metrics_handle {
        eprintln!("{}", handle.render());
    }
    Ok(())
}

async fn load_principal(
    principals: &PrincipalRepositoryImpl,
    id: Option<StringUuid>,
) -> Result<Option<Principal>> {
    let Some(id) = id else {
        return Ok(None);
    };
    match principals.find_by_id(id).await? {
        Some(principal) => Ok(Some(principal)),
        None => bail!("Unknown principal {}", id),
    }
}

fn list_operations() -> Result<()> {
    let registry = catalog::default_registry()?;
    for (name, policies) in registry.operations() {
        let rendered: Vec<String> = policies.iter().map(ToString::to_string).collect();
        println!("{:<28} {}", name, rendered.join(" AND "));
    }
    Ok(())
}

fn parse_json(raw: &str, flag: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{} is not valid JSON", flag))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
