//! klog-publish CLI
//!
//! Entry point for the `klog-publish` command-line tool.

use clap::{Parser, Subcommand};
use klog_publish::config::{
    deep_merge, parse_override, ConfigError, EffectiveConfig, ProjectManifest, PublishSettings,
    DEFAULT_MANIFEST, DEFAULT_REPO_CONFIG,
};
use klog_publish::pipeline::EFFECTIVE_CONFIG_FILE;
use klog_publish::signing::{
    decode_verifying_key, encode_verifying_key, generate_keypair, seal_signing_key,
};
use klog_publish::{
    verify_staged, BuildEnvironment, PublicationAssembler, PublishPipeline, RepositoryTarget,
    SigningState, Stager,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "KLOG_PUBLISH_LOG";

#[derive(Parser)]
#[command(name = "klog-publish")]
#[command(about = "Assemble, sign and stage klog publications", version)]
struct Cli {
    /// Path to the project manifest (default: publish.toml)
    #[arg(long, short = 'm', global = true)]
    manifest: Option<PathBuf>,

    /// Path to repo config file (default: .klog/publish.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Override a config value (key.path=value), repeatable
    #[arg(long = "set", global = true, value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the assembled publication of every module without staging
    Describe {
        /// Only describe this module
        #[arg(long)]
        module: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Report whether this build would sign its publications
    SigningStatus {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Assemble and stage every module
    Publish {
        /// Staging directory
        #[arg(long, short = 'o', default_value = "build/staging")]
        out: PathBuf,

        /// Output the report in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Verify checksums, signatures and records of a staging directory
    Verify {
        /// Staging directory
        #[arg(long, short = 'd', default_value = "build/staging")]
        dir: PathBuf,

        /// Base64 Ed25519 public key; signatures are required when set
        #[arg(long)]
        public_key: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate a signing key sealed with SIGNING_PASSWORD
    Keygen,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Build credentials are read here once and passed down explicitly.
    let env = BuildEnvironment::from_env();

    match cli.command {
        Commands::Describe { ref module, json } => {
            run_describe(&cli, module.as_deref(), json);
        }
        Commands::SigningStatus { json } => {
            run_signing_status(&env, json);
        }
        Commands::Publish { ref out, json } => {
            run_publish(&cli, &env, out, json);
        }
        Commands::Verify {
            ref dir,
            ref public_key,
            json,
        } => {
            run_verify(dir, public_key.as_deref(), json);
        }
        Commands::Keygen => {
            run_keygen(&env);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<EffectiveConfig, ConfigError> {
    let user_path = EffectiveConfig::default_user_path();
    let repo_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPO_CONFIG));

    let mut cli_layer = None;
    for raw in &cli.overrides {
        let value = parse_override(raw)?;
        cli_layer = Some(match cli_layer {
            Some(acc) => deep_merge(acc, value),
            None => value,
        });
    }

    EffectiveConfig::build(user_path.as_deref(), Some(&repo_path), cli_layer)
}

fn load_inputs(cli: &Cli) -> (EffectiveConfig, PublishSettings, ProjectManifest, PathBuf) {
    let config = match load_config(cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(2);
        }
    };
    let settings = match config.settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(2);
        }
    };

    let manifest_path = cli
        .manifest
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST));
    let manifest = match ProjectManifest::from_file(&manifest_path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Manifest error: {}", e);
            process::exit(2);
        }
    };

    let base_dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    (config, settings, manifest, base_dir)
}

fn resolve_signing(env: &BuildEnvironment) -> SigningState {
    match SigningState::resolve(env) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Signing error: {}", e);
            process::exit(3);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_describe(cli: &Cli, only: Option<&str>, json_output: bool) {
    let (_, settings, manifest, _) = load_inputs(cli);
    let assembler = PublicationAssembler::new(&manifest.project, &settings.pom, &settings.version_mapping);

    let modules: Vec<_> = manifest
        .modules
        .iter()
        .filter(|m| only.map_or(true, |name| m.name == name))
        .collect();
    if modules.is_empty() {
        eprintln!("Module '{}' not found in manifest.", only.unwrap_or_default());
        process::exit(1);
    }

    let mut failed = false;
    let mut described = Vec::new();
    for module in modules {
        match assembler.assemble(module) {
            Ok(publication) => {
                if !json_output {
                    let d = &publication.descriptor;
                    println!("{}", publication.coordinates);
                    println!("  Name: {}", d.name);
                    println!("  Description: {}", d.description);
                    println!("  URL: {}", d.url);
                    println!("  SCM: {}", d.scm.url);
                    for dep in &publication.dependencies {
                        println!(
                            "  Dependency: {}:{}:{} ({})",
                            dep.group_id, dep.artifact_id, dep.version, dep.scope
                        );
                    }
                    println!();
                }
                described.push(serde_json::json!({
                    "module": module.label(),
                    "publication": publication,
                }));
            }
            Err(e) => {
                failed = true;
                eprintln!("Module '{}': {}", module.label(), e);
                described.push(serde_json::json!({
                    "module": module.label(),
                    "error": e.to_string(),
                }));
            }
        }
    }

    if json_output {
        print_json(&described);
    }
    if failed {
        process::exit(2);
    }
}

fn run_signing_status(env: &BuildEnvironment, json_output: bool) {
    let state = resolve_signing(env);

    if json_output {
        print_json(&serde_json::json!({
            "signing_enabled": state.is_enabled(),
            "fingerprint": state.fingerprint(),
            "present_variables": env.present_variables(),
        }));
    } else if let Some(fp) = state.fingerprint() {
        println!("Signing enabled");
        println!("  Key fingerprint: {}", fp);
    } else {
        println!("Signing disabled: SIGNING_KEY and SIGNING_PASSWORD are not both set.");
    }
}

fn run_publish(cli: &Cli, env: &BuildEnvironment, out: &Path, json_output: bool) {
    let (config, settings, manifest, base_dir) = load_inputs(cli);
    let signing = resolve_signing(env);
    let build_id = ulid::Ulid::new().to_string();

    if let Err(e) = std::fs::create_dir_all(out) {
        eprintln!("Error creating {}: {}", out.display(), e);
        process::exit(1);
    }
    let config = config.with_build_id(build_id.clone());
    if let Err(e) = config.write_to_file(&out.join(EFFECTIVE_CONFIG_FILE)) {
        eprintln!("Error writing effective config: {}", e);
        process::exit(1);
    }

    let repository = RepositoryTarget::select(&manifest.project.version, &settings.repository, env);
    let assembler = PublicationAssembler::new(&manifest.project, &settings.pom, &settings.version_mapping);
    let stager = Stager::new(out, base_dir, &signing, build_id);
    let pipeline = PublishPipeline::new(assembler, stager, repository);

    let report = match pipeline.run(&manifest.modules) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error writing report: {}", e);
            process::exit(e.exit_code());
        }
    };

    if json_output {
        print_json(&report);
    } else {
        println!("Build {}", report.build_id);
        println!(
            "  Signing: {}",
            report.signing_fingerprint.as_deref().unwrap_or("disabled")
        );
        println!("  Repository: {} ({:?})", report.repository.url, report.repository.kind);
        for outcome in &report.modules {
            match (&outcome.coordinates, &outcome.error) {
                (Some(coordinates), _) => println!("  [staged] {}", coordinates),
                (None, Some(error)) => println!("  [failed] {}: {}", outcome.module, error),
                (None, None) => println!("  [failed] {}", outcome.module),
            }
        }
    }

    if !report.is_success() {
        process::exit(1);
    }
}

fn run_verify(dir: &Path, public_key: Option<&str>, json_output: bool) {
    let key = match public_key.map(decode_verifying_key).transpose() {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Invalid public key: {}", e);
            process::exit(2);
        }
    };

    let report = match verify_staged(dir, key.as_ref()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error verifying {}: {}", dir.display(), e);
            process::exit(1);
        }
    };

    if json_output {
        print_json(&report);
    } else {
        println!(
            "Checked {} files and {} records in {}",
            report.files.len(),
            report.records.len(),
            dir.display()
        );
        for failure in report.failures() {
            println!("  {}: {:?}", failure.path, failure.status);
        }
    }

    if !report.is_success() {
        process::exit(1);
    }
}

fn run_keygen(env: &BuildEnvironment) {
    let passphrase = match env.signing_password.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(p) => p,
        None => {
            eprintln!("SIGNING_PASSWORD must be set to seal the generated key.");
            process::exit(2);
        }
    };

    let key = generate_keypair();
    let sealed = match seal_signing_key(&key, passphrase) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error sealing key: {}", e);
            process::exit(3);
        }
    };
    println!("SIGNING_KEY={}", sealed);
    println!("PUBLIC_KEY={}", encode_verifying_key(&key.verifying_key()));
}
