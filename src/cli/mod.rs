//! SF-030: CLI subcommands: init, validate, order, compile.

use crate::core::error::CompileError;
use crate::core::orchestrator::Orchestrator;
use crate::core::{digest, parser, types};
use clap::Subcommand;
use std::path::{Path, PathBuf};

const DEFAULT_SCHEMA: &str = "schema.graphql";

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new sdlforge project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Parse the schema and run every plugin's validation
    Validate {
        /// Path to sdlforge.yaml
        #[arg(short, long, default_value = "sdlforge.yaml")]
        file: PathBuf,
    },

    /// Show the resolved plugin order for the schema
    Order {
        /// Path to sdlforge.yaml
        #[arg(short, long, default_value = "sdlforge.yaml")]
        file: PathBuf,
    },

    /// Compile the schema and write the outputs
    Compile {
        /// Path to sdlforge.yaml
        #[arg(short, long, default_value = "sdlforge.yaml")]
        file: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "out")]
        output: PathBuf,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Order { file } => cmd_order(&file),
        Commands::Compile { file, output } => cmd_compile(&file, &output),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("sdlforge.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;

    let config = r#"version: "1.0"
name: my-api
schema: schema.graphql
plugins: []
strict_mode: false
feature_flags:
  env: dev
policy:
  parallel_validate: false
  output_format: json
  strip_owned_directives: true
"#;
    let schema = r#""A single todo item"
type Todo @persist @auth(rules: [{allow: owner}]) {
  id: ID!
  content: String
}
"#;
    let schema_path = path.join(DEFAULT_SCHEMA);
    std::fs::write(&config_path, config)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;
    if !schema_path.exists() {
        std::fs::write(&schema_path, schema)
            .map_err(|e| format!("cannot write {}: {}", schema_path.display(), e))?;
    }

    println!("Initialized sdlforge project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}", schema_path.display());
    Ok(())
}

/// Load a config file and the schema text it points to.
fn load_project(file: &Path) -> Result<(types::CompileConfig, String), String> {
    let config = parser::parse_config_file(file)?;
    let base = file.parent().unwrap_or_else(|| Path::new("."));
    let schema_path = base.join(config.schema.as_deref().unwrap_or(DEFAULT_SCHEMA));
    let text = std::fs::read_to_string(&schema_path)
        .map_err(|e| format!("failed to read {}: {}", schema_path.display(), e))?;
    Ok((config, text))
}

/// Print every diagnostic to stderr and summarize.
fn report(err: CompileError) -> String {
    for d in &err.diagnostics {
        eprintln!("  ERROR: {}", d);
    }
    match err.stage() {
        Some(stage) => format!("{} error(s) in stage {}", err.len(), stage),
        None => "compile failed".to_string(),
    }
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let (config, text) = load_project(file)?;
    let plan = Orchestrator::with_builtin()
        .validate(&text, &config)
        .map_err(report)?;
    for w in &plan.warnings {
        eprintln!("  WARN: {}", w);
    }
    println!(
        "OK: {} ({} types, {} plugins)",
        config.name,
        plan.schema.types.len(),
        plan.order.len()
    );
    Ok(())
}

fn cmd_order(file: &Path) -> Result<(), String> {
    let (config, text) = load_project(file)?;
    let plan = Orchestrator::with_builtin()
        .plan(&text, &config)
        .map_err(report)?;
    println!("Plugin order: {} ({} plugins)", config.name, plan.order.len());
    for (i, plugin) in plan.order.iter().enumerate() {
        let directives: Vec<String> = plan
            .registry
            .directives_of(plugin)
            .iter()
            .map(|d| format!("@{}", d))
            .collect();
        println!("  {}. {} [{}]", i + 1, plugin, directives.join(", "));
    }
    Ok(())
}

fn cmd_compile(file: &Path, output: &Path) -> Result<(), String> {
    let (config, text) = load_project(file)?;
    let out = Orchestrator::with_builtin()
        .compile(&text, &config)
        .map_err(report)?;
    for w in &out.warnings {
        eprintln!("  WARN: {}", w);
    }

    std::fs::create_dir_all(output)
        .map_err(|e| format!("cannot create {}: {}", output.display(), e))?;
    let resolvers = out.resolvers_json().map_err(|e| e.to_string())?;
    let infra_name = format!(
        "infrastructure.{}",
        out.infrastructure_document.format.extension()
    );
    let files = [
        ("schema.graphql".to_string(), out.rewritten_schema.as_str()),
        (infra_name, out.infrastructure_document.content.as_str()),
        ("resolvers.json".to_string(), resolvers.as_str()),
    ];
    for (name, content) in &files {
        let path = output.join(name);
        std::fs::write(&path, content)
            .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
    }

    println!(
        "Compiled: {} ({} plugins, {} pipelines)",
        out.name,
        out.plugin_order.len(),
        out.resolver_pipelines.len()
    );
    for (name, content) in &files {
        println!(
            "  {} {}",
            digest::artifact_digest(name, content),
            output.join(name).display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(schema: &str, config: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sdlforge.yaml"), config).unwrap();
        std::fs::write(dir.path().join("schema.graphql"), schema).unwrap();
        dir
    }

    const CONFIG: &str = "version: \"1.0\"\nname: todo-api\n";

    #[test]
    fn test_sf030_init() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("api");
        cmd_init(&sub).unwrap();
        assert!(sub.join("sdlforge.yaml").exists());
        assert!(sub.join("schema.graphql").exists());
        // the generated project is valid as-is
        cmd_validate(&sub.join("sdlforge.yaml")).unwrap();
    }

    #[test]
    fn test_sf030_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sdlforge.yaml"), "exists").unwrap();
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_sf030_validate_invalid() {
        let dir = project("type Todo @persist(key: \"missing\") { id: ID! }", CONFIG);
        let err = cmd_validate(&dir.path().join("sdlforge.yaml")).unwrap_err();
        assert!(err.contains("stage validate"));
    }

    #[test]
    fn test_sf030_missing_schema() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("sdlforge.yaml");
        std::fs::write(&config, "version: \"1.0\"\nschema: nope.graphql\n").unwrap();
        let err = cmd_order(&config).unwrap_err();
        assert!(err.contains("nope.graphql"));
    }

    #[test]
    fn test_sf030_order() {
        let dir = project("type Todo @persist @searchable { id: ID! }", CONFIG);
        cmd_order(&dir.path().join("sdlforge.yaml")).unwrap();
    }

    #[test]
    fn test_sf030_compile_writes_outputs() {
        let dir = project("type Todo @persist { id: ID! content: String }", CONFIG);
        let out = dir.path().join("out");
        cmd_compile(&dir.path().join("sdlforge.yaml"), &out).unwrap();

        let schema = std::fs::read_to_string(out.join("schema.graphql")).unwrap();
        assert!(schema.contains("createTodo"));
        let infra: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("infrastructure.json")).unwrap())
                .unwrap();
        assert_eq!(infra["name"], "todo-api");
        assert!(infra["resources"]["TodoTable"].is_object());
        let resolvers: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("resolvers.json")).unwrap())
                .unwrap();
        assert_eq!(resolvers["Mutation.createTodo"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_sf030_compile_yaml_output() {
        let config = "version: \"1.0\"\nname: todo-api\npolicy:\n  output_format: yaml\n";
        let dir = project("type Todo @persist { id: ID! }", config);
        let out = dir.path().join("out");
        dispatch(Commands::Compile {
            file: dir.path().join("sdlforge.yaml"),
            output: out.clone(),
        })
        .unwrap();
        assert!(out.join("infrastructure.yaml").exists());
        assert!(!out.join("infrastructure.json").exists());
    }

    #[test]
    fn test_sf030_compile_failure_writes_nothing() {
        let dir = project("type Todo @persist @mystery { id: ID! }", &format!("{}strict_mode: true\n", CONFIG));
        let out = dir.path().join("out");
        let err = cmd_compile(&dir.path().join("sdlforge.yaml"), &out).unwrap_err();
        assert!(err.contains("stage setup"));
        assert!(!out.exists());
    }
}
