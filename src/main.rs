use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use modelgen::{open_introspector, GenerateError, GeneratorConfig, ModelGenerator, ModelWriter};

/// Generate Sequelize model definitions from a live database schema
#[derive(Parser, Debug)]
#[command(name = "modelgen", version)]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// postgres, mysql, mariadb, sqlite or mssql
    #[arg(long, short = 'e', env = "MODELGEN_ENGINE")]
    engine: Option<String>,

    #[arg(long, short = 'H')]
    host: Option<String>,

    #[arg(long, short = 'p')]
    port: Option<u16>,

    #[arg(long, short = 'd')]
    database: Option<String>,

    #[arg(long, short = 'u')]
    user: Option<String>,

    #[arg(long, short = 'x', env = "MODELGEN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// SQLite database file
    #[arg(long)]
    file: Option<String>,

    #[arg(long, short = 's')]
    schema: Option<String>,

    /// Camel-case table and column names
    #[arg(long, short = 'C')]
    camel_case: bool,

    /// Only generate these tables
    #[arg(long, short = 't', value_delimiter = ',')]
    tables: Vec<String>,

    /// Skip these tables
    #[arg(long, short = 'T', value_delimiter = ',')]
    skip_tables: Vec<String>,

    /// Output directory for model files
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Print the synthesized models as JSON instead of writing files
    #[arg(long)]
    json: bool,

    /// Maximum number of tables introspected at once
    #[arg(long)]
    concurrency: Option<usize>,
}

fn load_config(cli: &Cli) -> anyhow::Result<GeneratorConfig> {
    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::from_file(path)?,
        None => GeneratorConfig::default(),
    };

    let connection = &mut config.connection;
    if let Some(engine) = &cli.engine {
        connection.engine = engine.parse()?;
    }
    if cli.host.is_some() {
        connection.host = cli.host.clone();
    }
    if cli.port.is_some() {
        connection.port = cli.port;
    }
    if cli.database.is_some() {
        connection.database = cli.database.clone();
    }
    if cli.user.is_some() {
        connection.username = cli.user.clone();
    }
    if cli.password.is_some() {
        connection.password = cli.password.clone();
    }
    if cli.file.is_some() {
        connection.file_path = cli.file.clone();
    }

    let generation = &mut config.generation;
    if cli.schema.is_some() {
        generation.schema = cli.schema.clone();
    }
    if cli.camel_case {
        generation.camel_case = true;
    }
    if !cli.tables.is_empty() {
        generation.tables = Some(cli.tables.clone());
    }
    if !cli.skip_tables.is_empty() {
        generation.skip_tables = cli.skip_tables.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        generation.max_concurrency = concurrency;
    }
    if generation.max_concurrency == 0 {
        return Err(GenerateError::Config("concurrency must be at least 1".to_string()).into());
    }

    if let Some(output) = &cli.output {
        config.output.directory = output.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let mut introspector = open_introspector(config.connection.clone())
        .await
        .with_context(|| format!("Failed to connect to {}", config.connection.engine))?;

    let result = ModelGenerator::new(introspector.as_ref(), &config.generation)
        .run()
        .await;
    if let Err(e) = introspector.disconnect().await {
        log::warn!("Failed to disconnect: {:#}", e);
    }
    let report = result?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        ModelWriter::new(config.output.clone())
            .write_all(&report.models)
            .await?;
    }

    if !report.is_complete() {
        log::warn!("{} table(s) skipped:", report.failures.len());
        for failure in &report.failures {
            log::warn!("  {}", failure);
        }
    }
    Ok(())
}
