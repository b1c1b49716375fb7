use clap::Parser;
use clap_stdin::FileOrStdin;
use docmap::{EntityDefinition, MappingConfig, MappingContext, PersistentEntity, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

fn read_definition(input: &FileOrStdin) -> Result<EntityDefinition, Box<dyn std::error::Error>> {
    let reader = input.clone().into_reader()?;
    Ok(serde_json::from_reader(reader)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = cli::Args::parse();
    let config = MappingConfig::try_from(args.config.as_str())?;
    match &args.command {
        cli::Command::Mapping { input, output } => {
            let definition = read_definition(input)?;
            let entity = PersistentEntity::build(&definition, &config)?;
            let mapping = docmap::mapping::build(&MappingContext::new(config), &entity)?;
            let mut writer = output.clone().into_writer()?;
            serde_json::to_writer_pretty(&mut writer, &mapping)?;
        }
        cli::Command::Settings { input, output } => {
            let definition = read_definition(input)?;
            let entity = PersistentEntity::build(&definition, &config)?;
            let settings = entity
                .settings()
                .and_then(Settings::to_json)
                .unwrap_or_default();
            let mut writer = output.clone().into_writer()?;
            serde_json::to_writer_pretty(&mut writer, &settings)?;
        }
        cli::Command::Validate { input } => {
            let definition = read_definition(input)?;
            let entity = PersistentEntity::build(&definition, &config.clone().with_strict(false))?;
            let diagnostics = docmap::validate(&entity, config.strict);
            for diagnostic in &diagnostics {
                println!("{diagnostic}");
            }
            let errors = diagnostics.iter().filter(|d| d.is_error()).count();
            if errors > 0 {
                return Err(format!("{} has {errors} invalid field name(s)", entity.name()).into());
            }
            tracing::debug!(entity = %entity.name(), "no field name errors");
        }
    }
    Ok(())
}
