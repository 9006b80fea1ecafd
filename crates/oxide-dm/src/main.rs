//! oxide-dm CLI
//!
//! Command-line tool for inspecting what the DM dialect generates and for
//! running its catalog checks against a live database.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use oxide_dm::prelude::*;

/// DM dialect tooling for the oxide ORM.
#[derive(Parser)]
#[command(name = "oxide-dm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL, required by commands that query the catalog.
    #[arg(short, long, env = "DATABASE_URL")]
    database: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the column type of a single field.
    ColumnType {
        /// Field kind (bool, int32, int64, string, bytes, time, dm_decimal, ...).
        #[arg(short, long)]
        kind: String,

        /// Field size.
        #[arg(short, long)]
        size: Option<u32>,

        /// Treat the field as primary key.
        #[arg(short, long)]
        primary_key: bool,

        /// Tag settings, e.g. "AUTO_INCREMENT:false;NOT NULL".
        #[arg(short, long, default_value = "")]
        tag: String,
    },

    /// Show the column types of the fields in a JSON file.
    ColumnTypes {
        /// JSON file holding an array of field descriptors.
        file: PathBuf,
    },

    /// Show the name generated for an index or constraint.
    KeyName {
        /// Key kind prefix (idx, uix, fk, ...).
        #[arg(short, long)]
        kind: String,

        /// Table name.
        #[arg(short, long)]
        table: String,

        /// Field names.
        fields: Vec<String>,
    },

    /// Show the LIMIT/OFFSET suffix for the given values.
    Limit {
        /// Limit value.
        #[arg(short, long, allow_hyphen_values = true)]
        limit: Option<String>,

        /// Offset value.
        #[arg(short, long, allow_hyphen_values = true)]
        offset: Option<String>,
    },

    /// Show the current schema.
    CurrentSchema,

    /// Check whether a table exists.
    HasTable {
        /// Table name, optionally SCHEMA.TABLE.
        table: String,
    },

    /// Check whether a column exists.
    HasColumn {
        /// Table name, optionally SCHEMA.TABLE.
        table: String,
        /// Column name.
        column: String,
    },

    /// Check whether an index exists.
    HasIndex {
        /// Table name, optionally SCHEMA.TABLE.
        table: String,
        /// Index name.
        index: String,
    },

    /// Check whether a foreign key exists.
    HasForeignKey {
        /// Table name, optionally SCHEMA.TABLE.
        table: String,
        /// Constraint name.
        name: String,
    },

    /// Drop an index.
    DropIndex {
        /// Table name, optionally SCHEMA.TABLE.
        table: String,
        /// Index name.
        index: String,
    },

    /// Change the type of a column.
    ModifyColumn {
        /// Table name, quoted as it should appear in the statement.
        table: String,
        /// Column name, quoted as it should appear in the statement.
        column: String,
        /// New column type.
        sql_type: String,
    },
}

async fn connect(database: Option<&str>) -> anyhow::Result<DmDialect<AnyPool>> {
    let Some(url) = database else {
        bail!("this command needs --database or DATABASE_URL");
    };
    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    Ok(DmDialect::new(pool))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let database = cli.database.as_deref();

    match cli.command {
        Commands::ColumnType {
            kind,
            size,
            primary_key,
            tag,
        } => {
            let mut field = FieldDescriptor::from_tag("field", kind.parse()?, &tag);
            if size.is_some() {
                field.size = size;
            }
            field.primary_key |= primary_key;
            let column = resolve_column_type(&field)?;
            println!("{}", column.sql_type);
            if column.infer_auto_increment {
                info!("Field becomes an identity column");
            }
        }

        Commands::ColumnTypes { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let fields: Vec<FieldDescriptor> = serde_json::from_str(&json)
                .with_context(|| format!("invalid field descriptors in {}", file.display()))?;
            let columns = validate_fields(&fields)?;
            for (field, column) in fields.iter().zip(&columns) {
                println!("{}\t{}", field.name, column.sql_type);
            }
        }

        Commands::KeyName {
            kind,
            table,
            fields,
        } => {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            println!("{}", build_key_name(&kind, &table, &fields));
        }

        Commands::Limit { limit, offset } => {
            let limit = limit.as_ref().map(|l| l as &dyn std::fmt::Display);
            let offset = offset.as_ref().map(|o| o as &dyn std::fmt::Display);
            println!("{:?}", limit_and_offset_sql(limit, offset)?);
        }

        Commands::CurrentSchema => {
            let dialect = connect(database).await?;
            println!("{}", dialect.current_database().await?);
        }

        Commands::HasTable { table } => {
            let dialect = connect(database).await?;
            println!("{}", dialect.catalog().try_has_table(&table).await?);
        }

        Commands::HasColumn { table, column } => {
            let dialect = connect(database).await?;
            println!("{}", dialect.catalog().try_has_column(&table, &column).await?);
        }

        Commands::HasIndex { table, index } => {
            let dialect = connect(database).await?;
            println!("{}", dialect.catalog().try_has_index(&table, &index).await?);
        }

        Commands::HasForeignKey { table, name } => {
            let dialect = connect(database).await?;
            println!(
                "{}",
                dialect.catalog().try_has_foreign_key(&table, &name).await?
            );
        }

        Commands::DropIndex { table, index } => {
            let dialect = connect(database).await?;
            dialect.remove_index(&table, &index).await?;
            info!(table = %table, index = %index, "Index dropped");
        }

        Commands::ModifyColumn {
            table,
            column,
            sql_type,
        } => {
            let dialect = connect(database).await?;
            dialect.modify_column(&table, &column, &sql_type).await?;
            info!(table = %table, column = %column, "Column modified");
        }
    }

    Ok(())
}
