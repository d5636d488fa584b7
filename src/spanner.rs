use anyhow::{Context, Result};
use async_trait::async_trait;
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::client::{Client, ClientConfig, Error as SpannerError};
use gcloud_spanner::mutation::insert;
use gcloud_spanner::statement::Statement;
use std::sync::Arc;

use crate::config::SpannerConfig;
use crate::store::{CreateOutcome, LinkStore};

/// Shareable Spanner-backed link store for use across async handlers
#[derive(Clone)]
pub struct SpannerLinkStore {
    inner: Arc<Client>,
    table: Arc<str>,
}

impl SpannerLinkStore {
    /// Create a new Spanner link store from configuration
    ///
    /// The gcloud-spanner library picks up the SPANNER_EMULATOR_HOST
    /// environment variable and connects to the emulator when it is set,
    /// or to production Spanner otherwise.
    ///
    /// With `auto_provision` set, the instance, database and link table are
    /// created first if they don't exist yet.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        if config.auto_provision {
            auto_provision(config).await?;
        } else {
            tracing::info!("Auto-provisioning disabled, expecting table '{}' to exist", config.table);
        }

        let database_path = config.database_path();

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
            table: Arc::from(config.table.as_str()),
        })
    }

    async fn read_long_url(&self, short_path: &str) -> Result<Option<String>> {
        let key = short_path.to_string();

        let mut statement = Statement::new(&format!(
            "SELECT long_url FROM {} WHERE short_path = @short_path",
            self.table
        ));
        statement.add_param("short_path", &key);

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query link from Spanner")?;

        if let Some(row) = result_set.next().await? {
            let long_url: String = row.column_by_name("long_url")?;
            tracing::debug!("Read link: {}", short_path);
            Ok(Some(long_url))
        } else {
            tracing::debug!("Link not found: {}", short_path);
            Ok(None)
        }
    }

    async fn insert_link(&self, short_path: &str, long_url: &str) -> Result<CreateOutcome> {
        let key = short_path.to_string();
        let value = long_url.to_string();

        // A plain insert mutation is rejected with ALREADY_EXISTS when the
        // primary key is taken, which makes create-if-absent a single commit.
        let mutation = insert(&self.table, &["short_path", "long_url"], &[&key, &value]);

        match self.inner.apply(vec![mutation]).await {
            Ok(_) => {
                tracing::debug!("Inserted link: {}", short_path);
                Ok(CreateOutcome::Created)
            }
            Err(SpannerError::GRPC(status)) if status.code() == Code::AlreadyExists => {
                tracing::debug!("Link already exists: {}", short_path);
                Ok(CreateOutcome::Conflict)
            }
            Err(e) => Err(e).context("Failed to insert link into Spanner"),
        }
    }
}

#[async_trait]
impl LinkStore for SpannerLinkStore {
    async fn fetch(&self, short_path: &str) -> Result<Option<String>> {
        self.read_long_url(short_path)
            .await
            .inspect_err(|e| tracing::error!("Failed to fetch link '{}': {:#}", short_path, e))
    }

    async fn create(&self, short_path: &str, long_url: &str) -> Result<CreateOutcome> {
        self.insert_link(short_path, long_url)
            .await
            .inspect_err(|e| tracing::error!("Failed to create link '{}': {:#}", short_path, e))
    }

    /// Runs `SELECT 1` to confirm the session pool can reach the database
    async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

/// Automatically provision Spanner instance, database, and link table
///
/// Meant for zero-setup local development against the emulator.
async fn auto_provision(config: &SpannerConfig) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_table_exists(&admin_client, &database_path, &config.table).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if config.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", config.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

fn create_table_ddl(table: &str) -> String {
    format!(
        r#"
CREATE TABLE {table} (
    short_path STRING(MAX) NOT NULL,
    long_url STRING(MAX) NOT NULL,
) PRIMARY KEY (short_path)
"#
    )
    .trim()
    .to_string()
}

fn ddl_declares_table(statements: &[String], table: &str) -> bool {
    let plain = format!("CREATE TABLE {} ", table);
    let quoted = format!("CREATE TABLE `{}` ", table);
    statements
        .iter()
        .any(|stmt| stmt.starts_with(&plain) || stmt.starts_with(&quoted))
}

async fn ensure_table_exists(
    admin_client: &AdminClient,
    database_path: &str,
    table: &str,
) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    if ddl_declares_table(&ddl_response.into_inner().statements, table) {
        tracing::info!("Table '{}' already exists", table);
        return Ok(());
    }

    tracing::info!("Table '{}' not found, creating...", table);

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![create_table_ddl(table)],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create table")?;

    tracing::info!("Table '{}' created successfully", table);
    Ok(())
}
