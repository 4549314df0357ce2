//! Tool instance lifecycle orchestration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, instrument, warn};

use crate::bundle::{materializer, BundleError, Layout};
use crate::params::ParamScanner;
use crate::provisioner::{Dispatcher, ProvisionJob};
use crate::store::{queries, RecordStore, ToolInstanceRecord};

use super::types::{
    CreateOutcome, CreateToolInstance, InstanceError, ToolInstanceId, ToolInstanceView,
    UpdateToolInstance,
};

/// Display name used when neither the request nor the template names the
/// instance.
const DEFAULT_INSTANCE_NAME: &str = "Tool Instance";
/// Code filename of the built-in default bundle.
const DEFAULT_CODE_FILE: &str = "tool.py";
/// Dependency manifest filename of the built-in default bundle.
const DEFAULT_REQUIREMENTS_FILE: &str = "requirements.txt";

/// Resolved origin of a new instance's files, either a stored template or
/// the built-in default bundle.
struct BundleSource {
    source_dir: PathBuf,
    name: String,
    code_file_name: String,
    requirements_file_name: String,
    icon_path: Option<PathBuf>,
    is_venv_tool: bool,
}

/// Orchestrates tool instance state across the record store, the bundle
/// directories on disk, and the background provisioner.
///
/// Every operation comes in two forms: an owned one that opens and
/// commits its own transaction, and an `_in` one that runs on a caller
/// supplied connection so it can participate in a larger transaction.
pub struct ToolInstanceManager {
    store: RecordStore,
    dispatcher: Arc<Dispatcher>,
    layout: Layout,
    scanner: Arc<dyn ParamScanner>,
}

impl ToolInstanceManager {
    /// Create a manager over the given store, dispatcher, and layout.
    pub fn new(
        store: RecordStore,
        dispatcher: Arc<Dispatcher>,
        layout: Layout,
        scanner: Arc<dyn ParamScanner>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            layout,
            scanner,
        }
    }

    /// Create a tool instance in its own transaction.
    ///
    /// # Errors
    ///
    /// See [`ToolInstanceManager::create_in`].
    #[instrument(skip(self))]
    pub async fn create(&self, req: CreateToolInstance) -> Result<CreateOutcome, InstanceError> {
        let mut tx = self.store.begin().await?;
        let outcome = self.create_in(&mut tx, req).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Create a tool instance on a caller-supplied connection.
    ///
    /// Materializes a new bundle directory under the workflow's `tools`
    /// directory, records the instance, and enqueues an environment build.
    /// If any step fails after files were put in place, the directory and
    /// any copied icon are removed again on a best-effort basis and no row
    /// is committed.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::WorkflowNotFound`] or
    /// [`InstanceError::TemplateNotFound`] for dangling references,
    /// [`InstanceError::Bundle`] when materialization fails, and
    /// [`InstanceError::Database`] on store failures.
    pub async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        req: CreateToolInstance,
    ) -> Result<CreateOutcome, InstanceError> {
        let source = self.resolve_source(conn, req.template_id.as_deref()).await?;

        let workflow = queries::get_workflow(conn, &req.workflow_id)
            .await?
            .ok_or_else(|| InstanceError::WorkflowNotFound(req.workflow_id.clone()))?;
        let workflow_dir = PathBuf::from(&workflow.directory);
        let workflow_dir = dunce::canonicalize(&workflow_dir).unwrap_or(workflow_dir);

        let name = req
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or(source.name.clone(), str::to_string);

        let id = ToolInstanceId::generate();
        let instance_dir = materializer::create_instance_dir(&workflow_dir, &name)?;

        if let Err(e) = materializer::copy_template(&source.source_dir, &instance_dir) {
            materializer::delete_tree(&instance_dir);
            return Err(e.into());
        }

        let icon_path = match &source.icon_path {
            Some(template_icon) => {
                match materializer::copy_icon(template_icon, id.as_str(), &self.layout.icons_root())
                {
                    Ok(dest) => dest.display().to_string(),
                    Err(e) => {
                        materializer::delete_tree(&instance_dir);
                        return Err(e.into());
                    }
                }
            }
            None => String::new(),
        };

        let record = ToolInstanceRecord {
            id: id.as_str().to_string(),
            workflow_id: workflow.id,
            name: name.clone(),
            source_folder_path: instance_dir.display().to_string(),
            code_file_name: source.code_file_name,
            requirements_file_name: source.requirements_file_name,
            icon_path,
            is_venv_tool: source.is_venv_tool,
        };
        if let Err(e) = queries::insert_instance(conn, &record).await {
            materializer::delete_tree(&instance_dir);
            if !record.icon_path.is_empty() {
                materializer::delete_file(Path::new(&record.icon_path));
            }
            return Err(e.into());
        }

        self.dispatcher.submit(ProvisionJob::BuildEnv {
            tool_dir: instance_dir.clone(),
            requirements_file: record.requirements_file_name.clone(),
        });

        debug!("created tool instance {id} at {}", instance_dir.display());
        Ok(CreateOutcome { id, name })
    }

    /// Update a tool instance's name and icon in its own transaction.
    ///
    /// # Errors
    ///
    /// See [`ToolInstanceManager::update_in`].
    #[instrument(skip(self))]
    pub async fn update(&self, req: UpdateToolInstance) -> Result<(), InstanceError> {
        let mut tx = self.store.begin().await?;
        self.update_in(&mut tx, req).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Update a tool instance on a caller-supplied connection.
    ///
    /// Only the display name and the icon are mutable; everything else on
    /// the row is fixed at creation. A replacement icon is taken from a
    /// temporary file, which is removed afterwards on a best-effort
    /// basis. A successful update always re-enqueues an environment
    /// build.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InstanceNotFound`] for an unknown id,
    /// [`InstanceError::TempFileNotFound`] when the icon source is gone,
    /// and [`InstanceError::Validation`] for an unsupported icon type.
    pub async fn update_in(
        &self,
        conn: &mut SqliteConnection,
        req: UpdateToolInstance,
    ) -> Result<(), InstanceError> {
        let mut record = queries::get_instance(conn, &req.instance_id)
            .await?
            .ok_or_else(|| InstanceError::InstanceNotFound(req.instance_id.clone()))?;

        if let Some(name) = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            record.name = name.to_string();
        }

        if let Some(tmp_icon) = &req.tmp_icon_path {
            if !tmp_icon.is_file() {
                return Err(InstanceError::TempFileNotFound(
                    tmp_icon.display().to_string(),
                ));
            }
            let dest = materializer::copy_icon(tmp_icon, &record.id, &self.layout.icons_root())
                .map_err(|e| match e {
                    BundleError::UnsupportedImageType(_) => {
                        InstanceError::Validation(e.to_string())
                    }
                    other => other.into(),
                })?;
            materializer::delete_file(tmp_icon);
            record.icon_path = dest.display().to_string();
        }

        queries::update_instance(conn, &record).await?;

        self.dispatcher.submit(ProvisionJob::BuildEnv {
            tool_dir: PathBuf::from(&record.source_folder_path),
            requirements_file: record.requirements_file_name.clone(),
        });
        Ok(())
    }

    /// Fetch the full view of a tool instance in its own transaction.
    ///
    /// # Errors
    ///
    /// See [`ToolInstanceManager::get_in`].
    #[instrument(skip(self))]
    pub async fn get(&self, instance_id: &str) -> Result<ToolInstanceView, InstanceError> {
        let mut conn = self.store.acquire().await?;
        self.get_in(&mut conn, instance_id).await
    }

    /// Fetch the full view of a tool instance on a caller-supplied
    /// connection.
    ///
    /// The view carries live file contents, so the bundle directory must
    /// be readable; a parameter scan failure only degrades the view.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InstanceNotFound`] for an unknown id and
    /// [`InstanceError::Internal`] when the bundle files cannot be read.
    pub async fn get_in(
        &self,
        conn: &mut SqliteConnection,
        instance_id: &str,
    ) -> Result<ToolInstanceView, InstanceError> {
        let record = queries::get_instance(conn, instance_id)
            .await?
            .ok_or_else(|| InstanceError::InstanceNotFound(instance_id.to_string()))?;
        self.assemble(&record)
    }

    /// List tool instances in their own transaction.
    ///
    /// # Errors
    ///
    /// See [`ToolInstanceManager::list_in`].
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        workflow_id: Option<&str>,
    ) -> Result<Vec<ToolInstanceView>, InstanceError> {
        let mut conn = self.store.acquire().await?;
        self.list_in(&mut conn, workflow_id).await
    }

    /// List tool instances on a caller-supplied connection, optionally
    /// filtered by owning workflow.
    ///
    /// Unlike [`ToolInstanceManager::get_in`], an unreadable bundle does
    /// not fail the listing: the affected entry degrades to row data with
    /// empty file contents and `is_valid = false`.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::Database`] when the listing query fails.
    pub async fn list_in(
        &self,
        conn: &mut SqliteConnection,
        workflow_id: Option<&str>,
    ) -> Result<Vec<ToolInstanceView>, InstanceError> {
        let records = queries::list_instances(conn, workflow_id).await?;
        let mut views = Vec::with_capacity(records.len());
        for record in &records {
            match self.assemble(record) {
                Ok(view) => views.push(view),
                Err(e) => {
                    warn!("degrading unreadable tool instance {}: {e}", record.id);
                    views.push(ToolInstanceView::degraded(record, self.icon_uri(record)));
                }
            }
        }
        Ok(views)
    }

    /// Remove a tool instance in its own transaction.
    ///
    /// # Errors
    ///
    /// See [`ToolInstanceManager::remove_in`].
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        instance_id: &str,
        delete_directory: bool,
    ) -> Result<(), InstanceError> {
        let mut tx = self.store.begin().await?;
        self.remove_in(&mut tx, instance_id, delete_directory).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Remove a tool instance on a caller-supplied connection.
    ///
    /// The row is deleted synchronously; the bundle directory, when
    /// requested, is deleted by a background job, so callers observe the
    /// row gone before the files are. The icon is removed on a
    /// best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::InstanceNotFound`] for an unknown id.
    pub async fn remove_in(
        &self,
        conn: &mut SqliteConnection,
        instance_id: &str,
        delete_directory: bool,
    ) -> Result<(), InstanceError> {
        let record = queries::get_instance(conn, instance_id)
            .await?
            .ok_or_else(|| InstanceError::InstanceNotFound(instance_id.to_string()))?;

        queries::delete_instance(conn, instance_id).await?;

        if delete_directory {
            self.dispatcher.submit(ProvisionJob::DeleteDir {
                path: PathBuf::from(&record.source_folder_path),
            });
        }
        if !record.icon_path.is_empty() {
            materializer::delete_file(Path::new(&record.icon_path));
        }

        debug!("removed tool instance {instance_id}");
        Ok(())
    }

    /// Resolve which bundle a new instance materializes from.
    async fn resolve_source(
        &self,
        conn: &mut SqliteConnection,
        template_id: Option<&str>,
    ) -> Result<BundleSource, InstanceError> {
        match template_id {
            Some(template_id) => {
                let template = queries::get_template(conn, template_id)
                    .await?
                    .ok_or_else(|| InstanceError::TemplateNotFound(template_id.to_string()))?;
                Ok(BundleSource {
                    source_dir: PathBuf::from(&template.source_folder_path),
                    name: template.name,
                    code_file_name: template.code_file_name,
                    requirements_file_name: template.requirements_file_name,
                    icon_path: (!template.icon_path.is_empty())
                        .then(|| PathBuf::from(&template.icon_path)),
                    is_venv_tool: template.is_venv_tool,
                })
            }
            None => Ok(BundleSource {
                source_dir: self.layout.default_bundle_dir.clone(),
                name: DEFAULT_INSTANCE_NAME.to_string(),
                code_file_name: DEFAULT_CODE_FILE.to_string(),
                requirements_file_name: DEFAULT_REQUIREMENTS_FILE.to_string(),
                icon_path: None,
                is_venv_tool: true,
            }),
        }
    }

    /// Build the full view for a row, reading the bundle files from disk.
    fn assemble(&self, record: &ToolInstanceRecord) -> Result<ToolInstanceView, InstanceError> {
        let dir = Path::new(&record.source_folder_path);

        let code_path = dir.join(&record.code_file_name);
        let code = fs::read_to_string(&code_path).map_err(|e| {
            InstanceError::Internal(format!("cannot read {}: {e}", code_path.display()))
        })?;
        let requirements_path = dir.join(&record.requirements_file_name);
        let requirements = fs::read_to_string(&requirements_path).map_err(|e| {
            InstanceError::Internal(format!("cannot read {}: {e}", requirements_path.display()))
        })?;

        let (user_params, is_valid) = match self.scanner.scan(&code) {
            Ok(params) => (params, true),
            Err(e) => {
                warn!("parameter scan failed for tool instance {}: {e}", record.id);
                (Vec::new(), false)
            }
        };

        Ok(ToolInstanceView {
            id: record.id.clone(),
            workflow_id: record.workflow_id.clone(),
            name: record.name.clone(),
            source_folder_path: record.source_folder_path.clone(),
            code,
            requirements,
            user_params,
            is_valid,
            icon_uri: self.icon_uri(record),
            is_venv_tool: record.is_venv_tool,
        })
    }

    fn icon_uri(&self, record: &ToolInstanceRecord) -> String {
        if record.icon_path.is_empty() {
            String::new()
        } else {
            self.layout.icon_uri(Path::new(&record.icon_path))
        }
    }
}

impl std::fmt::Debug for ToolInstanceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInstanceManager")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
