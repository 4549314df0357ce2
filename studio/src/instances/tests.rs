use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::{tempdir, TempDir};

use crate::bundle::Layout;
use crate::params::ConfigClassScanner;
use crate::provisioner::{Dispatcher, EnvironmentBuilder};
use crate::store::{queries, RecordStore, ToolTemplateRecord, WorkflowRecord};

use super::{
    CreateToolInstance, InstanceError, ToolInstanceManager, UpdateToolInstance,
};

const WORKFLOW_ID: &str = "wf-1";

const TOOL_CODE: &str = "\
from pydantic import BaseModel


class UserParameters(BaseModel):
    greeting: str = \"hello\"
    repeat: int = 1


def run_tool(config, args):
    return config.greeting * config.repeat
";

#[derive(Default)]
struct RecordingBuilder {
    built: parking_lot::Mutex<Vec<(PathBuf, String)>>,
}

#[async_trait]
impl EnvironmentBuilder for RecordingBuilder {
    async fn build(&self, tool_dir: &Path, requirements_file: &str) -> anyhow::Result<()> {
        self.built
            .lock()
            .push((tool_dir.to_path_buf(), requirements_file.to_string()));
        Ok(())
    }
}

struct Harness {
    _tmp: TempDir,
    store: RecordStore,
    manager: ToolInstanceManager,
    dispatcher: Arc<Dispatcher>,
    builder: Arc<RecordingBuilder>,
    workflow_dir: PathBuf,
    assets_root: PathBuf,
    scratch_dir: PathBuf,
}

impl Harness {
    fn tools_dir(&self) -> PathBuf {
        self.workflow_dir.join("tools")
    }

    async fn seed_template(
        &self,
        id: &str,
        with_icon: bool,
        is_venv_tool: bool,
    ) -> anyhow::Result<ToolTemplateRecord> {
        let template_dir = self.scratch_dir.join(format!("template-{id}"));
        fs::create_dir_all(&template_dir)?;
        fs::write(template_dir.join("main.py"), TOOL_CODE)?;
        fs::write(template_dir.join("deps.txt"), "pydantic\n")?;

        let icon_path = if with_icon {
            let icon = self.scratch_dir.join(format!("{id}.png"));
            fs::write(&icon, b"\x89PNG")?;
            icon.display().to_string()
        } else {
            String::new()
        };

        let template = ToolTemplateRecord {
            id: id.to_string(),
            name: format!("Template {id}"),
            source_folder_path: template_dir.display().to_string(),
            icon_path,
            code_file_name: "main.py".to_string(),
            requirements_file_name: "deps.txt".to_string(),
            is_venv_tool,
        };
        let mut conn = self.store.acquire().await?;
        queries::insert_template(&mut conn, &template).await?;
        Ok(template)
    }
}

async fn harness() -> anyhow::Result<Harness> {
    let tmp = tempdir()?;
    let workflow_dir = tmp.path().join("workflow");
    fs::create_dir_all(&workflow_dir)?;
    let assets_root = tmp.path().join("assets");
    let scratch_dir = tmp.path().join("scratch");
    fs::create_dir_all(&scratch_dir)?;

    let default_bundle = tmp.path().join("default_tool");
    fs::create_dir_all(&default_bundle)?;
    fs::write(default_bundle.join("tool.py"), TOOL_CODE)?;
    fs::write(default_bundle.join("requirements.txt"), "pydantic\n")?;

    let store = RecordStore::in_memory().await?;
    store.init_schema().await?;
    let mut conn = store.acquire().await?;
    queries::insert_workflow(
        &mut conn,
        &WorkflowRecord {
            id: WORKFLOW_ID.to_string(),
            name: "Test Workflow".to_string(),
            directory: workflow_dir.display().to_string(),
        },
    )
    .await?;
    drop(conn);

    let builder = Arc::new(RecordingBuilder::default());
    let dispatcher = Arc::new(Dispatcher::start(
        Arc::clone(&builder) as Arc<dyn EnvironmentBuilder>,
        2,
    ));
    let manager = ToolInstanceManager::new(
        store.clone(),
        Arc::clone(&dispatcher),
        Layout::new(&assets_root, &default_bundle),
        Arc::new(ConfigClassScanner),
    );

    Ok(Harness {
        _tmp: tmp,
        store,
        manager,
        dispatcher,
        builder,
        workflow_dir,
        assets_root,
        scratch_dir,
    })
}

fn create_req(template_id: Option<&str>, name: Option<&str>) -> CreateToolInstance {
    CreateToolInstance {
        workflow_id: WORKFLOW_ID.to_string(),
        template_id: template_id.map(str::to_string),
        name: name.map(str::to_string),
    }
}

#[tokio::test]
async fn test_create_from_default_bundle() -> anyhow::Result<()> {
    let h = harness().await?;

    let outcome = h.manager.create(create_req(None, None)).await?;
    assert_eq!(outcome.name, "Tool Instance");

    let view = h.manager.get(outcome.id.as_str()).await?;
    assert_eq!(view.workflow_id, WORKFLOW_ID);
    assert!(view.is_valid);
    assert!(view.is_venv_tool);
    assert_eq!(view.requirements, "pydantic\n");
    let names: Vec<_> = view.user_params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["greeting", "repeat"]);

    let instance_dir = PathBuf::from(&view.source_folder_path);
    assert!(instance_dir.starts_with(h.tools_dir()));
    let dir_name = instance_dir.file_name().unwrap().to_str().unwrap();
    assert!(dir_name.starts_with("tool-instance_"), "got {dir_name}");
    assert!(instance_dir.join("tool.py").is_file());
    assert!(instance_dir.join("requirements.txt").is_file());

    h.dispatcher.shutdown().await;
    let built = h.builder.built.lock();
    assert_eq!(built.len(), 1);
    assert_eq!(built[0].0, instance_dir);
    assert_eq!(built[0].1, "requirements.txt");
    Ok(())
}

#[tokio::test]
async fn test_create_rejects_unknown_workflow() -> anyhow::Result<()> {
    let h = harness().await?;

    let result = h
        .manager
        .create(CreateToolInstance {
            workflow_id: "no-such-workflow".to_string(),
            template_id: None,
            name: None,
        })
        .await;
    assert!(matches!(result, Err(InstanceError::WorkflowNotFound(_))));
    assert!(!h.tools_dir().exists());
    Ok(())
}

#[tokio::test]
async fn test_create_rejects_unknown_template() -> anyhow::Result<()> {
    let h = harness().await?;

    let result = h.manager.create(create_req(Some("ghost"), None)).await;
    assert!(matches!(result, Err(InstanceError::TemplateNotFound(_))));
    assert!(!h.tools_dir().exists());
    Ok(())
}

#[tokio::test]
async fn test_create_cleans_up_when_template_source_is_gone() -> anyhow::Result<()> {
    let h = harness().await?;
    let template = h.seed_template("t-gone", false, true).await?;
    fs::remove_dir_all(&template.source_folder_path)?;

    let result = h.manager.create(create_req(Some("t-gone"), None)).await;
    assert!(matches!(result, Err(InstanceError::Bundle(_))));

    // No orphan directory and no committed row.
    let leftovers: Vec<_> = fs::read_dir(h.tools_dir())?.collect();
    assert!(leftovers.is_empty());
    let views = h.manager.list(None).await?;
    assert!(views.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_create_from_template_copies_icon() -> anyhow::Result<()> {
    let h = harness().await?;
    h.seed_template("t-icon", true, true).await?;

    let outcome = h.manager.create(create_req(Some("t-icon"), None)).await?;
    assert_eq!(outcome.name, "Template t-icon");

    let icon = h
        .assets_root
        .join("tool_icons")
        .join(format!("{}_icon.png", outcome.id));
    assert!(icon.is_file());

    let view = h.manager.get(outcome.id.as_str()).await?;
    assert_eq!(
        view.icon_uri,
        format!("tool_icons/{}_icon.png", outcome.id)
    );
    assert_eq!(view.code, TOOL_CODE);
    Ok(())
}

#[tokio::test]
async fn test_request_name_overrides_template_name() -> anyhow::Result<()> {
    let h = harness().await?;
    h.seed_template("t-named", false, true).await?;

    let outcome = h
        .manager
        .create(create_req(Some("t-named"), Some("My Analyzer")))
        .await?;
    assert_eq!(outcome.name, "My Analyzer");

    let view = h.manager.get(outcome.id.as_str()).await?;
    let dir_name = PathBuf::from(&view.source_folder_path);
    let dir_name = dir_name.file_name().unwrap().to_str().unwrap().to_string();
    assert!(dir_name.starts_with("my-analyzer_"), "got {dir_name}");
    Ok(())
}

#[tokio::test]
async fn test_update_name_and_icon() -> anyhow::Result<()> {
    let h = harness().await?;
    let outcome = h.manager.create(create_req(None, None)).await?;

    let tmp_icon = h.scratch_dir.join("upload.jpeg");
    fs::write(&tmp_icon, b"jpeg-bytes")?;

    h.manager
        .update(UpdateToolInstance {
            instance_id: outcome.id.as_str().to_string(),
            name: Some("Renamed".to_string()),
            tmp_icon_path: Some(tmp_icon.clone()),
        })
        .await?;

    // The temporary upload is consumed.
    assert!(!tmp_icon.exists());

    let view = h.manager.get(outcome.id.as_str()).await?;
    assert_eq!(view.name, "Renamed");
    assert_eq!(
        view.icon_uri,
        format!("tool_icons/{}_icon.jpeg", outcome.id)
    );

    // Create and update each requested a rebuild.
    h.dispatcher.shutdown().await;
    assert_eq!(h.builder.built.lock().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_update_rejects_unsupported_icon_type() -> anyhow::Result<()> {
    let h = harness().await?;
    let outcome = h.manager.create(create_req(None, None)).await?;

    let tmp_icon = h.scratch_dir.join("upload.gif");
    fs::write(&tmp_icon, b"gif-bytes")?;

    let result = h
        .manager
        .update(UpdateToolInstance {
            instance_id: outcome.id.as_str().to_string(),
            name: None,
            tmp_icon_path: Some(tmp_icon.clone()),
        })
        .await;
    assert!(matches!(result, Err(InstanceError::Validation(_))));

    // Rejected before any filesystem change: upload intact, icon unset.
    assert!(tmp_icon.exists());
    let view = h.manager.get(outcome.id.as_str()).await?;
    assert_eq!(view.icon_uri, "");
    Ok(())
}

#[tokio::test]
async fn test_update_rejects_missing_temp_icon() -> anyhow::Result<()> {
    let h = harness().await?;
    let outcome = h.manager.create(create_req(None, None)).await?;

    let result = h
        .manager
        .update(UpdateToolInstance {
            instance_id: outcome.id.as_str().to_string(),
            name: None,
            tmp_icon_path: Some(h.scratch_dir.join("never-written.png")),
        })
        .await;
    assert!(matches!(result, Err(InstanceError::TempFileNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_get_unknown_instance() -> anyhow::Result<()> {
    let h = harness().await?;
    let result = h.manager.get("no-such-instance").await;
    assert!(matches!(result, Err(InstanceError::InstanceNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_list_degrades_unreadable_bundles() -> anyhow::Result<()> {
    let h = harness().await?;
    let healthy = h.manager.create(create_req(None, Some("Healthy"))).await?;
    let broken = h.manager.create(create_req(None, Some("Broken"))).await?;

    let broken_view = h.manager.get(broken.id.as_str()).await?;
    fs::remove_file(PathBuf::from(&broken_view.source_folder_path).join("tool.py"))?;

    let views = h.manager.list(Some(WORKFLOW_ID)).await?;
    assert_eq!(views.len(), 2);

    let healthy_view = views
        .iter()
        .find(|v| v.id == healthy.id.as_str())
        .expect("healthy instance listed");
    assert!(healthy_view.is_valid);
    assert!(!healthy_view.code.is_empty());

    let broken_view = views
        .iter()
        .find(|v| v.id == broken.id.as_str())
        .expect("broken instance listed");
    assert!(!broken_view.is_valid);
    assert!(broken_view.code.is_empty());
    assert!(broken_view.user_params.is_empty());

    // A strict read of the broken instance fails instead of degrading.
    let result = h.manager.get(broken.id.as_str()).await;
    assert!(matches!(result, Err(InstanceError::Internal(_))));
    Ok(())
}

#[tokio::test]
async fn test_list_filters_by_workflow() -> anyhow::Result<()> {
    let h = harness().await?;
    h.manager.create(create_req(None, None)).await?;

    let other_dir = h.scratch_dir.join("other-workflow");
    fs::create_dir_all(&other_dir)?;
    let mut conn = h.store.acquire().await?;
    queries::insert_workflow(
        &mut conn,
        &WorkflowRecord {
            id: "wf-2".to_string(),
            name: "Other".to_string(),
            directory: other_dir.display().to_string(),
        },
    )
    .await?;
    drop(conn);
    h.manager
        .create(CreateToolInstance {
            workflow_id: "wf-2".to_string(),
            template_id: None,
            name: None,
        })
        .await?;

    assert_eq!(h.manager.list(None).await?.len(), 2);
    assert_eq!(h.manager.list(Some(WORKFLOW_ID)).await?.len(), 1);
    assert_eq!(h.manager.list(Some("wf-2")).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_malformed_parameters_degrade_the_view() -> anyhow::Result<()> {
    let h = harness().await?;
    let outcome = h.manager.create(create_req(None, None)).await?;

    let view = h.manager.get(outcome.id.as_str()).await?;
    fs::write(
        PathBuf::from(&view.source_folder_path).join("tool.py"),
        "class UserParameters(BaseModel):\n    x: str\n    def oops(self):\n",
    )?;

    let view = h.manager.get(outcome.id.as_str()).await?;
    assert!(!view.is_valid);
    assert!(view.user_params.is_empty());
    assert!(!view.code.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_remove_deletes_row_now_and_directory_later() -> anyhow::Result<()> {
    let h = harness().await?;
    let outcome = h.manager.create(create_req(None, None)).await?;
    let view = h.manager.get(outcome.id.as_str()).await?;
    let instance_dir = PathBuf::from(&view.source_folder_path);

    h.manager.remove(outcome.id.as_str(), true).await?;

    // Row is gone synchronously.
    let result = h.manager.get(outcome.id.as_str()).await;
    assert!(matches!(result, Err(InstanceError::InstanceNotFound(_))));

    // Directory deletion rides the background queue.
    h.dispatcher.shutdown().await;
    assert!(!instance_dir.exists());
    Ok(())
}

#[tokio::test]
async fn test_remove_can_keep_the_directory() -> anyhow::Result<()> {
    let h = harness().await?;
    let outcome = h.manager.create(create_req(None, None)).await?;
    let view = h.manager.get(outcome.id.as_str()).await?;
    let instance_dir = PathBuf::from(&view.source_folder_path);

    h.manager.remove(outcome.id.as_str(), false).await?;
    h.dispatcher.shutdown().await;
    assert!(instance_dir.exists());
    Ok(())
}

#[tokio::test]
async fn test_remove_unknown_instance() -> anyhow::Result<()> {
    let h = harness().await?;
    let result = h.manager.remove("no-such-instance", true).await;
    assert!(matches!(result, Err(InstanceError::InstanceNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_same_name_concurrent_creates_get_distinct_directories() -> anyhow::Result<()> {
    let h = harness().await?;
    let (first, second) = tokio::join!(
        h.manager.create(create_req(None, Some("Twin"))),
        h.manager.create(create_req(None, Some("Twin")))
    );
    let first = first?;
    let second = second?;

    let first_dir = h.manager.get(first.id.as_str()).await?.source_folder_path;
    let second_dir = h.manager.get(second.id.as_str()).await?.source_folder_path;
    assert_ne!(first_dir, second_dir);
    Ok(())
}

#[tokio::test]
async fn test_create_in_joins_a_caller_transaction() -> anyhow::Result<()> {
    let h = harness().await?;

    let mut tx = h.store.begin().await?;
    let first = h
        .manager
        .create_in(&mut tx, create_req(None, Some("First")))
        .await?;
    let second = h
        .manager
        .create_in(&mut tx, create_req(None, Some("Second")))
        .await?;
    tx.commit().await?;

    let views = h.manager.list(Some(WORKFLOW_ID)).await?;
    let ids: Vec<_> = views.iter().map(|v| v.id.as_str()).collect();
    assert!(ids.contains(&first.id.as_str()));
    assert!(ids.contains(&second.id.as_str()));
    Ok(())
}

#[tokio::test]
async fn test_non_venv_instance_still_gets_build_jobs() -> anyhow::Result<()> {
    let h = harness().await?;
    h.seed_template("t-plain", false, false).await?;

    let outcome = h.manager.create(create_req(Some("t-plain"), None)).await?;
    let view = h.manager.get(outcome.id.as_str()).await?;
    assert!(!view.is_venv_tool);

    h.manager
        .update(UpdateToolInstance {
            instance_id: outcome.id.as_str().to_string(),
            name: Some("Plain v2".to_string()),
            tmp_icon_path: None,
        })
        .await?;

    // Build dispatch does not depend on the venv flag: one job from the
    // create and one from the update, both naming the row's manifest.
    h.dispatcher.shutdown().await;
    let built = h.builder.built.lock();
    assert_eq!(built.len(), 2);
    assert!(built.iter().all(|(dir, manifest)| {
        *dir == PathBuf::from(&view.source_folder_path) && manifest.as_str() == "deps.txt"
    }));
    Ok(())
}

#[tokio::test]
async fn test_failed_insert_cleans_up_directory_and_icon() -> anyhow::Result<()> {
    let h = harness().await?;
    h.seed_template("t-orphan", true, true).await?;
    sqlx::query("DROP TABLE tool_instances")
        .execute(h.store.pool())
        .await?;

    let result = h.manager.create(create_req(Some("t-orphan"), None)).await;
    assert!(matches!(result, Err(InstanceError::Database(_))));

    // Neither the instance directory nor the copied icon survives.
    let leftovers: Vec<_> = fs::read_dir(h.tools_dir())?.collect();
    assert!(leftovers.is_empty());
    let icons_root = h.assets_root.join("tool_icons");
    if icons_root.exists() {
        assert!(fs::read_dir(&icons_root)?.next().is_none());
    }
    Ok(())
}
